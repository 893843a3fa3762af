//! Linfa Explain prelude.
//!
//! This module contains the types and traits needed to ingest an ensemble and explain its
//! predictions, so that they can be imported as a group.
//!

#[doc(no_inline)]
pub use crate::error::{Error, Result};

#[doc(no_inline)]
pub use crate::ensemble::{Ensemble, EnsembleKind};

#[doc(no_inline)]
pub use crate::explainer::{Explainer, ExplainerParams, ExplainerValidParams};

#[doc(no_inline)]
pub use crate::literal::{ActiveMask, Instance, Literal};

#[doc(no_inline)]
pub use crate::oracle::{is_implicant, Target};

#[doc(no_inline)]
pub use crate::reason::Reason;

#[doc(no_inline)]
pub use crate::theory::{ClauseTheory, Propagator};

#[doc(no_inline)]
pub use crate::{Float, ParamGuard};
