//! `linfa-explain` computes abductive explanations for the predictions of tree ensembles.
//!
//! ## The big picture
//!
//! `linfa-explain` is a crate in the [linfa](https://github.com/rust-ml/linfa) ecosystem. Given
//! a trained ensemble and an observation, it looks for a small set of split conditions of the
//! observation which is *sufficient*: whatever values the remaining conditions take, the ensemble
//! keeps predicting the same class.
//!
//! ## Current state
//!
//! Supported are boosted trees (binary, multiclass and regression) and random forests (binary
//! and multiclass). Trees are ingested from an [external format](ensemble::RawTree) and every
//! split condition becomes a [`Literal`]. The [`Explainer`] shrinks the full set of literals of
//! an [`Instance`] to a locally minimal [`Reason`]:
//!
//! ```rust
//! use linfa_explain::prelude::*;
//! use linfa_explain::ensemble::{Operator, RawNode, RawTree};
//! use ndarray::array;
//!
//! let mut ensemble = Ensemble::boosted_binary();
//! ensemble.add_tree(&RawTree::new(RawNode::split(
//!     0,
//!     Operator::LessOrEqual,
//!     5.0,
//!     RawNode::leaf(1.0),
//!     RawNode::leaf(-1.0),
//! )))?;
//! ensemble.add_tree(&RawTree::new(RawNode::split(
//!     1,
//!     Operator::LessOrEqual,
//!     0.0,
//!     RawNode::leaf(0.2),
//!     RawNode::leaf(-0.2),
//! )))?;
//!
//! let instance = ensemble.binarize(&array![3.0, 1.0])?;
//! let mut explainer = Explainer::new(ensemble);
//! let prediction = explainer.predict(&instance)?;
//! let reason = explainer.compute_reason_conditions(&instance, prediction, 42)?;
//!
//! // x0 <= 5 alone keeps the margin positive
//! assert_eq!(reason.indices(), &[0]);
//! # Ok::<(), linfa_explain::Error>(())
//! ```

pub mod benchmarks;
pub mod ensemble;
pub mod error;
pub mod explainer;
pub mod literal;
pub mod oracle;
mod param_guard;
pub mod prelude;
pub mod reason;
pub mod theory;

use std::fmt;
use std::iter::Sum;
use std::ops::AddAssign;

use num_traits::{FromPrimitive, NumCast};

pub use ensemble::{Ensemble, EnsembleKind};
pub use error::{Error, Result};
pub use explainer::{Explainer, ExplainerParams, ExplainerValidParams};
pub use literal::{ActiveMask, Instance, Literal};
pub use oracle::{is_implicant, Target};
pub use param_guard::ParamGuard;
pub use reason::Reason;
pub use theory::{ClauseTheory, Propagator};

/// Floating point numbers
///
/// Thresholds of split conditions and leaf weights are stored with this type. It is implemented
/// for 32bit and 64bit floating points.
pub trait Float:
    num_traits::Float
    + FromPrimitive
    + Default
    + Sum
    + AddAssign
    + fmt::Display
    + fmt::Debug
    + Send
    + Sync
    + 'static
{
    fn cast<T: NumCast>(x: T) -> Self {
        NumCast::from(x).unwrap()
    }
}

impl Float for f32 {}
impl Float for f64 {}
