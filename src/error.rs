//! Error types in Linfa Explain
//!

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("invalid tree model: {0}")]
    ModelIngest(String),
    #[error("the ensemble has no trees, add at least one tree before querying")]
    UninitializedEnsemble,
    #[error("dimension mismatch: expected {expected} values, found {found}")]
    DimensionMismatch { expected: usize, found: usize },
    #[error("invalid class {class}, the ensemble has {n_classes} classes")]
    InvalidClass { class: usize, n_classes: usize },
    #[error("invalid configuration {0}")]
    InvalidConfiguration(String),
    #[error("operation not supported by this ensemble: {0}")]
    UnsupportedKind(String),
    #[error("the instance does not force the prediction {0}")]
    TargetNotForced(String),
}

#[cfg(feature = "serde")]
impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::ModelIngest(err.to_string())
    }
}
