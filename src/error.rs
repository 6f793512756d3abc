//! Errors
//!
//! The error type shared by every fallible operation in the crate.
use thiserror::Error;

/// Errors reported by estimators and data utilities.
#[derive(Debug, Error)]
pub enum MlError {
    /// Malformed dimensions or parameter values at construction or fit time.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Vector or sample width does not match what the model was fitted on.
    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },
    /// Prediction or pruning requested before a tree was fitted.
    #[error("the tree has not been fitted yet")]
    EmptyTree,
    /// A cardinality constraint cannot be satisfied by the data.
    #[error("insufficient data: {0}")]
    InsufficientData(String),
}

impl MlError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn insufficient_data(message: impl Into<String>) -> Self {
        Self::InsufficientData(message.into())
    }
}
