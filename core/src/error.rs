//! Common error types for Tessera.

use thiserror::Error;

/// Errors raised when converting between values and their typed forms.
#[derive(Debug, Error)]
pub enum ValueError {
    /// The value does not have the expected variant.
    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    /// A JSON attribute could not be encoded or decoded.
    #[error("Invalid JSON value: {0}")]
    Json(#[from] serde_json::Error),
}

impl ValueError {
    pub fn type_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}

/// Result type for value conversions.
pub type ValueResult<T> = Result<T, ValueError>;
