//! SQL error types.

use crate::DriverError;
use tessera_core::ValueError;
use thiserror::Error;

/// Domain classification of a driver failure, decided by the vendor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlErrorKind {
    /// A unique or check constraint rejected the statement.
    ConstraintViolation,
    /// A foreign key or other referential rule rejected the statement.
    Integrity,
    /// Any other failure.
    Execution,
}

/// Errors raised by statement execution and value mediation.
#[derive(Debug, Error)]
pub enum SqlError {
    #[error("Constraint violation: {message}")]
    ConstraintViolation { message: String, sql: String },

    #[error("Integrity violation: {message}")]
    Integrity { message: String, sql: String },

    #[error("Statement failed: {message}")]
    Execution { message: String, sql: String },

    #[error("Column '{0}' not present in result row")]
    MissingColumn(String),

    #[error("Attribute {0} is encrypted but no crypto provider is configured")]
    MissingCryptoProvider(String),

    #[error("Crypto failure: {0}")]
    Crypto(String),

    #[error("Value error: {0}")]
    Value(#[from] ValueError),
}

impl SqlError {
    /// Wrap a driver error using the vendor's classification.
    pub fn from_driver(kind: SqlErrorKind, error: DriverError, sql: impl Into<String>) -> Self {
        let sql = sql.into();
        let message = error.to_string();
        match kind {
            SqlErrorKind::ConstraintViolation => Self::ConstraintViolation { message, sql },
            SqlErrorKind::Integrity => Self::Integrity { message, sql },
            SqlErrorKind::Execution => Self::Execution { message, sql },
        }
    }

    /// Classification of this error; mediation failures count as execution errors.
    pub fn kind(&self) -> SqlErrorKind {
        match self {
            Self::ConstraintViolation { .. } => SqlErrorKind::ConstraintViolation,
            Self::Integrity { .. } => SqlErrorKind::Integrity,
            _ => SqlErrorKind::Execution,
        }
    }

    /// Returns true for business-rule violations callers may want to branch on.
    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self.kind(),
            SqlErrorKind::ConstraintViolation | SqlErrorKind::Integrity
        )
    }
}

/// Result type for SQL operations.
pub type SqlResult<T> = Result<T, SqlError>;
