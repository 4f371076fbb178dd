//! Transaction error types.

use tessera_sql::SqlError;
use thiserror::Error;

/// Transaction errors.
#[derive(Debug, Error)]
pub enum TransactionError {
    /// A statement or the transaction boundary failed.
    #[error("sql error: {0}")]
    Sql(#[from] SqlError),

    /// A transaction was opened while another is active on this thread.
    #[error("nested transactions are not supported")]
    NestedTransaction,

    /// The transaction already reached a terminal state.
    #[error("transaction already committed or rolled back")]
    AlreadyCommitted,

    /// The outcome was queried before any commit attempt.
    #[error("transaction has not been committed yet")]
    NotCommitted,

    /// A listener vetoed the operation.
    #[error("listener failed: {0}")]
    Listener(String),

    /// A queued logic unit failed with a caller error.
    #[error("logic failed: {0}")]
    Logic(Box<dyn std::error::Error + Send + Sync>),
}

impl TransactionError {
    pub fn logic(error: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Logic(Box::new(error))
    }

    /// The SQL error behind this failure, if any.
    pub fn as_sql(&self) -> Option<&SqlError> {
        match self {
            Self::Sql(e) => Some(e),
            _ => None,
        }
    }
}

/// Result type for transaction operations.
pub type TransactionResult<T> = Result<T, TransactionError>;
