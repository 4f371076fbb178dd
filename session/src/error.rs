//! Session error types.

use tessera_deployer::DeployError;
use tessera_query::QueryError;
use tessera_record::RecordError;
use tessera_sql::SqlError;
use tessera_transaction::TransactionError;
use thiserror::Error;

/// Session errors.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Unknown type: {0}")]
    UnknownType(String),

    #[error("Schema has not been deployed")]
    NotDeployed,

    #[error("Illegal argument: {0}")]
    IllegalArgument(String),

    #[error("Illegal state: {0}")]
    IllegalState(String),

    #[error("Mandatory attribute {holder}.{attr} is not set")]
    MissingMandatory { holder: String, attr: String },

    #[error("Unpersisted references form a cycle through {holder}")]
    ReferenceCycle { holder: String },

    #[error("Virtual attribute {holder}.{attr} failed: {message}")]
    VirtualAttribute {
        holder: String,
        attr: String,
        message: String,
    },

    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[error("record error: {0}")]
    Record(#[from] RecordError),

    #[error("query error: {0}")]
    Query(#[from] QueryError),

    #[error("transaction error: {0}")]
    Transaction(#[from] TransactionError),

    #[error("deploy error: {0}")]
    Deploy(#[from] DeployError),

    #[error("sql error: {0}")]
    Sql(#[from] SqlError),
}

impl SessionError {
    pub fn illegal_argument(message: impl Into<String>) -> Self {
        Self::IllegalArgument(message.into())
    }

    pub fn illegal_state(message: impl Into<String>) -> Self {
        Self::IllegalState(message.into())
    }

    /// The SQL error behind this failure, if any.
    pub fn as_sql(&self) -> Option<&SqlError> {
        match self {
            Self::Sql(e) | Self::Query(QueryError::Sql(e)) => Some(e),
            Self::Transaction(e) | Self::Deploy(DeployError::Transaction(e)) => e.as_sql(),
            _ => None,
        }
    }

    /// Returns true if the database rejected the change on a unique or
    /// referential rule.
    pub fn is_constraint_violation(&self) -> bool {
        self.as_sql()
            .is_some_and(SqlError::is_constraint_violation)
    }
}

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;
