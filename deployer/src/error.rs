//! Deployment error types.

use tessera_registry::RegistryError;
use tessera_sql::DriverError;
use tessera_transaction::TransactionError;
use thiserror::Error;

/// A structural problem found while deploying or validating.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaProblem {
    #[error("table {table} does not exist")]
    MissingTable { table: String },

    #[error("column {table}.{column} does not exist")]
    MissingColumn { table: String, column: String },

    #[error("constraint {constraint} on {table} does not exist")]
    MissingConstraint { table: String, constraint: String },

    #[error("index {index} on {table} does not exist")]
    MissingIndex { table: String, index: String },

    /// A reference has neither a delete flag nor an inverse deleting orphans.
    #[error("no delete policy for reference {holder}.{attribute}: set cascade_delete or null_on_delete")]
    AmbiguousDeletePolicy { holder: String, attribute: String },
}

/// Deployment errors.
#[derive(Debug, Error)]
pub enum DeployError {
    #[error("schema error: {0}")]
    Schema(#[from] SchemaProblem),

    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("transaction error: {0}")]
    Transaction(#[from] TransactionError),

    /// An existence probe failed.
    #[error("probing {object} failed: {source}")]
    Probe {
        object: String,
        #[source]
        source: DriverError,
    },
}

impl DeployError {
    pub fn probe(object: impl Into<String>, source: DriverError) -> Self {
        Self::Probe {
            object: object.into(),
            source,
        }
    }
}

/// Result type for deployment operations.
pub type DeployResult<T> = Result<T, DeployError>;
