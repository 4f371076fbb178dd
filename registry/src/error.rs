//! Registry error types.

use thiserror::Error;

/// Errors raised while registering tables and columns.
#[derive(Debug, Error, PartialEq)]
pub enum RegistryError {
    #[error("Duplicate table name: {0}")]
    DuplicateTableName(String),

    #[error("Duplicate column '{column}' on table {table}")]
    DuplicateColumn { table: String, column: String },

    #[error("Holder {0} already has a table of this kind")]
    HolderAlreadyMapped(String),
}

/// Result type for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;
