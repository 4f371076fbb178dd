//! Query error types.

use tessera_parser::ParseError;
use tessera_sql::SqlError;
use thiserror::Error;

/// Result type for query operations.
pub type QueryResult<T> = Result<T, QueryError>;

/// Errors raised while building, compiling or decoding queries.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("Unknown type: {name}")]
    UnknownHolder { name: String },

    #[error("Unknown attribute: {attr} on type {holder}")]
    UnknownAttribute { holder: String, attr: String },

    #[error("Attribute {attr} on type {holder} is not a reference")]
    NotAReference { holder: String, attr: String },

    #[error("Type {holder} has no table")]
    Unmapped { holder: String },

    #[error("Query needs argument {index} but only {given} were given")]
    MissingArgument { index: usize, given: usize },

    #[error("LIMIT and OFFSET take a non-negative integer, got {value}")]
    InvalidPaging { value: String },

    #[error("{path} {op} null never holds; only = compares with null")]
    NullOrdering { path: String, op: &'static str },

    #[error("Walk aborted at {path}")]
    Aborted { path: String },

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("SQL error: {0}")]
    Sql(#[from] SqlError),
}

impl QueryError {
    pub fn unknown_holder(name: impl Into<String>) -> Self {
        Self::UnknownHolder { name: name.into() }
    }

    pub fn unknown_attribute(holder: impl Into<String>, attr: impl Into<String>) -> Self {
        Self::UnknownAttribute {
            holder: holder.into(),
            attr: attr.into(),
        }
    }

    pub fn not_a_reference(holder: impl Into<String>, attr: impl Into<String>) -> Self {
        Self::NotAReference {
            holder: holder.into(),
            attr: attr.into(),
        }
    }

    pub fn unmapped(holder: impl Into<String>) -> Self {
        Self::Unmapped {
            holder: holder.into(),
        }
    }
}
