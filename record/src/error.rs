//! Record errors.

use tessera_core::RecordId;
use thiserror::Error;

/// Result type for record operations.
pub type RecordResult<T> = Result<T, RecordError>;

/// Misuse of records or their context.
#[derive(Debug, Error, PartialEq)]
pub enum RecordError {
    #[error("Cannot instantiate {name}: not a concrete type")]
    NotConcrete { name: String },

    #[error("Type {holder} has no attribute {attr}")]
    UnknownAttribute { holder: String, attr: String },

    #[error("Attribute {holder}.{attr} cannot hold a {found} value")]
    ValueMismatch {
        holder: String,
        attr: String,
        found: String,
    },

    #[error("Attribute {holder}.{attr} is not a reference")]
    NotAReference { holder: String, attr: String },

    #[error("Attribute {holder}.{attr} is not an inverse")]
    NotAnInverse { holder: String, attr: String },

    #[error("Attribute {attr} expects a {expected}, got a {found}")]
    TargetMismatch {
        attr: String,
        expected: String,
        found: String,
    },

    #[error("Record belongs to another context")]
    ForeignRecord,

    #[error("Record is no longer attached to this context")]
    Detached,

    #[error("Record {holder}{id} is already persisted")]
    AlreadyPersisted { holder: String, id: RecordId },

    #[error("Another {holder}{id} is already registered")]
    DuplicateKey { holder: String, id: RecordId },

    #[error("Cannot attach a {holder} that was never persisted")]
    NotPersisted { holder: String },
}

impl RecordError {
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
}
