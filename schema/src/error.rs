//! Schema construction errors.

use thiserror::Error;

/// Errors that can occur while building a schema.
#[derive(Debug, Error, PartialEq)]
pub enum SchemaError {
    #[error("Duplicate holder name: {0}")]
    DuplicateHolderName(String),

    #[error("Duplicate attribute '{attribute}' on {holder}")]
    DuplicateAttribute { holder: String, attribute: String },

    #[error("Attribute name '{0}' is reserved for the primary key")]
    ReservedAttributeName(String),

    #[error("Invalid identifier: '{0}'")]
    InvalidIdentifier(String),

    #[error("Unknown super type: {0}")]
    UnknownSuperType(String),

    #[error("Super type {0} is a mixin")]
    SuperTypeIsMixin(String),

    #[error("Unknown mixin: {0}")]
    UnknownMixin(String),

    #[error("Inheritance cycle detected involving type: {0}")]
    InheritanceCycle(String),

    #[error("Unknown reference target '{target}' for attribute {holder}.{attribute}")]
    UnknownReferenceTarget {
        holder: String,
        attribute: String,
        target: String,
    },

    #[error("Unknown holder: {0}")]
    UnknownHolder(String),

    #[error("Unknown attribute '{attribute}' on {holder}")]
    UnknownAttribute { holder: String, attribute: String },

    #[error("Inverse attribute {holder}.{attribute} must point at a reference attribute")]
    InverseTargetNotReference { holder: String, attribute: String },

    #[error("Attribute {holder}.{attribute} cannot both cascade and nullify on delete")]
    ConflictingDeletePolicy { holder: String, attribute: String },

    #[error("Unique constraint on {0} has no attributes")]
    EmptyUniqueConstraint(String),
}

impl SchemaError {
    pub fn duplicate_attribute(holder: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self::DuplicateAttribute {
            holder: holder.into(),
            attribute: attribute.into(),
        }
    }

    pub fn unknown_attribute(holder: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self::UnknownAttribute {
            holder: holder.into(),
            attribute: attribute.into(),
        }
    }

    pub fn unknown_reference_target(
        holder: impl Into<String>,
        attribute: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self::UnknownReferenceTarget {
            holder: holder.into(),
            attribute: attribute.into(),
            target: target.into(),
        }
    }
}

/// Result type for schema operations.
pub type SchemaResult<T> = Result<T, SchemaError>;
