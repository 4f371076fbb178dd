//! Tessera Core Types
//!
//! This crate provides the foundational types used throughout Tessera:
//! - Identity types (HolderId, AttributeRef, RecordId)
//! - Value types (the Value enum carried by attributes, rows and statement parameters)
//! - Common error types

mod error;
mod id;
mod value;

pub use error::*;
pub use id::*;
pub use value::*;
