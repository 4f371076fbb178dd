//! Tessera Records
//!
//! The per-unit-of-work identity map.
//!
//! Responsibilities:
//! - Hold records in an arena addressed by `RecordHandle`s, so cyclic
//!   graphs need no shared ownership
//! - Key persisted records by (concrete type, id) and track pending ones
//!   per type
//! - Track back-references from every reference-valued attribute
//! - Attach persisted records from another context

mod context;
mod error;
mod record;

pub use context::{ContextId, RecordContext};
pub use error::{RecordError, RecordResult};
pub use record::{AttributeValue, Record, RecordHandle};
