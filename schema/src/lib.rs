//! Tessera Schema
//!
//! The declarative model the engine maps onto relational tables:
//! - Types with single inheritance, abstract and virtual flags
//! - Mixins: reusable attribute bundles mixed into Types
//! - Attributes: scalar, reference and inverse kinds
//! - Unique constraints over attributes of one holder
//!
//! Schemas are built once through `SchemaBuilder` and are immutable afterwards.

mod builder;
mod error;
mod schema;
mod types;

pub use builder::{MixinBuilder, SchemaBuilder, TypeBuilder, PRIMARY_KEY_NAME};
pub use error::{SchemaError, SchemaResult};
pub use schema::Schema;
pub use types::*;
