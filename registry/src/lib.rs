//! Tessera Registry
//!
//! Physical mapping of a schema: which tables exist, which columns they
//! carry and how join tables union the primary keys of the tables below
//! them. Populated by the deployer, read by everything that builds SQL.
//!
//! - `TableRegistry`: type tables, join tables and unique-constraint tables
//! - `ConstraintRegistry`: backing columns of each unique constraint

mod constraint;
mod error;
mod registry;
mod table;

pub use constraint::{ConstraintRegistry, UniqueConstraintInfo};
pub use error::{RegistryError, RegistryResult};
pub use registry::TableRegistry;
pub use table::{AttributeColumn, ColumnRole, Table, TableId, TableKind};
