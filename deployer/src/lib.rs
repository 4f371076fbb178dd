//! Tessera Deployer
//!
//! Turn a Schema into tables.
//!
//! Responsibilities:
//! - Map types, mixins and unique constraints onto type, join and
//!   unique-constraint tables in a fresh TableRegistry
//! - Render the DDL for tables, columns, unique constraints, foreign keys
//!   and indexes, keeping every statement in a deployment log
//! - Probe for each object and create only what is missing, each in its own
//!   transaction, or report what is missing in validate-only mode

mod ddl;
mod deployer;
mod error;
mod mapping;
mod options;

pub use ddl::{Ddl, DdlObject};
pub use deployer::{Deployer, Deployment};
pub use error::{DeployError, DeployResult, SchemaProblem};
pub use mapping::{map_schema, TableMapping};
pub use options::DeployOptions;
