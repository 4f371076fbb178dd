//! Tessera SQL
//!
//! The relational boundary of the engine:
//! - `Vendor`: the injected dialect capability (identifiers, types, probes, error mapping)
//! - `Connection` / `Row`: the statement execution interface
//! - Statement builders (`Select`, `Insert`, `Update`, `Delete`) with `Criteria` trees
//!   rendered to `?`-parameterized SQL
//! - Attribute mediators mapping attribute kinds to columns and values
//! - `CryptoProvider` for encrypted attributes

mod connection;
mod criteria;
mod crypto;
mod error;
mod identifier;
pub mod mediator;
mod statement;
mod vendor;

pub use connection::{Connection, DriverError, Row};
pub use criteria::{ColumnRef, CompareOp, Criteria};
pub use crypto::CryptoProvider;
pub use error::{SqlError, SqlErrorKind, SqlResult};
pub use identifier::{hash_identifier, shorten_identifier};
pub use statement::{Delete, Insert, Join, OrderBy, Select, SelectColumn, Statement, Update};
pub use vendor::{AnsiVendor, IdentifierCase, SqlType, Vendor};
