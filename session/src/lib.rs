//! Tessera Session
//!
//! The accessor layer.
//!
//! Responsibilities:
//! - Own the schema, the connection template, the listener and adapter
//!   registries, and the table mapping produced by deployment (`Engine`)
//! - Run inserts, updates and deletes as one transaction each, cascading
//!   to unpersisted and owned references (`Session`)
//! - Read by id, by nquery and by example into the session's identity map,
//!   resolving lazy references and inverse attributes on demand

mod config;
mod engine;
mod error;
mod keys;
mod read;
mod session;
mod write;

pub use config::EngineConfig;
pub use engine::Engine;
pub use error::{SessionError, SessionResult};
pub use session::Session;
