//! Tessera integration test support.
//!
//! Responsibilities:
//! - An in-memory `ScriptedConnection` that records statements, answers
//!   existence probes, returns queued rows and fails on demand
//! - Schema fixtures and deployed engines shared by the integration tests

mod connection;
mod fixtures;

pub use connection::{Executed, ScriptedConnection};
pub use fixtures::{
    deployed, init_tracing, node_schema, parent_child_schema, person_schema, polymorphic_schema, row,
};

pub mod prelude {
    pub use crate::{
        deployed, init_tracing, node_schema, parent_child_schema, person_schema, polymorphic_schema, row,
        Executed, ScriptedConnection,
    };
    pub use tessera_core::{RecordId, Value};
    pub use tessera_deployer::{DeployError, DeployOptions, SchemaProblem};
    pub use tessera_query::{Example, LoadingMode};
    pub use tessera_record::{AttributeValue, RecordHandle};
    pub use tessera_schema::{AttributeSpec, Schema, SchemaBuilder};
    pub use tessera_session::{Engine, EngineConfig, Session, SessionError};
    pub use tessera_sql::Row;
    pub use tessera_transaction::{ListenerEvent, ListenerKind};
}
