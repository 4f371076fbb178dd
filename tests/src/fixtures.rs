//! Schemas and engines shared by the integration tests.

use crate::ScriptedConnection;
use std::sync::Arc;
use tessera_core::Value;
use tessera_schema::{AttributeSpec, Schema, SchemaBuilder};
use tessera_session::{Engine, EngineConfig};
use tessera_sql::{AnsiVendor, Row};

/// Install a test log subscriber once per process.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// A result row from (alias, value) pairs.
pub fn row<const N: usize>(pairs: [(&str, Value); N]) -> Row {
    Row::from_pairs(pairs)
}

/// `Parent{child: Child}` owning its child, `Child{name}` with the inverse
/// `parents`.
pub fn parent_child_schema() -> Schema {
    let mut builder = SchemaBuilder::new();
    builder
        .add_type("Child")
        .attr(AttributeSpec::string("name"))
        .attr(AttributeSpec::inverse("parents", "Parent", "child"))
        .done()
        .unwrap();
    builder
        .add_type("Parent")
        .attr(AttributeSpec::reference("child", "Child").cascade_delete())
        .done()
        .unwrap();
    builder.build().unwrap()
}

/// `Node{name, parent: Node}`, cleared when the parent goes away.
pub fn node_schema() -> Schema {
    let mut builder = SchemaBuilder::new();
    builder
        .add_type("Node")
        .attr(AttributeSpec::string("name"))
        .attr(AttributeSpec::reference("parent", "Node").null_on_delete())
        .done()
        .unwrap();
    builder.build().unwrap()
}

/// Abstract `Bar{name}` with `A` and `B{size}`, referenced by `Holder.bar`.
pub fn polymorphic_schema() -> Schema {
    let mut builder = SchemaBuilder::new();
    builder
        .add_type("Bar")
        .abstract_type()
        .attr(AttributeSpec::string("name"))
        .done()
        .unwrap();
    builder.add_type("A").extends("Bar").done().unwrap();
    builder
        .add_type("B")
        .extends("Bar")
        .attr(AttributeSpec::integer("size"))
        .done()
        .unwrap();
    builder
        .add_type("Holder")
        .attr(AttributeSpec::reference("bar", "Bar").null_on_delete())
        .done()
        .unwrap();
    builder.build().unwrap()
}

/// `Person{first!, last}` unique on (first, last), with a virtual `full`.
pub fn person_schema() -> Schema {
    let mut builder = SchemaBuilder::new();
    builder
        .add_type("Person")
        .attr(AttributeSpec::string("first").mandatory())
        .attr(AttributeSpec::string("last"))
        .attr(AttributeSpec::string("full").virtual_attr())
        .done()
        .unwrap();
    builder.add_unique_constraint("Person", ["first", "last"]);
    builder.build().unwrap()
}

/// An engine deployed against a fresh script whose log has been cleared.
pub fn deployed(schema: Schema, config: EngineConfig) -> (Engine, ScriptedConnection) {
    init_tracing();
    let script = ScriptedConnection::new();
    let mut engine = Engine::new(schema, Box::new(script.clone()), Arc::new(AnsiVendor::new()))
        .with_config(config);
    engine.deploy().expect("fixture schema deploys");
    script.clear_log();
    (engine, script)
}
