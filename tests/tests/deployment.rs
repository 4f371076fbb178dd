//! Engine deployment against the scripted connection.

use parking_lot::Mutex;
use std::sync::Arc;
use tessera_sql::AnsiVendor;
use tessera_tests::prelude::*;

fn engine(schema: Schema, script: &ScriptedConnection, config: EngineConfig) -> Engine {
    init_tracing();
    Engine::new(schema, Box::new(script.clone()), Arc::new(AnsiVendor::new())).with_config(config)
}

// ========== TEST: deploy_creates_every_object_once ==========
#[test]
fn test_deploy_creates_every_object_once() {
    // GIVEN Parent{child: Child} and an empty database
    let script = ScriptedConnection::new();
    let mut engine = engine(parent_child_schema(), &script, EngineConfig::new());

    // WHEN deployed twice
    let first = engine.deploy().unwrap().created;
    let objects = script.object_count();
    let second = engine.deploy().unwrap().created;

    // THEN the first run creates each object and the second finds them all
    assert_eq!(first, objects);
    assert!(script.has_object("Parent"));
    assert!(script.has_object("Child"));
    assert!(script.has_object("Parent.child"));
    assert!(script.has_object("Child.name"));
    assert!(script.has_object("FK_Parent_child"));
    assert_eq!(second, 0);
    assert_eq!(script.object_count(), objects);
}

// ========== TEST: polymorphic_reference_targets_join_table ==========
#[test]
fn test_polymorphic_reference_targets_join_table() {
    // GIVEN Holder{bar: Bar} where Bar has two concrete sub types
    let script = ScriptedConnection::new();
    let mut engine = engine(polymorphic_schema(), &script, EngineConfig::new());

    // WHEN deployed
    let sql_log = engine.deploy().unwrap().sql_log.clone();

    // THEN Bar_J links A and B and the reference points at it
    assert!(script.has_object("Bar_J"));
    assert!(script.has_object("Bar_J.A"));
    assert!(script.has_object("Bar_J.B"));
    assert!(!script.has_object("Bar"));
    assert!(sql_log
        .iter()
        .any(|s| s.contains("FOREIGN KEY (bar) REFERENCES Bar_J (id) ON DELETE SET NULL")));
    assert!(sql_log
        .iter()
        .any(|s| s.contains("FOREIGN KEY (B) REFERENCES B (id) ON DELETE CASCADE")));
}

// ========== TEST: validate_only_accepts_deployed_database ==========
#[test]
fn test_validate_only_accepts_deployed_database() {
    // GIVEN a database deployed by one engine
    let script = ScriptedConnection::new();
    engine(parent_child_schema(), &script, EngineConfig::new())
        .deploy()
        .unwrap();

    // WHEN a second engine validates the same schema
    let config = EngineConfig::new().with_deploy(DeployOptions::new().with_validate_only(true));
    let mut validator = engine(parent_child_schema(), &script, config);
    let deployment = validator.deploy().unwrap();

    // THEN nothing is missing and nothing is created
    assert!(deployment.findings.is_empty());
    assert_eq!(deployment.created, 0);
}

// ========== TEST: validate_only_reports_missing_tables ==========
#[test]
fn test_validate_only_reports_missing_tables() {
    // GIVEN an empty database and a lenient validating engine
    let script = ScriptedConnection::new();
    let options = DeployOptions::new()
        .with_validate_only(true)
        .with_ignore_validation_errors(true);
    let mut engine = engine(parent_child_schema(), &script, EngineConfig::new().with_deploy(options));

    // WHEN deployed
    let deployment = engine.deploy().unwrap();

    // THEN the missing tables are reported and no DDL ran
    assert!(deployment
        .findings
        .contains(&SchemaProblem::MissingTable { table: "Child".into() }));
    assert_eq!(script.object_count(), 0);
}

// ========== TEST: ambiguous_delete_policy_fails_deploy ==========
#[test]
fn test_ambiguous_delete_policy_fails_deploy() {
    // GIVEN a reference with neither a delete flag nor an orphan-deleting inverse
    let mut builder = SchemaBuilder::new();
    builder.add_type("Child").done().unwrap();
    builder
        .add_type("Parent")
        .attr(AttributeSpec::reference("child", "Child"))
        .done()
        .unwrap();
    let script = ScriptedConnection::new();
    let mut engine = engine(builder.build().unwrap(), &script, EngineConfig::new());

    // WHEN deployed
    let result = engine.deploy();

    // THEN it is a configuration error
    assert!(matches!(
        result,
        Err(SessionError::Deploy(DeployError::Schema(SchemaProblem::AmbiguousDeletePolicy { .. })))
    ));
}

// ========== TEST: orphan_deleting_inverse_promotes_cascade ==========
#[test]
fn test_orphan_deleting_inverse_promotes_cascade() {
    // GIVEN Parent.child without a flag but an inverse deleting orphans
    let mut builder = SchemaBuilder::new();
    builder
        .add_type("Child")
        .attr(AttributeSpec::inverse("parents", "Parent", "child").delete_orphans())
        .done()
        .unwrap();
    builder
        .add_type("Parent")
        .attr(AttributeSpec::reference("child", "Child"))
        .done()
        .unwrap();
    let script = ScriptedConnection::new();
    let mut engine = engine(builder.build().unwrap(), &script, EngineConfig::new());

    // WHEN deployed
    let sql_log = engine.deploy().unwrap().sql_log.clone();

    // THEN the foreign key cascades
    assert!(sql_log
        .iter()
        .any(|s| s.ends_with("REFERENCES Child (id) ON DELETE CASCADE")));
}

// ========== TEST: deployment_listener_notified ==========
#[test]
fn test_deployment_listener_notified() {
    // GIVEN a global deployment listener
    let script = ScriptedConnection::new();
    let mut engine = engine(node_schema(), &script, EngineConfig::new());
    let seen = Arc::new(Mutex::new(0));
    let counter = seen.clone();
    engine.listeners().add_global(
        ListenerKind::Deployment,
        Arc::new(move |_: &ListenerEvent<'_>| -> Result<(), String> {
            *counter.lock() += 1;
            Ok(())
        }),
    );

    // WHEN deployed twice
    engine.deploy().unwrap();
    engine.deploy().unwrap();

    // THEN it heard both
    assert_eq!(*seen.lock(), 2);
}

// ========== TEST: session_requires_deployment ==========
#[test]
fn test_session_requires_deployment() {
    let script = ScriptedConnection::new();
    let engine = engine(node_schema(), &script, EngineConfig::new());

    let result = engine.session();

    assert!(matches!(result, Err(SessionError::NotDeployed)));
}
