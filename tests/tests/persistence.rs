//! Insert, read back and delete through Parent{child: Child}.

use pretty_assertions::assert_eq;
use tessera_tests::prelude::*;

const PARENT_READ: &str = "SELECT t0.id AS c0, t0.child AS c1, t1.id AS c2, t1.name AS c3 \
                           FROM Parent t0 LEFT JOIN Child t1 ON t0.child = t1.id WHERE t0.id = ?";

fn executed(sql: &str, params: Vec<Value>) -> Executed {
    Executed {
        sql: sql.to_string(),
        params,
    }
}

/// Insert Parent{child: Child{name: "x"}} and return both handles.
fn parent_with_child(session: &mut Session<'_>) -> (RecordHandle, RecordHandle) {
    let child = session.create("Child").unwrap();
    session.set(child, "name", "x").unwrap();
    let parent = session.create("Parent").unwrap();
    session.set_reference(parent, "child", Some(child)).unwrap();
    session.insert(parent).unwrap();
    (parent, child)
}

// ========== TEST: cascade_insert_orders_targets_first ==========
#[test]
fn test_cascade_insert_orders_targets_first() {
    // GIVEN an unpersisted Parent pointing at an unpersisted Child
    let (engine, script) = deployed(parent_child_schema(), EngineConfig::new());
    let mut session = engine.session().unwrap();
    let child = session.create("Child").unwrap();
    session.set(child, "name", "x").unwrap();
    let parent = session.create("Parent").unwrap();
    session.set_reference(parent, "child", Some(child)).unwrap();

    // WHEN the parent is inserted
    let id = session.insert(parent).unwrap();

    // THEN the child is inserted first in the same transaction and both get ids
    assert_eq!(
        script.committed(),
        vec![
            executed("INSERT INTO Child (name) VALUES (?)", vec![Value::from("x")]),
            executed("INSERT INTO Parent (child) VALUES (?)", vec![Value::Int(1)]),
        ]
    );
    assert_eq!(script.commits(), 1);
    assert_eq!(id, RecordId::new(2));
    assert_eq!(session.id(child).unwrap(), Some(RecordId::new(1)));
    assert_eq!(session.id(parent).unwrap(), Some(RecordId::new(2)));
}

// ========== TEST: read_by_id_round_trip ==========
#[test]
fn test_read_by_id_round_trip() {
    // GIVEN a stored Parent 2 whose child 1 is named "x"
    let (engine, script) = deployed(parent_child_schema(), EngineConfig::new());
    script.respond(
        "FROM Parent",
        vec![row([
            ("c0", Value::Int(2)),
            ("c1", Value::Int(1)),
            ("c2", Value::Int(1)),
            ("c3", Value::from("x")),
        ])],
    );
    let mut session = engine.session().unwrap();

    // WHEN the parent is read by id
    let parent = session.read_by_id("Parent", RecordId::new(2)).unwrap().unwrap();
    let child = session.resolve(parent, "child").unwrap().unwrap();

    // THEN one eager read brings the child along
    assert_eq!(script.attempted(), vec![executed(PARENT_READ, vec![Value::Int(2)])]);
    assert_eq!(session.type_name(child).unwrap(), "Child");
    assert_eq!(session.id(child).unwrap(), Some(RecordId::new(1)));
    assert_eq!(session.value(child, "name").unwrap(), Value::from("x"));

    // AND reading it again is served by the identity map
    let again = session.read_by_id("Parent", RecordId::new(2)).unwrap().unwrap();
    assert_eq!(again, parent);
    assert_eq!(script.attempted().len(), 1);
}

// ========== TEST: read_missing_row_yields_none ==========
#[test]
fn test_read_missing_row_yields_none() {
    let (engine, _script) = deployed(parent_child_schema(), EngineConfig::new());
    let mut session = engine.session().unwrap();

    let found = session.read_by_id("Child", RecordId::new(42)).unwrap();

    assert_eq!(found, None);
}

// ========== TEST: lazy_reference_resolved_on_demand ==========
#[test]
fn test_lazy_reference_resolved_on_demand() {
    // GIVEN lazy reads and a stored Parent 2 -> Child 1
    let config = EngineConfig::new().with_read_loading(LoadingMode::Lazy);
    let (engine, script) = deployed(parent_child_schema(), config);
    script.respond("FROM Parent", vec![row([("c0", Value::Int(2)), ("c1", Value::Int(1))])]);
    script.respond("FROM Child", vec![row([("c0", Value::Int(1)), ("c1", Value::from("x"))])]);
    let mut session = engine.session().unwrap();

    // WHEN the parent is read
    let parent = session.read_by_id("Parent", RecordId::new(2)).unwrap().unwrap();

    // THEN the child is only a key
    let child_type = session.holder("Child").unwrap();
    assert_eq!(
        session.get(parent, "child").unwrap(),
        Some(&AttributeValue::Lazy {
            holder: child_type,
            key: 1
        })
    );
    assert_eq!(script.attempted_like("FROM Child").len(), 0);

    // AND resolving it reads the child once
    let child = session.resolve(parent, "child").unwrap().unwrap();
    assert_eq!(session.value(child, "name").unwrap(), Value::from("x"));
    assert_eq!(
        script.attempted_like("FROM Child"),
        vec![executed(
            "SELECT t0.id AS c0, t0.name AS c1 FROM Child t0 WHERE t0.id = ?",
            vec![Value::Int(1)]
        )]
    );
    assert_eq!(session.resolve(parent, "child").unwrap(), Some(child));
    assert_eq!(script.attempted_like("FROM Child").len(), 1);
}

// ========== TEST: update_writes_every_column ==========
#[test]
fn test_update_writes_every_column() {
    // GIVEN a persisted child
    let (engine, script) = deployed(parent_child_schema(), EngineConfig::new());
    let mut session = engine.session().unwrap();
    let (_, child) = parent_with_child(&mut session);
    script.clear_log();

    // WHEN renamed and updated
    session.set(child, "name", "y").unwrap();
    session.update(child).unwrap();

    // THEN one UPDATE keyed by id
    assert_eq!(
        script.committed(),
        vec![executed(
            "UPDATE Child SET name = ? WHERE Child.id = ?",
            vec![Value::from("y"), Value::Int(1)]
        )]
    );
}

// ========== TEST: delete_cascades_to_owned_child ==========
#[test]
fn test_delete_cascades_to_owned_child() {
    // GIVEN Parent -> Child with child flagged cascade_delete
    let (engine, script) = deployed(parent_child_schema(), EngineConfig::new());
    let mut session = engine.session().unwrap();
    let (parent, child) = parent_with_child(&mut session);
    script.clear_log();

    // WHEN the parent is deleted
    session.delete(parent).unwrap();

    // THEN parent and child are deleted in one transaction and leave the session
    assert_eq!(
        script.committed(),
        vec![
            executed("DELETE FROM Parent WHERE Parent.id = ?", vec![Value::Int(2)]),
            executed("DELETE FROM Child WHERE Child.id = ?", vec![Value::Int(1)]),
        ]
    );
    assert!(session.record(parent).is_err());
    assert!(session.record(child).is_err());
    assert!(session.context().is_empty());
}

// ========== TEST: deleting_child_detaches_cascading_parent ==========
#[test]
fn test_deleting_child_detaches_cascading_parent() {
    // GIVEN Parent -> Child where the foreign key cascades
    let (engine, script) = deployed(parent_child_schema(), EngineConfig::new());
    let mut session = engine.session().unwrap();
    let (parent, child) = parent_with_child(&mut session);
    script.clear_log();

    // WHEN the child is deleted
    session.delete(child).unwrap();

    // THEN only the child row is deleted and the database takes the parent with it
    assert_eq!(
        script.committed(),
        vec![executed("DELETE FROM Child WHERE Child.id = ?", vec![Value::Int(1)])]
    );
    assert!(session.record(parent).is_err());
}

// ========== TEST: load_inverse_queries_referrers ==========
#[test]
fn test_load_inverse_queries_referrers() {
    // GIVEN a loaded Child 1 referenced by Parent 2
    let (engine, script) = deployed(parent_child_schema(), EngineConfig::new());
    script.respond("FROM Child", vec![row([("c0", Value::Int(1)), ("c1", Value::from("x"))])]);
    script.respond(
        "FROM Parent",
        vec![row([
            ("c0", Value::Int(2)),
            ("c1", Value::Int(1)),
            ("c2", Value::Int(1)),
            ("c3", Value::from("x")),
        ])],
    );
    let mut session = engine.session().unwrap();
    let child = session.read_by_id("Child", RecordId::new(1)).unwrap().unwrap();

    // WHEN the inverse is loaded
    let parents = session.load_inverse(child, "parents").unwrap();

    // THEN the parents are found by the child's key
    assert_eq!(parents.len(), 1);
    assert_eq!(session.type_name(parents[0]).unwrap(), "Parent");
    assert_eq!(session.resolve(parents[0], "child").unwrap(), Some(child));
    assert_eq!(
        session.get(child, "parents").unwrap(),
        Some(&AttributeValue::Inverse(parents.clone()))
    );
    let query = &script.attempted_like("FROM Parent")[0];
    assert!(query.sql.contains("t0.child = ?"));
    assert_eq!(query.params, vec![Value::Int(1)]);
}
