//! Reference chains, cycles and delete policies over Node{name, parent}.

use pretty_assertions::assert_eq;
use tessera_record::RecordError;
use tessera_tests::prelude::*;

fn executed(sql: &str, params: Vec<Value>) -> Executed {
    Executed {
        sql: sql.to_string(),
        params,
    }
}

fn node(session: &mut Session<'_>, name: &str, parent: Option<RecordHandle>) -> RecordHandle {
    let handle = session.create("Node").unwrap();
    session.set(handle, "name", name).unwrap();
    session.set_reference(handle, "parent", parent).unwrap();
    handle
}

// ========== TEST: chain_inserted_root_first ==========
#[test]
fn test_chain_inserted_root_first() {
    // GIVEN c -> b -> a, none persisted
    let (engine, script) = deployed(node_schema(), EngineConfig::new());
    let mut session = engine.session().unwrap();
    let a = node(&mut session, "a", None);
    let b = node(&mut session, "b", Some(a));
    let c = node(&mut session, "c", Some(b));

    // WHEN the leaf is inserted
    let id = session.insert(c).unwrap();

    // THEN the chain is written from the root down, each row pointing at the previous one
    assert_eq!(
        script.committed(),
        vec![
            executed("INSERT INTO Node (name) VALUES (?)", vec![Value::from("a")]),
            executed(
                "INSERT INTO Node (name, parent) VALUES (?, ?)",
                vec![Value::from("b"), Value::Int(1)]
            ),
            executed(
                "INSERT INTO Node (name, parent) VALUES (?, ?)",
                vec![Value::from("c"), Value::Int(2)]
            ),
        ]
    );
    assert_eq!(id, RecordId::new(3));
    assert_eq!(session.id(a).unwrap(), Some(RecordId::new(1)));
    assert_eq!(session.id(b).unwrap(), Some(RecordId::new(2)));
}

// ========== TEST: persisted_target_not_reinserted ==========
#[test]
fn test_persisted_target_not_reinserted() {
    let (engine, script) = deployed(node_schema(), EngineConfig::new());
    let mut session = engine.session().unwrap();
    let root = node(&mut session, "root", None);
    session.insert(root).unwrap();
    script.clear_log();

    let leaf = node(&mut session, "leaf", Some(root));
    session.insert(leaf).unwrap();

    assert_eq!(
        script.committed(),
        vec![executed(
            "INSERT INTO Node (name, parent) VALUES (?, ?)",
            vec![Value::from("leaf"), Value::Int(1)]
        )]
    );
}

// ========== TEST: unpersisted_cycle_rejected ==========
#[test]
fn test_unpersisted_cycle_rejected() {
    // GIVEN two new nodes pointing at each other
    let (engine, script) = deployed(node_schema(), EngineConfig::new());
    let mut session = engine.session().unwrap();
    let a = node(&mut session, "a", None);
    let b = node(&mut session, "b", Some(a));
    session.set_reference(a, "parent", Some(b)).unwrap();

    // WHEN one is inserted
    let result = session.insert(a);

    // THEN no order exists and nothing is sent
    assert!(matches!(result, Err(SessionError::ReferenceCycle { ref holder }) if holder == "Node"));
    assert!(script.attempted().is_empty());
    assert_eq!(session.id(a).unwrap(), None);
}

// ========== TEST: second_insert_rejected ==========
#[test]
fn test_second_insert_rejected() {
    let (engine, script) = deployed(node_schema(), EngineConfig::new());
    let mut session = engine.session().unwrap();
    let a = node(&mut session, "a", None);
    session.insert(a).unwrap();

    let again = session.insert(a);

    assert!(matches!(again, Err(SessionError::IllegalState(_))));
    assert_eq!(script.committed().len(), 1);
}

// ========== TEST: unpersisted_update_and_delete_rejected ==========
#[test]
fn test_unpersisted_update_and_delete_rejected() {
    let (engine, script) = deployed(node_schema(), EngineConfig::new());
    let mut session = engine.session().unwrap();
    let a = node(&mut session, "a", None);

    let updated = session.update(a);
    let deleted = session.delete(a);

    assert!(matches!(updated, Err(SessionError::Record(RecordError::NotPersisted { .. }))));
    assert!(matches!(deleted, Err(SessionError::Record(RecordError::NotPersisted { .. }))));
    assert!(script.attempted().is_empty());
}

// ========== TEST: delete_clears_nulling_referrers ==========
#[test]
fn test_delete_clears_nulling_referrers() {
    // GIVEN a persisted leaf whose parent reference nulls on delete
    let (engine, script) = deployed(node_schema(), EngineConfig::new());
    let mut session = engine.session().unwrap();
    let root = node(&mut session, "root", None);
    let leaf = node(&mut session, "leaf", Some(root));
    session.insert(leaf).unwrap();
    script.clear_log();

    // WHEN the parent is deleted
    session.delete(root).unwrap();

    // THEN only the parent row goes and the leaf forgets it
    assert_eq!(
        script.committed(),
        vec![executed("DELETE FROM Node WHERE Node.id = ?", vec![Value::Int(1)])]
    );
    assert!(session.record(root).is_err());
    assert_eq!(session.get(leaf, "parent").unwrap(), None);
    assert_eq!(session.id(leaf).unwrap(), Some(RecordId::new(2)));
    assert_eq!(session.context().len(), 1);
}

// ========== TEST: update_writes_cleared_reference_as_null ==========
#[test]
fn test_update_writes_cleared_reference_as_null() {
    let (engine, script) = deployed(node_schema(), EngineConfig::new());
    let mut session = engine.session().unwrap();
    let root = node(&mut session, "root", None);
    let leaf = node(&mut session, "leaf", Some(root));
    session.insert(leaf).unwrap();
    script.clear_log();

    session.set_reference(leaf, "parent", None).unwrap();
    session.update(leaf).unwrap();

    assert_eq!(
        script.committed(),
        vec![executed(
            "UPDATE Node SET name = ?, parent = ? WHERE Node.id = ?",
            vec![Value::from("leaf"), Value::Null, Value::Int(2)]
        )]
    );
}

// ========== TEST: attach_shares_identity ==========
#[test]
fn test_attach_shares_identity() {
    // GIVEN a leaf persisted in one session
    let (engine, _script) = deployed(node_schema(), EngineConfig::new());
    let mut first = engine.session().unwrap();
    let root = node(&mut first, "root", None);
    let leaf = node(&mut first, "leaf", Some(root));
    first.insert(leaf).unwrap();

    // WHEN attached to a second session
    let mut second = engine.session().unwrap();
    let local = second.attach(&first, leaf).unwrap();

    // THEN it keeps its id and brings its parent along
    assert_eq!(second.id(local).unwrap(), Some(RecordId::new(2)));
    let parent = second.resolve(local, "parent").unwrap().unwrap();
    assert_eq!(second.id(parent).unwrap(), Some(RecordId::new(1)));
    assert_eq!(second.read_by_id("Node", RecordId::new(1)).unwrap(), Some(parent));
    assert_eq!(second.context().len(), 2);
}
