//! Lifecycle listeners around writes.

use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use tessera_tests::prelude::*;
use tessera_transaction::Listener;

type Log = Arc<Mutex<Vec<String>>>;

fn recording(log: &Log, tag: &str) -> Arc<dyn Listener> {
    let log = log.clone();
    let tag = tag.to_string();
    Arc::new(move |event: &ListenerEvent<'_>| -> Result<(), String> {
        let id = event.id.map(|id| id.to_string()).unwrap_or_else(|| "-".to_string());
        log.lock().push(format!(
            "{}:{:?}:{}{}",
            tag,
            event.kind,
            event.type_name.unwrap_or("-"),
            id
        ));
        Ok(())
    })
}

fn veto(message: &str) -> Arc<dyn Listener> {
    let message = message.to_string();
    Arc::new(move |_: &ListenerEvent<'_>| -> Result<(), String> { Err(message.clone()) })
}

// ========== TEST: persist_events_in_insert_order ==========
#[test]
fn test_persist_events_in_insert_order() {
    // GIVEN global persist listeners and one bound to Parent
    let (engine, _script) = deployed(parent_child_schema(), EngineConfig::new());
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let listeners = engine.listeners();
    listeners.add_for_type(ListenerKind::PostPersist, "Parent", recording(&log, "typed"));
    listeners.add_global(ListenerKind::PrePersist, recording(&log, "global"));
    listeners.add_global(ListenerKind::PostPersist, recording(&log, "global"));

    // WHEN Parent -> Child is inserted
    let mut session = engine.session().unwrap();
    let child = session.create("Child").unwrap();
    let parent = session.create("Parent").unwrap();
    session.set_reference(parent, "child", Some(child)).unwrap();
    session.insert(parent).unwrap();

    // THEN each record is announced before and after its row, globals first
    assert_eq!(
        *log.lock(),
        vec![
            "global:PrePersist:Child-",
            "global:PostPersist:Child#1",
            "global:PrePersist:Parent-",
            "global:PostPersist:Parent#2",
            "typed:PostPersist:Parent#2",
        ]
    );
}

// ========== TEST: pre_persist_veto_rolls_back ==========
#[test]
fn test_pre_persist_veto_rolls_back() {
    // GIVEN a listener refusing every Parent, and a transaction listener
    let (engine, script) = deployed(parent_child_schema(), EngineConfig::new());
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    engine
        .listeners()
        .add_for_type(ListenerKind::PrePersist, "Parent", veto("parents are closed"));
    let outcomes = Arc::new(Mutex::new(Vec::new()));
    let seen = outcomes.clone();
    engine.listeners().add_global(
        ListenerKind::Transaction,
        Arc::new(move |event: &ListenerEvent<'_>| -> Result<(), String> {
            seen.lock().push(event.rolled_back);
            Ok(())
        }),
    );
    engine
        .listeners()
        .add_global(ListenerKind::PostPersist, recording(&log, "post"));

    // WHEN Parent -> Child is inserted
    let mut session = engine.session().unwrap();
    let child = session.create("Child").unwrap();
    let parent = session.create("Parent").unwrap();
    session.set_reference(parent, "child", Some(child)).unwrap();
    let result = session.insert(parent);

    // THEN the child row already written is rolled back with the rest
    assert!(matches!(result, Err(SessionError::Transaction(_))));
    assert!(result.unwrap_err().to_string().contains("parents are closed"));
    assert_eq!(script.attempted_like("INSERT INTO Child").len(), 1);
    assert!(script.committed().is_empty());
    assert_eq!(script.rollbacks(), 1);
    assert_eq!(session.id(child).unwrap(), None);
    assert_eq!(session.id(parent).unwrap(), None);
    assert_eq!(*log.lock(), vec!["post:PostPersist:Child#1"]);
    assert_eq!(*outcomes.lock(), vec![true]);
}

// ========== TEST: merge_and_delete_events ==========
#[test]
fn test_merge_and_delete_events() {
    // GIVEN a persisted Child 1 and merge/delete listeners bound to Child
    let (engine, _script) = deployed(parent_child_schema(), EngineConfig::new());
    let mut session = engine.session().unwrap();
    let child = session.create("Child").unwrap();
    session.insert(child).unwrap();
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    for kind in [
        ListenerKind::PreMerge,
        ListenerKind::PostMerge,
        ListenerKind::PreDelete,
        ListenerKind::PostDelete,
    ] {
        engine.listeners().add_for_type(kind, "Child", recording(&log, "child"));
    }

    // WHEN it is updated and then deleted
    session.set(child, "name", "y").unwrap();
    session.update(child).unwrap();
    session.delete(child).unwrap();

    // THEN each step is announced with the record's id
    assert_eq!(
        *log.lock(),
        vec![
            "child:PreMerge:Child#1",
            "child:PostMerge:Child#1",
            "child:PreDelete:Child#1",
            "child:PostDelete:Child#1",
        ]
    );
}

// ========== TEST: pre_delete_veto_keeps_record ==========
#[test]
fn test_pre_delete_veto_keeps_record() {
    // GIVEN a persisted Child and a listener refusing deletes
    let (engine, script) = deployed(parent_child_schema(), EngineConfig::new());
    let mut session = engine.session().unwrap();
    let child = session.create("Child").unwrap();
    session.insert(child).unwrap();
    script.clear_log();
    let id = engine.listeners().add_global(ListenerKind::PreDelete, veto("keep"));

    // WHEN deleted
    let refused = session.delete(child);

    // THEN nothing ran and the record is still loaded
    assert!(refused.is_err());
    assert!(script.attempted().is_empty());
    assert_eq!(session.id(child).unwrap(), Some(RecordId::new(1)));

    // AND once the listener is removed the delete goes through
    assert!(engine.listeners().remove(id));
    session.delete(child).unwrap();
    assert_eq!(script.committed().len(), 1);
    assert!(session.context().is_empty());
}
