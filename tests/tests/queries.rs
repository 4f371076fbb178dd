//! nquery and query-by-example over Node{name, parent}.

use pretty_assertions::assert_eq;
use tessera_tests::prelude::*;

const BY_NAME: &str = "SELECT t0.id AS c0, t0.name AS c1, t0.parent AS c2 FROM Node t0 \
                       WHERE t0.name = ? ORDER BY t0.id ASC";

fn lazy_queries() -> EngineConfig {
    EngineConfig::new().with_query_loading(LoadingMode::Lazy)
}

fn node_row(id: i64, name: &str, parent: Option<i64>) -> Row {
    row([
        ("c0", Value::Int(id)),
        ("c1", Value::from(name)),
        ("c2", parent.map(Value::Int).unwrap_or(Value::Null)),
    ])
}

// ========== TEST: pick_folds_rows_into_session ==========
#[test]
fn test_pick_folds_rows_into_session() {
    // GIVEN nodes 1 and 2 named "a", 2 being a child of 1
    let (engine, script) = deployed(node_schema(), lazy_queries());
    script.respond("FROM Node", vec![node_row(1, "a", None), node_row(2, "a", Some(1))]);
    let mut session = engine.session().unwrap();

    // WHEN picked by name
    let found = session.query("PICK Node IF name = ?", &[Value::from("a")]).unwrap();

    // THEN both come back in order and the child's parent resolves without SQL
    assert_eq!(
        script.attempted(),
        vec![Executed {
            sql: BY_NAME.to_string(),
            params: vec![Value::from("a")],
        }]
    );
    assert_eq!(found.len(), 2);
    assert_eq!(session.id(found[0]).unwrap(), Some(RecordId::new(1)));
    assert_eq!(session.get(found[0], "parent").unwrap(), None);
    assert_eq!(session.resolve(found[1], "parent").unwrap(), Some(found[0]));
    assert_eq!(session.read_by_id("Node", RecordId::new(2)).unwrap(), Some(found[1]));
    assert_eq!(script.attempted().len(), 1);
}

// ========== TEST: repeated_rows_yield_one_handle ==========
#[test]
fn test_repeated_rows_yield_one_handle() {
    let (engine, script) = deployed(node_schema(), lazy_queries());
    script.respond("FROM Node", vec![node_row(1, "a", None), node_row(1, "a", None)]);
    let mut session = engine.session().unwrap();

    let found = session.query("PICK Node n IF n.name = ?", &[Value::from("a")]).unwrap();

    assert_eq!(found.len(), 1);
    assert_eq!(session.context().len(), 1);
}

// ========== TEST: count_reads_single_value ==========
#[test]
fn test_count_reads_single_value() {
    let (engine, script) = deployed(node_schema(), lazy_queries());
    script.respond("SELECT COUNT(*)", vec![row([("count", Value::Int(3))])]);
    let session = engine.session().unwrap();

    let count = session.count("COUNT Node IF name = ?", &[Value::from("a")]).unwrap();

    assert_eq!(count, 3);
    assert_eq!(
        script.attempted()[0].sql,
        "SELECT COUNT(*) FROM Node t0 WHERE t0.name = ?"
    );
}

// ========== TEST: statement_kinds_not_interchangeable ==========
#[test]
fn test_statement_kinds_not_interchangeable() {
    let (engine, script) = deployed(node_schema(), lazy_queries());
    let mut session = engine.session().unwrap();

    let picked = session.query("COUNT Node", &[]);
    let counted = session.count("PICK Node", &[]);

    assert!(matches!(picked, Err(SessionError::IllegalArgument(_))));
    assert!(matches!(counted, Err(SessionError::IllegalArgument(_))));
    assert!(script.attempted().is_empty());
}

// ========== TEST: malformed_query_rejected ==========
#[test]
fn test_malformed_query_rejected() {
    let (engine, script) = deployed(node_schema(), lazy_queries());
    let mut session = engine.session().unwrap();

    let unknown = session.query("PICK Node IF colour = 'red'", &[]);
    let truncated = session.query("PICK Node IF", &[]);

    assert!(matches!(unknown, Err(SessionError::Query(_))));
    assert!(matches!(truncated, Err(SessionError::Query(_))));
    assert!(script.attempted().is_empty());
}

// ========== TEST: find_by_example ==========
#[test]
fn test_find_by_example() {
    // GIVEN one stored node named "a"
    let (engine, script) = deployed(node_schema(), lazy_queries());
    script.respond("FROM Node", vec![node_row(1, "a", None)]);
    let mut session = engine.session().unwrap();
    let node = session.holder("Node").unwrap();

    // WHEN searched for by an example carrying the name
    let found = session.find(&Example::new(node).with("name", "a")).unwrap();

    // THEN the name is compared and the node is loaded
    assert_eq!(found.len(), 1);
    assert_eq!(session.value(found[0], "name").unwrap(), Value::from("a"));
    let query = &script.attempted()[0];
    assert!(query.sql.contains("t0.name = ?"), "{}", query.sql);
    assert!(query.sql.ends_with("ORDER BY t0.id ASC"), "{}", query.sql);
    assert_eq!(query.params, vec![Value::from("a")]);
}

// ========== TEST: example_of_loaded_record ==========
#[test]
fn test_example_of_loaded_record() {
    // GIVEN node 2 "b" whose parent 1 is still lazy
    let (engine, script) = deployed(node_schema(), lazy_queries());
    script.respond("FROM Node", vec![node_row(2, "b", Some(1))]);
    let mut session = engine.session().unwrap();
    let loaded = session.query("PICK Node IF name = ?", &[Value::from("b")]).unwrap();

    // WHEN turned into an example and searched again
    let example = session.example_of(loaded[0]).unwrap();
    let mut joined = node_row(2, "b", Some(1));
    joined.push("c3", Value::Int(1));
    joined.push("c4", Value::from("a"));
    joined.push("c5", Value::Null);
    script.respond("FROM Node", vec![joined]);
    let found = session.find(&example).unwrap();

    // THEN both the name and the parent key are matched
    assert_eq!(found, loaded);
    let query = &script.attempted()[1];
    assert!(query.sql.contains("t0.name = ?"), "{}", query.sql);
    assert!(query.sql.contains("t0.parent = ?"), "{}", query.sql);
    assert_eq!(query.params.len(), 2);
    assert!(query.params.contains(&Value::from("b")));
    assert!(query.params.contains(&Value::Int(1)));
}

// ========== TEST: reread_keeps_unsaved_edits ==========
#[test]
fn test_reread_keeps_unsaved_edits() {
    // GIVEN node 2 "b" loaded with its parent left lazy, then renamed in the session
    let (engine, script) = deployed(node_schema(), lazy_queries());
    script.respond("FROM Node", vec![node_row(2, "b", Some(1))]);
    let mut session = engine.session().unwrap();
    let loaded = session.query("PICK Node IF name = ?", &[Value::from("b")]).unwrap();
    session.set(loaded[0], "name", "renamed").unwrap();

    // WHEN the same row is read again, this time with its parent joined
    let mut joined = node_row(2, "b", Some(1));
    joined.push("c3", Value::Int(1));
    joined.push("c4", Value::from("a"));
    joined.push("c5", Value::Null);
    script.respond("FROM Node", vec![joined]);
    let node = session.holder("Node").unwrap();
    let again = session
        .find(&Example::new(node).with_nested("parent", Example::new(node).with("name", "a")))
        .unwrap();

    // THEN the session's copy keeps the edit and only gains the parent
    assert_eq!(again, loaded);
    assert_eq!(session.value(loaded[0], "name").unwrap(), Value::from("renamed"));
    let parent = session.get(loaded[0], "parent").unwrap().cloned();
    assert!(matches!(parent, Some(AttributeValue::Reference(_))), "{:?}", parent);
    assert_eq!(session.context().len(), 2);
}
