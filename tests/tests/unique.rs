//! Unique constraints, mandatory attributes and virtual attributes on Person.

use pretty_assertions::assert_eq;
use std::collections::HashMap;
use std::sync::Arc;
use tessera_tests::prelude::*;

fn executed(sql: &str, params: Vec<Value>) -> Executed {
    Executed {
        sql: sql.to_string(),
        params,
    }
}

fn person(session: &mut Session<'_>, first: &str, last: &str) -> RecordHandle {
    let handle = session.create("Person").unwrap();
    session.set(handle, "first", first).unwrap();
    session.set(handle, "last", last).unwrap();
    handle
}

// ========== TEST: insert_writes_constraint_row ==========
#[test]
fn test_insert_writes_constraint_row() {
    let (engine, script) = deployed(person_schema(), EngineConfig::new());
    let mut session = engine.session().unwrap();
    let ada = person(&mut session, "Ada", "Lovelace");

    session.insert(ada).unwrap();

    assert_eq!(
        script.committed(),
        vec![
            executed(
                "INSERT INTO Person (first, last) VALUES (?, ?)",
                vec![Value::from("Ada"), Value::from("Lovelace")]
            ),
            executed(
                "INSERT INTO UQ_Person_first_last (Person, first, last) VALUES (?, ?, ?)",
                vec![Value::Int(1), Value::from("Ada"), Value::from("Lovelace")]
            ),
        ]
    );
}

// ========== TEST: duplicate_rejected_as_constraint_violation ==========
#[test]
fn test_duplicate_rejected_as_constraint_violation() {
    // GIVEN a stored Ada Lovelace and a database that refuses the second one
    let (engine, script) = deployed(person_schema(), EngineConfig::new());
    let mut session = engine.session().unwrap();
    let first = person(&mut session, "Ada", "Lovelace");
    session.insert(first).unwrap();
    script.fail_on("INSERT INTO UQ_Person_first_last", "23505", "duplicate key");

    // WHEN a second Ada Lovelace is inserted
    let second = person(&mut session, "Ada", "Lovelace");
    let result = session.insert(second);

    // THEN it is reported as a constraint violation and nothing is kept
    let err = result.unwrap_err();
    assert!(err.is_constraint_violation(), "{}", err);
    assert_eq!(script.committed().len(), 2);
    assert_eq!(session.id(second).unwrap(), None);
    assert_eq!(session.id(first).unwrap(), Some(RecordId::new(1)));
}

// ========== TEST: update_rewrites_constraint_row ==========
#[test]
fn test_update_rewrites_constraint_row() {
    let (engine, script) = deployed(person_schema(), EngineConfig::new());
    let mut session = engine.session().unwrap();
    let ada = person(&mut session, "Ada", "Lovelace");
    session.insert(ada).unwrap();
    script.clear_log();

    session.set(ada, "last", "King").unwrap();
    session.update(ada).unwrap();

    assert_eq!(
        script.committed(),
        vec![
            executed(
                "UPDATE Person SET first = ?, last = ? WHERE Person.id = ?",
                vec![Value::from("Ada"), Value::from("King"), Value::Int(1)]
            ),
            executed(
                "UPDATE UQ_Person_first_last SET first = ?, last = ? WHERE UQ_Person_first_last.Person = ?",
                vec![Value::from("Ada"), Value::from("King"), Value::Int(1)]
            ),
        ]
    );
}

// ========== TEST: missing_mandatory_sends_nothing ==========
#[test]
fn test_missing_mandatory_sends_nothing() {
    let (engine, script) = deployed(person_schema(), EngineConfig::new());
    let mut session = engine.session().unwrap();
    let nameless = session.create("Person").unwrap();
    session.set(nameless, "last", "Lovelace").unwrap();

    let result = session.insert(nameless);

    assert!(matches!(
        result,
        Err(SessionError::MissingMandatory { ref holder, ref attr }) if holder == "Person" && attr == "first"
    ));
    assert!(script.attempted().is_empty());
}

// ========== TEST: virtual_attribute_computed_on_read ==========
#[test]
fn test_virtual_attribute_computed_on_read() {
    // GIVEN an adapter joining first and last names
    let (engine, script) = deployed(person_schema(), EngineConfig::new());
    engine.adapters().register(
        "Person",
        "full",
        Arc::new(|values: &HashMap<String, Value>| -> Result<Value, String> {
            let part = |name: &str| values.get(name).and_then(Value::as_str).unwrap_or_default().to_string();
            Ok(Value::from(format!("{} {}", part("first"), part("last"))))
        }),
    );
    script.respond(
        "FROM Person",
        vec![row([
            ("c0", Value::Int(1)),
            ("c1", Value::from("Ada")),
            ("c2", Value::from("Lovelace")),
        ])],
    );
    let mut session = engine.session().unwrap();

    // WHEN Person 1 is read
    let ada = session.read_by_id("Person", RecordId::new(1)).unwrap().unwrap();

    // THEN the virtual attribute is filled and never selected
    assert_eq!(session.value(ada, "full").unwrap(), Value::from("Ada Lovelace"));
    assert_eq!(
        script.attempted(),
        vec![executed(
            "SELECT t0.id AS c0, t0.first AS c1, t0.last AS c2 FROM Person t0 WHERE t0.id = ?",
            vec![Value::Int(1)]
        )]
    );
}

// ========== TEST: failing_adapter_fails_read ==========
#[test]
fn test_failing_adapter_fails_read() {
    let (engine, script) = deployed(person_schema(), EngineConfig::new());
    engine.adapters().register(
        "Person",
        "full",
        Arc::new(|_: &HashMap<String, Value>| -> Result<Value, String> { Err("no names".to_string()) }),
    );
    script.respond(
        "FROM Person",
        vec![row([
            ("c0", Value::Int(1)),
            ("c1", Value::from("Ada")),
            ("c2", Value::Null),
        ])],
    );
    let mut session = engine.session().unwrap();

    let result = session.read_by_id("Person", RecordId::new(1));

    assert!(matches!(result, Err(SessionError::VirtualAttribute { ref message, .. }) if message == "no names"));
}
