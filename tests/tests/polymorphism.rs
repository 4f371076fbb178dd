//! References to an abstract type go through its join table.

use pretty_assertions::assert_eq;
use tessera_tests::prelude::*;

fn executed(sql: &str, params: Vec<Value>) -> Executed {
    Executed {
        sql: sql.to_string(),
        params,
    }
}

// ========== TEST: insert_adds_join_row ==========
#[test]
fn test_insert_adds_join_row() {
    // GIVEN a Holder pointing at an unpersisted B
    let (engine, script) = deployed(polymorphic_schema(), EngineConfig::new());
    let mut session = engine.session().unwrap();
    let b = session.create("B").unwrap();
    session.set(b, "name", "b").unwrap();
    session.set(b, "size", 3i64).unwrap();
    let holder = session.create("Holder").unwrap();
    session.set_reference(holder, "bar", Some(b)).unwrap();

    // WHEN the holder is inserted
    session.insert(holder).unwrap();

    // THEN B gets its Bar_J row and the reference stores that row's key
    assert_eq!(
        script.committed(),
        vec![
            executed("INSERT INTO B (name, size) VALUES (?, ?)", vec![Value::from("b"), Value::Int(3)]),
            executed("INSERT INTO Bar_J (B) VALUES (?)", vec![Value::Int(1)]),
            executed("INSERT INTO Holder (bar) VALUES (?)", vec![Value::Int(2)]),
        ]
    );
    let bar = session.holder("Bar").unwrap();
    assert_eq!(session.record(b).unwrap().join_key(bar), Some(2));
    assert_eq!(session.id(holder).unwrap(), Some(RecordId::new(3)));
}

// ========== TEST: join_key_looked_up_when_unknown ==========
#[test]
fn test_join_key_looked_up_when_unknown() {
    // GIVEN a B read straight from its own table, so its Bar_J key is unknown
    let (engine, script) = deployed(polymorphic_schema(), EngineConfig::new());
    script.respond(
        "FROM B t0",
        vec![row([
            ("c0", Value::Int(4)),
            ("c1", Value::from("b")),
            ("c2", Value::Int(3)),
        ])],
    );
    script.respond("FROM Bar_J", vec![row([("id", Value::Int(9))])]);
    let mut session = engine.session().unwrap();
    let b = session.read_by_id("B", RecordId::new(4)).unwrap().unwrap();

    // WHEN a new Holder referencing it is inserted
    let holder = session.create("Holder").unwrap();
    session.set_reference(holder, "bar", Some(b)).unwrap();
    session.insert(holder).unwrap();

    // THEN the join row is found by B's id and its key is stored
    assert_eq!(
        script.attempted_like("FROM Bar_J"),
        vec![executed(
            "SELECT t0.id AS id FROM Bar_J t0 WHERE t0.B = ?",
            vec![Value::Int(4)]
        )]
    );
    assert_eq!(
        script.committed(),
        vec![executed("INSERT INTO Holder (bar) VALUES (?)", vec![Value::Int(9)])]
    );
}

// ========== TEST: abstract_read_yields_concrete_record ==========
#[test]
fn test_abstract_read_yields_concrete_record() {
    // GIVEN Bar_J row 9 linking B 4
    let (engine, script) = deployed(polymorphic_schema(), EngineConfig::new());
    script.respond(
        "FROM Bar_J",
        vec![row([
            ("c0", Value::Int(9)),
            ("c1", Value::Null),
            ("c2", Value::Null),
            ("c3", Value::Int(4)),
            ("c4", Value::from("b")),
            ("c5", Value::Int(3)),
        ])],
    );
    let mut session = engine.session().unwrap();

    // WHEN Bar 9 is read
    let found = session.read_by_id("Bar", RecordId::new(9)).unwrap().unwrap();

    // THEN it is B 4, remembered under its join key
    let bar = session.holder("Bar").unwrap();
    assert_eq!(session.type_name(found).unwrap(), "B");
    assert_eq!(session.id(found).unwrap(), Some(RecordId::new(4)));
    assert_eq!(session.value(found, "size").unwrap(), Value::Int(3));
    assert_eq!(session.record(found).unwrap().join_key(bar), Some(9));

    // AND both ways of asking for it are served from the session
    assert_eq!(session.read_by_id("Bar", RecordId::new(9)).unwrap(), Some(found));
    assert_eq!(session.read_by_id("B", RecordId::new(4)).unwrap(), Some(found));
    assert_eq!(script.attempted().len(), 1);
}

// ========== TEST: unknown_join_row_reads_nothing ==========
#[test]
fn test_unknown_join_row_reads_nothing() {
    let (engine, script) = deployed(polymorphic_schema(), EngineConfig::new());
    let mut session = engine.session().unwrap();

    let found = session.read_by_id("Bar", RecordId::new(7)).unwrap();

    assert_eq!(found, None);
    assert_eq!(script.attempted_like("FROM Bar_J").len(), 1);
}

fn holder_row(holder: i64, join: i64, b: (i64, Value, i64)) -> Row {
    let (id, name, size) = b;
    row([
        ("c0", Value::Int(holder)),
        ("c1", Value::Int(join)),
        ("c2", Value::Int(join)),
        ("c3", Value::Null),
        ("c4", Value::Null),
        ("c5", Value::Int(id)),
        ("c6", name),
        ("c7", Value::Int(size)),
    ])
}

// ========== TEST: subtype_predicate_needs_joined_subtype ==========
#[test]
fn test_subtype_predicate_needs_joined_subtype() {
    // GIVEN Holder 5 whose bar is B 4 through Bar_J row 9
    let (engine, script) = deployed(polymorphic_schema(), EngineConfig::new());
    script.respond("FROM Holder", vec![holder_row(5, 9, (4, Value::from("b"), 3))]);
    let mut session = engine.session().unwrap();

    // WHEN holders are picked by their bar's name
    let found = session
        .query("PICK Holder h IF h.bar.name = ?", &[Value::from("b")])
        .unwrap();

    // THEN each subtype's comparison requires that subtype's row
    let query = &script.attempted()[0];
    assert!(
        query.sql.contains(
            "WHERE ((t2.id IS NOT NULL AND t2.name = ?) OR (t3.id IS NOT NULL AND t3.name = ?))"
        ),
        "{}",
        query.sql
    );
    assert_eq!(query.params, vec![Value::from("b"), Value::from("b")]);

    // AND the joined B comes back as the holder's bar
    assert_eq!(found.len(), 1);
    let bar = session.resolve(found[0], "bar").unwrap().unwrap();
    assert_eq!(session.type_name(bar).unwrap(), "B");
    assert_eq!(session.id(bar).unwrap(), Some(RecordId::new(4)));
    assert_eq!(script.attempted().len(), 1);
}

// ========== TEST: example_null_check_on_subtypes ==========
#[test]
fn test_example_null_check_on_subtypes() {
    // GIVEN Holder 5 whose bar B 4 has no name
    let (engine, script) = deployed(polymorphic_schema(), EngineConfig::new());
    script.respond("FROM Holder", vec![holder_row(5, 9, (4, Value::Null, 3))]);
    let mut session = engine.session().unwrap();
    let holder = session.holder("Holder").unwrap();
    let bar = session.holder("Bar").unwrap();

    // WHEN found by an example whose nested bar asks for a null name
    let example = Example::new(holder).with_nested("bar", Example::new(bar).with("name", Value::Null));
    let found = session.find(&example).unwrap();

    // THEN the null check is only trusted where its subtype was joined
    let query = &script.attempted()[0];
    assert!(
        query.sql.contains(
            "WHERE ((t2.id IS NOT NULL AND t2.name IS NULL) OR (t3.id IS NOT NULL AND t3.name IS NULL))"
        ),
        "{}",
        query.sql
    );
    assert!(query.params.is_empty());
    assert_eq!(found.len(), 1);
    let target = session.resolve(found[0], "bar").unwrap().unwrap();
    assert_eq!(session.value(target, "name").unwrap(), Value::Null);
}

// ========== TEST: mixin_reference_inserts_join_row ==========
#[test]
fn test_mixin_reference_inserts_join_row() {
    // GIVEN Tag{subject: Named} where the mixin Named is carried by Person and Rock
    let mut builder = SchemaBuilder::new();
    builder
        .add_mixin("Named")
        .attr(AttributeSpec::string("label"))
        .done()
        .unwrap();
    builder.add_type("Person").mixin("Named").done().unwrap();
    builder.add_type("Rock").mixin("Named").done().unwrap();
    builder
        .add_type("Tag")
        .attr(AttributeSpec::reference("subject", "Named"))
        .done()
        .unwrap();
    let (engine, script) = deployed(builder.build().unwrap(), EngineConfig::new());
    let mut session = engine.session().unwrap();
    let rock = session.create("Rock").unwrap();
    session.set(rock, "label", "granite").unwrap();
    let tag = session.create("Tag").unwrap();
    session.set_reference(tag, "subject", Some(rock)).unwrap();

    // WHEN the tag is inserted
    session.insert(tag).unwrap();

    // THEN the rock is linked through Named_J and the tag stores the link's key
    assert_eq!(
        script.committed(),
        vec![
            executed("INSERT INTO Rock (label) VALUES (?)", vec![Value::from("granite")]),
            executed("INSERT INTO Named_J (Rock) VALUES (?)", vec![Value::Int(1)]),
            executed("INSERT INTO Tag (subject) VALUES (?)", vec![Value::Int(2)]),
        ]
    );
    let named = session.holder("Named").unwrap();
    assert_eq!(session.record(rock).unwrap().join_key(named), Some(2));
    assert_eq!(session.id(tag).unwrap(), Some(RecordId::new(3)));
}
