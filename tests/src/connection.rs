//! Scripted in-memory connection.
//!
//! Statements run inside a transaction are held back until commit and
//! dropped on rollback, so tests can tell what the database kept from what
//! was merely attempted.

use parking_lot::Mutex;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use tessera_core::Value;
use tessera_sql::{Connection, DriverError, Row};

/// One statement as the driver saw it.
#[derive(Debug, Clone, PartialEq)]
pub struct Executed {
    pub sql: String,
    pub params: Vec<Value>,
}

impl Executed {
    fn new(sql: &str, params: &[Value]) -> Self {
        Self {
            sql: sql.to_string(),
            params: params.to_vec(),
        }
    }
}

struct Failure {
    pattern: String,
    code: String,
    message: String,
}

#[derive(Default)]
struct State {
    attempted: Vec<Executed>,
    pending: Vec<Executed>,
    committed: Vec<Executed>,
    created: HashSet<String>,
    pending_created: HashSet<String>,
    responses: VecDeque<(String, Vec<Row>)>,
    failures: Vec<Failure>,
    last_key: i64,
    commits: usize,
    rollbacks: usize,
}

/// Cloneable handle to one shared in-memory script.
#[derive(Clone, Default)]
pub struct ScriptedConnection {
    state: Arc<Mutex<State>>,
}

impl ScriptedConnection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer the next query whose SQL contains `pattern` with `rows`.
    /// Queries with no queued answer return no rows.
    pub fn respond(&self, pattern: &str, rows: Vec<Row>) -> &Self {
        self.state.lock().responses.push_back((pattern.to_string(), rows));
        self
    }

    /// Fail the next statement whose SQL contains `pattern` with the given
    /// vendor code.
    pub fn fail_on(&self, pattern: &str, code: &str, message: &str) -> &Self {
        self.state.lock().failures.push(Failure {
            pattern: pattern.to_string(),
            code: code.to_string(),
            message: message.to_string(),
        });
        self
    }

    /// Every statement sent, committed or not, excluding existence probes.
    pub fn attempted(&self) -> Vec<Executed> {
        self.state.lock().attempted.clone()
    }

    /// Statements that were part of a committed transaction.
    pub fn committed(&self) -> Vec<Executed> {
        self.state.lock().committed.clone()
    }

    /// SQL of the attempted statements containing `pattern`.
    pub fn attempted_like(&self, pattern: &str) -> Vec<Executed> {
        self.state
            .lock()
            .attempted
            .iter()
            .filter(|e| e.sql.contains(pattern))
            .cloned()
            .collect()
    }

    /// Forget every recorded statement; created objects are kept.
    pub fn clear_log(&self) {
        let mut state = self.state.lock();
        state.attempted.clear();
        state.committed.clear();
    }

    /// Returns true if a committed DDL statement created `name`
    /// (`table`, `table.column`, constraint or index name).
    pub fn has_object(&self, name: &str) -> bool {
        self.state.lock().created.contains(name)
    }

    pub fn object_count(&self) -> usize {
        self.state.lock().created.len()
    }

    pub fn commits(&self) -> usize {
        self.state.lock().commits
    }

    pub fn rollbacks(&self) -> usize {
        self.state.lock().rollbacks
    }
}

impl State {
    fn check(&mut self, sql: &str, params: &[Value]) -> Result<(), DriverError> {
        self.attempted.push(Executed::new(sql, params));
        let Some(index) = self.failures.iter().position(|f| sql.contains(&f.pattern)) else {
            return Ok(());
        };
        let failure = self.failures.remove(index);
        Err(DriverError::with_code(failure.code, failure.message))
    }

    fn record(&mut self, sql: &str, params: &[Value]) {
        self.pending.push(Executed::new(sql, params));
        if let Some(name) = created_object(sql) {
            self.pending_created.insert(name);
        }
    }

    /// Existence probes are answered from the created objects.
    fn probe(&self, sql: &str, params: &[Value]) -> Vec<Row> {
        let text = |v: &Value| v.as_str().unwrap_or_default().to_string();
        let key = match params {
            [table] => text(table),
            [table, column] if sql.contains("COLUMNS") => format!("{}.{}", text(table), text(column)),
            [_, name] => text(name),
            _ => String::new(),
        };
        let count = i64::from(self.created.contains(&key));
        vec![Row::from_pairs([("count", Value::Int(count))])]
    }
}

/// Name of the object a DDL statement creates.
fn created_object(sql: &str) -> Option<String> {
    let words: Vec<&str> = sql.split_whitespace().collect();
    match words.as_slice() {
        ["CREATE", "TABLE", table, ..] => Some(table.to_string()),
        ["CREATE", "INDEX", index, ..] => Some(index.to_string()),
        ["ALTER", "TABLE", table, "ADD", "COLUMN", column, ..] => Some(format!("{}.{}", table, column)),
        ["ALTER", "TABLE", _, "ADD", "CONSTRAINT", name, ..] => Some(name.to_string()),
        _ => None,
    }
}

impl Connection for ScriptedConnection {
    fn begin(&mut self) -> Result<(), DriverError> {
        let mut state = self.state.lock();
        state.pending.clear();
        state.pending_created.clear();
        Ok(())
    }

    fn commit(&mut self) -> Result<(), DriverError> {
        let mut state = self.state.lock();
        let pending = std::mem::take(&mut state.pending);
        state.committed.extend(pending);
        let created = std::mem::take(&mut state.pending_created);
        state.created.extend(created);
        state.commits += 1;
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), DriverError> {
        let mut state = self.state.lock();
        state.pending.clear();
        state.pending_created.clear();
        state.rollbacks += 1;
        Ok(())
    }

    fn execute(&mut self, sql: &str, params: &[Value]) -> Result<u64, DriverError> {
        let mut state = self.state.lock();
        state.check(sql, params)?;
        state.record(sql, params);
        Ok(1)
    }

    fn insert(&mut self, sql: &str, params: &[Value]) -> Result<i64, DriverError> {
        let mut state = self.state.lock();
        state.check(sql, params)?;
        state.record(sql, params);
        state.last_key += 1;
        Ok(state.last_key)
    }

    fn query(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Row>, DriverError> {
        let mut state = self.state.lock();
        if sql.contains("INFORMATION_SCHEMA") {
            return Ok(state.probe(sql, params));
        }
        state.check(sql, params)?;
        let position = state
            .responses
            .iter()
            .position(|(pattern, _)| sql.contains(pattern.as_str()));
        let answer = position.and_then(|i| state.responses.remove(i));
        Ok(answer.map(|(_, rows)| rows).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========== TEST: rollback_discards_pending ==========
    #[test]
    fn test_rollback_discards_pending() {
        // GIVEN a statement run and rolled back, then one committed
        let script = ScriptedConnection::new();
        let mut conn = script.clone();
        conn.begin().unwrap();
        conn.insert("INSERT INTO Child (name) VALUES (?)", &[Value::from("a")]).unwrap();
        conn.rollback().unwrap();
        conn.begin().unwrap();
        conn.insert("INSERT INTO Child (name) VALUES (?)", &[Value::from("b")]).unwrap();
        conn.commit().unwrap();

        // THEN both were attempted and only the second kept, with fresh keys
        assert_eq!(script.attempted().len(), 2);
        assert_eq!(script.committed(), vec![Executed::new("INSERT INTO Child (name) VALUES (?)", &[Value::from("b")])]);
        assert_eq!(script.rollbacks(), 1);
        assert_eq!(script.commits(), 1);
    }

    // ========== TEST: scripted_failure_fires_once ==========
    #[test]
    fn test_scripted_failure_fires_once() {
        let script = ScriptedConnection::new();
        script.fail_on("UQ_", "23505", "duplicate key");
        let mut conn = script.clone();

        let first = conn.execute("INSERT INTO UQ_Person_name (name) VALUES (?)", &[]);
        let second = conn.execute("INSERT INTO UQ_Person_name (name) VALUES (?)", &[]);

        assert_eq!(first.unwrap_err().code.as_deref(), Some("23505"));
        assert!(second.is_ok());
    }

    // ========== TEST: probes_answer_from_created_objects ==========
    #[test]
    fn test_probes_answer_from_created_objects() {
        // GIVEN a committed CREATE TABLE and ADD COLUMN
        let script = ScriptedConnection::new();
        let mut conn = script.clone();
        conn.begin().unwrap();
        conn.execute("CREATE TABLE Child (id BIGINT)", &[]).unwrap();
        conn.execute("ALTER TABLE Child ADD COLUMN name VARCHAR(255)", &[]).unwrap();
        conn.commit().unwrap();

        // WHEN probed
        let table = conn
            .query("SELECT COUNT(*) FROM INFORMATION_SCHEMA.TABLES WHERE TABLE_NAME = ?", &[Value::from("Child")])
            .unwrap();
        let column = conn
            .query(
                "SELECT COUNT(*) FROM INFORMATION_SCHEMA.COLUMNS WHERE TABLE_NAME = ? AND COLUMN_NAME = ?",
                &[Value::from("Child"), Value::from("age")],
            )
            .unwrap();

        // THEN known objects count once and unknown ones not at all
        assert_eq!(table[0].get_index(0), Some(&Value::Int(1)));
        assert_eq!(column[0].get_index(0), Some(&Value::Int(0)));
        assert!(script.has_object("Child.name"));
        assert_eq!(script.attempted().len(), 2);
    }

    // ========== TEST: queued_rows_answer_matching_query ==========
    #[test]
    fn test_queued_rows_answer_matching_query() {
        let script = ScriptedConnection::new();
        script.respond("FROM Child", vec![Row::from_pairs([("c0", Value::Int(1))])]);
        let mut conn = script.clone();

        let other = conn.query("SELECT t0.id AS c0 FROM Parent t0", &[]).unwrap();
        let hit = conn.query("SELECT t0.id AS c0 FROM Child t0", &[]).unwrap();
        let again = conn.query("SELECT t0.id AS c0 FROM Child t0", &[]).unwrap();

        assert!(other.is_empty());
        assert_eq!(hit.len(), 1);
        assert!(again.is_empty());
    }
}
