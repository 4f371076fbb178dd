//! Vendor capability.
//!
//! Everything dialect specific sits behind the `Vendor` trait: identifier
//! rules, column types, the primary-key fragment, index elision, existence
//! probes and error classification. `AnsiVendor` is a configurable
//! reference implementation probing `INFORMATION_SCHEMA`.

use crate::{shorten_identifier, Connection, DriverError, SqlErrorKind};
use serde::Deserialize;
use tessera_core::Value;

/// Logical column types handed to the vendor for rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlType {
    /// Primary and foreign keys.
    Key,
    Varchar,
    Integer { length: u32 },
    Decimal { length: u32, scale: u32 },
    Boolean,
    Timestamp,
    Blob,
    Clob,
}

/// The injected dialect capability.
pub trait Vendor: Send + Sync {
    /// Vendor name for diagnostics.
    fn name(&self) -> &str;

    /// Maximum identifier length in UTF-16 code units.
    fn max_identifier_length(&self) -> usize;

    /// Case or character transformation applied to every generated name.
    fn transform_identifier(&self, name: &str) -> String {
        name.to_string()
    }

    /// Final form of a generated identifier: transformed, then shortened.
    fn identifier(&self, name: &str) -> String {
        shorten_identifier(&self.transform_identifier(name), self.max_identifier_length())
    }

    /// Render a column type.
    fn sql_type(&self, ty: SqlType) -> String;

    /// Column definition of a table's generated primary key.
    fn primary_key_ddl(&self, column: &str) -> String;

    /// Primary keys get an index without `CREATE INDEX`.
    fn auto_indexes_primary_key(&self) -> bool {
        true
    }

    /// Unique constraints get an index without `CREATE INDEX`.
    fn auto_indexes_unique(&self) -> bool {
        true
    }

    /// Foreign keys get an index without `CREATE INDEX`.
    fn auto_indexes_foreign_keys(&self) -> bool {
        false
    }

    /// Map a driver failure onto the engine's error taxonomy.
    fn classify_error(&self, error: &DriverError) -> SqlErrorKind;

    /// Trailing pagination clause, empty when neither bound is set.
    fn limit_clause(&self, limit: Option<u64>, offset: Option<u64>) -> String {
        let mut clause = String::new();
        if let Some(limit) = limit {
            clause.push_str(&format!(" LIMIT {}", limit));
        }
        if let Some(offset) = offset {
            clause.push_str(&format!(" OFFSET {}", offset));
        }
        clause
    }

    fn table_exists(&self, conn: &mut dyn Connection, table: &str) -> Result<bool, DriverError>;

    fn column_exists(
        &self,
        conn: &mut dyn Connection,
        table: &str,
        column: &str,
    ) -> Result<bool, DriverError>;

    fn constraint_exists(
        &self,
        conn: &mut dyn Connection,
        table: &str,
        constraint: &str,
    ) -> Result<bool, DriverError>;

    fn index_exists(
        &self,
        conn: &mut dyn Connection,
        table: &str,
        index: &str,
    ) -> Result<bool, DriverError>;
}

/// Case applied to generated identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentifierCase {
    #[default]
    Preserve,
    Upper,
    Lower,
}

/// Reference vendor speaking ANSI DDL and probing `INFORMATION_SCHEMA`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AnsiVendor {
    pub max_identifier_length: usize,
    pub identifier_case: IdentifierCase,
    pub auto_index_primary_key: bool,
    pub auto_index_unique: bool,
    pub auto_index_foreign_keys: bool,
    pub varchar_length: u32,
}

impl Default for AnsiVendor {
    fn default() -> Self {
        Self {
            max_identifier_length: 30,
            identifier_case: IdentifierCase::Preserve,
            auto_index_primary_key: true,
            auto_index_unique: true,
            auto_index_foreign_keys: false,
            varchar_length: 4000,
        }
    }
}

impl AnsiVendor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_identifier_length(mut self, max: usize) -> Self {
        self.max_identifier_length = max;
        self
    }

    pub fn with_identifier_case(mut self, case: IdentifierCase) -> Self {
        self.identifier_case = case;
        self
    }

    pub fn with_auto_index_foreign_keys(mut self, enabled: bool) -> Self {
        self.auto_index_foreign_keys = enabled;
        self
    }

    pub fn with_auto_index_unique(mut self, enabled: bool) -> Self {
        self.auto_index_unique = enabled;
        self
    }

    fn count(
        conn: &mut dyn Connection,
        sql: &str,
        params: &[Value],
    ) -> Result<bool, DriverError> {
        let rows = conn.query(sql, params)?;
        let count = rows
            .first()
            .and_then(|row| row.get_index(0))
            .and_then(Value::as_int)
            .unwrap_or(0);
        Ok(count > 0)
    }
}

impl Vendor for AnsiVendor {
    fn name(&self) -> &str {
        "ansi"
    }

    fn max_identifier_length(&self) -> usize {
        self.max_identifier_length
    }

    fn transform_identifier(&self, name: &str) -> String {
        match self.identifier_case {
            IdentifierCase::Preserve => name.to_string(),
            IdentifierCase::Upper => name.to_uppercase(),
            IdentifierCase::Lower => name.to_lowercase(),
        }
    }

    fn sql_type(&self, ty: SqlType) -> String {
        match ty {
            SqlType::Key => "BIGINT".to_string(),
            SqlType::Varchar => format!("VARCHAR({})", self.varchar_length),
            SqlType::Integer { length } if length <= 9 => "INTEGER".to_string(),
            SqlType::Integer { .. } => "BIGINT".to_string(),
            SqlType::Decimal { length, scale } => format!("DECIMAL({},{})", length, scale),
            SqlType::Boolean => "BOOLEAN".to_string(),
            SqlType::Timestamp => "TIMESTAMP".to_string(),
            SqlType::Blob => "BLOB".to_string(),
            SqlType::Clob => "CLOB".to_string(),
        }
    }

    fn primary_key_ddl(&self, column: &str) -> String {
        format!(
            "{} {} GENERATED BY DEFAULT AS IDENTITY PRIMARY KEY",
            column,
            self.sql_type(SqlType::Key)
        )
    }

    fn auto_indexes_primary_key(&self) -> bool {
        self.auto_index_primary_key
    }

    fn auto_indexes_unique(&self) -> bool {
        self.auto_index_unique
    }

    fn auto_indexes_foreign_keys(&self) -> bool {
        self.auto_index_foreign_keys
    }

    fn classify_error(&self, error: &DriverError) -> SqlErrorKind {
        match error.code.as_deref() {
            Some("23505") => SqlErrorKind::ConstraintViolation,
            Some(code) if code.starts_with("23") => SqlErrorKind::Integrity,
            _ => SqlErrorKind::Execution,
        }
    }

    fn table_exists(&self, conn: &mut dyn Connection, table: &str) -> Result<bool, DriverError> {
        Self::count(
            conn,
            "SELECT COUNT(*) FROM INFORMATION_SCHEMA.TABLES WHERE TABLE_NAME = ?",
            &[Value::from(table)],
        )
    }

    fn column_exists(
        &self,
        conn: &mut dyn Connection,
        table: &str,
        column: &str,
    ) -> Result<bool, DriverError> {
        Self::count(
            conn,
            "SELECT COUNT(*) FROM INFORMATION_SCHEMA.COLUMNS WHERE TABLE_NAME = ? AND COLUMN_NAME = ?",
            &[Value::from(table), Value::from(column)],
        )
    }

    fn constraint_exists(
        &self,
        conn: &mut dyn Connection,
        table: &str,
        constraint: &str,
    ) -> Result<bool, DriverError> {
        Self::count(
            conn,
            "SELECT COUNT(*) FROM INFORMATION_SCHEMA.TABLE_CONSTRAINTS WHERE TABLE_NAME = ? AND CONSTRAINT_NAME = ?",
            &[Value::from(table), Value::from(constraint)],
        )
    }

    fn index_exists(
        &self,
        conn: &mut dyn Connection,
        table: &str,
        index: &str,
    ) -> Result<bool, DriverError> {
        Self::count(
            conn,
            "SELECT COUNT(*) FROM INFORMATION_SCHEMA.INDEXES WHERE TABLE_NAME = ? AND INDEX_NAME = ?",
            &[Value::from(table), Value::from(index)],
        )
    }
}
