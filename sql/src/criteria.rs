//! WHERE-clause trees.
//!
//! Criteria render to SQL with `?` placeholders. Parameters are appended to
//! the output list in the exact textual order of their placeholders, so a
//! rendered statement always binds each value once and in position.

use tessera_core::Value;

/// A column qualified by its table alias.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnRef {
    pub table_alias: String,
    pub column: String,
}

impl ColumnRef {
    pub fn new(table_alias: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table_alias: table_alias.into(),
            column: column.into(),
        }
    }

    pub fn render(&self) -> String {
        format!("{}.{}", self.table_alias, self.column)
    }
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

impl CompareOp {
    pub fn sql(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Lt => "<",
            CompareOp::LtEq => "<=",
            CompareOp::Gt => ">",
            CompareOp::GtEq => ">=",
        }
    }
}

/// A boolean predicate tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Criteria {
    And(Vec<Criteria>),
    Or(Vec<Criteria>),
    /// Explicit parenthesization.
    Wrap(Box<Criteria>),
    Compare {
        column: ColumnRef,
        op: CompareOp,
        value: Value,
    },
    IsNull(ColumnRef),
    IsNotNull(ColumnRef),
    Range {
        column: ColumnRef,
        low: Value,
        high: Value,
    },
    /// Never matches; used when a predicate cannot apply to a binding.
    False,
}

impl Criteria {
    pub fn eq(column: ColumnRef, value: impl Into<Value>) -> Self {
        Criteria::Compare {
            column,
            op: CompareOp::Eq,
            value: value.into(),
        }
    }

    /// Equality, or IS NULL for a null value.
    pub fn eq_or_null(column: ColumnRef, value: Value) -> Self {
        if value.is_null() {
            Criteria::IsNull(column)
        } else {
            Criteria::eq(column, value)
        }
    }

    pub fn wrap(inner: Criteria) -> Self {
        Criteria::Wrap(Box::new(inner))
    }

    /// Render into `sql`, appending bound values to `params`.
    pub fn render_into(&self, sql: &mut String, params: &mut Vec<Value>) {
        match self {
            Criteria::And(items) => Self::render_joined(items, " AND ", sql, params),
            Criteria::Or(items) => Self::render_joined(items, " OR ", sql, params),
            Criteria::Wrap(inner) => {
                sql.push('(');
                inner.render_into(sql, params);
                sql.push(')');
            }
            Criteria::Compare { column, op, value } => {
                if value.is_null() {
                    // Equality to null is IS NULL; no ordering holds against null
                    match op {
                        CompareOp::Eq => sql.push_str(&format!("{} IS NULL", column.render())),
                        _ => sql.push_str("1 = 0"),
                    }
                } else {
                    sql.push_str(&format!("{} {} ?", column.render(), op.sql()));
                    params.push(value.clone());
                }
            }
            Criteria::IsNull(column) => sql.push_str(&format!("{} IS NULL", column.render())),
            Criteria::IsNotNull(column) => {
                sql.push_str(&format!("{} IS NOT NULL", column.render()))
            }
            Criteria::Range { column, low, high } => {
                sql.push_str(&format!("{} BETWEEN ? AND ?", column.render()));
                params.push(low.clone());
                params.push(high.clone());
            }
            Criteria::False => sql.push_str("1 = 0"),
        }
    }

    fn render_joined(items: &[Criteria], separator: &str, sql: &mut String, params: &mut Vec<Value>) {
        match items {
            [] => sql.push_str(if separator == " AND " { "1 = 1" } else { "1 = 0" }),
            [single] => single.render_into(sql, params),
            _ => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        sql.push_str(separator);
                    }
                    // Nested AND/OR keep their grouping
                    let needs_parens = matches!(item, Criteria::And(v) | Criteria::Or(v) if v.len() > 1);
                    if needs_parens {
                        sql.push('(');
                    }
                    item.render_into(sql, params);
                    if needs_parens {
                        sql.push(')');
                    }
                }
            }
        }
    }

    /// Render standalone.
    pub fn render(&self) -> (String, Vec<Value>) {
        let mut sql = String::new();
        let mut params = Vec::new();
        self.render_into(&mut sql, &mut params);
        (sql, params)
    }
}
