//! Statement builders.

use crate::{ColumnRef, Criteria, Vendor};
use tessera_core::Value;

/// Rendered SQL with its positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Value>,
}

impl Statement {
    pub fn new(sql: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }
}

/// A LEFT JOIN of `table alias` on `left = right`.
#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub table: String,
    pub alias: String,
    pub left: ColumnRef,
    pub right: ColumnRef,
}

/// A selected column and its result alias.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectColumn {
    pub column: ColumnRef,
    pub alias: String,
}

/// One ORDER BY key. Several columns are folded with COALESCE, which is
/// how a sort path is addressed across sibling tables of a polymorphic join.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub columns: Vec<ColumnRef>,
    pub descending: bool,
}

impl OrderBy {
    pub fn asc(column: ColumnRef) -> Self {
        Self {
            columns: vec![column],
            descending: false,
        }
    }

    fn render(&self) -> String {
        let key = match self.columns.as_slice() {
            [single] => single.render(),
            columns => format!(
                "COALESCE({})",
                columns
                    .iter()
                    .map(ColumnRef::render)
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        };
        if self.descending {
            format!("{} DESC", key)
        } else {
            format!("{} ASC", key)
        }
    }
}

/// SELECT builder.
#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    pub table: String,
    pub alias: String,
    pub joins: Vec<Join>,
    pub columns: Vec<SelectColumn>,
    pub criteria: Option<Criteria>,
    pub order_by: Vec<OrderBy>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    pub count: bool,
}

impl Select {
    pub fn new(table: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            alias: alias.into(),
            joins: Vec::new(),
            columns: Vec::new(),
            criteria: None,
            order_by: Vec::new(),
            limit: None,
            offset: None,
            count: false,
        }
    }

    pub fn left_join(&mut self, join: Join) {
        self.joins.push(join);
    }

    pub fn column(&mut self, column: ColumnRef, alias: impl Into<String>) {
        self.columns.push(SelectColumn {
            column,
            alias: alias.into(),
        });
    }

    /// AND `criteria` onto the existing WHERE clause.
    pub fn filter(&mut self, criteria: Criteria) {
        self.criteria = Some(match self.criteria.take() {
            None => criteria,
            Some(Criteria::And(mut items)) => {
                items.push(criteria);
                Criteria::And(items)
            }
            Some(existing) => Criteria::And(vec![existing, criteria]),
        });
    }

    pub fn order(&mut self, order: OrderBy) {
        self.order_by.push(order);
    }

    pub fn render(&self, vendor: &dyn Vendor) -> Statement {
        let mut sql = String::from("SELECT ");
        let mut params = Vec::new();

        if self.count {
            sql.push_str("COUNT(*)");
        } else if self.columns.is_empty() {
            sql.push('1');
        } else {
            let columns = self
                .columns
                .iter()
                .map(|c| format!("{} AS {}", c.column.render(), c.alias))
                .collect::<Vec<_>>()
                .join(", ");
            sql.push_str(&columns);
        }

        sql.push_str(&format!(" FROM {} {}", self.table, self.alias));
        for join in &self.joins {
            sql.push_str(&format!(
                " LEFT JOIN {} {} ON {} = {}",
                join.table,
                join.alias,
                join.left.render(),
                join.right.render()
            ));
        }

        if let Some(criteria) = &self.criteria {
            sql.push_str(" WHERE ");
            criteria.render_into(&mut sql, &mut params);
        }

        if !self.count {
            if !self.order_by.is_empty() {
                let order = self
                    .order_by
                    .iter()
                    .map(OrderBy::render)
                    .collect::<Vec<_>>()
                    .join(", ");
                sql.push_str(&format!(" ORDER BY {}", order));
            }
            sql.push_str(&vendor.limit_clause(self.limit, self.offset));
        }

        Statement { sql, params }
    }
}

/// INSERT builder. The primary key is generated by the database.
#[derive(Debug, Clone, PartialEq)]
pub struct Insert {
    pub table: String,
    pub values: Vec<(String, Value)>,
}

impl Insert {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            values: Vec::new(),
        }
    }

    pub fn value(mut self, column: impl Into<String>, value: Value) -> Self {
        self.values.push((column.into(), value));
        self
    }

    pub fn render(&self) -> Statement {
        if self.values.is_empty() {
            return Statement::new(format!("INSERT INTO {} DEFAULT VALUES", self.table), Vec::new());
        }
        let columns = self
            .values
            .iter()
            .map(|(c, _)| c.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = vec!["?"; self.values.len()].join(", ");
        Statement::new(
            format!(
                "INSERT INTO {} ({}) VALUES ({})",
                self.table, columns, placeholders
            ),
            self.values.iter().map(|(_, v)| v.clone()).collect(),
        )
    }
}

/// UPDATE builder.
#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    pub table: String,
    pub values: Vec<(String, Value)>,
    pub criteria: Criteria,
}

impl Update {
    pub fn new(table: impl Into<String>, criteria: Criteria) -> Self {
        Self {
            table: table.into(),
            values: Vec::new(),
            criteria,
        }
    }

    pub fn set(mut self, column: impl Into<String>, value: Value) -> Self {
        self.values.push((column.into(), value));
        self
    }

    pub fn render(&self) -> Statement {
        let sets = self
            .values
            .iter()
            .map(|(c, _)| format!("{} = ?", c))
            .collect::<Vec<_>>()
            .join(", ");
        let mut sql = format!("UPDATE {} SET {} WHERE ", self.table, sets);
        let mut params: Vec<Value> = self.values.iter().map(|(_, v)| v.clone()).collect();
        self.criteria.render_into(&mut sql, &mut params);
        Statement { sql, params }
    }
}

/// DELETE builder.
#[derive(Debug, Clone, PartialEq)]
pub struct Delete {
    pub table: String,
    pub criteria: Criteria,
}

impl Delete {
    pub fn new(table: impl Into<String>, criteria: Criteria) -> Self {
        Self {
            table: table.into(),
            criteria,
        }
    }

    pub fn render(&self) -> Statement {
        let mut sql = format!("DELETE FROM {} WHERE ", self.table);
        let mut params = Vec::new();
        self.criteria.render_into(&mut sql, &mut params);
        Statement { sql, params }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AnsiVendor;
    use pretty_assertions::assert_eq;

    // ========== TEST: render_select_with_join_and_paging ==========
    #[test]
    fn test_render_select_with_join_and_paging() {
        // GIVEN a select over Parent joined to Child
        let mut select = Select::new("Parent", "t0");
        select.column(ColumnRef::new("t0", "id"), "c0");
        select.column(ColumnRef::new("t1", "name"), "c1");
        select.left_join(Join {
            table: "Child".into(),
            alias: "t1".into(),
            left: ColumnRef::new("t0", "child"),
            right: ColumnRef::new("t1", "id"),
        });
        select.filter(Criteria::eq(ColumnRef::new("t1", "name"), "x"));
        select.order(OrderBy::asc(ColumnRef::new("t0", "id")));
        select.limit = Some(10);
        select.offset = Some(20);

        // WHEN rendered
        let statement = select.render(&AnsiVendor::new());

        // THEN the SQL reads in clause order
        assert_eq!(
            statement.sql,
            "SELECT t0.id AS c0, t1.name AS c1 FROM Parent t0 \
             LEFT JOIN Child t1 ON t0.child = t1.id \
             WHERE t1.name = ? ORDER BY t0.id ASC LIMIT 10 OFFSET 20"
        );
        assert_eq!(statement.params, vec![Value::from("x")]);
    }

    // ========== TEST: render_count_ignores_order_and_paging ==========
    #[test]
    fn test_render_count_ignores_order_and_paging() {
        let mut select = Select::new("Node", "t0");
        select.count = true;
        select.order(OrderBy::asc(ColumnRef::new("t0", "id")));
        select.limit = Some(5);

        let statement = select.render(&AnsiVendor::new());

        assert_eq!(statement.sql, "SELECT COUNT(*) FROM Node t0");
    }

    // ========== TEST: order_by_coalesce ==========
    #[test]
    fn test_order_by_coalesce() {
        let mut select = Select::new("Bar_J", "t0");
        select.order(OrderBy {
            columns: vec![ColumnRef::new("t1", "name"), ColumnRef::new("t2", "name")],
            descending: true,
        });

        let statement = select.render(&AnsiVendor::new());

        assert_eq!(
            statement.sql,
            "SELECT 1 FROM Bar_J t0 ORDER BY COALESCE(t1.name, t2.name) DESC"
        );
    }

    // ========== TEST: render_insert_update_delete ==========
    #[test]
    fn test_render_insert_update_delete() {
        let insert = Insert::new("Child").value("name", Value::from("x")).render();
        assert_eq!(insert.sql, "INSERT INTO Child (name) VALUES (?)");

        let empty = Insert::new("Marker").render();
        assert_eq!(empty.sql, "INSERT INTO Marker DEFAULT VALUES");

        let key = Criteria::eq(ColumnRef::new("Child", "id"), 7i64);
        let update = Update::new("Child", key.clone())
            .set("name", Value::from("y"))
            .render();
        assert_eq!(update.sql, "UPDATE Child SET name = ? WHERE Child.id = ?");
        assert_eq!(update.params, vec![Value::from("y"), Value::Int(7)]);

        let delete = Delete::new("Child", key).render();
        assert_eq!(delete.sql, "DELETE FROM Child WHERE Child.id = ?");
        assert_eq!(delete.params, vec![Value::Int(7)]);
    }
}
