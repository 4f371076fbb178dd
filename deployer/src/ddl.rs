//! DDL rendering.

use crate::SchemaProblem;
use tessera_registry::{AttributeColumn, Table, UniqueConstraintInfo};
use tessera_schema::OnDelete;
use tessera_sql::{Connection, DriverError, Vendor};

/// Kind of structural object a DDL statement creates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DdlObject {
    Table,
    Column,
    Constraint,
    Index,
}

/// One rendered DDL statement and the object it creates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ddl {
    pub object: DdlObject,
    pub table: String,
    /// Object name; equals `table` for tables.
    pub name: String,
    pub sql: String,
}

impl Ddl {
    pub fn create_table(vendor: &dyn Vendor, table: &Table) -> Self {
        Self {
            object: DdlObject::Table,
            table: table.name.clone(),
            name: table.name.clone(),
            sql: format!(
                "CREATE TABLE {} ({})",
                table.name,
                vendor.primary_key_ddl(&table.primary_key().name)
            ),
        }
    }

    pub fn add_column(vendor: &dyn Vendor, table: &Table, column: &AttributeColumn) -> Self {
        Self {
            object: DdlObject::Column,
            table: table.name.clone(),
            name: column.name.clone(),
            sql: format!(
                "ALTER TABLE {} ADD COLUMN {} {}",
                table.name,
                column.name,
                vendor.sql_type(column.sql_type)
            ),
        }
    }

    pub fn add_unique(table: &Table, info: &UniqueConstraintInfo) -> Self {
        let columns: Vec<&str> = info.value_columns.iter().map(|(_, c)| c.as_str()).collect();
        Self {
            object: DdlObject::Constraint,
            table: table.name.clone(),
            name: info.name.clone(),
            sql: format!(
                "ALTER TABLE {} ADD CONSTRAINT {} UNIQUE ({})",
                table.name,
                info.name,
                columns.join(", ")
            ),
        }
    }

    pub fn add_foreign_key(
        vendor: &dyn Vendor,
        table: &Table,
        column: &AttributeColumn,
        target: &Table,
        on_delete: OnDelete,
    ) -> Self {
        let name = vendor.identifier(&format!("FK_{}_{}", table.name, column.name));
        Self {
            object: DdlObject::Constraint,
            table: table.name.clone(),
            sql: format!(
                "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({}) ON DELETE {}",
                table.name,
                name,
                column.name,
                target.name,
                target.primary_key().name,
                on_delete.sql()
            ),
            name,
        }
    }

    pub fn create_index(vendor: &dyn Vendor, table: &Table, column: &AttributeColumn) -> Self {
        let name = vendor.identifier(&format!("IX_{}_{}", table.name, column.name));
        Self {
            object: DdlObject::Index,
            table: table.name.clone(),
            sql: format!("CREATE INDEX {} ON {} ({})", name, table.name, column.name),
            name,
        }
    }

    /// Ask the vendor whether the object already exists.
    pub fn exists(&self, vendor: &dyn Vendor, conn: &mut dyn Connection) -> Result<bool, DriverError> {
        match self.object {
            DdlObject::Table => vendor.table_exists(conn, &self.table),
            DdlObject::Column => vendor.column_exists(conn, &self.table, &self.name),
            DdlObject::Constraint => vendor.constraint_exists(conn, &self.table, &self.name),
            DdlObject::Index => vendor.index_exists(conn, &self.table, &self.name),
        }
    }

    /// The problem reported when the object is missing in validate-only mode.
    pub fn missing(&self) -> SchemaProblem {
        let table = self.table.clone();
        match self.object {
            DdlObject::Table => SchemaProblem::MissingTable { table },
            DdlObject::Column => SchemaProblem::MissingColumn {
                table,
                column: self.name.clone(),
            },
            DdlObject::Constraint => SchemaProblem::MissingConstraint {
                table,
                constraint: self.name.clone(),
            },
            DdlObject::Index => SchemaProblem::MissingIndex {
                table,
                index: self.name.clone(),
            },
        }
    }
}
