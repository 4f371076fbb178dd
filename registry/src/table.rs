//! Physical table descriptions.

use std::fmt;
use tessera_core::{AttributeRef, HolderId};
use tessera_sql::SqlType;

/// Index of a table in its registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableId(pub u32);

impl TableId {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// The three table shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    /// One row per concrete instance of exactly one Type.
    Type(HolderId),
    /// Unions the primary keys of its joined tables for a holder with
    /// several concrete implementers.
    Join(HolderId),
    /// Side table carrying the UNIQUE constraint at this index of the
    /// schema's unique constraints.
    UniqueConstraint(usize),
}

/// What a column stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnRole {
    /// The synthetic `id` column.
    PrimaryKey,
    /// A domain attribute of a type table.
    Attribute(AttributeRef),
    /// Join-table column pointing at the row of a joined table.
    Joined(TableId),
    /// Unique-constraint column pointing at a participating type's row.
    ConstraintHolder(HolderId),
    /// Unique-constraint copy of a constrained attribute.
    ConstraintValue(AttributeRef),
}

/// Binds one attribute (or synthetic key) to a column on one table.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeColumn {
    pub name: String,
    pub role: ColumnRole,
    pub sql_type: SqlType,
    /// An explicit `CREATE INDEX` is needed for this column.
    pub requires_index: bool,
    /// Target of the column's foreign key, if any.
    pub references: Option<TableId>,
}

impl AttributeColumn {
    pub fn new(name: impl Into<String>, role: ColumnRole, sql_type: SqlType) -> Self {
        Self {
            name: name.into(),
            role,
            sql_type,
            requires_index: false,
            references: None,
        }
    }

    pub fn with_index(mut self, requires_index: bool) -> Self {
        self.requires_index = requires_index;
        self
    }

    pub fn referencing(mut self, table: Option<TableId>) -> Self {
        self.references = table;
        self
    }

    pub fn is_primary_key(&self) -> bool {
        matches!(self.role, ColumnRole::PrimaryKey)
    }

    /// The domain attribute of an attribute column.
    pub fn attribute(&self) -> Option<AttributeRef> {
        match self.role {
            ColumnRole::Attribute(attr) => Some(attr),
            _ => None,
        }
    }
}

/// A registered table.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub id: TableId,
    pub name: String,
    pub kind: TableKind,
    /// Columns in creation order; the primary key is always first.
    pub columns: Vec<AttributeColumn>,
    /// Tables unioned by a join table, in link order.
    pub joined: Vec<TableId>,
}

impl Table {
    pub fn primary_key(&self) -> &AttributeColumn {
        &self.columns[0]
    }

    /// Holder of a type or join table.
    pub fn holder(&self) -> Option<HolderId> {
        match self.kind {
            TableKind::Type(h) | TableKind::Join(h) => Some(h),
            TableKind::UniqueConstraint(_) => None,
        }
    }

    pub fn is_join_table(&self) -> bool {
        matches!(self.kind, TableKind::Join(_))
    }

    pub fn column(&self, name: &str) -> Option<&AttributeColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Column backing a domain attribute.
    pub fn attribute_column(&self, attr: AttributeRef) -> Option<&AttributeColumn> {
        self.columns.iter().find(|c| c.attribute() == Some(attr))
    }

    /// Join-table column pointing at `joined`.
    pub fn joined_column(&self, joined: TableId) -> Option<&AttributeColumn> {
        self.columns
            .iter()
            .find(|c| c.role == ColumnRole::Joined(joined))
    }
}
