//! The TableRegistry - mapping from holders to physical tables.

use crate::{AttributeColumn, ColumnRole, RegistryError, RegistryResult, Table, TableId, TableKind};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tessera_core::HolderId;
use tessera_schema::PRIMARY_KEY_NAME;
use tessera_sql::{SqlType, Vendor};
use tracing::debug;

/// Holds every table created for one schema deployment.
///
/// Lookups are plain map reads. Registration rejects duplicate physical
/// names; `reset()` clears everything before a fresh deployment.
pub struct TableRegistry {
    vendor: Arc<dyn Vendor>,
    /// Tables indexed by TableId.
    tables: Vec<Table>,
    /// Table ID lookup by physical name.
    by_name: HashMap<String, TableId>,
    /// Type table per concrete type.
    type_tables: HashMap<HolderId, TableId>,
    /// Join table per holder with several concrete implementers.
    join_tables: HashMap<HolderId, TableId>,
    /// Side table per unique constraint index.
    constraint_tables: HashMap<usize, TableId>,
    /// The table addressing a holder: its join table, or the table of its
    /// only implementer.
    representatives: HashMap<HolderId, TableId>,
    /// Join tables linking each table, in link order.
    parent_joins: HashMap<TableId, Vec<TableId>>,
}

impl std::fmt::Debug for TableRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableRegistry")
            .field("vendor", &self.vendor.name())
            .field("tables", &self.tables)
            .finish()
    }
}

impl TableRegistry {
    /// Create an empty registry.
    pub fn new(vendor: Arc<dyn Vendor>) -> Self {
        Self {
            vendor,
            tables: Vec::new(),
            by_name: HashMap::new(),
            type_tables: HashMap::new(),
            join_tables: HashMap::new(),
            constraint_tables: HashMap::new(),
            representatives: HashMap::new(),
            parent_joins: HashMap::new(),
        }
    }

    pub fn vendor(&self) -> &Arc<dyn Vendor> {
        &self.vendor
    }

    /// Clear all state.
    pub fn reset(&mut self) {
        self.tables.clear();
        self.by_name.clear();
        self.type_tables.clear();
        self.join_tables.clear();
        self.constraint_tables.clear();
        self.representatives.clear();
        self.parent_joins.clear();
    }

    // ==================== Registration ====================

    fn create_table(&mut self, name: &str, kind: TableKind) -> RegistryResult<TableId> {
        let name = self.vendor.identifier(name);
        if self.by_name.contains_key(&name) {
            return Err(RegistryError::DuplicateTableName(name));
        }

        let id = TableId(self.tables.len() as u32);
        let primary_key = AttributeColumn::new(
            self.vendor.identifier(PRIMARY_KEY_NAME),
            ColumnRole::PrimaryKey,
            SqlType::Key,
        )
        .with_index(!self.vendor.auto_indexes_primary_key());

        debug!(table = %name, ?kind, "registered table");
        self.by_name.insert(name.clone(), id);
        self.tables.push(Table {
            id,
            name,
            kind,
            columns: vec![primary_key],
            joined: Vec::new(),
        });
        Ok(id)
    }

    /// Register the table of a concrete type.
    pub fn create_type_table(&mut self, holder: HolderId, name: &str) -> RegistryResult<TableId> {
        if self.type_tables.contains_key(&holder) {
            return Err(RegistryError::HolderAlreadyMapped(name.to_string()));
        }
        let id = self.create_table(name, TableKind::Type(holder))?;
        self.type_tables.insert(holder, id);
        Ok(id)
    }

    /// Register the join table of a holder.
    pub fn create_join_table(&mut self, holder: HolderId, name: &str) -> RegistryResult<TableId> {
        if self.join_tables.contains_key(&holder) {
            return Err(RegistryError::HolderAlreadyMapped(name.to_string()));
        }
        let id = self.create_table(name, TableKind::Join(holder))?;
        self.join_tables.insert(holder, id);
        Ok(id)
    }

    /// Register the side table of the unique constraint at `constraint`.
    pub fn create_unique_constraint_table(
        &mut self,
        constraint: usize,
        name: &str,
    ) -> RegistryResult<TableId> {
        let id = self.create_table(name, TableKind::UniqueConstraint(constraint))?;
        self.constraint_tables.insert(constraint, id);
        Ok(id)
    }

    /// Add a column to a table. The column name is used as given.
    pub fn add_column(&mut self, table: TableId, column: AttributeColumn) -> RegistryResult<()> {
        let target = &mut self.tables[table.index()];
        if target.columns.iter().any(|c| c.name == column.name) {
            return Err(RegistryError::DuplicateColumn {
                table: target.name.clone(),
                column: column.name,
            });
        }
        target.columns.push(column);
        Ok(())
    }

    /// Record that `join` unions the rows of `joined`.
    pub fn link(&mut self, join: TableId, joined: TableId) {
        let table = &mut self.tables[join.index()];
        if !table.joined.contains(&joined) {
            table.joined.push(joined);
            self.parent_joins.entry(joined).or_default().push(join);
        }
    }

    /// Set the table that addresses a holder.
    pub fn set_representative(&mut self, holder: HolderId, table: TableId) {
        self.representatives.insert(holder, table);
    }

    // ==================== Lookups ====================

    pub fn table(&self, id: TableId) -> &Table {
        &self.tables[id.index()]
    }

    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.iter()
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    pub fn table_by_name(&self, name: &str) -> Option<&Table> {
        self.by_name.get(name).map(|id| self.table(*id))
    }

    pub fn type_table(&self, holder: HolderId) -> Option<&Table> {
        self.type_tables.get(&holder).map(|id| self.table(*id))
    }

    pub fn join_table(&self, holder: HolderId) -> Option<&Table> {
        self.join_tables.get(&holder).map(|id| self.table(*id))
    }

    pub fn unique_constraint_table(&self, constraint: usize) -> Option<&Table> {
        self.constraint_tables.get(&constraint).map(|id| self.table(*id))
    }

    /// The table addressing a holder; `None` for unused holders.
    pub fn representative(&self, holder: HolderId) -> Option<&Table> {
        self.representatives.get(&holder).map(|id| self.table(*id))
    }

    /// Join tables linking `table` directly.
    pub fn parent_joins(&self, table: TableId) -> &[TableId] {
        self.parent_joins
            .get(&table)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Every (join table, linked table) edge above `table`, breadth first.
    /// Each join table appears once, reached through its first linked table
    /// on the way up, which is the order rows must be inserted in.
    pub fn join_chain(&self, table: TableId) -> Vec<(TableId, TableId)> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([table]);
        while let Some(current) = queue.pop_front() {
            for &join in self.parent_joins(current) {
                if seen.insert(join) {
                    chain.push((join, current));
                    queue.push_back(join);
                }
            }
        }
        chain
    }

    /// Type tables reachable below `table` through join links, in link order.
    pub fn leaf_tables(&self, table: TableId) -> Vec<TableId> {
        let mut leaves = Vec::new();
        let mut stack = vec![table];
        while let Some(current) = stack.pop() {
            let t = self.table(current);
            if t.is_join_table() {
                stack.extend(t.joined.iter().rev().copied());
            } else if !leaves.contains(&current) {
                leaves.push(current);
            }
        }
        leaves
    }
}
