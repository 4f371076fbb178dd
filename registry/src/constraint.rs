//! Constraint registry: where each unique constraint physically lives.

use crate::TableId;
use std::collections::HashMap;
use tessera_core::{AttributeRef, HolderId};

/// Backing columns of one unique constraint.
#[derive(Debug, Clone, PartialEq)]
pub struct UniqueConstraintInfo {
    /// Index into the schema's unique constraints.
    pub constraint: usize,
    pub table: TableId,
    /// Physical name of the UNIQUE constraint.
    pub name: String,
    /// One reference column per participating concrete type.
    pub holder_columns: Vec<(HolderId, String)>,
    /// Copies of the constrained attributes, in constraint order.
    pub value_columns: Vec<(AttributeRef, String)>,
}

impl UniqueConstraintInfo {
    pub fn holder_column(&self, holder: HolderId) -> Option<&str> {
        self.holder_columns
            .iter()
            .find(|(h, _)| *h == holder)
            .map(|(_, c)| c.as_str())
    }

    pub fn covers(&self, attr: AttributeRef) -> bool {
        self.value_columns.iter().any(|(a, _)| *a == attr)
    }
}

/// Registry of unique constraint tables.
#[derive(Debug, Default)]
pub struct ConstraintRegistry {
    entries: Vec<UniqueConstraintInfo>,
    by_constraint: HashMap<usize, usize>,
}

impl ConstraintRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, info: UniqueConstraintInfo) {
        self.by_constraint.insert(info.constraint, self.entries.len());
        self.entries.push(info);
    }

    pub fn get(&self, constraint: usize) -> Option<&UniqueConstraintInfo> {
        self.by_constraint.get(&constraint).map(|i| &self.entries[*i])
    }

    /// Constraints a row of `concrete` participates in.
    pub fn for_holder(&self, concrete: HolderId) -> impl Iterator<Item = &UniqueConstraintInfo> {
        self.entries
            .iter()
            .filter(move |e| e.holder_column(concrete).is_some())
    }

    pub fn all(&self) -> &[UniqueConstraintInfo] {
        &self.entries
    }

    pub fn reset(&mut self) {
        self.entries.clear();
        self.by_constraint.clear();
    }
}
