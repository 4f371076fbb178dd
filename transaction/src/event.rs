//! Persistence events collected while a transaction runs.

use tessera_core::RecordId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Persisted,
    Merged,
    Deleted,
}

/// One record-level change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionEvent {
    pub kind: EventKind,
    pub type_name: String,
    pub id: RecordId,
}

/// Ordered event log of one transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionEvents {
    events: Vec<TransactionEvent>,
}

impl TransactionEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn persisted(&mut self, type_name: impl Into<String>, id: RecordId) {
        self.push(EventKind::Persisted, type_name, id);
    }

    pub fn merged(&mut self, type_name: impl Into<String>, id: RecordId) {
        self.push(EventKind::Merged, type_name, id);
    }

    pub fn deleted(&mut self, type_name: impl Into<String>, id: RecordId) {
        self.push(EventKind::Deleted, type_name, id);
    }

    fn push(&mut self, kind: EventKind, type_name: impl Into<String>, id: RecordId) {
        self.events.push(TransactionEvent {
            kind,
            type_name: type_name.into(),
            id,
        });
    }

    pub fn iter(&self) -> impl Iterator<Item = &TransactionEvent> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
