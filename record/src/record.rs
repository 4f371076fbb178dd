//! Records and their attribute values.

use crate::ContextId;
use std::collections::BTreeMap;
use std::fmt;
use tessera_core::{AttributeRef, HolderId, RecordId, Value};

/// Stable address of a record inside one context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordHandle {
    pub context: ContextId,
    pub index: u32,
}

impl fmt::Display for RecordHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.context, self.index)
    }
}

/// What an attribute of a record currently holds.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Value(Value),
    Reference(RecordHandle),
    /// A reference whose target has not been read yet.
    Lazy { holder: HolderId, key: i64 },
    Inverse(Vec<RecordHandle>),
}

impl AttributeValue {
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            AttributeValue::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<RecordHandle> {
        match self {
            AttributeValue::Reference(h) => Some(*h),
            _ => None,
        }
    }
}

/// One instance of a concrete type.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub(crate) holder: HolderId,
    pub(crate) id: Option<RecordId>,
    pub(crate) values: BTreeMap<AttributeRef, AttributeValue>,
    /// Primary keys of the join-table rows standing for this record.
    pub(crate) join_keys: BTreeMap<HolderId, i64>,
}

impl Record {
    pub(crate) fn new(holder: HolderId, id: Option<RecordId>) -> Self {
        Self {
            holder,
            id,
            values: BTreeMap::new(),
            join_keys: BTreeMap::new(),
        }
    }

    /// Concrete type.
    pub fn holder(&self) -> HolderId {
        self.holder
    }

    pub fn id(&self) -> Option<RecordId> {
        self.id
    }

    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    pub fn get(&self, attr: AttributeRef) -> Option<&AttributeValue> {
        self.values.get(&attr)
    }

    pub fn values(&self) -> impl Iterator<Item = (AttributeRef, &AttributeValue)> {
        self.values.iter().map(|(a, v)| (*a, v))
    }

    pub fn join_key(&self, holder: HolderId) -> Option<i64> {
        self.join_keys.get(&holder).copied()
    }

    pub fn join_keys(&self) -> impl Iterator<Item = (HolderId, i64)> + '_ {
        self.join_keys.iter().map(|(h, k)| (*h, *k))
    }
}
