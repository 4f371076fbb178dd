//! Identity types.
//!
//! Schema-level identifiers are dense indices handed out by the schema
//! builder and are only meaningful within the schema that produced them.
//! Record identifiers are database primary keys.

use std::fmt;

/// Identifier of a named attribute holder (a Type or a Mixin).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HolderId(pub u32);

impl HolderId {
    /// Create a new HolderId from a raw value.
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw value.
    pub fn raw(&self) -> u32 {
        self.0
    }

    /// Index into the schema's holder arena.
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for HolderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "h{}", self.0)
    }
}

/// Identifier of an attribute: the holder that declares it plus the
/// declaration index within that holder.
///
/// Inherited and mixed-in attributes keep the reference of their declaring
/// holder, so the same attribute seen through two sub-types compares equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AttributeRef {
    pub holder: HolderId,
    pub index: u32,
}

impl AttributeRef {
    pub fn new(holder: HolderId, index: u32) -> Self {
        Self { holder, index }
    }
}

impl fmt::Display for AttributeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.a{}", self.holder, self.index)
    }
}

/// Database primary key of a persisted row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId(pub i64);

impl RecordId {
    /// Create a new RecordId from a raw value.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the raw value.
    pub fn raw(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<i64> for RecordId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}
