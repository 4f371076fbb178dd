//! Arena-backed identity map.

use crate::{AttributeValue, Record, RecordError, RecordHandle, RecordResult};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tessera_core::{AttributeRef, HolderId, RecordId, Value};
use tessera_schema::{AttributeDef, Schema};
use tessera_sql::mediator;
use tracing::debug;

static NEXT_CONTEXT: AtomicU64 = AtomicU64::new(1);

/// Identifies one context; handles carry it so they cannot be used
/// against another arena by accident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(u64);

impl ContextId {
    fn next() -> Self {
        Self(NEXT_CONTEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ctx{}", self.0)
    }
}

/// Records of one unit of work.
///
/// Not thread-safe; confine a context to the session that owns it.
#[derive(Debug)]
pub struct RecordContext {
    id: ContextId,
    schema: Arc<Schema>,
    records: Vec<Option<Record>>,
    /// Persisted records by concrete type and id.
    by_key: HashMap<(HolderId, RecordId), u32>,
    /// Unpersisted records per concrete type, in creation order.
    pending: BTreeMap<HolderId, Vec<u32>>,
    /// Target index to (source index, attribute).
    referenced_by: HashMap<u32, Vec<(u32, AttributeRef)>>,
    /// Foreign (context, index) to local index.
    proxies: HashMap<(ContextId, u32), u32>,
}

impl RecordContext {
    pub fn new(schema: Arc<Schema>) -> Self {
        Self {
            id: ContextId::next(),
            schema,
            records: Vec::new(),
            by_key: HashMap::new(),
            pending: BTreeMap::new(),
            referenced_by: HashMap::new(),
            proxies: HashMap::new(),
        }
    }

    pub fn id(&self) -> ContextId {
        self.id
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Number of attached records.
    pub fn len(&self) -> usize {
        self.records.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn handles(&self) -> impl Iterator<Item = RecordHandle> + '_ {
        self.records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.is_some())
            .map(|(i, _)| self.handle(i as u32))
    }

    // ==================== Creation ====================

    /// Create an unpersisted record of a concrete type.
    pub fn create(&mut self, holder: HolderId) -> RecordResult<RecordHandle> {
        self.check_concrete(holder)?;
        let index = self.push(Record::new(holder, None));
        self.pending.entry(holder).or_default().push(index);
        debug!(holder = self.schema.holder_name(holder), index, "record created");
        Ok(self.handle(index))
    }

    /// Return the record registered for `(holder, id)`, registering a new
    /// persisted one if there is none.
    pub fn create_with_id(&mut self, holder: HolderId, id: RecordId) -> RecordResult<RecordHandle> {
        self.check_concrete(holder)?;
        if let Some(&index) = self.by_key.get(&(holder, id)) {
            return Ok(self.handle(index));
        }
        let index = self.push(Record::new(holder, Some(id)));
        self.by_key.insert((holder, id), index);
        Ok(self.handle(index))
    }

    fn check_concrete(&self, holder: HolderId) -> RecordResult<()> {
        match self.schema.get_holder(holder) {
            Some(h) if h.is_concrete() => Ok(()),
            Some(h) => Err(RecordError::NotConcrete {
                name: h.name.clone(),
            }),
            None => Err(RecordError::NotConcrete {
                name: holder.to_string(),
            }),
        }
    }

    fn push(&mut self, record: Record) -> u32 {
        self.records.push(Some(record));
        (self.records.len() - 1) as u32
    }

    fn handle(&self, index: u32) -> RecordHandle {
        RecordHandle {
            context: self.id,
            index,
        }
    }

    // ==================== Access ====================

    pub fn get(&self, handle: RecordHandle) -> RecordResult<&Record> {
        let index = self.index(handle)?;
        self.record(index)
    }

    pub fn value(&self, handle: RecordHandle, attr: AttributeRef) -> RecordResult<Option<&AttributeValue>> {
        Ok(self.get(handle)?.get(attr))
    }

    /// Resolve an attribute name against the record's type.
    pub fn attribute(&self, handle: RecordHandle, name: &str) -> RecordResult<AttributeRef> {
        let holder = self.get(handle)?.holder;
        self.schema
            .find_attribute(holder, name)
            .ok_or_else(|| RecordError::unknown_attribute(self.schema.holder_name(holder), name))
    }

    pub fn lookup(&self, holder: HolderId, id: RecordId) -> Option<RecordHandle> {
        self.by_key.get(&(holder, id)).map(|i| self.handle(*i))
    }

    /// Find a record by the key of the join-table row standing for it.
    pub fn lookup_join(&self, holder: HolderId, key: i64) -> Option<RecordHandle> {
        self.records
            .iter()
            .position(|r| r.as_ref().and_then(|r| r.join_key(holder)) == Some(key))
            .map(|i| self.handle(i as u32))
    }

    pub fn pending(&self, holder: HolderId) -> Vec<RecordHandle> {
        self.pending
            .get(&holder)
            .map(|list| list.iter().map(|i| self.handle(*i)).collect())
            .unwrap_or_default()
    }

    /// Records referencing `handle`, with the attribute they use.
    pub fn referenced_by(&self, handle: RecordHandle) -> RecordResult<Vec<(RecordHandle, AttributeRef)>> {
        let index = self.index(handle)?;
        Ok(self
            .referenced_by
            .get(&index)
            .map(|list| list.iter().map(|(s, a)| (self.handle(*s), *a)).collect())
            .unwrap_or_default())
    }

    fn index(&self, handle: RecordHandle) -> RecordResult<u32> {
        if handle.context != self.id {
            return Err(RecordError::ForeignRecord);
        }
        self.record(handle.index)?;
        Ok(handle.index)
    }

    fn record(&self, index: u32) -> RecordResult<&Record> {
        self.records
            .get(index as usize)
            .and_then(Option::as_ref)
            .ok_or(RecordError::Detached)
    }

    fn record_mut(&mut self, index: u32) -> RecordResult<&mut Record> {
        self.records
            .get_mut(index as usize)
            .and_then(Option::as_mut)
            .ok_or(RecordError::Detached)
    }

    /// The definition of `attr`, provided the record's type carries it.
    fn visible(&self, index: u32, attr: AttributeRef) -> RecordResult<&AttributeDef> {
        let holder = self.record(index)?.holder;
        let known = self
            .schema
            .get_holder(attr.holder)
            .is_some_and(|h| (attr.index as usize) < h.attributes.len());
        if !known || !self.schema.is_a(holder, attr.holder) {
            return Err(RecordError::unknown_attribute(
                self.schema.holder_name(holder),
                attr.to_string(),
            ));
        }
        Ok(self.schema.attribute(attr))
    }

    // ==================== Mutation ====================

    /// Set a scalar attribute. Null clears a reference.
    pub fn set_value(&mut self, handle: RecordHandle, attr: AttributeRef, value: Value) -> RecordResult<()> {
        let index = self.index(handle)?;
        let def = self.visible(index, attr)?;
        if def.kind.is_reference() && value.is_null() {
            return self.replace(index, attr, None);
        }
        if def.kind.is_reference() || def.kind.is_inverse() || !mediator::accepts(&def.kind, &value) {
            return Err(RecordError::ValueMismatch {
                holder: self.schema.holder_name(attr.holder).to_string(),
                attr: def.name.clone(),
                found: value.type_name().to_string(),
            });
        }
        self.replace(index, attr, Some(AttributeValue::Value(value)))
    }

    pub fn set_reference(
        &mut self,
        handle: RecordHandle,
        attr: AttributeRef,
        target: Option<RecordHandle>,
    ) -> RecordResult<()> {
        let index = self.index(handle)?;
        let def = self.visible(index, attr)?;
        let expected = def.kind.reference_target().ok_or_else(|| {
            RecordError::not_a_reference(self.schema.holder_name(attr.holder), def.name.clone())
        })?;
        let Some(target) = target else {
            return self.replace(index, attr, None);
        };
        let target_holder = self.get(target)?.holder;
        if !self.schema.is_a(target_holder, expected) {
            return Err(RecordError::TargetMismatch {
                attr: def.name.clone(),
                expected: self.schema.holder_name(expected).to_string(),
                found: self.schema.holder_name(target_holder).to_string(),
            });
        }
        self.replace(index, attr, Some(AttributeValue::Reference(target)))
    }

    /// Record an unresolved reference by its foreign key.
    pub fn set_lazy(&mut self, handle: RecordHandle, attr: AttributeRef, key: i64) -> RecordResult<()> {
        let index = self.index(handle)?;
        let def = self.visible(index, attr)?;
        let holder = def.kind.reference_target().ok_or_else(|| {
            RecordError::not_a_reference(self.schema.holder_name(attr.holder), def.name.clone())
        })?;
        self.replace(index, attr, Some(AttributeValue::Lazy { holder, key }))
    }

    pub fn set_inverse(
        &mut self,
        handle: RecordHandle,
        attr: AttributeRef,
        records: Vec<RecordHandle>,
    ) -> RecordResult<()> {
        let index = self.index(handle)?;
        let def = self.visible(index, attr)?;
        if !def.kind.is_inverse() {
            return Err(RecordError::NotAnInverse {
                holder: self.schema.holder_name(attr.holder).to_string(),
                attr: def.name.clone(),
            });
        }
        for record in &records {
            self.index(*record)?;
        }
        self.replace(index, attr, Some(AttributeValue::Inverse(records)))
    }

    pub fn clear(&mut self, handle: RecordHandle, attr: AttributeRef) -> RecordResult<()> {
        let index = self.index(handle)?;
        self.replace(index, attr, None)
    }

    pub fn set_join_key(&mut self, handle: RecordHandle, holder: HolderId, key: i64) -> RecordResult<()> {
        let index = self.index(handle)?;
        self.record_mut(index)?.join_keys.insert(holder, key);
        Ok(())
    }

    fn replace(&mut self, index: u32, attr: AttributeRef, value: Option<AttributeValue>) -> RecordResult<()> {
        let target = value.as_ref().and_then(AttributeValue::as_reference);
        let record = self.record_mut(index)?;
        let old = match value {
            Some(value) => record.values.insert(attr, value),
            None => record.values.remove(&attr),
        };
        if let Some(AttributeValue::Reference(old)) = old {
            self.unlink(old.index, index, attr);
        }
        if let Some(target) = target {
            self.referenced_by
                .entry(target.index)
                .or_default()
                .push((index, attr));
        }
        Ok(())
    }

    fn unlink(&mut self, target: u32, source: u32, attr: AttributeRef) {
        if let Some(list) = self.referenced_by.get_mut(&target) {
            list.retain(|entry| *entry != (source, attr));
            if list.is_empty() {
                self.referenced_by.remove(&target);
            }
        }
    }

    // ==================== Lifecycle ====================

    /// Move a pending record to the id-keyed map.
    pub fn persisted(&mut self, handle: RecordHandle, id: RecordId) -> RecordResult<()> {
        let index = self.index(handle)?;
        let record = self.record(index)?;
        let holder = record.holder;
        if let Some(existing) = record.id {
            return Err(RecordError::AlreadyPersisted {
                holder: self.schema.holder_name(holder).to_string(),
                id: existing,
            });
        }
        if self.by_key.contains_key(&(holder, id)) {
            return Err(RecordError::DuplicateKey {
                holder: self.schema.holder_name(holder).to_string(),
                id,
            });
        }
        self.record_mut(index)?.id = Some(id);
        self.by_key.insert((holder, id), index);
        if let Some(list) = self.pending.get_mut(&holder) {
            list.retain(|i| *i != index);
        }
        debug!(holder = self.schema.holder_name(holder), %id, "record persisted");
        Ok(())
    }

    /// Remove a record from the context. References to it from other
    /// records fall back to their foreign key, or are cleared if the
    /// record was never persisted.
    pub fn detach(&mut self, handle: RecordHandle) -> RecordResult<Record> {
        let index = self.index(handle)?;
        let record = self
            .records
            .get_mut(index as usize)
            .and_then(Option::take)
            .ok_or(RecordError::Detached)?;

        match record.id {
            Some(id) => {
                self.by_key.remove(&(record.holder, id));
            }
            None => {
                if let Some(list) = self.pending.get_mut(&record.holder) {
                    list.retain(|i| *i != index);
                }
            }
        }
        for (attr, value) in &record.values {
            if let AttributeValue::Reference(target) = value {
                self.unlink(target.index, index, *attr);
            }
        }
        for (source, attr) in self.referenced_by.remove(&index).unwrap_or_default() {
            let fallback = record.id.and_then(|id| {
                let holder = self.schema.attribute(attr).kind.reference_target()?;
                let key = record.join_key(holder).unwrap_or(id.raw());
                Some(AttributeValue::Lazy { holder, key })
            });
            if let Some(Some(referrer)) = self.records.get_mut(source as usize) {
                match fallback {
                    Some(lazy) => referrer.values.insert(attr, lazy),
                    None => referrer.values.remove(&attr),
                };
            }
        }
        for value in self.records.iter_mut().flatten().flat_map(|r| r.values.values_mut()) {
            if let AttributeValue::Inverse(list) = value {
                list.retain(|h| h.index != index);
            }
        }
        self.proxies.retain(|_, local| *local != index);
        Ok(record)
    }

    /// Bring a persisted record of another context into this one.
    ///
    /// The local record shares the foreign record's identity. Referenced
    /// records are attached recursively; inverse values are not copied.
    pub fn attach(&mut self, other: &RecordContext, handle: RecordHandle) -> RecordResult<RecordHandle> {
        if handle.context == self.id {
            self.index(handle)?;
            return Ok(handle);
        }
        if handle.context != other.id {
            return Err(RecordError::ForeignRecord);
        }
        if let Some(&local) = self.proxies.get(&(other.id, handle.index)) {
            return Ok(self.handle(local));
        }

        let record = other.get(handle)?;
        let id = record.id.ok_or_else(|| RecordError::NotPersisted {
            holder: self.schema.holder_name(record.holder).to_string(),
        })?;
        let local = self.create_with_id(record.holder, id)?;
        self.proxies.insert((other.id, handle.index), local.index);

        for (holder, key) in record.join_keys() {
            self.set_join_key(local, holder, key)?;
        }
        for (attr, value) in record.values() {
            let copied = match value {
                AttributeValue::Reference(target) => {
                    AttributeValue::Reference(self.attach(other, *target)?)
                }
                AttributeValue::Inverse(_) => continue,
                other_value => other_value.clone(),
            };
            self.replace(local.index, attr, Some(copied))?;
        }
        Ok(local)
    }
}
