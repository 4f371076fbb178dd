//! Session: one unit of work over an engine.

use crate::{Engine, SessionError, SessionResult};
use std::collections::HashMap;
use tessera_core::{AttributeRef, HolderId, RecordId, Value};
use tessera_deployer::TableMapping;
use tessera_query::{decode_row, DecodedRecord, DecodedValue, MappingBinding};
use tessera_record::{AttributeValue, Record, RecordContext, RecordHandle};
use tessera_schema::Schema;
use tessera_sql::{Row, Statement, Vendor};
use tessera_transaction::{ListenerEvent, ListenerKind, Transaction};
use tracing::warn;

/// Records read and written through one engine.
///
/// A session owns its identity map: reading the same row twice yields the
/// same handle.
pub struct Session<'e> {
    pub(crate) engine: &'e Engine,
    pub(crate) schema: &'e Schema,
    pub(crate) mapping: &'e TableMapping,
    pub(crate) context: RecordContext,
}

impl<'e> Session<'e> {
    pub(crate) fn new(engine: &'e Engine) -> SessionResult<Self> {
        Ok(Self {
            engine,
            schema: engine.schema(),
            mapping: engine.mapping()?,
            context: RecordContext::new(engine.schema().clone()),
        })
    }

    pub fn context(&self) -> &RecordContext {
        &self.context
    }

    pub fn holder(&self, type_name: &str) -> SessionResult<HolderId> {
        self.schema
            .holder_id(type_name)
            .ok_or_else(|| SessionError::UnknownType(type_name.to_string()))
    }

    pub fn record(&self, handle: RecordHandle) -> SessionResult<&Record> {
        Ok(self.context.get(handle)?)
    }

    pub fn type_name(&self, handle: RecordHandle) -> SessionResult<&'e str> {
        let schema = self.schema;
        let holder = self.context.get(handle)?.holder();
        Ok(schema.holder_name(holder))
    }

    pub fn id(&self, handle: RecordHandle) -> SessionResult<Option<RecordId>> {
        Ok(self.context.get(handle)?.id())
    }

    // ==================== Record Editing ====================

    /// Create an unpersisted record of a concrete type.
    pub fn create(&mut self, type_name: &str) -> SessionResult<RecordHandle> {
        let holder = self.holder(type_name)?;
        Ok(self.context.create(holder)?)
    }

    pub fn set(&mut self, handle: RecordHandle, attribute: &str, value: impl Into<Value>) -> SessionResult<()> {
        let attr = self.context.attribute(handle, attribute)?;
        Ok(self.context.set_value(handle, attr, value.into())?)
    }

    pub fn set_reference(
        &mut self,
        handle: RecordHandle,
        attribute: &str,
        target: Option<RecordHandle>,
    ) -> SessionResult<()> {
        let attr = self.context.attribute(handle, attribute)?;
        Ok(self.context.set_reference(handle, attr, target)?)
    }

    pub fn get(&self, handle: RecordHandle, attribute: &str) -> SessionResult<Option<&AttributeValue>> {
        let attr = self.context.attribute(handle, attribute)?;
        Ok(self.context.value(handle, attr)?)
    }

    /// Scalar value of an attribute; unset reads as null.
    pub fn value(&self, handle: RecordHandle, attribute: &str) -> SessionResult<Value> {
        match self.get(handle, attribute)? {
            None => Ok(Value::Null),
            Some(AttributeValue::Value(v)) => Ok(v.clone()),
            Some(_) => Err(SessionError::illegal_argument(format!(
                "{} is not a scalar attribute",
                attribute
            ))),
        }
    }

    /// Bring a persisted record of another session into this one.
    pub fn attach(&mut self, other: &Session<'_>, handle: RecordHandle) -> SessionResult<RecordHandle> {
        Ok(self.context.attach(&other.context, handle)?)
    }

    // ==================== Plumbing ====================

    pub(crate) fn vendor(&self) -> &'e dyn Vendor {
        self.engine.template().vendor().as_ref()
    }

    /// Commit `tx`, then tell transaction listeners how it ended.
    pub(crate) fn run(&self, tx: &mut Transaction<'_>) -> SessionResult<()> {
        let outcome = self.engine.template().run(tx);
        let mut event = ListenerEvent::global(ListenerKind::Transaction);
        event.rolled_back = outcome.is_err();
        let notified = self.engine.listeners().fire(&event);
        match outcome {
            Ok(()) => Ok(notified?),
            Err(e) => {
                if let Err(listener) = notified {
                    warn!(error = %listener, "transaction listener failed after rollback");
                }
                Err(e.into())
            }
        }
    }

    /// Run one read statement in its own transaction.
    pub(crate) fn fetch(&self, statement: &Statement) -> SessionResult<Vec<Row>> {
        let mut rows = Vec::new();
        {
            let mut tx = Transaction::new();
            tx.push(|scope| {
                rows = scope.query(statement)?;
                Ok(())
            });
            self.engine.template().run(&mut tx)?;
        }
        Ok(rows)
    }

    /// Decode `row` and merge the result into the identity map.
    pub(crate) fn decode_into(
        &mut self,
        bindings: &[MappingBinding],
        row: &Row,
    ) -> SessionResult<Option<RecordHandle>> {
        match decode_row(self.schema, bindings, row, self.engine.crypto())? {
            Some(decoded) => self.materialize(&decoded).map(Some),
            None => Ok(None),
        }
    }

    /// A record new to the session takes every decoded value. One already
    /// in the identity map keeps its values, unsaved edits included; the row
    /// only upgrades lazy references whose target it carries.
    fn materialize(&mut self, decoded: &DecodedRecord) -> SessionResult<RecordHandle> {
        let known = self.context.lookup(decoded.holder, decoded.id).is_some();
        let handle = self.context.create_with_id(decoded.holder, decoded.id)?;
        for (holder, key) in &decoded.join_keys {
            self.context.set_join_key(handle, *holder, *key)?;
        }
        for (attr, value) in &decoded.values {
            let lazy = matches!(self.context.value(handle, *attr)?, Some(AttributeValue::Lazy { .. }));
            match value {
                DecodedValue::Reference(nested) => {
                    let target = self.materialize(nested)?;
                    if !known || lazy {
                        self.context.set_reference(handle, *attr, Some(target))?;
                    }
                }
                _ if known => {}
                DecodedValue::Value(v) => self.context.set_value(handle, *attr, v.clone())?,
                DecodedValue::Lazy { key, .. } => self.context.set_lazy(handle, *attr, *key)?,
            }
        }
        if !known {
            self.compute_virtual(handle)?;
        }
        Ok(handle)
    }

    /// Fill virtual attributes from their registered adapters.
    fn compute_virtual(&mut self, handle: RecordHandle) -> SessionResult<()> {
        let schema = self.schema;
        let record = self.context.get(handle)?;
        let holder = record.holder();
        let virtuals: Vec<AttributeRef> = schema
            .holder_attributes(holder)
            .into_iter()
            .filter(|a| {
                let def = schema.attribute(*a);
                def.is_virtual && !def.kind.is_reference() && !def.kind.is_inverse()
            })
            .collect();
        if virtuals.is_empty() {
            return Ok(());
        }

        let inputs: HashMap<String, Value> = record
            .values()
            .filter_map(|(a, v)| Some((schema.attribute(a).name.clone(), v.as_value()?.clone())))
            .collect();
        let type_name = schema.holder_name(holder);
        let adapters = self.engine.adapters();
        for attr in virtuals {
            let def = schema.attribute(attr);
            let adapter = adapters
                .get(type_name, &def.name)
                .or_else(|| adapters.get(schema.holder_name(attr.holder), &def.name));
            let Some(adapter) = adapter else {
                continue;
            };
            let value = adapter
                .compute(&inputs)
                .map_err(|message| SessionError::VirtualAttribute {
                    holder: type_name.to_string(),
                    attr: def.name.clone(),
                    message,
                })?;
            self.context.set_value(handle, attr, value)?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for Session<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("context", &self.context.id())
            .field("records", &self.context.len())
            .finish()
    }
}
