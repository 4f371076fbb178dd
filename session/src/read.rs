//! Reads: by id, by nquery, by example, and on-demand resolution.

use crate::{Session, SessionError, SessionResult};
use std::collections::{BTreeSet, HashSet};
use tessera_core::{AttributeRef, RecordId, Value};
use tessera_query::{
    CompiledQuery, Example, LoadingIterator, QueryCompiler, QueryError, WithRequired,
};
use tessera_record::{AttributeValue, RecordHandle};
use tessera_registry::TableId;
use tessera_schema::AttributeKind;
use tessera_sql::Criteria;
use tracing::debug;

impl<'e> Session<'e> {
    /// Read one record. A concrete type is read from its own table by id;
    /// an abstract type or mixin by the key of its representative table,
    /// yielding a record of whichever concrete type owns that row.
    pub fn read_by_id(
        &mut self,
        type_name: &str,
        id: impl Into<RecordId>,
    ) -> SessionResult<Option<RecordHandle>> {
        let holder = self.holder(type_name)?;
        let key = id.into().raw();
        let mapping = self.mapping;
        let registry = &mapping.registry;
        let table = if self.schema.holder(holder).is_concrete() {
            registry.type_table(holder)
        } else {
            registry.representative(holder)
        }
        .ok_or_else(|| QueryError::unmapped(type_name))?;

        if let Some(cached) = self.cached(table, key) {
            return Ok(Some(cached));
        }
        self.read_from(table.id, key)
    }

    fn read_from(&mut self, root: TableId, key: i64) -> SessionResult<Option<RecordHandle>> {
        let mapping = self.mapping;
        let loading = WithRequired::new(self.engine.config().default_read_loading, BTreeSet::new());
        let mut loaded = LoadingIterator::new(self.schema, &mapping.registry, &loading).build(root)?;
        loaded
            .select
            .filter(Criteria::eq(loaded.root_primary_key.clone(), key));

        let rows = self.fetch(&loaded.select.render(self.vendor()))?;
        debug!(table = %mapping.registry.table(root).name, key, found = !rows.is_empty(), "read by id");
        match rows.first() {
            Some(row) => self.decode_into(&loaded.bindings, row),
            None => Ok(None),
        }
    }

    // ==================== Queries ====================

    /// Run a `PICK` statement.
    pub fn query(&mut self, nquery: &str, args: &[Value]) -> SessionResult<Vec<RecordHandle>> {
        let compiled = self.compiler().compile_text(nquery, args)?;
        if compiled.count {
            return Err(SessionError::illegal_argument(
                "COUNT statements are run with count()",
            ));
        }
        self.load(&compiled)
    }

    /// Run a `COUNT` statement.
    pub fn count(&self, nquery: &str, args: &[Value]) -> SessionResult<u64> {
        let compiled = self.compiler().compile_text(nquery, args)?;
        if !compiled.count {
            return Err(SessionError::illegal_argument(
                "PICK statements are run with query()",
            ));
        }
        let rows = self.fetch(&compiled.select.render(self.vendor()))?;
        rows.first()
            .and_then(|row| row.get_index(0))
            .and_then(Value::as_int)
            .and_then(|n| u64::try_from(n).ok())
            .ok_or_else(|| SessionError::illegal_state("COUNT returned no count"))
    }

    /// Records matching every value set on `example`.
    pub fn find(&mut self, example: &Example) -> SessionResult<Vec<RecordHandle>> {
        let compiled = self.compiler().compile_example(example)?;
        self.load(&compiled)
    }

    /// An example holding the present values of a record, nesting through
    /// loaded references.
    pub fn example_of(&self, handle: RecordHandle) -> SessionResult<Example> {
        self.example_from(handle, &mut HashSet::new())
    }

    fn example_from(
        &self,
        handle: RecordHandle,
        visited: &mut HashSet<RecordHandle>,
    ) -> SessionResult<Example> {
        visited.insert(handle);
        let record = self.context.get(handle)?;
        let mut example = Example::new(record.holder());
        for (attr, value) in record.values() {
            let name = self.schema.attribute(attr).name.clone();
            example = match value {
                AttributeValue::Value(v) => example.with(name, v.clone()),
                AttributeValue::Lazy { key, .. } => example.with(name, *key),
                AttributeValue::Reference(target) if !visited.contains(target) => {
                    let nested = self.example_from(*target, visited)?;
                    example.with_nested(name, nested)
                }
                _ => example,
            };
        }
        Ok(example)
    }

    fn compiler(&self) -> QueryCompiler<'e> {
        let engine = self.engine;
        let mapping = self.mapping;
        QueryCompiler::new(self.schema, &mapping.registry)
            .with_crypto(engine.crypto())
            .with_loading(engine.config().default_query_loading)
    }

    fn load(&mut self, compiled: &CompiledQuery) -> SessionResult<Vec<RecordHandle>> {
        let rows = self.fetch(&compiled.select.render(self.vendor()))?;
        let mut handles = Vec::with_capacity(rows.len());
        for row in &rows {
            if let Some(handle) = self.decode_into(&compiled.bindings, row)? {
                if !handles.contains(&handle) {
                    handles.push(handle);
                }
            }
        }
        Ok(handles)
    }

    // ==================== Resolution ====================

    /// The record a reference points at, reading it if it was left lazy.
    pub fn resolve(&mut self, handle: RecordHandle, attribute: &str) -> SessionResult<Option<RecordHandle>> {
        let attr = self.context.attribute(handle, attribute)?;
        self.resolve_attr(handle, attr)
    }

    pub(crate) fn resolve_attr(
        &mut self,
        handle: RecordHandle,
        attr: AttributeRef,
    ) -> SessionResult<Option<RecordHandle>> {
        match self.context.value(handle, attr)?.cloned() {
            None | Some(AttributeValue::Value(_)) => Ok(None),
            Some(AttributeValue::Reference(target)) => Ok(Some(target)),
            Some(AttributeValue::Lazy { holder, key }) => {
                let mapping = self.mapping;
                let table = mapping
                    .registry
                    .representative(holder)
                    .ok_or_else(|| QueryError::unmapped(self.schema.holder_name(holder)))?;
                let target = match self.cached(table, key) {
                    Some(target) => target,
                    None => self.read_from(table.id, key)?.ok_or_else(|| {
                        SessionError::illegal_state(format!(
                            "{} references a missing {} row {}",
                            self.schema.attribute(attr).name,
                            table.name,
                            key
                        ))
                    })?,
                };
                self.context.set_reference(handle, attr, Some(target))?;
                Ok(Some(target))
            }
            Some(AttributeValue::Inverse(_)) => Err(SessionError::illegal_argument(format!(
                "{} is an inverse attribute",
                self.schema.attribute(attr).name
            ))),
        }
    }

    /// Load the records whose reference backs an inverse attribute.
    pub fn load_inverse(&mut self, handle: RecordHandle, attribute: &str) -> SessionResult<Vec<RecordHandle>> {
        let schema = self.schema;
        let attr = self.context.attribute(handle, attribute)?;
        let AttributeKind::Inverse {
            holder,
            attribute: reference,
            ..
        } = &schema.attribute(attr).kind
        else {
            return Err(SessionError::illegal_argument(format!(
                "{} is not an inverse attribute",
                attribute
            )));
        };
        let (holder, reference) = (*holder, *reference);
        let target = schema
            .attribute(reference)
            .kind
            .reference_target()
            .ok_or_else(|| SessionError::illegal_state(format!("{} backs no reference", attribute)))?;

        let key = self.key_for(handle, target)?;
        let example = Example::new(holder).with(schema.attribute(reference).name.clone(), key);
        let found = self.find(&example)?;
        self.context.set_inverse(handle, attr, found.clone())?;
        Ok(found)
    }
}
