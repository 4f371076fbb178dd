//! Writes: insert, update and delete, each in one transaction.

use crate::keys::{missing, Inserted, Param};
use crate::{Session, SessionError, SessionResult};
use std::collections::{HashSet, VecDeque};
use tessera_core::{AttributeRef, HolderId, RecordId, Value};
use tessera_query::QueryError;
use tessera_record::{AttributeValue, RecordError, RecordHandle};
use tessera_registry::{Table, TableKind};
use tessera_schema::{AttributeKind, OnDelete};
use tessera_sql::{mediator, ColumnRef, Criteria, Delete, Insert, Update};
use tessera_transaction::{ListenerEvent, ListenerKind, Transaction};
use tracing::debug;

/// A join row to insert, pointing at the type row (`source == None`) or at
/// an earlier join row of the same record.
struct JoinPlan {
    holder: HolderId,
    table: String,
    column: String,
    source: Option<usize>,
}

/// A unique-constraint row keyed by the record's id.
struct ConstraintPlan {
    table: String,
    holder_column: String,
    values: Vec<(String, Param)>,
}

struct InsertPlan<'e> {
    type_name: &'e str,
    table: String,
    values: Vec<(String, Param)>,
    joins: Vec<JoinPlan>,
    constraints: Vec<ConstraintPlan>,
}

/// A persisted row to delete.
struct DeletePlan<'e> {
    type_name: &'e str,
    table: String,
    primary_key: String,
    id: RecordId,
}

impl<'e> Session<'e> {
    // ==================== Insert ====================

    /// Insert a record together with every unpersisted record it references.
    /// Returns the id assigned to `handle`.
    pub fn insert(&mut self, handle: RecordHandle) -> SessionResult<RecordId> {
        let record = self.context.get(handle)?;
        if let Some(id) = record.id() {
            return Err(SessionError::illegal_state(format!(
                "{}{} is already persisted",
                self.schema.holder_name(record.holder()),
                id
            )));
        }

        let order = self.insert_order(handle)?;
        for pending in &order {
            self.check_mandatory(*pending)?;
        }
        let plans = order
            .iter()
            .map(|pending| self.insert_plan(*pending, &order))
            .collect::<SessionResult<Vec<_>>>()?;

        let listeners = self.engine.listeners();
        let mut inserted: Vec<Inserted> = Vec::with_capacity(plans.len());
        {
            let mut tx = Transaction::new();
            tx.push(|scope| {
                for plan in &plans {
                    listeners.fire(&ListenerEvent::record(ListenerKind::PrePersist, plan.type_name, None))?;

                    let mut insert = Insert::new(plan.table.clone());
                    for (column, param) in &plan.values {
                        insert = insert.value(column.clone(), param.resolve(scope, &inserted)?);
                    }
                    let id = scope.insert(&insert.render())?;

                    let mut keys: Vec<i64> = Vec::with_capacity(plan.joins.len());
                    let mut join_keys = Vec::with_capacity(plan.joins.len());
                    for join in &plan.joins {
                        let linked = match join.source {
                            None => id,
                            Some(i) => keys.get(i).copied().ok_or_else(|| missing(&join.table))?,
                        };
                        let row = Insert::new(join.table.clone()).value(join.column.clone(), Value::Int(linked));
                        let key = scope.insert(&row.render())?;
                        keys.push(key);
                        join_keys.push((join.holder, key));
                    }

                    for constraint in &plan.constraints {
                        let mut row = Insert::new(constraint.table.clone())
                            .value(constraint.holder_column.clone(), Value::Int(id));
                        for (column, param) in &constraint.values {
                            row = row.value(column.clone(), param.resolve(scope, &inserted)?);
                        }
                        scope.execute(&row.render())?;
                    }

                    let id = RecordId::new(id);
                    scope.events().persisted(plan.type_name, id);
                    listeners.fire(&ListenerEvent::record(ListenerKind::PostPersist, plan.type_name, Some(id)))?;
                    inserted.push(Inserted { id, join_keys });
                }
                Ok(())
            });
            self.run(&mut tx)?;
        }

        for (pending, keys) in order.iter().zip(&inserted) {
            self.context.persisted(*pending, keys.id)?;
            for (holder, key) in &keys.join_keys {
                self.context.set_join_key(*pending, *holder, *key)?;
            }
        }
        debug!(records = inserted.len(), "inserted");
        let root = inserted.last().ok_or_else(|| SessionError::illegal_state("nothing inserted"))?;
        Ok(root.id)
    }

    /// Unpersisted records reachable from `root` through references,
    /// targets before referrers.
    fn insert_order(&self, root: RecordHandle) -> SessionResult<Vec<RecordHandle>> {
        let mut order = Vec::new();
        let mut visiting = Vec::new();
        self.visit_pending(root, &mut visiting, &mut order)?;
        Ok(order)
    }

    fn visit_pending(
        &self,
        handle: RecordHandle,
        visiting: &mut Vec<RecordHandle>,
        order: &mut Vec<RecordHandle>,
    ) -> SessionResult<()> {
        if order.contains(&handle) {
            return Ok(());
        }
        let schema = self.schema;
        let record = self.context.get(handle)?;
        if visiting.contains(&handle) {
            return Err(SessionError::ReferenceCycle {
                holder: schema.holder_name(record.holder()).to_string(),
            });
        }
        visiting.push(handle);

        let targets: Vec<RecordHandle> = record
            .values()
            .filter_map(|(attr, value)| match value {
                AttributeValue::Reference(target) if schema.attribute(attr).is_persistent() => Some(*target),
                _ => None,
            })
            .collect();
        for target in targets {
            if self.context.get(target)?.id().is_none() {
                self.visit_pending(target, visiting, order)?;
            }
        }

        visiting.pop();
        order.push(handle);
        Ok(())
    }

    fn check_mandatory(&self, handle: RecordHandle) -> SessionResult<()> {
        let schema = self.schema;
        let holder = self.context.get(handle)?.holder();
        for attr in schema.holder_attributes(holder) {
            let def = schema.attribute(attr);
            if !def.mandatory || !def.is_persistent() {
                continue;
            }
            let present = match self.context.value(handle, attr)? {
                Some(AttributeValue::Value(v)) => !v.is_null(),
                Some(AttributeValue::Reference(_) | AttributeValue::Lazy { .. }) => true,
                Some(AttributeValue::Inverse(_)) | None => false,
            };
            if !present {
                return Err(SessionError::MissingMandatory {
                    holder: schema.holder_name(holder).to_string(),
                    attr: def.name.clone(),
                });
            }
        }
        Ok(())
    }

    fn insert_plan(&self, handle: RecordHandle, order: &[RecordHandle]) -> SessionResult<InsertPlan<'e>> {
        let schema = self.schema;
        let mapping = self.mapping;
        let holder = self.context.get(handle)?.holder();
        let type_name = schema.holder_name(holder);
        let table = self.type_table(holder)?;

        let values = self.row_values(handle, table, order, false)?;

        let chain = mapping.registry.join_chain(table.id);
        let mut joins = Vec::with_capacity(chain.len());
        for (join, linked) in &chain {
            let join_table = mapping.registry.table(*join);
            let TableKind::Join(join_holder) = join_table.kind else {
                return Err(SessionError::illegal_state(format!("{} is not a join table", join_table.name)));
            };
            let column = join_table.joined_column(*linked).ok_or_else(|| {
                SessionError::illegal_state(format!("{} has no column for its link", join_table.name))
            })?;
            let source = if *linked == table.id {
                None
            } else {
                chain.iter().position(|(j, _)| j == linked)
            };
            joins.push(JoinPlan {
                holder: join_holder,
                table: join_table.name.clone(),
                column: column.name.clone(),
                source,
            });
        }

        let constraints = self.constraint_rows(handle, holder, order)?;
        Ok(InsertPlan {
            type_name,
            table: table.name.clone(),
            values,
            joins,
            constraints,
        })
    }

    // ==================== Update ====================

    /// Write every column of a persisted record. Unset attributes are
    /// written as null.
    pub fn update(&mut self, handle: RecordHandle) -> SessionResult<()> {
        let schema = self.schema;
        let record = self.context.get(handle)?;
        let holder = record.holder();
        let type_name = schema.holder_name(holder);
        let id = record.id().ok_or_else(|| RecordError::NotPersisted {
            holder: type_name.to_string(),
        })?;
        self.check_mandatory(handle)?;

        let table = self.type_table(holder)?;
        let values = self.row_values(handle, table, &[], true)?;
        let constraints = self.constraint_rows(handle, holder, &[])?;
        let primary_key = ColumnRef::new(table.name.clone(), table.primary_key().name.clone());

        let listeners = self.engine.listeners();
        let mut tx = Transaction::new();
        tx.push(|scope| {
            listeners.fire(&ListenerEvent::record(ListenerKind::PreMerge, type_name, Some(id)))?;

            if !values.is_empty() {
                let mut update = Update::new(table.name.clone(), Criteria::eq(primary_key, id.raw()));
                for (column, param) in &values {
                    update = update.set(column.clone(), param.resolve(scope, &[])?);
                }
                scope.execute(&update.render())?;
            }
            for constraint in &constraints {
                let owner = ColumnRef::new(constraint.table.clone(), constraint.holder_column.clone());
                let mut update = Update::new(constraint.table.clone(), Criteria::eq(owner, id.raw()));
                for (column, param) in &constraint.values {
                    update = update.set(column.clone(), param.resolve(scope, &[])?);
                }
                scope.execute(&update.render())?;
            }

            scope.events().merged(type_name, id);
            listeners.fire(&ListenerEvent::record(ListenerKind::PostMerge, type_name, Some(id)))?;
            Ok(())
        });
        self.run(&mut tx)?;
        debug!(record = %type_name, %id, "updated");
        Ok(())
    }

    // ==================== Delete ====================

    /// Delete a persisted record and the records it owns through
    /// cascading references. Referrers loaded in this session follow the
    /// database's delete policy.
    pub fn delete(&mut self, handle: RecordHandle) -> SessionResult<()> {
        let owned = self.collect_owned(handle)?;
        let plans = owned
            .iter()
            .map(|h| self.delete_plan(*h))
            .collect::<SessionResult<Vec<_>>>()?;

        let listeners = self.engine.listeners();
        {
            let mut tx = Transaction::new();
            tx.push(|scope| {
                for plan in &plans {
                    listeners.fire(&ListenerEvent::record(ListenerKind::PreDelete, plan.type_name, Some(plan.id)))?;
                    let key = ColumnRef::new(plan.table.clone(), plan.primary_key.clone());
                    scope.execute(&Delete::new(plan.table.clone(), Criteria::eq(key, plan.id.raw())).render())?;
                    scope.events().deleted(plan.type_name, plan.id);
                    listeners.fire(&ListenerEvent::record(ListenerKind::PostDelete, plan.type_name, Some(plan.id)))?;
                }
                Ok(())
            });
            self.run(&mut tx)?;
        }

        self.forget(owned)
    }

    /// `root` followed by every record reachable through cascading
    /// references, resolving lazy ones.
    fn collect_owned(&mut self, root: RecordHandle) -> SessionResult<Vec<RecordHandle>> {
        let schema = self.schema;
        let mut owned = Vec::new();
        let mut queue = VecDeque::from([root]);
        while let Some(handle) = queue.pop_front() {
            if owned.contains(&handle) {
                continue;
            }
            let record = self.context.get(handle)?;
            if record.id().is_none() {
                return Err(RecordError::NotPersisted {
                    holder: schema.holder_name(record.holder()).to_string(),
                }
                .into());
            }
            let cascading: Vec<AttributeRef> = record
                .values()
                .filter(|(attr, value)| {
                    matches!(value, AttributeValue::Reference(_) | AttributeValue::Lazy { .. })
                        && schema.attribute(*attr).on_delete == Some(OnDelete::Cascade)
                })
                .map(|(attr, _)| attr)
                .collect();
            owned.push(handle);
            for attr in cascading {
                if let Some(target) = self.resolve_attr(handle, attr)? {
                    queue.push_back(target);
                }
            }
        }
        Ok(owned)
    }

    fn delete_plan(&self, handle: RecordHandle) -> SessionResult<DeletePlan<'e>> {
        let schema = self.schema;
        let record = self.context.get(handle)?;
        let type_name = schema.holder_name(record.holder());
        let id = record.id().ok_or_else(|| RecordError::NotPersisted {
            holder: type_name.to_string(),
        })?;
        let table = self.type_table(record.holder())?;
        Ok(DeletePlan {
            type_name,
            table: table.name.clone(),
            primary_key: table.primary_key().name.clone(),
            id,
        })
    }

    /// Drop deleted records from the context, applying each referencing
    /// attribute's delete policy to loaded referrers.
    fn forget(&mut self, deleted: Vec<RecordHandle>) -> SessionResult<()> {
        let mut queue = VecDeque::from(deleted);
        let mut done = HashSet::new();
        while let Some(handle) = queue.pop_front() {
            if !done.insert(handle) || self.context.get(handle).is_err() {
                continue;
            }
            for (referrer, attr) in self.context.referenced_by(handle)? {
                if done.contains(&referrer) {
                    continue;
                }
                match self.delete_policy(attr) {
                    Some(OnDelete::SetNull) => self.context.clear(referrer, attr)?,
                    Some(OnDelete::Cascade) => queue.push_back(referrer),
                    None => {}
                }
            }
            let record = self.context.detach(handle)?;
            debug!(record = %self.schema.holder_name(record.holder()), id = ?record.id(), "forgotten");
        }
        Ok(())
    }

    /// The policy the deployed foreign key of `attr` carries.
    fn delete_policy(&self, attr: AttributeRef) -> Option<OnDelete> {
        let def = self.schema.attribute(attr);
        def.on_delete.or_else(|| {
            self.schema
                .inverses_of(attr)
                .iter()
                .any(|(_, inverse)| {
                    matches!(inverse.kind, AttributeKind::Inverse { delete_orphans: true, .. })
                })
                .then_some(OnDelete::Cascade)
        })
    }

    // ==================== Columns ====================

    fn type_table(&self, holder: HolderId) -> SessionResult<&'e Table> {
        let mapping = self.mapping;
        mapping
            .registry
            .type_table(holder)
            .ok_or_else(|| QueryError::unmapped(self.schema.holder_name(holder)).into())
    }

    /// Parameters for the attribute columns of `table`. Unset attributes
    /// are skipped, or written as null when `nulls` is set.
    fn row_values(
        &self,
        handle: RecordHandle,
        table: &Table,
        order: &[RecordHandle],
        nulls: bool,
    ) -> SessionResult<Vec<(String, Param)>> {
        let mut values = Vec::new();
        for column in &table.columns {
            let Some(attr) = column.attribute() else {
                continue;
            };
            match self.column_value(handle, attr, order)? {
                Some(param) => values.push((column.name.clone(), param)),
                None if nulls => values.push((column.name.clone(), Param::Value(Value::Null))),
                None => {}
            }
        }
        Ok(values)
    }

    fn constraint_rows(
        &self,
        handle: RecordHandle,
        holder: HolderId,
        order: &[RecordHandle],
    ) -> SessionResult<Vec<ConstraintPlan>> {
        let mapping = self.mapping;
        let mut rows = Vec::new();
        for info in mapping.constraints.for_holder(holder) {
            let Some(holder_column) = info.holder_column(holder) else {
                continue;
            };
            let mut values = Vec::with_capacity(info.value_columns.len());
            for (attr, column) in &info.value_columns {
                let param = self
                    .column_value(handle, *attr, order)?
                    .unwrap_or(Param::Value(Value::Null));
                values.push((column.clone(), param));
            }
            rows.push(ConstraintPlan {
                table: mapping.registry.table(info.table).name.clone(),
                holder_column: holder_column.to_string(),
                values,
            });
        }
        Ok(rows)
    }

    fn column_value(
        &self,
        handle: RecordHandle,
        attr: AttributeRef,
        order: &[RecordHandle],
    ) -> SessionResult<Option<Param>> {
        let def = self.schema.attribute(attr);
        match self.context.value(handle, attr)? {
            None | Some(AttributeValue::Inverse(_)) => Ok(None),
            Some(AttributeValue::Value(value)) => {
                let encoded = mediator::encode(def, value, self.engine.crypto())?;
                Ok(Some(Param::Value(encoded)))
            }
            Some(AttributeValue::Reference(target)) => {
                let holder = def
                    .kind
                    .reference_target()
                    .ok_or_else(|| SessionError::illegal_state(format!("{} is not a reference", def.name)))?;
                self.reference_key(*target, holder, order).map(Some)
            }
            Some(AttributeValue::Lazy { key, .. }) => Ok(Some(Param::Value(Value::Int(*key)))),
        }
    }
}
