//! Foreign-key values of references.
//!
//! A reference column holds the key of the row standing for the target in
//! the target holder's representative table: the target's own id, or the
//! key of one of its join-table rows.

use crate::{Session, SessionError, SessionResult};
use tessera_core::{HolderId, RecordId, Value};
use tessera_query::QueryError;
use tessera_record::RecordHandle;
use tessera_registry::{Table, TableKind};
use tessera_sql::{ColumnRef, Criteria, Select};
use tessera_transaction::{Scope, Transaction, TransactionError, TransactionResult};

/// One hop from a linked row up to the join row pointing at it.
#[derive(Debug, Clone)]
pub(crate) struct LookupStep {
    pub table: String,
    pub primary_key: String,
    /// Column of `table` holding the linked row's key.
    pub column: String,
}

/// A statement parameter known only once the transaction runs.
#[derive(Debug, Clone)]
pub(crate) enum Param {
    Value(Value),
    /// Key of a record inserted earlier in the same transaction.
    Pending {
        position: usize,
        join: Option<HolderId>,
    },
    /// Key found by walking join rows up from a persisted id.
    Lookup { id: i64, steps: Vec<LookupStep> },
}

/// Keys generated for one inserted record.
#[derive(Debug, Clone)]
pub(crate) struct Inserted {
    pub id: RecordId,
    pub join_keys: Vec<(HolderId, i64)>,
}

impl Param {
    pub fn resolve(&self, scope: &mut Scope<'_>, inserted: &[Inserted]) -> TransactionResult<Value> {
        match self {
            Param::Value(value) => Ok(value.clone()),
            Param::Pending { position, join } => {
                let record = inserted.get(*position).ok_or_else(|| missing("inserted record"))?;
                let key = match join {
                    None => Some(record.id.raw()),
                    Some(holder) => record
                        .join_keys
                        .iter()
                        .find(|(h, _)| h == holder)
                        .map(|(_, k)| *k),
                };
                key.map(Value::Int).ok_or_else(|| missing("join row"))
            }
            Param::Lookup { id, steps } => lookup_key(scope, *id, steps).map(Value::Int),
        }
    }
}

pub(crate) fn missing(what: &str) -> TransactionError {
    TransactionError::logic(SessionError::illegal_state(format!("no key for {}", what)))
}

pub(crate) fn lookup_key(scope: &mut Scope<'_>, id: i64, steps: &[LookupStep]) -> TransactionResult<i64> {
    let mut key = id;
    for step in steps {
        let mut select = Select::new(step.table.clone(), "t0");
        select.column(ColumnRef::new("t0", step.primary_key.clone()), "id");
        select.filter(Criteria::eq(ColumnRef::new("t0", step.column.clone()), key));
        let statement = select.render(scope.vendor());
        let rows = scope.query(&statement)?;
        key = rows
            .first()
            .and_then(|row| row.get("id"))
            .and_then(|v| v.as_int())
            .ok_or_else(|| missing(&step.table))?;
    }
    Ok(key)
}

impl<'e> Session<'e> {
    /// How to obtain the key `target` is referenced by through a reference
    /// declared against `holder`. Unpersisted targets must appear in
    /// `order`, the insertion order of the running transaction.
    pub(crate) fn reference_key(
        &self,
        target: RecordHandle,
        holder: HolderId,
        order: &[RecordHandle],
    ) -> SessionResult<Param> {
        let registry = &self.mapping.registry;
        let representative = registry
            .representative(holder)
            .ok_or_else(|| QueryError::unmapped(self.schema.holder_name(holder)))?;
        let join = match representative.kind {
            TableKind::Join(h) => Some(h),
            _ => None,
        };
        let record = self.context.get(target)?;

        let Some(id) = record.id() else {
            let position = order.iter().position(|h| *h == target).ok_or_else(|| {
                SessionError::illegal_state(format!(
                    "reference to an unpersisted {}",
                    self.schema.holder_name(record.holder())
                ))
            })?;
            return Ok(Param::Pending { position, join });
        };
        let Some(join) = join else {
            return Ok(Param::Value(Value::Int(id.raw())));
        };
        if let Some(key) = record.join_key(join) {
            return Ok(Param::Value(Value::Int(key)));
        }

        let table = registry
            .type_table(record.holder())
            .ok_or_else(|| QueryError::unmapped(self.schema.holder_name(record.holder())))?;
        let steps = self.path_to(table, representative)?;
        Ok(Param::Lookup {
            id: id.raw(),
            steps,
        })
    }

    /// Join steps from a type table up to one of its join tables.
    fn path_to(&self, from: &Table, to: &Table) -> SessionResult<Vec<LookupStep>> {
        let registry = &self.mapping.registry;
        let chain = registry.join_chain(from.id);
        let mut steps = Vec::new();
        let mut current = to.id;
        while current != from.id {
            let (join, linked) = chain
                .iter()
                .find(|(join, _)| *join == current)
                .copied()
                .ok_or_else(|| {
                    SessionError::illegal_state(format!("{} does not lead to {}", from.name, to.name))
                })?;
            let join_table = registry.table(join);
            let column = join_table.joined_column(linked).ok_or_else(|| {
                SessionError::illegal_state(format!("{} has no column for its link", join_table.name))
            })?;
            steps.push(LookupStep {
                table: join_table.name.clone(),
                primary_key: join_table.primary_key().name.clone(),
                column: column.name.clone(),
            });
            current = linked;
        }
        steps.reverse();
        Ok(steps)
    }

    /// Key of a persisted record as seen through `holder`, querying the
    /// join rows if the record does not know it.
    pub(crate) fn key_for(&self, target: RecordHandle, holder: HolderId) -> SessionResult<i64> {
        match self.reference_key(target, holder, &[])? {
            Param::Value(value) => value
                .as_int()
                .ok_or_else(|| SessionError::illegal_state("non-integer key")),
            Param::Lookup { id, steps } => {
                let mut key = id;
                {
                    let mut tx = Transaction::new();
                    tx.push(|scope| {
                        key = lookup_key(scope, id, &steps)?;
                        Ok(())
                    });
                    self.engine.template().run(&mut tx)?;
                }
                Ok(key)
            }
            Param::Pending { .. } => Err(SessionError::illegal_state("record is not persisted")),
        }
    }

    /// The loaded record stored under `key` in `table`, if any.
    pub(crate) fn cached(&self, table: &Table, key: i64) -> Option<RecordHandle> {
        match table.kind {
            TableKind::Type(holder) => self.context.lookup(holder, RecordId::new(key)),
            TableKind::Join(holder) => self.context.lookup_join(holder, key),
            TableKind::UniqueConstraint(_) => None,
        }
    }
}
