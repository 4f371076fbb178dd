//! Row decoding.

use crate::{MappingBinding, QueryResult};
use tessera_core::{AttributeRef, HolderId, RecordId, Value};
use tessera_schema::Schema;
use tessera_sql::{mediator, CryptoProvider, Row, SqlError};

/// A decoded attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedValue {
    Value(Value),
    /// A joined reference target.
    Reference(Box<DecodedRecord>),
    /// A reference left for later: `key` addresses the row of `holder`'s
    /// representative table.
    Lazy { holder: HolderId, key: i64 },
}

/// One record cut out of a row.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedRecord {
    pub holder: HolderId,
    pub id: RecordId,
    pub values: Vec<(AttributeRef, DecodedValue)>,
    pub join_keys: Vec<(HolderId, i64)>,
}

impl DecodedRecord {
    pub fn value(&self, attr: AttributeRef) -> Option<&DecodedValue> {
        self.values.iter().find(|(a, _)| *a == attr).map(|(_, v)| v)
    }
}

fn column<'r>(row: &'r Row, alias: &str) -> QueryResult<&'r Value> {
    row.get(alias)
        .ok_or_else(|| SqlError::MissingColumn(alias.to_string()).into())
}

fn key(value: &Value) -> QueryResult<Option<i64>> {
    value.to_key().map_err(|e| SqlError::Value(e).into())
}

/// Decode the record held by `row` under the first binding whose primary
/// key is present. Returns `None` when no binding matches.
pub fn decode_row(
    schema: &Schema,
    bindings: &[MappingBinding],
    row: &Row,
    crypto: Option<&dyn CryptoProvider>,
) -> QueryResult<Option<DecodedRecord>> {
    for binding in bindings {
        if let Some(id) = key(column(row, &binding.primary_key)?)? {
            return decode_binding(schema, binding, RecordId::new(id), row, crypto).map(Some);
        }
    }
    Ok(None)
}

fn decode_binding(
    schema: &Schema,
    binding: &MappingBinding,
    id: RecordId,
    row: &Row,
    crypto: Option<&dyn CryptoProvider>,
) -> QueryResult<DecodedRecord> {
    let mut values = Vec::with_capacity(binding.attributes.len());
    for alias in &binding.attributes {
        let def = schema.attribute(alias.attribute);
        let raw = column(row, &alias.alias)?;

        let value = match def.kind.reference_target() {
            Some(target) => match key(raw)? {
                None => DecodedValue::Value(Value::Null),
                Some(k) if alias.lazy => DecodedValue::Lazy {
                    holder: target,
                    key: k,
                },
                Some(k) => {
                    let nested = binding.nested(alias.attribute);
                    match decode_row(schema, nested, row, crypto)? {
                        Some(record) => DecodedValue::Reference(Box::new(record)),
                        None => DecodedValue::Lazy {
                            holder: target,
                            key: k,
                        },
                    }
                }
            },
            None => DecodedValue::Value(mediator::decode(def, raw, crypto)?),
        };
        values.push((alias.attribute, value));
    }

    let mut join_keys = Vec::with_capacity(binding.join_keys.len());
    for (holder, alias) in &binding.join_keys {
        if let Some(k) = key(column(row, alias)?)? {
            join_keys.push((*holder, k));
        }
    }

    Ok(DecodedRecord {
        holder: binding.holder,
        id,
        values,
        join_keys,
    })
}
