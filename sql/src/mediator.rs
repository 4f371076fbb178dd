//! Attribute mediators.
//!
//! One exhaustive match per concern over `AttributeKind`: whether an
//! attribute needs a column, which SQL type backs it, how a record value is
//! bound as a statement parameter and how a column value is read back.

use crate::{CryptoProvider, SqlError, SqlResult, SqlType};
use tessera_core::{Value, ValueError};
use tessera_schema::{AttributeDef, AttributeKind};

/// Virtual and inverse attributes have no column.
pub fn requires_column(attr: &AttributeDef) -> bool {
    attr.is_persistent()
}

/// SQL type backing an attribute, `None` if it has no column.
pub fn sql_type(attr: &AttributeDef) -> Option<SqlType> {
    if !requires_column(attr) {
        return None;
    }
    Some(match &attr.kind {
        AttributeKind::String => SqlType::Varchar,
        AttributeKind::Decimal {
            length,
            decimal_places: 0,
        } => SqlType::Integer { length: *length },
        AttributeKind::Decimal {
            length,
            decimal_places,
        } => SqlType::Decimal {
            length: *length,
            scale: *decimal_places,
        },
        AttributeKind::Boolean => SqlType::Boolean,
        AttributeKind::Date => SqlType::Timestamp,
        AttributeKind::Binary | AttributeKind::Crypto => SqlType::Blob,
        AttributeKind::Json => SqlType::Clob,
        AttributeKind::Reference { .. } => SqlType::Key,
        AttributeKind::Inverse { .. } => return None,
    })
}

/// Returns true if `value` may be stored in a scalar attribute of `kind`.
pub fn accepts(kind: &AttributeKind, value: &Value) -> bool {
    match (kind, value) {
        (_, Value::Null) => true,
        (AttributeKind::String, Value::String(_)) => true,
        (AttributeKind::Decimal { .. }, Value::Int(_) | Value::Decimal(_)) => true,
        (AttributeKind::Boolean, Value::Bool(_)) => true,
        (AttributeKind::Date, Value::Date(_)) => true,
        (AttributeKind::Binary, Value::Binary(_)) => true,
        (AttributeKind::Crypto, Value::String(_) | Value::Binary(_)) => true,
        (AttributeKind::Json, Value::Json(_)) => true,
        _ => false,
    }
}

fn mismatch(attr: &AttributeDef, value: &Value) -> SqlError {
    SqlError::Value(ValueError::type_mismatch(attr.kind.name(), value.type_name()))
}

fn provider<'c>(
    attr: &AttributeDef,
    crypto: Option<&'c dyn CryptoProvider>,
) -> SqlResult<&'c dyn CryptoProvider> {
    crypto.ok_or_else(|| SqlError::MissingCryptoProvider(attr.name.clone()))
}

/// Convert a record value into a statement parameter.
pub fn encode(
    attr: &AttributeDef,
    value: &Value,
    crypto: Option<&dyn CryptoProvider>,
) -> SqlResult<Value> {
    if value.is_null() {
        return Ok(Value::Null);
    }
    match (&attr.kind, value) {
        (AttributeKind::String, Value::String(_)) => Ok(value.clone()),
        (AttributeKind::Decimal { decimal_places: 0, .. }, _) => value
            .to_key()
            .map(|v| v.map(Value::Int).unwrap_or(Value::Null))
            .map_err(|_| mismatch(attr, value)),
        (AttributeKind::Decimal { .. }, _) => value
            .as_decimal()
            .map(Value::Decimal)
            .ok_or_else(|| mismatch(attr, value)),
        (AttributeKind::Boolean, Value::Bool(_)) => Ok(value.clone()),
        (AttributeKind::Date, Value::Date(_)) => Ok(value.clone()),
        (AttributeKind::Binary, Value::Binary(_)) => Ok(value.clone()),
        (AttributeKind::Crypto, Value::String(s)) => provider(attr, crypto)?
            .encrypt(s.as_bytes())
            .map(Value::Binary)
            .map_err(SqlError::Crypto),
        (AttributeKind::Crypto, Value::Binary(b)) => provider(attr, crypto)?
            .encrypt(b)
            .map(Value::Binary)
            .map_err(SqlError::Crypto),
        (AttributeKind::Json, Value::Json(j)) => serde_json::to_string(j)
            .map(Value::String)
            .map_err(|e| SqlError::Value(ValueError::from(e))),
        (AttributeKind::Reference { .. }, Value::Int(_)) => Ok(value.clone()),
        _ => Err(mismatch(attr, value)),
    }
}

/// Convert a column value read from a row into a record value.
pub fn decode(
    attr: &AttributeDef,
    raw: &Value,
    crypto: Option<&dyn CryptoProvider>,
) -> SqlResult<Value> {
    if raw.is_null() {
        return Ok(Value::Null);
    }
    match (&attr.kind, raw) {
        (AttributeKind::String, Value::String(_)) => Ok(raw.clone()),
        (AttributeKind::Decimal { decimal_places: 0, .. }, _) => raw
            .to_key()
            .map(|v| v.map(Value::Int).unwrap_or(Value::Null))
            .map_err(|_| mismatch(attr, raw)),
        (AttributeKind::Decimal { .. }, _) => raw
            .as_decimal()
            .map(Value::Decimal)
            .ok_or_else(|| mismatch(attr, raw)),
        (AttributeKind::Boolean, Value::Bool(_)) => Ok(raw.clone()),
        (AttributeKind::Boolean, Value::Int(i)) => Ok(Value::Bool(*i != 0)),
        (AttributeKind::Date, Value::Date(_)) => Ok(raw.clone()),
        (AttributeKind::Date, Value::Int(millis)) => Ok(Value::Date(*millis)),
        (AttributeKind::Binary, Value::Binary(_)) => Ok(raw.clone()),
        (AttributeKind::Crypto, Value::Binary(cipher)) => {
            let plain = provider(attr, crypto)?
                .decrypt(cipher)
                .map_err(SqlError::Crypto)?;
            Ok(match String::from_utf8(plain) {
                Ok(text) => Value::String(text),
                Err(e) => Value::Binary(e.into_bytes()),
            })
        }
        (AttributeKind::Json, Value::String(text)) => serde_json::from_str(text)
            .map(Value::Json)
            .map_err(|e| SqlError::Value(ValueError::from(e))),
        (AttributeKind::Json, Value::Json(_)) => Ok(raw.clone()),
        (AttributeKind::Reference { .. }, _) => raw
            .to_key()
            .map(|v| v.map(Value::Int).unwrap_or(Value::Null))
            .map_err(|_| mismatch(attr, raw)),
        _ => Err(mismatch(attr, raw)),
    }
}
