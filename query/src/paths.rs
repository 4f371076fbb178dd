//! Attribute path resolution against a schema and a binding tree.

use crate::{MappingBinding, QueryError, QueryResult};
use tessera_core::{AttributeRef, HolderId};
use tessera_schema::Schema;
use tessera_sql::{ColumnRef, Criteria};

/// A column carrying the value at a path.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PathColumn {
    pub column: ColumnRef,
    /// `None` for the primary key.
    pub attribute: Option<AttributeRef>,
    /// Primary keys of the subtype bindings chosen on the way down, one per
    /// polymorphic reference passed. Their LEFT JOINs leave NULL columns for
    /// absent subtypes, so a predicate only counts where they are present.
    pub guards: Vec<ColumnRef>,
}

impl PathColumn {
    /// `predicate`, restricted to rows where every guard binding is present.
    pub fn guard(&self, predicate: Criteria) -> Criteria {
        if self.guards.is_empty() {
            return predicate;
        }
        let mut all: Vec<Criteria> = self.guards.iter().cloned().map(Criteria::IsNotNull).collect();
        all.push(predicate);
        Criteria::And(all)
    }
}

/// Check `segments` name attributes reachable from `holder`, returning the
/// last one. An attribute counts if any concrete implementer carries it.
pub(crate) fn validate(
    schema: &Schema,
    holder: HolderId,
    segments: &[&str],
) -> QueryResult<Option<AttributeRef>> {
    let mut current = holder;
    let mut last = None;
    for (i, segment) in segments.iter().enumerate() {
        let attr = find(schema, current, segment)?;
        if i + 1 < segments.len() {
            current = schema
                .attribute(attr)
                .kind
                .reference_target()
                .ok_or_else(|| QueryError::not_a_reference(schema.holder_name(current), *segment))?;
        }
        last = Some(attr);
    }
    Ok(last)
}

fn find(schema: &Schema, holder: HolderId, name: &str) -> QueryResult<AttributeRef> {
    std::iter::once(holder)
        .chain(schema.concrete_implementers(holder))
        .find_map(|h| schema.find_attribute(h, name))
        .ok_or_else(|| QueryError::unknown_attribute(schema.holder_name(holder), name))
}

/// Columns holding the value at `segments` below `binding`; empty when the
/// binding's type cannot carry the path.
pub(crate) fn columns(schema: &Schema, binding: &MappingBinding, segments: &[&str]) -> Vec<PathColumn> {
    let Some((first, rest)) = segments.split_first() else {
        return vec![PathColumn {
            column: binding.primary_key_column.clone(),
            attribute: None,
            guards: Vec::new(),
        }];
    };
    let Some(attr) = schema.find_attribute(binding.holder, first) else {
        return Vec::new();
    };

    if rest.is_empty() {
        return binding
            .attribute(attr)
            .map(|a| PathColumn {
                column: a.column.clone(),
                attribute: Some(attr),
                guards: Vec::new(),
            })
            .into_iter()
            .collect();
    }
    let targets = binding.nested(attr);
    let polymorphic = targets.len() > 1;
    targets
        .iter()
        .flat_map(|nested| {
            columns(schema, nested, rest).into_iter().map(move |mut column| {
                if polymorphic {
                    column.guards.insert(0, nested.primary_key_column.clone());
                }
                column
            })
        })
        .collect()
}

/// Bindings of the records found at `segments` below `binding`.
pub(crate) fn records<'b>(
    schema: &Schema,
    binding: &'b MappingBinding,
    segments: &[&str],
) -> Vec<&'b MappingBinding> {
    let Some((first, rest)) = segments.split_first() else {
        return vec![binding];
    };
    let Some(attr) = schema.find_attribute(binding.holder, first) else {
        return Vec::new();
    };
    binding
        .nested(attr)
        .iter()
        .flat_map(|nested| records(schema, nested, rest))
        .collect()
}
