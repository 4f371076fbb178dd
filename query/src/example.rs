//! Query by example.
//!
//! An example is a partially filled record. Every set attribute becomes an
//! equality predicate (a null value matches NULL); nested examples reach
//! through references. Binary, encrypted, inverse and virtual attributes
//! never take part in matching.

use crate::compiler::any_of;
use crate::paths;
use crate::{CompiledQuery, LoadingMode, QueryCompiler, QueryError, QueryResult, WithRequired};
use std::collections::BTreeSet;
use tessera_core::{HolderId, Value};
use tessera_schema::AttributeKind;
use tessera_sql::{Criteria, OrderBy};
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub enum ExampleValue {
    Value(Value),
    Nested(Example),
}

/// A partially populated record used as a template.
#[derive(Debug, Clone, PartialEq)]
pub struct Example {
    pub holder: HolderId,
    pub values: Vec<(String, ExampleValue)>,
    /// Attribute path and descending flag.
    pub order_by: Option<(String, bool)>,
    pub loading: LoadingMode,
}

impl Example {
    pub fn new(holder: HolderId) -> Self {
        Self {
            holder,
            values: Vec::new(),
            order_by: None,
            loading: LoadingMode::Lazy,
        }
    }

    pub fn with(mut self, attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values
            .push((attribute.into(), ExampleValue::Value(value.into())));
        self
    }

    pub fn with_nested(mut self, attribute: impl Into<String>, nested: Example) -> Self {
        self.values
            .push((attribute.into(), ExampleValue::Nested(nested)));
        self
    }

    pub fn order_by(mut self, path: impl Into<String>, descending: bool) -> Self {
        self.order_by = Some((path.into(), descending));
        self
    }

    pub fn eager(mut self) -> Self {
        self.loading = LoadingMode::Eager;
        self
    }

    fn leaves(&self, prefix: &[String], out: &mut Vec<(Vec<String>, Value)>) {
        for (name, value) in &self.values {
            let mut path = prefix.to_vec();
            path.push(name.clone());
            match value {
                ExampleValue::Value(v) => out.push((path, v.clone())),
                ExampleValue::Nested(nested) => nested.leaves(&path, out),
            }
        }
    }
}

impl<'a> QueryCompiler<'a> {
    pub fn compile_example(&self, example: &Example) -> QueryResult<CompiledQuery> {
        let mut all = Vec::new();
        example.leaves(&[], &mut all);

        let mut leaves = Vec::with_capacity(all.len());
        let mut required = BTreeSet::new();
        for (path, value) in all {
            let segments: Vec<&str> = path.iter().map(String::as_str).collect();
            let Some(attr) = paths::validate(self.schema, example.holder, &segments)? else {
                continue;
            };
            let def = self.schema.attribute(attr);
            let comparable = !def.is_virtual
                && !matches!(
                    def.kind,
                    AttributeKind::Binary | AttributeKind::Crypto | AttributeKind::Inverse { .. }
                );
            if comparable {
                required.insert(path.join("."));
                leaves.push((path, value));
            }
        }
        if let Some((path, _)) = &example.order_by {
            let segments: Vec<&str> = path.split('.').collect();
            paths::validate(self.schema, example.holder, &segments)?;
            required.insert(path.clone());
        }

        let mut loaded = self.prepare(example.holder, WithRequired::new(example.loading, required))?;

        if !leaves.is_empty() {
            let criteria = self.restrict(&loaded.bindings, |binding| {
                let mut predicates = Vec::with_capacity(leaves.len());
                for (path, value) in &leaves {
                    let segments: Vec<&str> = path.iter().map(String::as_str).collect();
                    let mut matches = Vec::new();
                    for target in paths::columns(self.schema, binding, &segments) {
                        matches.push(target.guard(Criteria::eq_or_null(
                            target.column.clone(),
                            self.encode(&target, value)?,
                        )));
                    }
                    predicates.push(any_of(matches));
                }
                Ok(Criteria::And(predicates))
            })?;
            loaded.select.filter(criteria);
        }

        match &example.order_by {
            Some((path, descending)) => {
                let segments: Vec<&str> = path.split('.').collect();
                let columns: Vec<_> = loaded
                    .bindings
                    .iter()
                    .flat_map(|b| paths::columns(self.schema, b, &segments))
                    .map(|c| c.column)
                    .collect();
                if columns.is_empty() {
                    return Err(QueryError::unknown_attribute(
                        self.schema.holder_name(example.holder),
                        path.clone(),
                    ));
                }
                loaded.select.order(OrderBy {
                    columns,
                    descending: *descending,
                });
            }
            None => loaded
                .select
                .order(OrderBy::asc(loaded.root_primary_key.clone())),
        }

        debug!(holder = %example.holder, predicates = leaves.len(), "example compiled");
        Ok(CompiledQuery {
            select: loaded.select,
            bindings: loaded.bindings,
            count: false,
        })
    }
}
