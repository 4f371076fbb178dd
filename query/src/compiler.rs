//! nquery compilation.
//!
//! Two passes over the parsed condition. The first collects every
//! attribute path the statement touches so the loading iterator joins
//! them; the second renders each predicate against the binding that
//! actually carries its column, keeping the AND / OR / parenthesis
//! structure of the source.

use crate::paths::{self, PathColumn};
use crate::{
    LoadedSelect, LoadingIterator, LoadingMode, MappingBinding, QueryError, QueryResult,
    WithRequired,
};
use std::collections::BTreeSet;
use tessera_core::{HolderId, Value};
use tessera_parser::{
    parse_query, AttributePath, BooleanStatement, CompareOperator, Literal, Operand, Query,
};
use tessera_registry::TableRegistry;
use tessera_schema::Schema;
use tessera_sql::{mediator, CompareOp, CryptoProvider, Criteria, OrderBy, Select};
use tracing::debug;

/// A compiled read.
#[derive(Debug, Clone)]
pub struct CompiledQuery {
    pub select: Select,
    pub bindings: Vec<MappingBinding>,
    pub count: bool,
}

/// Compiles nquery statements and examples against one mapped schema.
pub struct QueryCompiler<'a> {
    pub(crate) schema: &'a Schema,
    pub(crate) registry: &'a TableRegistry,
    crypto: Option<&'a dyn CryptoProvider>,
    mode: LoadingMode,
}

impl<'a> QueryCompiler<'a> {
    pub fn new(schema: &'a Schema, registry: &'a TableRegistry) -> Self {
        Self {
            schema,
            registry,
            crypto: None,
            mode: LoadingMode::Eager,
        }
    }

    pub fn with_crypto(mut self, crypto: Option<&'a dyn CryptoProvider>) -> Self {
        self.crypto = crypto;
        self
    }

    /// Loading of paths the statement does not touch.
    pub fn with_loading(mut self, mode: LoadingMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn compile_text(&self, text: &str, args: &[Value]) -> QueryResult<CompiledQuery> {
        let query = parse_query(text)?;
        self.compile(&query, args)
    }

    pub fn compile(&self, query: &Query, args: &[Value]) -> QueryResult<CompiledQuery> {
        let holder = self.holder(query.holder())?;
        let needed = query.argument_count();
        if needed > args.len() {
            return Err(QueryError::MissingArgument {
                index: args.len(),
                given: args.len(),
            });
        }
        let alias = query.alias();

        // Pass 1: required paths.
        let mut required = BTreeSet::new();
        if let Some(condition) = query.condition() {
            self.collect_paths(condition, holder, alias, &mut required)?;
        }
        if let Query::Pick(pick) = query {
            if let Some(order) = &pick.order_by {
                self.require(&order.path, holder, alias, &mut required)?;
            }
        }

        let count = matches!(query, Query::Count(_));
        let base = if count { LoadingMode::Lazy } else { self.mode };
        let mut loaded = self.prepare(holder, WithRequired::new(base, required))?;

        // Pass 2: SQL.
        if let Some(condition) = query.condition() {
            let criteria = self.restrict(&loaded.bindings, |binding| {
                self.emit(condition, binding, alias, args)
            })?;
            loaded.select.filter(criteria);
        }

        match query {
            Query::Pick(pick) => {
                match &pick.order_by {
                    Some(order) => {
                        let segments = order.path.without_alias(alias);
                        let columns: Vec<_> = loaded
                            .bindings
                            .iter()
                            .flat_map(|b| paths::columns(self.schema, b, &segments))
                            .map(|c| c.column)
                            .collect();
                        if columns.is_empty() {
                            return Err(QueryError::unknown_attribute(
                                query.holder(),
                                order.path.to_string(),
                            ));
                        }
                        loaded.select.order(OrderBy {
                            columns,
                            descending: order.descending,
                        });
                    }
                    None => loaded.select.order(OrderBy::asc(loaded.root_primary_key.clone())),
                }
                loaded.select.limit = self.paging(pick.limit.as_ref(), args)?;
                loaded.select.offset = self.paging(pick.offset.as_ref(), args)?;
            }
            Query::Count(_) => loaded.select.count = true,
        }

        debug!(holder = query.holder(), count, "query compiled");
        Ok(CompiledQuery {
            select: loaded.select,
            bindings: loaded.bindings,
            count,
        })
    }

    // ==================== Shared ====================

    pub(crate) fn holder(&self, name: &str) -> QueryResult<HolderId> {
        self.schema
            .holder_id(name)
            .ok_or_else(|| QueryError::unknown_holder(name))
    }

    pub(crate) fn prepare(
        &self,
        holder: HolderId,
        loaded: WithRequired<LoadingMode>,
    ) -> QueryResult<LoadedSelect> {
        LoadingIterator::new(self.schema, self.registry, &loaded).for_holder(holder)
    }

    /// Apply `predicate` to every root binding. Several bindings mean a
    /// polymorphic root: each predicate is guarded by its binding's key.
    pub(crate) fn restrict(
        &self,
        bindings: &[MappingBinding],
        predicate: impl Fn(&MappingBinding) -> QueryResult<Criteria>,
    ) -> QueryResult<Criteria> {
        match bindings {
            [] => Ok(Criteria::False),
            [single] => predicate(single),
            _ => {
                let mut alternatives = Vec::with_capacity(bindings.len());
                for binding in bindings {
                    alternatives.push(Criteria::And(vec![
                        Criteria::IsNotNull(binding.primary_key_column.clone()),
                        predicate(binding)?,
                    ]));
                }
                Ok(Criteria::Or(alternatives))
            }
        }
    }

    /// Encode a comparison value for the column it is compared with.
    pub(crate) fn encode(&self, target: &PathColumn, value: &Value) -> QueryResult<Value> {
        match target.attribute {
            Some(attr) => {
                let def = self.schema.attribute(attr);
                Ok(mediator::encode(def, value, self.crypto)?)
            }
            None => Ok(Value::from(value.to_key().map_err(tessera_sql::SqlError::from)?)),
        }
    }

    // ==================== Pass 1 ====================

    fn collect_paths(
        &self,
        statement: &BooleanStatement,
        holder: HolderId,
        alias: Option<&str>,
        out: &mut BTreeSet<String>,
    ) -> QueryResult<()> {
        match statement {
            BooleanStatement::And(items) | BooleanStatement::Or(items) => {
                for item in items {
                    self.collect_paths(item, holder, alias, out)?;
                }
                Ok(())
            }
            BooleanStatement::Wrap(inner) => self.collect_paths(inner, holder, alias, out),
            BooleanStatement::Compare { path, .. } | BooleanStatement::InRange { path, .. } => {
                self.require(path, holder, alias, out)
            }
            BooleanStatement::Typed {
                path, type_name, ..
            } => {
                self.holder(type_name)?;
                self.require(path, holder, alias, out)
            }
        }
    }

    fn require(
        &self,
        path: &AttributePath,
        holder: HolderId,
        alias: Option<&str>,
        out: &mut BTreeSet<String>,
    ) -> QueryResult<()> {
        let segments = path.without_alias(alias);
        paths::validate(self.schema, holder, &segments)?;
        if !segments.is_empty() {
            out.insert(segments.join("."));
        }
        Ok(())
    }

    // ==================== Pass 2 ====================

    fn emit(
        &self,
        statement: &BooleanStatement,
        binding: &MappingBinding,
        alias: Option<&str>,
        args: &[Value],
    ) -> QueryResult<Criteria> {
        match statement {
            BooleanStatement::And(items) => Ok(Criteria::And(
                items
                    .iter()
                    .map(|item| self.emit(item, binding, alias, args))
                    .collect::<QueryResult<_>>()?,
            )),
            BooleanStatement::Or(items) => Ok(Criteria::Or(
                items
                    .iter()
                    .map(|item| self.emit(item, binding, alias, args))
                    .collect::<QueryResult<_>>()?,
            )),
            BooleanStatement::Wrap(inner) => {
                Ok(Criteria::wrap(self.emit(inner, binding, alias, args)?))
            }
            BooleanStatement::Compare {
                path, op, value, ..
            } => {
                let value = operand(value, args)?;
                let op = compare_op(*op);
                if value.is_null() && op != CompareOp::Eq {
                    return Err(QueryError::NullOrdering {
                        path: path.to_string(),
                        op: op.sql(),
                    });
                }
                let mut matches = Vec::new();
                for target in paths::columns(self.schema, binding, &path.without_alias(alias)) {
                    matches.push(target.guard(Criteria::Compare {
                        value: self.encode(&target, &value)?,
                        column: target.column.clone(),
                        op,
                    }));
                }
                Ok(any_of(matches))
            }
            BooleanStatement::InRange {
                path, low, high, ..
            } => {
                let low = operand(low, args)?;
                let high = operand(high, args)?;
                let mut matches = Vec::new();
                for target in paths::columns(self.schema, binding, &path.without_alias(alias)) {
                    matches.push(target.guard(Criteria::Range {
                        low: self.encode(&target, &low)?,
                        high: self.encode(&target, &high)?,
                        column: target.column.clone(),
                    }));
                }
                Ok(any_of(matches))
            }
            BooleanStatement::Typed {
                path, type_name, ..
            } => {
                let ty = self.holder(type_name)?;
                let matches = paths::records(self.schema, binding, &path.without_alias(alias))
                    .into_iter()
                    .filter(|record| self.schema.is_a(record.holder, ty))
                    .map(|record| Criteria::IsNotNull(record.primary_key_column.clone()))
                    .collect();
                Ok(any_of(matches))
            }
        }
    }

    fn paging(&self, operand_ref: Option<&Operand>, args: &[Value]) -> QueryResult<Option<u64>> {
        let Some(op) = operand_ref else {
            return Ok(None);
        };
        let value = operand(op, args)?;
        match value.as_int() {
            Some(n) if n >= 0 => Ok(Some(n as u64)),
            _ => Err(QueryError::InvalidPaging {
                value: value.to_string(),
            }),
        }
    }
}

/// One criteria over the alternatives; none never matches.
pub(crate) fn any_of(mut items: Vec<Criteria>) -> Criteria {
    match items.len() {
        0 => Criteria::False,
        1 => items.remove(0),
        _ => Criteria::wrap(Criteria::Or(items)),
    }
}

fn operand(operand: &Operand, args: &[Value]) -> QueryResult<Value> {
    match operand {
        Operand::Argument(index) => args.get(*index).cloned().ok_or(QueryError::MissingArgument {
            index: *index,
            given: args.len(),
        }),
        Operand::Literal(literal) => Ok(match literal {
            Literal::Null => Value::Null,
            Literal::Bool(b) => Value::Bool(*b),
            Literal::Int(i) => Value::Int(*i),
            Literal::Float(f) => Value::Decimal(*f),
            Literal::String(s) => Value::String(s.clone()),
        }),
    }
}

fn compare_op(op: CompareOperator) -> CompareOp {
    match op {
        CompareOperator::Eq => CompareOp::Eq,
        CompareOperator::Lt => CompareOp::Lt,
        CompareOperator::LtEq => CompareOp::LtEq,
        CompareOperator::Gt => CompareOp::Gt,
        CompareOperator::GtEq => CompareOp::GtEq,
    }
}
