//! The loading iterator: one walk builds a SELECT and its binding tree.

use crate::{
    AliasBinding, ColumnDecision, CyclePolicy, GraphWalker, LoadedAttributes, Loading,
    MappingBinding, QueryError, QueryResult, Via, WalkContext, WalkOutcome, WalkVisitor,
};
use std::collections::HashMap;
use tessera_core::{AttributeRef, HolderId};
use tessera_registry::{AttributeColumn, Table, TableId, TableKind, TableRegistry};
use tessera_schema::Schema;
use tessera_sql::{ColumnRef, Join, Select};
use tracing::debug;

/// A SELECT with the bindings that decode its rows.
#[derive(Debug, Clone)]
pub struct LoadedSelect {
    pub select: Select,
    /// One binding per concrete table under the root, in link order.
    pub bindings: Vec<MappingBinding>,
    /// Primary key of the root table.
    pub root_primary_key: ColumnRef,
}

/// Builds reads of a table and everything the loading strategy pulls in.
pub struct LoadingIterator<'a> {
    schema: &'a Schema,
    registry: &'a TableRegistry,
    loaded: &'a dyn LoadedAttributes,
}

impl<'a> LoadingIterator<'a> {
    pub fn new(
        schema: &'a Schema,
        registry: &'a TableRegistry,
        loaded: &'a dyn LoadedAttributes,
    ) -> Self {
        Self {
            schema,
            registry,
            loaded,
        }
    }

    /// Read through the table representing `holder`.
    pub fn for_holder(&self, holder: HolderId) -> QueryResult<LoadedSelect> {
        let table = self
            .registry
            .representative(holder)
            .ok_or_else(|| QueryError::unmapped(self.schema.holder_name(holder)))?;
        self.build(table.id)
    }

    pub fn build(&self, root: TableId) -> QueryResult<LoadedSelect> {
        let mut builder = Builder {
            schema: self.schema,
            registry: self.registry,
            loaded: self.loaded,
            select: None,
            root_primary_key: None,
            frames: Vec::new(),
            roots: Vec::new(),
            tables: 0,
            columns: 0,
        };

        let walker = GraphWalker::new(self.schema, self.registry);
        if walker.walk(root, &mut builder) == WalkOutcome::Aborted {
            return Err(QueryError::Aborted {
                path: self.registry.table(root).name.clone(),
            });
        }

        let (Some(select), Some(root_primary_key)) = (builder.select, builder.root_primary_key) else {
            return Err(QueryError::Aborted {
                path: self.registry.table(root).name.clone(),
            });
        };
        debug!(
            table = %self.registry.table(root).name,
            joins = select.joins.len(),
            columns = select.columns.len(),
            "read built"
        );
        Ok(LoadedSelect {
            select,
            bindings: builder.roots,
            root_primary_key,
        })
    }
}

enum FrameKind {
    Join { holder: HolderId, primary_key: String },
    Type(MappingBinding),
    Opaque,
}

struct Frame {
    alias: String,
    /// Reference attribute whose target this table belongs to.
    level: Option<AttributeRef>,
    kind: FrameKind,
}

struct Builder<'a> {
    schema: &'a Schema,
    registry: &'a TableRegistry,
    loaded: &'a dyn LoadedAttributes,
    select: Option<Select>,
    root_primary_key: Option<ColumnRef>,
    frames: Vec<Frame>,
    roots: Vec<MappingBinding>,
    tables: usize,
    columns: usize,
}

impl Builder<'_> {
    fn next_column(&mut self) -> String {
        let alias = format!("c{}", self.columns);
        self.columns += 1;
        alias
    }

    fn select_column(&mut self, column: ColumnRef) -> String {
        let alias = self.next_column();
        if let Some(select) = self.select.as_mut() {
            select.column(column, alias.clone());
        }
        alias
    }

    fn left_join(&mut self, table: &Table, alias: &str, left: ColumnRef, right: ColumnRef) {
        if let Some(select) = self.select.as_mut() {
            select.left_join(Join {
                table: table.name.clone(),
                alias: alias.to_string(),
                left,
                right,
            });
        }
    }

    fn current_binding(&mut self) -> Option<&mut MappingBinding> {
        self.frames.iter_mut().rev().find_map(|f| match &mut f.kind {
            FrameKind::Type(binding) => Some(binding),
            _ => None,
        })
    }

    /// Join-table keys of the current reference level, outermost first.
    fn level_join_keys(&self) -> Vec<(HolderId, String)> {
        let mut keys: Vec<(HolderId, String)> = self
            .frames
            .iter()
            .rev()
            .map_while(|f| match &f.kind {
                FrameKind::Join {
                    holder,
                    primary_key,
                } => Some((*holder, primary_key.clone())),
                _ => None,
            })
            .collect();
        keys.reverse();
        keys
    }
}

impl WalkVisitor for Builder<'_> {
    fn enter_table(&mut self, table: &Table, via: Via, _ctx: &WalkContext<'_>) {
        let alias = format!("t{}", self.tables);
        self.tables += 1;
        let primary_key_column = ColumnRef::new(&alias, &table.primary_key().name);

        let level = match via {
            Via::Root => {
                self.select = Some(Select::new(&table.name, &alias));
                self.root_primary_key = Some(primary_key_column.clone());
                None
            }
            Via::Joined { join } => {
                let parent = self.frames.last().map(|f| (f.alias.clone(), f.level));
                let joined = self.registry.table(join).joined_column(table.id);
                if let (Some((parent_alias, _)), Some(column)) = (&parent, joined) {
                    let left = ColumnRef::new(parent_alias, &column.name);
                    self.left_join(table, &alias, left, primary_key_column.clone());
                }
                parent.and_then(|(_, level)| level)
            }
            Via::Reference { from, attribute } => {
                let owner_alias = self.frames.last().map(|f| f.alias.clone());
                let column = self.registry.table(from).attribute_column(attribute);
                if let (Some(owner_alias), Some(column)) = (owner_alias, column) {
                    let left = ColumnRef::new(owner_alias, &column.name);
                    self.left_join(table, &alias, left, primary_key_column.clone());
                }
                if let Some(owner) = self.current_binding() {
                    if let Some(binding) = owner.attributes.iter_mut().find(|a| a.attribute == attribute) {
                        binding.lazy = false;
                    }
                    owner.references.entry(attribute).or_default();
                }
                Some(attribute)
            }
        };

        let primary_key = self.select_column(primary_key_column.clone());
        let kind = match table.kind {
            TableKind::Join(holder) => FrameKind::Join {
                holder,
                primary_key,
            },
            TableKind::Type(holder) => FrameKind::Type(MappingBinding {
                holder,
                table: table.id,
                primary_key_column,
                primary_key,
                attributes: Vec::new(),
                references: HashMap::new(),
                join_keys: self.level_join_keys(),
            }),
            TableKind::UniqueConstraint(_) => FrameKind::Opaque,
        };
        self.frames.push(Frame { alias, level, kind });
    }

    fn column(&mut self, _table: &Table, column: &AttributeColumn, ctx: &WalkContext<'_>) -> ColumnDecision {
        let Some(attribute) = column.attribute() else {
            return ColumnDecision::Skip;
        };
        let def = self.schema.attribute(attribute);
        let strategy = self.loaded.strategy(def, &ctx.path_to(attribute));
        if strategy == Loading::NotLoaded {
            return ColumnDecision::Skip;
        }
        let is_reference = def.kind.is_reference();

        let Some(table_alias) = self.frames.last().map(|f| f.alias.clone()) else {
            return ColumnDecision::Skip;
        };
        let column_ref = ColumnRef::new(table_alias, &column.name);
        let alias = self.select_column(column_ref.clone());
        if let Some(binding) = self.current_binding() {
            binding.attributes.push(AliasBinding {
                attribute,
                column: column_ref,
                alias,
                // Cleared when the walker enters the target.
                lazy: is_reference,
            });
        }

        if strategy == Loading::Loaded && is_reference {
            ColumnDecision::Follow
        } else {
            ColumnDecision::Select
        }
    }

    fn cycle(&mut self, _table: &Table, column: &AttributeColumn, ctx: &WalkContext<'_>) -> CyclePolicy {
        match column.attribute() {
            Some(attribute) if self.loaded.requires_beneath(&ctx.path_to(attribute)) => {
                CyclePolicy::Continue
            }
            _ => CyclePolicy::Skip,
        }
    }

    fn exit_table(&mut self, _table: &Table, _ctx: &WalkContext<'_>) {
        let Some(frame) = self.frames.pop() else {
            return;
        };
        let FrameKind::Type(binding) = frame.kind else {
            return;
        };
        match frame.level {
            None => self.roots.push(binding),
            Some(attribute) => {
                if let Some(owner) = self.current_binding() {
                    owner.references.entry(attribute).or_default().push(binding);
                }
            }
        }
    }
}
