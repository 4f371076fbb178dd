//! Hierarchy / column graph walker.
//!
//! One depth-first traversal over the join-table tree and the reference
//! graph of a mapped schema. The walk is an explicit task stack, so depth
//! is bounded by the heap rather than the call stack; callers plug in a
//! `WalkVisitor` to decide which columns matter and how cycles are broken.

use tessera_core::AttributeRef;
use tessera_registry::{AttributeColumn, Table, TableId, TableRegistry};
use tessera_schema::Schema;
use tracing::trace;

/// How a table was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Via {
    /// The table the walk started from.
    Root,
    /// A table unioned by the join table `join`.
    Joined { join: TableId },
    /// The target of reference `attribute` on the type table `from`.
    Reference { from: TableId, attribute: AttributeRef },
}

/// A visitor's verdict on one attribute column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnDecision {
    /// Keep the column and, for references, walk into the target.
    Follow,
    /// Keep the column only.
    Select,
    /// Ignore the column.
    Skip,
}

/// What to do when a reference would re-enter an attribute already on the
/// ownership stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePolicy {
    Continue,
    Skip,
    Abort,
}

/// One entry of the full stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Synthetic primary-key step for an entered table.
    PrimaryKey(TableId),
    /// A followed reference attribute.
    Attribute(AttributeRef),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkOutcome {
    Completed,
    Aborted,
}

/// Stacks exposed to visitors while walking.
#[derive(Debug)]
pub struct WalkContext<'s> {
    schema: &'s Schema,
    domain: Vec<AttributeRef>,
    full: Vec<Step>,
}

impl<'s> WalkContext<'s> {
    fn new(schema: &'s Schema) -> Self {
        Self {
            schema,
            domain: Vec::new(),
            full: Vec::new(),
        }
    }

    /// Followed reference attributes, outermost first.
    pub fn domain_stack(&self) -> &[AttributeRef] {
        &self.domain
    }

    /// Followed references interleaved with primary-key steps.
    pub fn full_stack(&self) -> &[Step] {
        &self.full
    }

    /// Dotted path of the followed references.
    pub fn domain_path(&self) -> String {
        self.domain
            .iter()
            .map(|a| self.schema.attribute(*a).name.as_str())
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Dotted path of `attr` seen from the current table.
    pub fn path_to(&self, attr: AttributeRef) -> String {
        let name = &self.schema.attribute(attr).name;
        if self.domain.is_empty() {
            name.clone()
        } else {
            format!("{}.{}", self.domain_path(), name)
        }
    }

    pub fn on_stack(&self, attr: AttributeRef) -> bool {
        self.domain.contains(&attr)
    }
}

/// Callbacks driven by `GraphWalker::walk`.
pub trait WalkVisitor {
    fn enter_table(&mut self, table: &Table, via: Via, ctx: &WalkContext<'_>);

    /// Called for every non-key column of a type table, in column order.
    fn column(&mut self, table: &Table, column: &AttributeColumn, ctx: &WalkContext<'_>)
        -> ColumnDecision;

    fn cycle(&mut self, _table: &Table, _column: &AttributeColumn, _ctx: &WalkContext<'_>) -> CyclePolicy {
        CyclePolicy::Skip
    }

    fn exit_table(&mut self, _table: &Table, _ctx: &WalkContext<'_>) {}
}

enum Task {
    Enter { table: TableId, via: Via },
    Column { table: TableId, index: usize },
    Exit { table: TableId, via: Via },
}

/// Depth-first walker over a table registry.
pub struct GraphWalker<'a> {
    schema: &'a Schema,
    registry: &'a TableRegistry,
    follow_attributes: bool,
}

impl<'a> GraphWalker<'a> {
    pub fn new(schema: &'a Schema, registry: &'a TableRegistry) -> Self {
        Self {
            schema,
            registry,
            follow_attributes: true,
        }
    }

    /// Walk into reference targets (on by default).
    pub fn follow_attributes(mut self, enabled: bool) -> Self {
        self.follow_attributes = enabled;
        self
    }

    pub fn walk(&self, root: TableId, visitor: &mut dyn WalkVisitor) -> WalkOutcome {
        let mut ctx = WalkContext::new(self.schema);
        let mut tasks = vec![Task::Enter {
            table: root,
            via: Via::Root,
        }];

        while let Some(task) = tasks.pop() {
            match task {
                Task::Enter { table, via } => {
                    let t = self.registry.table(table);
                    ctx.full.push(Step::PrimaryKey(table));
                    visitor.enter_table(t, via, &ctx);

                    tasks.push(Task::Exit { table, via });
                    if t.is_join_table() {
                        for &joined in t.joined.iter().rev() {
                            tasks.push(Task::Enter {
                                table: joined,
                                via: Via::Joined { join: table },
                            });
                        }
                    } else {
                        for index in (1..t.columns.len()).rev() {
                            tasks.push(Task::Column { table, index });
                        }
                    }
                }
                Task::Column { table, index } => {
                    let t = self.registry.table(table);
                    let column = &t.columns[index];
                    let decision = visitor.column(t, column, &ctx);
                    if decision != ColumnDecision::Follow || !self.follow_attributes {
                        continue;
                    }
                    let Some((attribute, target)) = self.followable(column) else {
                        continue;
                    };

                    if ctx.on_stack(attribute) {
                        match visitor.cycle(t, column, &ctx) {
                            CyclePolicy::Continue => {
                                trace!(path = %ctx.path_to(attribute), "cycle continued");
                            }
                            CyclePolicy::Skip => continue,
                            CyclePolicy::Abort => return WalkOutcome::Aborted,
                        }
                    }

                    ctx.domain.push(attribute);
                    ctx.full.push(Step::Attribute(attribute));
                    tasks.push(Task::Enter {
                        table: target,
                        via: Via::Reference {
                            from: table,
                            attribute,
                        },
                    });
                }
                Task::Exit { table, via } => {
                    visitor.exit_table(self.registry.table(table), &ctx);
                    ctx.full.pop();
                    if matches!(via, Via::Reference { .. }) {
                        ctx.domain.pop();
                        ctx.full.pop();
                    }
                }
            }
        }
        WalkOutcome::Completed
    }

    /// A non-virtual reference to a used, non-virtual holder with a table.
    fn followable(&self, column: &AttributeColumn) -> Option<(AttributeRef, TableId)> {
        let attribute = column.attribute()?;
        let def = self.schema.attribute(attribute);
        let target = def.kind.reference_target()?;
        if def.is_virtual || self.schema.holder(target).is_virtual() || !self.schema.is_used(target) {
            return None;
        }
        Some((attribute, column.references?))
    }
}
