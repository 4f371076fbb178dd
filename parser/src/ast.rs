//! Abstract Syntax Tree types for nquery.

use std::fmt;

/// Source location for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub column: usize,
}

impl Span {
    pub fn new(start: usize, end: usize, line: usize, column: usize) -> Self {
        Self {
            start,
            end,
            line,
            column,
        }
    }
}

/// A parsed nquery statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    Pick(PickQuery),
    Count(CountQuery),
}

impl Query {
    /// Name of the queried holder.
    pub fn holder(&self) -> &str {
        match self {
            Query::Pick(q) => &q.holder,
            Query::Count(q) => &q.holder,
        }
    }

    pub fn alias(&self) -> Option<&str> {
        match self {
            Query::Pick(q) => q.alias.as_deref(),
            Query::Count(q) => q.alias.as_deref(),
        }
    }

    pub fn condition(&self) -> Option<&BooleanStatement> {
        match self {
            Query::Pick(q) => q.condition.as_ref(),
            Query::Count(q) => q.condition.as_ref(),
        }
    }

    /// Number of `?` placeholders; arguments bind to them in textual order.
    pub fn argument_count(&self) -> usize {
        let mut count = 0;
        let mut visit = |operand: &Operand| {
            if let Operand::Argument(i) = operand {
                count = count.max(i + 1);
            }
        };
        if let Some(condition) = self.condition() {
            condition.for_each_operand(&mut visit);
        }
        if let Query::Pick(q) = self {
            q.limit.iter().chain(q.offset.iter()).for_each(&mut visit);
        }
        count
    }
}

// ==================== PICK / COUNT ====================

/// `PICK` statement: select records of a holder.
#[derive(Debug, Clone, PartialEq)]
pub struct PickQuery {
    pub holder: String,
    pub alias: Option<String>,
    pub condition: Option<BooleanStatement>,
    pub order_by: Option<OrderTerm>,
    pub limit: Option<Operand>,
    pub offset: Option<Operand>,
    pub span: Span,
}

/// `COUNT` statement: count records of a holder.
#[derive(Debug, Clone, PartialEq)]
pub struct CountQuery {
    pub holder: String,
    pub alias: Option<String>,
    pub condition: Option<BooleanStatement>,
    pub span: Span,
}

/// ORDER BY term.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderTerm {
    pub path: AttributePath,
    pub descending: bool,
}

// ==================== CONDITIONS ====================

/// A boolean condition tree. AND/OR chains are flattened; parentheses are
/// kept as `Wrap` so the emitted SQL nests exactly like the source.
#[derive(Debug, Clone, PartialEq)]
pub enum BooleanStatement {
    And(Vec<BooleanStatement>),
    Or(Vec<BooleanStatement>),
    Wrap(Box<BooleanStatement>),
    Compare {
        path: AttributePath,
        op: CompareOperator,
        value: Operand,
        span: Span,
    },
    /// `path INRANGE (low, high)`, bounds inclusive.
    InRange {
        path: AttributePath,
        low: Operand,
        high: Operand,
        span: Span,
    },
    /// `path TYPED Type`: the record at `path` is a `Type`.
    Typed {
        path: AttributePath,
        type_name: String,
        span: Span,
    },
}

impl BooleanStatement {
    /// Visit operands in textual order.
    pub fn for_each_operand(&self, visit: &mut impl FnMut(&Operand)) {
        match self {
            BooleanStatement::And(items) | BooleanStatement::Or(items) => {
                for item in items {
                    item.for_each_operand(visit);
                }
            }
            BooleanStatement::Wrap(inner) => inner.for_each_operand(visit),
            BooleanStatement::Compare { value, .. } => visit(value),
            BooleanStatement::InRange { low, high, .. } => {
                visit(low);
                visit(high);
            }
            BooleanStatement::Typed { .. } => {}
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOperator {
    Eq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

impl fmt::Display for CompareOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CompareOperator::Eq => "=",
            CompareOperator::Lt => "<",
            CompareOperator::LtEq => "<=",
            CompareOperator::Gt => ">",
            CompareOperator::GtEq => ">=",
        };
        write!(f, "{}", s)
    }
}

/// A value position: a numbered `?` placeholder or an inline literal.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Argument(usize),
    Literal(Literal),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

/// Dotted attribute path, e.g. `p.child.name`.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributePath {
    pub segments: Vec<String>,
    pub span: Span,
}

impl AttributePath {
    /// Drop a leading alias segment.
    pub fn without_alias(&self, alias: Option<&str>) -> Vec<&str> {
        let mut segments: Vec<&str> = self.segments.iter().map(String::as_str).collect();
        if alias.is_some_and(|a| segments.first() == Some(&a)) {
            segments.remove(0);
        }
        segments
    }
}

impl fmt::Display for AttributePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}
