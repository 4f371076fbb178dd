//! Tessera Query
//!
//! Turn reads into SQL and rows back into records.
//!
//! Responsibilities:
//! - Walk the join-table tree and the reference graph of a mapped schema
//!   with cycle detection (`GraphWalker`)
//! - Build a SELECT plus the `MappingBinding` tree that decodes its rows,
//!   driven by a per-path loading strategy (`LoadingIterator`)
//! - Compile nquery statements and query-by-example trees into the same
//!   primitives
//! - Decode result rows into record trees

mod binding;
mod compiler;
mod decode;
mod error;
mod example;
mod iterator;
mod loading;
mod paths;
mod walker;

pub use binding::{AliasBinding, MappingBinding};
pub use compiler::{CompiledQuery, QueryCompiler};
pub use decode::{decode_row, DecodedRecord, DecodedValue};
pub use error::{QueryError, QueryResult};
pub use example::{Example, ExampleValue};
pub use iterator::{LoadedSelect, LoadingIterator};
pub use loading::{LoadedAttributes, Loading, LoadingMode, WithRequired};
pub use walker::{ColumnDecision, CyclePolicy, GraphWalker, Step, Via, WalkContext, WalkOutcome, WalkVisitor};
