//! Tessera Parser
//!
//! This crate parses nquery text:
//! - `PICK <Holder> [alias] [IF <condition>] [ORDER BY <path> [ASC|DESC]] [LIMIT n] [OFFSET n]`
//! - `COUNT <Holder> [alias] [IF <condition>]`
//! - Conditions: comparisons, `INRANGE`, `TYPED`, AND/OR and parentheses
//! - Error handling with location information

mod ast;
mod error;
mod lexer;
mod parser;

pub use ast::*;
pub use error::*;
pub use parser::{parse_query, Parser};
