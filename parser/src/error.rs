//! nquery parse errors.

use crate::Span;
use thiserror::Error;

/// What went wrong while reading nquery text.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseErrorKind {
    #[error("expected {expected}, found {found}")]
    Unexpected { expected: String, found: String },

    #[error("unexpected character '{0}'")]
    Character(char),

    #[error("unterminated string literal")]
    UnterminatedString,

    #[error("invalid escape sequence '\\{0}'")]
    Escape(char),

    #[error("invalid number literal '{0}'")]
    Number(String),
}

/// A parse error and where in the text it occurred.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Parse error at line {}, column {}: {}", .span.line, .span.column, .kind)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub span: Span,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn unexpected(span: Span, expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::new(
            ParseErrorKind::Unexpected {
                expected: expected.into(),
                found: found.into(),
            },
            span,
        )
    }

    /// The token that was expected, for `Unexpected` errors.
    pub fn expected(&self) -> Option<&str> {
        match &self.kind {
            ParseErrorKind::Unexpected { expected, .. } => Some(expected),
            _ => None,
        }
    }

    /// The token found instead, for `Unexpected` errors.
    pub fn found(&self) -> Option<&str> {
        match &self.kind {
            ParseErrorKind::Unexpected { found, .. } => Some(found),
            _ => None,
        }
    }

    pub fn line(&self) -> usize {
        self.span.line
    }

    pub fn column(&self) -> usize {
        self.span.column
    }
}

pub type ParseResult<T> = Result<T, ParseError>;
