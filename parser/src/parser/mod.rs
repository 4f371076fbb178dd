//! Parser for nquery text.
//!
//! - `query`: PICK / COUNT statements and their clauses
//! - `condition`: boolean conditions, paths and operands

mod condition;
mod query;

use crate::ast::*;
use crate::error::{ParseError, ParseResult};
use crate::lexer::{Lexer, Token, TokenKind};

// ==================== PARSER STATE ====================

/// Parser state.
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    /// Returned by `peek` past the end of `tokens`.
    eof: Token,
    /// Next `?` placeholder number.
    next_argument: usize,
}

impl Parser {
    /// Create a new parser from source text.
    pub fn new(input: &str) -> ParseResult<Self> {
        let tokens = Lexer::new(input).tokenize()?;
        let eof = tokens
            .last()
            .cloned()
            .unwrap_or_else(|| Token::eof(input.len(), 1, 1));
        Ok(Self {
            tokens,
            pos: 0,
            eof,
            next_argument: 0,
        })
    }
}

// ==================== TOKEN HELPERS ====================

impl Parser {
    pub(crate) fn peek(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&self.eof)
    }

    pub(crate) fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    pub(crate) fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.peek().kind) == std::mem::discriminant(kind)
    }

    /// Consume the next token if it has the given kind.
    pub(crate) fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(crate) fn expect(&mut self, kind: &TokenKind) -> ParseResult<Token> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(kind.name()))
        }
    }

    pub(crate) fn expect_ident(&mut self) -> ParseResult<String> {
        match self.peek().kind.clone() {
            TokenKind::Ident(name) => {
                self.advance();
                Ok(name)
            }
            _ => Err(self.unexpected("identifier")),
        }
    }

    /// Expect an identifier or a keyword that can be used as a name.
    /// Lets attributes be called `order`, `count` and so on after a dot.
    pub(crate) fn expect_name(&mut self) -> ParseResult<String> {
        let token = self.peek().clone();
        let name = match &token.kind {
            TokenKind::Ident(name) => name.clone(),
            kind if kind.is_keyword() => kind.name().to_lowercase(),
            _ => return Err(self.unexpected("name")),
        };
        self.advance();
        Ok(name)
    }

    pub(crate) fn unexpected(&self, expected: &str) -> ParseError {
        let token = self.peek();
        ParseError::unexpected(token.span, expected, token.kind.name())
    }

    pub(crate) fn span_from(&self, start: Span) -> Span {
        let end_token = if self.pos > 0 {
            &self.tokens[self.pos - 1]
        } else {
            self.peek()
        };
        Span::new(start.start, end_token.span.end, start.line, start.column)
    }

    pub(crate) fn next_argument(&mut self) -> usize {
        let n = self.next_argument;
        self.next_argument += 1;
        n
    }
}

// ==================== PUBLIC API ====================

/// Parse one nquery statement.
pub fn parse_query(input: &str) -> ParseResult<Query> {
    let mut parser = Parser::new(input)?;
    let query = parser.parse_query()?;
    if !parser.check(&TokenKind::Eof) {
        return Err(parser.unexpected("end of input"));
    }
    Ok(query)
}

// ==================== TESTS ====================
