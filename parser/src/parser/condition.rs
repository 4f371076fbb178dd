//! Condition parsing: OR / AND chains, predicates, paths and operands.

use super::Parser;
use crate::ast::*;
use crate::error::ParseResult;
use crate::lexer::TokenKind;

impl Parser {
    pub(crate) fn parse_condition(&mut self) -> ParseResult<BooleanStatement> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> ParseResult<BooleanStatement> {
        let first = self.parse_and()?;
        if !self.check(&TokenKind::Or) {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.eat(&TokenKind::Or) {
            items.push(self.parse_and()?);
        }
        Ok(BooleanStatement::Or(items))
    }

    fn parse_and(&mut self) -> ParseResult<BooleanStatement> {
        let first = self.parse_primary()?;
        if !self.check(&TokenKind::And) {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.eat(&TokenKind::And) {
            items.push(self.parse_primary()?);
        }
        Ok(BooleanStatement::And(items))
    }

    fn parse_primary(&mut self) -> ParseResult<BooleanStatement> {
        if self.eat(&TokenKind::LParen) {
            let inner = self.parse_condition()?;
            self.expect(&TokenKind::RParen)?;
            return Ok(BooleanStatement::Wrap(Box::new(inner)));
        }

        let start = self.peek().span;
        let path = self.parse_path()?;

        match self.peek().kind {
            TokenKind::InRange => {
                self.advance();
                self.expect(&TokenKind::LParen)?;
                let low = self.parse_operand()?;
                self.expect(&TokenKind::Comma)?;
                let high = self.parse_operand()?;
                self.expect(&TokenKind::RParen)?;
                Ok(BooleanStatement::InRange {
                    path,
                    low,
                    high,
                    span: self.span_from(start),
                })
            }
            TokenKind::Typed => {
                self.advance();
                let type_name = self.expect_ident()?;
                Ok(BooleanStatement::Typed {
                    path,
                    type_name,
                    span: self.span_from(start),
                })
            }
            _ => {
                let op = self.parse_compare_operator()?;
                let value = self.parse_operand()?;
                Ok(BooleanStatement::Compare {
                    path,
                    op,
                    value,
                    span: self.span_from(start),
                })
            }
        }
    }

    fn parse_compare_operator(&mut self) -> ParseResult<CompareOperator> {
        let op = match self.peek().kind {
            TokenKind::Eq => CompareOperator::Eq,
            TokenKind::Lt => CompareOperator::Lt,
            TokenKind::LtEq => CompareOperator::LtEq,
            TokenKind::Gt => CompareOperator::Gt,
            TokenKind::GtEq => CompareOperator::GtEq,
            _ => return Err(self.unexpected("comparison operator")),
        };
        self.advance();
        Ok(op)
    }

    /// `name(.name)*`; segments after a dot may be keywords.
    pub(crate) fn parse_path(&mut self) -> ParseResult<AttributePath> {
        let start = self.peek().span;
        let mut segments = vec![self.expect_ident()?];
        while self.eat(&TokenKind::Dot) {
            segments.push(self.expect_name()?);
        }
        Ok(AttributePath {
            segments,
            span: self.span_from(start),
        })
    }

    pub(crate) fn parse_operand(&mut self) -> ParseResult<Operand> {
        let token = self.peek().clone();
        let literal = match token.kind {
            TokenKind::Question => {
                self.advance();
                return Ok(Operand::Argument(self.next_argument()));
            }
            TokenKind::Minus => {
                self.advance();
                match self.peek().kind {
                    TokenKind::Int(n) => Literal::Int(-n),
                    TokenKind::Float(f) => Literal::Float(-f),
                    _ => return Err(self.unexpected("number")),
                }
            }
            TokenKind::Int(n) => Literal::Int(n),
            TokenKind::Float(f) => Literal::Float(f),
            TokenKind::String(s) => Literal::String(s),
            TokenKind::True => Literal::Bool(true),
            TokenKind::False => Literal::Bool(false),
            TokenKind::Null => Literal::Null,
            _ => return Err(self.unexpected("value")),
        };
        self.advance();
        Ok(Operand::Literal(literal))
    }
}
