//! PICK / COUNT statement parsing.

use super::Parser;
use crate::ast::*;
use crate::error::ParseResult;
use crate::lexer::TokenKind;

impl Parser {
    pub(crate) fn parse_query(&mut self) -> ParseResult<Query> {
        match self.peek().kind {
            TokenKind::Pick => self.parse_pick().map(Query::Pick),
            TokenKind::Count => self.parse_count().map(Query::Count),
            _ => Err(self.unexpected("PICK or COUNT")),
        }
    }

    fn parse_pick(&mut self) -> ParseResult<PickQuery> {
        let start = self.expect(&TokenKind::Pick)?.span;
        let holder = self.expect_ident()?;
        let alias = self.parse_alias()?;
        let condition = self.parse_if()?;

        let order_by = if self.eat(&TokenKind::Order) {
            self.expect(&TokenKind::By)?;
            let path = self.parse_path()?;
            let descending = if self.eat(&TokenKind::Desc) {
                true
            } else {
                self.eat(&TokenKind::Asc);
                false
            };
            Some(OrderTerm { path, descending })
        } else {
            None
        };

        let limit = if self.eat(&TokenKind::Limit) {
            Some(self.parse_operand()?)
        } else {
            None
        };
        let offset = if self.eat(&TokenKind::Offset) {
            Some(self.parse_operand()?)
        } else {
            None
        };

        Ok(PickQuery {
            holder,
            alias,
            condition,
            order_by,
            limit,
            offset,
            span: self.span_from(start),
        })
    }

    fn parse_count(&mut self) -> ParseResult<CountQuery> {
        let start = self.expect(&TokenKind::Count)?.span;
        let holder = self.expect_ident()?;
        let alias = self.parse_alias()?;
        let condition = self.parse_if()?;

        Ok(CountQuery {
            holder,
            alias,
            condition,
            span: self.span_from(start),
        })
    }

    fn parse_alias(&mut self) -> ParseResult<Option<String>> {
        if self.check(&TokenKind::Ident(String::new())) {
            Ok(Some(self.expect_ident()?))
        } else {
            Ok(None)
        }
    }

    fn parse_if(&mut self) -> ParseResult<Option<BooleanStatement>> {
        if self.eat(&TokenKind::If) {
            Ok(Some(self.parse_condition()?))
        } else {
            Ok(None)
        }
    }
}
