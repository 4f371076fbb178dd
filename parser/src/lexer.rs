//! Lexer (tokenizer) for nquery text.

use crate::{ParseError, ParseErrorKind, ParseResult, Span};

/// Token types.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Keywords (case-insensitive)
    Pick,
    Count,
    If,
    Order,
    By,
    Asc,
    Desc,
    Limit,
    Offset,
    And,
    Or,
    InRange,
    Typed,
    Null,
    True,
    False,

    // Literals
    Ident(String),
    Int(i64),
    Float(f64),
    String(String),

    // Symbols
    LParen,   // (
    RParen,   // )
    Comma,    // ,
    Dot,      // .
    Eq,       // =
    Lt,       // <
    LtEq,     // <=
    Gt,       // >
    GtEq,     // >=
    Minus,    // -
    Question, // ?

    // End of file
    Eof,
}

impl TokenKind {
    pub fn name(&self) -> &'static str {
        match self {
            TokenKind::Pick => "PICK",
            TokenKind::Count => "COUNT",
            TokenKind::If => "IF",
            TokenKind::Order => "ORDER",
            TokenKind::By => "BY",
            TokenKind::Asc => "ASC",
            TokenKind::Desc => "DESC",
            TokenKind::Limit => "LIMIT",
            TokenKind::Offset => "OFFSET",
            TokenKind::And => "AND",
            TokenKind::Or => "OR",
            TokenKind::InRange => "INRANGE",
            TokenKind::Typed => "TYPED",
            TokenKind::Null => "null",
            TokenKind::True => "true",
            TokenKind::False => "false",
            TokenKind::Ident(_) => "identifier",
            TokenKind::Int(_) => "integer",
            TokenKind::Float(_) => "float",
            TokenKind::String(_) => "string",
            TokenKind::LParen => "'('",
            TokenKind::RParen => "')'",
            TokenKind::Comma => "','",
            TokenKind::Dot => "'.'",
            TokenKind::Eq => "'='",
            TokenKind::Lt => "'<'",
            TokenKind::LtEq => "'<='",
            TokenKind::Gt => "'>'",
            TokenKind::GtEq => "'>='",
            TokenKind::Minus => "'-'",
            TokenKind::Question => "'?'",
            TokenKind::Eof => "end of input",
        }
    }

    /// Returns true for keywords, which double as names after a dot.
    pub fn is_keyword(&self) -> bool {
        KEYWORDS.iter().any(|(_, kind)| kind == self)
    }
}

/// Keywords, matched case-insensitively.
const KEYWORDS: &[(&str, TokenKind)] = &[
    ("PICK", TokenKind::Pick),
    ("COUNT", TokenKind::Count),
    ("IF", TokenKind::If),
    ("ORDER", TokenKind::Order),
    ("BY", TokenKind::By),
    ("ASC", TokenKind::Asc),
    ("DESC", TokenKind::Desc),
    ("LIMIT", TokenKind::Limit),
    ("OFFSET", TokenKind::Offset),
    ("AND", TokenKind::And),
    ("OR", TokenKind::Or),
    ("INRANGE", TokenKind::InRange),
    ("TYPED", TokenKind::Typed),
    ("NULL", TokenKind::Null),
    ("TRUE", TokenKind::True),
    ("FALSE", TokenKind::False),
];

fn keyword(word: &str) -> Option<TokenKind> {
    KEYWORDS
        .iter()
        .find(|(text, _)| text.eq_ignore_ascii_case(word))
        .map(|(_, kind)| kind.clone())
}

/// A token with its span.
#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn eof(offset: usize, line: usize, column: usize) -> Self {
        Self {
            kind: TokenKind::Eof,
            span: Span::new(offset, offset, line, column),
        }
    }
}

/// Splits nquery text into tokens, tracking byte offset, line and column.
pub struct Lexer<'a> {
    src: &'a str,
    offset: usize,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            src,
            offset: 0,
            line: 1,
            column: 1,
        }
    }

    /// Every token of the input, ending with `Eof`.
    pub fn tokenize(mut self) -> ParseResult<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            self.skip_trivia();
            let start = (self.offset, self.line, self.column);
            let kind = match self.bump() {
                None => TokenKind::Eof,
                Some(c) => self.scan(c, start)?,
            };
            let done = kind == TokenKind::Eof;
            tokens.push(Token {
                kind,
                span: self.span(start),
            });
            if done {
                return Ok(tokens);
            }
        }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.offset..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.offset += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn bump_if(&mut self, expected: char) -> bool {
        let hit = self.peek() == Some(expected);
        if hit {
            self.bump();
        }
        hit
    }

    /// Consume characters while `pred` holds and return them.
    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let from = self.offset;
        while self.peek().is_some_and(&pred) {
            self.bump();
        }
        &self.src[from..self.offset]
    }

    /// Whitespace and `--` line comments.
    fn skip_trivia(&mut self) {
        loop {
            self.take_while(char::is_whitespace);
            if !self.rest().starts_with("--") {
                return;
            }
            self.take_while(|c| c != '\n');
        }
    }

    fn span(&self, (offset, line, column): (usize, usize, usize)) -> Span {
        Span::new(offset, self.offset, line, column)
    }

    fn error(&self, kind: ParseErrorKind, start: (usize, usize, usize)) -> ParseError {
        ParseError::new(kind, self.span(start))
    }

    fn scan(&mut self, c: char, start: (usize, usize, usize)) -> ParseResult<TokenKind> {
        let kind = match c {
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            ',' => TokenKind::Comma,
            '.' => TokenKind::Dot,
            '=' => TokenKind::Eq,
            '?' => TokenKind::Question,
            '-' => TokenKind::Minus,
            '<' if self.bump_if('=') => TokenKind::LtEq,
            '<' => TokenKind::Lt,
            '>' if self.bump_if('=') => TokenKind::GtEq,
            '>' => TokenKind::Gt,
            '"' | '\'' => self.string(c, start)?,
            '0'..='9' => self.number(start)?,
            c if c == '_' || c.is_ascii_alphabetic() => {
                self.take_while(|ch| ch.is_alphanumeric() || ch == '_');
                let word = &self.src[start.0..self.offset];
                keyword(word).unwrap_or_else(|| TokenKind::Ident(word.to_string()))
            }
            other => return Err(self.error(ParseErrorKind::Character(other), start)),
        };
        Ok(kind)
    }

    fn string(&mut self, quote: char, start: (usize, usize, usize)) -> ParseResult<TokenKind> {
        let mut text = String::new();
        loop {
            let c = self
                .bump()
                .ok_or_else(|| self.error(ParseErrorKind::UnterminatedString, start))?;
            if c == quote {
                return Ok(TokenKind::String(text));
            }
            if c != '\\' {
                text.push(c);
                continue;
            }
            let escaped = self
                .bump()
                .ok_or_else(|| self.error(ParseErrorKind::UnterminatedString, start))?;
            text.push(match escaped {
                'n' => '\n',
                't' => '\t',
                '\\' => '\\',
                q if q == quote => q,
                other => return Err(self.error(ParseErrorKind::Escape(other), start)),
            });
        }
    }

    /// Digits with an optional fraction. A dot only belongs to the number
    /// when a digit follows it.
    fn number(&mut self, start: (usize, usize, usize)) -> ParseResult<TokenKind> {
        self.take_while(|c| c.is_ascii_digit());
        let mut after = self.rest().chars();
        let fraction = after.next() == Some('.') && after.next().is_some_and(|c| c.is_ascii_digit());
        if fraction {
            self.bump();
            self.take_while(|c| c.is_ascii_digit());
        }

        let text = &self.src[start.0..self.offset];
        let invalid = || self.error(ParseErrorKind::Number(text.to_string()), start);
        if fraction {
            text.parse().map(TokenKind::Float).map_err(|_| invalid())
        } else {
            text.parse().map(TokenKind::Int).map_err(|_| invalid())
        }
    }
}
