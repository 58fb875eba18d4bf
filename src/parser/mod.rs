//! Parser: tokens to runtime nodes
//!
//! Source text parses directly into the [`Node`] values the evaluator
//! consumes; there is no separate syntax tree. Reader shorthand expands
//! here: `'x` to `(quote x)`, `` `x `` to `(backquote x)`, and `,x` to
//! `(unquote x)`.

use crate::error::{Error, Result};
use crate::lexer::{Scanner, Token, TokenKind};
use crate::runtime::node::{cons, list_from, ListBuilder};
use crate::runtime::{Node, Symbol};

/// Reads every top-level form in `source`.
pub fn parse(source: &str) -> Result<Vec<Node>> {
    let tokens = Scanner::new(source).scan_tokens()?;
    Parser::new(tokens).parse()
}

/// Token-stream parser
pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
}

impl Parser {
    /// Creates a parser over a scanned token stream.
    pub fn new(tokens: Vec<Token>) -> Self {
        Parser { tokens, current: 0 }
    }

    /// Parses all top-level forms.
    pub fn parse(&mut self) -> Result<Vec<Node>> {
        let mut forms = Vec::new();
        while !self.is_at_end() {
            forms.push(self.parse_expression()?);
        }
        Ok(forms)
    }

    fn parse_expression(&mut self) -> Result<Node> {
        let token = self.advance()?;
        match token.kind {
            TokenKind::LeftParen => self.parse_list(),
            TokenKind::Quote => self.parse_shorthand("quote"),
            TokenKind::Backquote => self.parse_shorthand("backquote"),
            TokenKind::Comma => self.parse_shorthand("unquote"),
            TokenKind::Integer(n) => Ok(Node::Int(n)),
            TokenKind::Float(f) => Ok(Node::Float(f)),
            TokenKind::String(s) => Ok(Node::Str(s)),
            TokenKind::Char(c) => Ok(Node::Rune(c)),
            TokenKind::Atom(text) => Ok(classify_atom(&text)),
            TokenKind::RightParen => Err(self.syntax_error(&token, "unexpected `)`")),
            TokenKind::Dot => Err(self.syntax_error(&token, "unexpected `.` outside a list")),
            TokenKind::Eof => Err(Error::UnexpectedEof),
        }
    }

    /// Reads forms up to `)`. A `.` before the final element produces a
    /// dotted pair.
    fn parse_list(&mut self) -> Result<Node> {
        let mut builder = ListBuilder::new();
        loop {
            match self.peek_kind() {
                TokenKind::RightParen => {
                    self.current += 1;
                    return Ok(builder.build());
                }
                TokenKind::Dot => {
                    self.current += 1;
                    let tail = self.parse_expression()?;
                    let close = self.advance()?;
                    if close.kind != TokenKind::RightParen {
                        return Err(self.syntax_error(&close, "expected `)` after dotted tail"));
                    }
                    return Ok(builder.build_with_tail(tail));
                }
                TokenKind::Eof => return Err(Error::UnexpectedEof),
                _ => builder.push(self.parse_expression()?),
            }
        }
    }

    fn parse_shorthand(&mut self, name: &str) -> Result<Node> {
        let inner = self.parse_expression()?;
        Ok(list_from(vec![Node::Symbol(Symbol::new(name)), inner]))
    }

    fn peek_kind(&self) -> &TokenKind {
        match self.tokens.get(self.current) {
            Some(token) => &token.kind,
            None => &TokenKind::Eof,
        }
    }

    fn advance(&mut self) -> Result<Token> {
        let token = self
            .tokens
            .get(self.current)
            .cloned()
            .ok_or(Error::UnexpectedEof)?;
        self.current += 1;
        Ok(token)
    }

    fn is_at_end(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Eof)
    }

    fn syntax_error(&self, token: &Token, message: &str) -> Error {
        Error::SyntaxError {
            line: token.line,
            message: message.to_string(),
        }
    }
}

/// Maps atom text to a node: `nil`, `t`, `:keyword`, or a symbol.
fn classify_atom(text: &str) -> Node {
    match text {
        "nil" => Node::Null,
        "t" => Node::True,
        _ if text.starts_with(':') => Node::Keyword(Symbol::new(text)),
        _ => Node::Symbol(Symbol::new(text)),
    }
}

/// Convenience for tests and embedding: parses exactly one form.
pub fn parse_one(source: &str) -> Result<Node> {
    let mut forms = parse(source)?;
    match forms.len() {
        1 => Ok(forms.remove(0)),
        0 => Err(Error::UnexpectedEof),
        _ => Err(Error::SyntaxError {
            line: 1,
            message: "expected exactly one form".to_string(),
        }),
    }
}
