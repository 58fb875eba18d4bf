use super::token::{Token, TokenKind};
use crate::error::{Error, Result};

/// Tokenizer for S-expression source text
pub struct Scanner {
    /// Source code as character vector
    source: Vec<char>,
    /// Accumulated tokens
    tokens: Vec<Token>,
    /// Start position of current token
    start: usize,
    /// Current position in source
    current: usize,
    /// Current line number (1-indexed)
    line: usize,
    /// Current column number (1-indexed)
    column: usize,
}

impl Scanner {
    /// Creates a new scanner from source code
    pub fn new(source: &str) -> Self {
        Scanner {
            source: source.chars().collect(),
            tokens: Vec::new(),
            start: 0,
            current: 0,
            line: 1,
            column: 1,
        }
    }

    /// Scans all tokens from source code and returns them as a vector
    pub fn scan_tokens(mut self) -> Result<Vec<Token>> {
        while !self.is_at_end() {
            self.start = self.current;
            self.scan_token()?;
        }
        self.tokens
            .push(Token::new(TokenKind::Eof, String::new(), self.line, self.column));
        Ok(self.tokens)
    }

    fn scan_token(&mut self) -> Result<()> {
        let c = self.advance();
        match c {
            ' ' | '\r' | '\t' => {}
            '\n' => {
                self.line += 1;
                self.column = 1;
            }
            ';' => self.skip_line_comment(),
            '(' => self.add_token(TokenKind::LeftParen),
            ')' => self.add_token(TokenKind::RightParen),
            '\'' => self.add_token(TokenKind::Quote),
            '`' => self.add_token(TokenKind::Backquote),
            ',' => self.add_token(TokenKind::Comma),
            '"' => self.scan_string()?,
            '#' if self.peek() == Some('\\') => {
                self.advance();
                self.scan_char()?
            }
            _ => self.scan_atom(),
        }
        Ok(())
    }

    fn skip_line_comment(&mut self) {
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.advance();
        }
    }

    fn scan_string(&mut self) -> Result<()> {
        let mut value = String::new();
        loop {
            let c = self.advance_or("unterminated string")?;
            match c {
                '"' => break,
                '\\' => {
                    let escaped = self.advance_or("unterminated escape sequence")?;
                    value.push(match escaped {
                        'n' => '\n',
                        'r' => '\r',
                        't' => '\t',
                        other => other,
                    });
                }
                '\n' => {
                    self.line += 1;
                    self.column = 1;
                    value.push('\n');
                }
                other => value.push(other),
            }
        }
        self.add_token(TokenKind::String(value));
        Ok(())
    }

    /// Reads a character literal: a single character, a named character
    /// (`space`, `tab`, `linefeed`, `newline`, `return`), or `U` followed by
    /// a hexadecimal code point.
    fn scan_char(&mut self) -> Result<()> {
        let first = self.advance_or("unterminated character literal")?;
        let mut name = String::from(first);
        if first.is_alphanumeric() {
            while let Some(c) = self.peek() {
                if c.is_alphanumeric() || c == '+' {
                    name.push(c);
                    self.advance();
                } else {
                    break;
                }
            }
        }
        let c = if name.chars().count() == 1 {
            first
        } else {
            match name.to_ascii_lowercase().as_str() {
                "space" => ' ',
                "tab" => '\t',
                "linefeed" | "newline" => '\n',
                "return" => '\r',
                _ => self.parse_codepoint(&name)?,
            }
        };
        self.add_token(TokenKind::Char(c));
        Ok(())
    }

    fn parse_codepoint(&self, name: &str) -> Result<char> {
        let bad = || Error::SyntaxError {
            line: self.line,
            message: format!("invalid character literal #\\{name}"),
        };
        let hex = name
            .strip_prefix('U')
            .or_else(|| name.strip_prefix('u'))
            .map(|h| h.strip_prefix('+').unwrap_or(h))
            .ok_or_else(bad)?;
        let code = u32::from_str_radix(hex, 16).map_err(|_| bad())?;
        char::from_u32(code).ok_or_else(bad)
    }

    /// Reads an unstructured atom and classifies it as a number, the dotted
    /// pair marker, or a plain atom.
    fn scan_atom(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() || matches!(c, '(' | ')' | '\'' | '`' | ',' | '"' | ';') {
                break;
            }
            self.advance();
        }
        let text: String = self.source[self.start..self.current].iter().collect();
        let kind = if text == "." {
            TokenKind::Dot
        } else if let Ok(n) = text.parse::<i64>() {
            TokenKind::Integer(n)
        } else if looks_numeric(&text) {
            match text.parse::<f64>() {
                Ok(f) => TokenKind::Float(f),
                Err(_) => TokenKind::Atom(text.clone()),
            }
        } else {
            TokenKind::Atom(text.clone())
        };
        self.tokens
            .push(Token::new(kind, text, self.line, self.start_column()));
    }

    fn add_token(&mut self, kind: TokenKind) {
        let lexeme: String = self.source[self.start..self.current].iter().collect();
        self.tokens
            .push(Token::new(kind, lexeme, self.line, self.start_column()));
    }

    fn start_column(&self) -> usize {
        self.column.saturating_sub(self.current - self.start)
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }

    fn advance(&mut self) -> char {
        let c = self.source[self.current];
        self.current += 1;
        self.column += 1;
        c
    }

    fn advance_or(&mut self, message: &str) -> Result<char> {
        if self.is_at_end() {
            return Err(Error::SyntaxError {
                line: self.line,
                message: message.to_string(),
            });
        }
        Ok(self.advance())
    }

    fn peek(&self) -> Option<char> {
        self.source.get(self.current).copied()
    }
}

/// True when `text` could be a number: avoids treating `-`, `1+`, or `...`
/// as failed numeric parses.
fn looks_numeric(text: &str) -> bool {
    let rest = text.strip_prefix('-').unwrap_or(text);
    rest.starts_with(|c: char| c.is_ascii_digit())
        && rest.chars().all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '-' | '+'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Scanner::new(source)
            .scan_tokens()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_scan_basic_forms() {
        assert_eq!(
            kinds("(+ 1 2.5)"),
            vec![
                TokenKind::LeftParen,
                TokenKind::Atom("+".to_string()),
                TokenKind::Integer(1),
                TokenKind::Float(2.5),
                TokenKind::RightParen,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_scan_string_escapes() {
        assert_eq!(
            kinds("\"a\\nb\""),
            vec![TokenKind::String("a\nb".to_string()), TokenKind::Eof]
        );
    }

    #[test]
    fn test_scan_char_literals() {
        assert_eq!(kinds("#\\a")[0], TokenKind::Char('a'));
        assert_eq!(kinds("#\\space")[0], TokenKind::Char(' '));
        assert_eq!(kinds("#\\U0041")[0], TokenKind::Char('A'));
    }

    #[test]
    fn test_comments_and_reader_shorthand() {
        assert_eq!(
            kinds("'x ; trailing\n`y ,z"),
            vec![
                TokenKind::Quote,
                TokenKind::Atom("x".to_string()),
                TokenKind::Backquote,
                TokenKind::Atom("y".to_string()),
                TokenKind::Comma,
                TokenKind::Atom("z".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_negative_numbers_vs_symbols() {
        assert_eq!(kinds("-5")[0], TokenKind::Integer(-5));
        assert_eq!(kinds("-")[0], TokenKind::Atom("-".to_string()));
        assert_eq!(kinds("1+")[0], TokenKind::Atom("1+".to_string()));
    }
}
