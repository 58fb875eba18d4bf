/// A single token from source text
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// The type of token
    pub kind: TokenKind,
    /// Original text of the token
    pub lexeme: String,
    /// Line number where the token appears (1-indexed)
    pub line: usize,
    /// Column number where the token starts (1-indexed)
    pub column: usize,
}

impl Token {
    /// Creates a new token with the given properties
    pub fn new(kind: TokenKind, lexeme: String, line: usize, column: usize) -> Self {
        Token {
            kind,
            lexeme,
            line,
            column,
        }
    }
}

/// All possible token types
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// `(`
    LeftParen,
    /// `)`
    RightParen,
    /// `'` quote shorthand
    Quote,
    /// `` ` `` backquote shorthand
    Backquote,
    /// `,` unquote shorthand
    Comma,
    /// `.` dotted-pair marker
    Dot,
    /// Integer literal
    Integer(i64),
    /// Floating-point literal
    Float(f64),
    /// String literal (escapes already resolved)
    String(String),
    /// Character literal such as `#\a` or `#\space`
    Char(char),
    /// Any other atom: symbols, keywords, `nil`, `t`
    Atom(String),
    /// End of input
    Eof,
}
