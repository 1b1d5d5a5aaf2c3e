//! Token definitions for BeamScript
//!
//! Tokens represent the atomic units of meaning in source code.

use std::fmt;

/// Location in source code for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub column: usize,
}

impl Span {
    pub fn new(start: usize, end: usize, line: usize, column: usize) -> Self {
        Self { start, end, line, column }
    }

    /// Span covering `self` through `other`, positioned at `self`.
    pub fn to(self, other: Span) -> Self {
        Self::new(self.start, other.end.max(self.end), self.line, self.column)
    }
}

/// Token kinds in BeamScript
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    // Literals
    Int,
    Float,
    String,
    Null,

    Identifier,

    // Keywords
    Var,
    Declare,
    Const,
    Def,
    If,
    Else,
    While,

    // Logical
    And,        // and, &&
    Or,         // or, ||
    Not,        // not, !

    // Arithmetic
    UnaryPlus,      // + in operand position
    UnaryMinus,     // - in operand position
    BinaryOperator, // + - * / % ^

    // Assignment and comparison
    Equals,              // =
    DoubleEquals,        // ==
    NotEquals,           // !=
    LessThan,            // <
    LessThanOrEquals,    // <=
    GreaterThan,         // >
    GreaterThanOrEquals, // >=

    // Punctuation
    Comma,
    Dot,
    Colon,
    Semicolon,
    OpenParen,
    CloseParen,
    OpenBrace,
    CloseBrace,
    OpenBracket,
    CloseBracket,

    Eof,
}

impl TokenKind {
    /// True for `==`, `!=`, `<`, `<=`, `>`, `>=`.
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            TokenKind::DoubleEquals
                | TokenKind::NotEquals
                | TokenKind::LessThan
                | TokenKind::LessThanOrEquals
                | TokenKind::GreaterThan
                | TokenKind::GreaterThanOrEquals
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TokenKind::Int => "integer",
            TokenKind::Float => "float",
            TokenKind::String => "string",
            TokenKind::Null => "null",
            TokenKind::Identifier => "identifier",
            TokenKind::Var => "var",
            TokenKind::Declare => "declare",
            TokenKind::Const => "const",
            TokenKind::Def => "def",
            TokenKind::If => "if",
            TokenKind::Else => "else",
            TokenKind::While => "while",
            TokenKind::And => "and",
            TokenKind::Or => "or",
            TokenKind::Not => "not",
            TokenKind::UnaryPlus => "unary +",
            TokenKind::UnaryMinus => "unary -",
            TokenKind::BinaryOperator => "operator",
            TokenKind::Equals => "=",
            TokenKind::DoubleEquals => "==",
            TokenKind::NotEquals => "!=",
            TokenKind::LessThan => "<",
            TokenKind::LessThanOrEquals => "<=",
            TokenKind::GreaterThan => ">",
            TokenKind::GreaterThanOrEquals => ">=",
            TokenKind::Comma => ",",
            TokenKind::Dot => ".",
            TokenKind::Colon => ":",
            TokenKind::Semicolon => ";",
            TokenKind::OpenParen => "(",
            TokenKind::CloseParen => ")",
            TokenKind::OpenBrace => "{",
            TokenKind::CloseBrace => "}",
            TokenKind::OpenBracket => "[",
            TokenKind::CloseBracket => "]",
            TokenKind::Eof => "end of input",
        };
        write!(f, "{}", name)
    }
}

/// A token with its kind, text and location
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    pub lexeme: String,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span, lexeme: String) -> Self {
        Self { kind, span, lexeme }
    }
}

/// Check if a string is a reserved word and return the corresponding token kind
pub fn lookup_keyword(ident: &str) -> Option<TokenKind> {
    match ident {
        "var" => Some(TokenKind::Var),
        "declare" => Some(TokenKind::Declare),
        "const" => Some(TokenKind::Const),
        "def" => Some(TokenKind::Def),
        "null" => Some(TokenKind::Null),
        "and" => Some(TokenKind::And),
        "or" => Some(TokenKind::Or),
        "not" => Some(TokenKind::Not),
        "if" => Some(TokenKind::If),
        "else" => Some(TokenKind::Else),
        "while" => Some(TokenKind::While),
        _ => None,
    }
}
