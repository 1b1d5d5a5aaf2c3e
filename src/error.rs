//! Error types for BeamScript
//!
//! Provides structured error handling with source locations. Every error is
//! fatal to the current run.

use crate::token::Span;
use std::fmt;
use thiserror::Error;

/// Pipeline stage an error originates from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Lex,
    Parse,
    Runtime,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Lex => write!(f, "LexError"),
            Phase::Parse => write!(f, "ParseError"),
            Phase::Runtime => write!(f, "RuntimeError"),
        }
    }
}

/// Error kinds in BeamScript
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ErrorKind {
    // Lexer errors
    #[error("unrecognized character '{0}'")]
    UnexpectedCharacter(char),
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("unterminated block comment")]
    UnterminatedComment,
    #[error("invalid number '{0}'")]
    InvalidNumber(String),

    // Parser errors
    #[error("unexpected token '{0}'")]
    UnexpectedToken(String),
    #[error("{0}, got '{1}'")]
    ExpectedToken(String, String),
    #[error("constant '{0}' must be initialized")]
    ConstWithoutInitializer(String),
    #[error("function parameters must be identifiers")]
    InvalidParameter,

    // Runtime errors
    #[error("cannot declare '{0}': it is already defined in this scope")]
    DuplicateDeclaration(String),
    #[error("cannot resolve '{0}': it does not exist")]
    UndeclaredVariable(String),
    #[error("cannot assign to '{0}': it was declared constant")]
    ConstAssignment(String),
    #[error("type mismatch: expected {0}, got {1}")]
    TypeMismatch(String, String),
    #[error("division by zero")]
    DivisionByZero,
    #[error("member '{0}' not found on {1}")]
    MemberNotFound(String, String),
    #[error("{0} is not callable")]
    NotCallable(String),
    #[error("invalid assignment target")]
    InvalidAssignmentTarget,
    #[error("'{name}' expects {expected} arguments, got {got}")]
    ArityMismatch { name: String, expected: usize, got: usize },
    #[error("maximum call depth of {0} exceeded")]
    StackOverflow(usize),
    #[error("{0}")]
    Native(String),
}

impl ErrorKind {
    pub fn phase(&self) -> Phase {
        match self {
            ErrorKind::UnexpectedCharacter(_)
            | ErrorKind::UnterminatedString
            | ErrorKind::UnterminatedComment
            | ErrorKind::InvalidNumber(_) => Phase::Lex,
            ErrorKind::UnexpectedToken(_)
            | ErrorKind::ExpectedToken(..)
            | ErrorKind::ConstWithoutInitializer(_)
            | ErrorKind::InvalidParameter => Phase::Parse,
            _ => Phase::Runtime,
        }
    }
}

/// A BeamScript error with location information
#[derive(Debug, Clone, PartialEq)]
pub struct BeamError {
    pub kind: ErrorKind,
    pub span: Option<Span>,
    pub source_line: Option<String>,
}

impl BeamError {
    pub fn new(kind: ErrorKind, span: Option<Span>) -> Self {
        Self {
            kind,
            span,
            source_line: None,
        }
    }

    /// Attach a location if the error does not carry one yet.
    pub fn or_span(mut self, span: Span) -> Self {
        if self.span.is_none() {
            self.span = Some(span);
        }
        self
    }

    pub fn with_source(mut self, source: &str) -> Self {
        if let Some(span) = &self.span {
            if let Some(line) = source.lines().nth(span.line.saturating_sub(1)) {
                self.source_line = Some(line.to_string());
            }
        }
        self
    }
}

impl fmt::Display for BeamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let phase = self.kind.phase();
        if let Some(span) = &self.span {
            write!(f, "[line {}:{}] {}: {}", span.line, span.column, phase, self.kind)?;

            if let Some(ref line) = self.source_line {
                write!(f, "\n  | {}", line)?;
                write!(f, "\n  | {}^", " ".repeat(span.column.saturating_sub(1)))?;
            }
        } else {
            write!(f, "{}: {}", phase, self.kind)?;
        }
        Ok(())
    }
}

impl std::error::Error for BeamError {}

impl From<ErrorKind> for BeamError {
    fn from(kind: ErrorKind) -> Self {
        BeamError::new(kind, None)
    }
}

/// Result type for BeamScript operations
pub type Result<T> = std::result::Result<T, BeamError>;
