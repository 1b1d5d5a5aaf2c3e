//! Abstract Syntax Tree definitions for BeamScript
//!
//! Represents the structure of programs after parsing. The node set is
//! closed: the interpreter matches on it exhaustively.

use crate::token::Span;

/// Expression nodes. Every expression evaluates to exactly one value.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Variable reference: foo
    Identifier { name: String, span: Span },

    /// Number literal: 42, 3.14
    NumericLiteral { value: f64, is_float: bool, span: Span },

    /// String literal: "hello", 'hello'
    StringLiteral { value: String, span: Span },

    /// null
    NullLiteral { span: Span },

    /// Object literal: { a: 1, b }
    ObjectLiteral { properties: Vec<Property>, span: Span },

    /// Assignment: target = value. The target is validated at run time.
    Assignment {
        target: Box<Expr>,
        value: Box<Expr>,
        span: Span,
    },

    /// Arithmetic or comparison: a + b, x < y
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
        span: Span,
    },

    /// Prefix operation: -x, not y
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
        span: Span,
    },

    /// a and b, a || b
    Logical {
        left: Box<Expr>,
        op: LogicalOp,
        right: Box<Expr>,
        span: Span,
    },

    /// Member access: obj.prop (non-computed) or obj[expr] (computed)
    Member {
        object: Box<Expr>,
        property: Box<Expr>,
        computed: bool,
        span: Span,
    },

    /// Function call: foo(a, b)
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
        span: Span,
    },
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::Identifier { span, .. } => *span,
            Expr::NumericLiteral { span, .. } => *span,
            Expr::StringLiteral { span, .. } => *span,
            Expr::NullLiteral { span } => *span,
            Expr::ObjectLiteral { span, .. } => *span,
            Expr::Assignment { span, .. } => *span,
            Expr::Binary { span, .. } => *span,
            Expr::Unary { span, .. } => *span,
            Expr::Logical { span, .. } => *span,
            Expr::Member { span, .. } => *span,
            Expr::Call { span, .. } => *span,
        }
    }
}

/// One `key` or `key: value` entry of an object literal
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub key: String,
    /// `None` for shorthand `{ key }`, which reads the variable `key`
    pub value: Option<Expr>,
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,      // +
    Sub,      // -
    Mul,      // *
    Div,      // /
    Mod,      // %
    Pow,      // ^
    Eq,       // ==
    Ne,       // !=
    Lt,       // <
    Le,       // <=
    Gt,       // >
    Ge,       // >=
}

impl BinaryOp {
    /// Map an operator lexeme to its binary operator
    pub fn from_lexeme(lexeme: &str) -> Option<Self> {
        let op = match lexeme {
            "+" => BinaryOp::Add,
            "-" => BinaryOp::Sub,
            "*" => BinaryOp::Mul,
            "/" => BinaryOp::Div,
            "%" => BinaryOp::Mod,
            "^" => BinaryOp::Pow,
            "==" => BinaryOp::Eq,
            "!=" => BinaryOp::Ne,
            "<" => BinaryOp::Lt,
            "<=" => BinaryOp::Le,
            ">" => BinaryOp::Gt,
            ">=" => BinaryOp::Ge,
            _ => return None,
        };
        Some(op)
    }
}

impl std::fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BinaryOp::Add => write!(f, "+"),
            BinaryOp::Sub => write!(f, "-"),
            BinaryOp::Mul => write!(f, "*"),
            BinaryOp::Div => write!(f, "/"),
            BinaryOp::Mod => write!(f, "%"),
            BinaryOp::Pow => write!(f, "^"),
            BinaryOp::Eq => write!(f, "=="),
            BinaryOp::Ne => write!(f, "!="),
            BinaryOp::Lt => write!(f, "<"),
            BinaryOp::Le => write!(f, "<="),
            BinaryOp::Gt => write!(f, ">"),
            BinaryOp::Ge => write!(f, ">="),
        }
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,  // +
    Neg,   // -
    Not,   // not, !
}

/// Logical operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

/// Declaration keyword of a variable declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclKind {
    Var,
    Declare,
}

/// One `name [= init]` entry of a variable declaration
#[derive(Debug, Clone, PartialEq)]
pub struct Declarator {
    pub name: String,
    pub init: Option<Expr>,
    pub span: Span,
}

/// A `{ ... }` body. Blocks do not open a scope of their own.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub body: Vec<Stmt>,
    pub span: Span,
}

/// Statement nodes
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// [const] var|declare a = 1, b
    VariableDeclaration {
        declarations: Vec<Declarator>,
        kind: DeclKind,
        constant: bool,
        span: Span,
    },

    /// def name(params) { body }
    FunctionDeclaration {
        name: String,
        params: Vec<String>,
        body: Block,
        span: Span,
    },

    /// if cond { } else if cond { } else { }
    If {
        condition: Expr,
        consequent: Block,
        /// Either a `Stmt::Block` or a nested `Stmt::If`
        alternate: Option<Box<Stmt>>,
        span: Span,
    },

    /// while cond { }
    While {
        condition: Expr,
        body: Block,
        span: Span,
    },

    Block(Block),

    Expression { expr: Expr },
}

/// A complete program
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub body: Vec<Stmt>,
}

impl Program {
    pub fn new(body: Vec<Stmt>) -> Self {
        Self { body }
    }
}
