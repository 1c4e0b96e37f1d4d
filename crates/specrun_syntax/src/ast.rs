//! Abstract Syntax Tree definitions for spec scripts.
//!
//! Function bodies (named functions, anonymous functions and trailing blocks) are stored behind `Arc` so the
//! interpreter can capture them in closures without cloning statement trees, and so a compiled program can be re-run
//! many times.

use std::fmt;
use std::sync::Arc;

/// Source location span (byte offsets)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

/// A node with source location
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }
}

pub type Ident = String;

/// A program is a sequence of top-level statements.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub statements: Vec<Spanned<Stmt>>,
}

/// A `{ ... }` statement block.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Block {
    pub statements: Vec<Spanned<Stmt>>,
    pub span: Span,
}

/// A function body with its parameter list.
///
/// `name` is `None` for anonymous functions and trailing blocks.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    pub name: Option<Ident>,
    pub params: Vec<Spanned<Ident>>,
    pub body: Block,
    pub span: Span,
}

// ============================================================================
// Statements
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Let(LetStmt),
    Assign(AssignStmt),
    Fn(Arc<FunctionDef>),
    If(IfStmt),
    While(WhileStmt),
    For(ForStmt),
    Return(Option<Spanned<Expr>>),
    Throw(Spanned<Expr>),
    Break,
    Continue,
    Expr(Spanned<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct LetStmt {
    pub name: Spanned<Ident>,
    pub value: Option<Spanned<Expr>>,
}

/// `target = value`, where target is an identifier or an index expression.
#[derive(Debug, Clone, PartialEq)]
pub struct AssignStmt {
    pub target: Spanned<Expr>,
    pub value: Spanned<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfStmt {
    pub condition: Spanned<Expr>,
    pub then_block: Block,
    pub else_branch: Option<ElseBranch>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ElseBranch {
    If(Box<Spanned<IfStmt>>),
    Block(Block),
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhileStmt {
    pub condition: Spanned<Expr>,
    pub body: Block,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForStmt {
    pub binding: Spanned<Ident>,
    pub iterable: Spanned<Expr>,
    pub body: Block,
}

// ============================================================================
// Expressions
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),
    Ident(Ident),
    List(Vec<Spanned<Expr>>),
    Unary(UnaryOp, Box<Spanned<Expr>>),
    Binary(Box<Spanned<Expr>>, BinaryOp, Box<Spanned<Expr>>),
    Call(CallExpr),
    Index(Box<Spanned<Expr>>, Box<Spanned<Expr>>),
    Field(Box<Spanned<Expr>>, Spanned<Ident>),
    Lambda(Arc<FunctionDef>),
    Paren(Box<Spanned<Expr>>),
}

/// A call, with an optional trailing block passed as the final argument.
#[derive(Debug, Clone, PartialEq)]
pub struct CallExpr {
    pub callee: Box<Spanned<Expr>>,
    pub args: Vec<Spanned<Expr>>,
    pub trailing: Option<Arc<FunctionDef>>,
}

impl CallExpr {
    /// Name of the callee when it is a bare identifier.
    pub fn callee_name(&self) -> Option<&str> {
        match &self.callee.node {
            Expr::Ident(name) => Some(name),
            _ => None,
        }
    }

    /// Number of arguments including the trailing block.
    pub fn arity(&self) -> usize {
        self.args.len() + usize::from(self.trailing.is_some())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    Float(f64),
    String(String),
    Bool(bool),
    Nil,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        };
        write!(f, "{}", s)
    }
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnaryOp::Neg => write!(f, "-"),
            UnaryOp::Not => write!(f, "!"),
        }
    }
}
