//! This module handles the AST.

use crate::span::{Span, WithSpan};
use std::fmt;

/// A binary operator - includes arithmetic and comparison.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[allow(clippy::missing_docs_in_private_items)]
pub enum BinaryOperator {
    Slash,
    Star,
    Plus,
    Minus,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
    BangEqual,
    EqualEqual,
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::Slash => "/",
                Self::Star => "*",
                Self::Plus => "+",
                Self::Minus => "-",
                Self::Greater => ">",
                Self::GreaterEqual => ">=",
                Self::Less => "<",
                Self::LessEqual => "<=",
                Self::BangEqual => "!=",
                Self::EqualEqual => "==",
            }
        )
    }
}

/// A binary logic operator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[allow(clippy::missing_docs_in_private_items)]
pub enum LogicalOperator {
    And,
    Or,
}

impl fmt::Display for LogicalOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::And => "and",
                Self::Or => "or",
            }
        )
    }
}

/// A unary operator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[allow(clippy::missing_docs_in_private_items)]
pub enum UnaryOperator {
    Bang,
    Minus,
}

impl fmt::Display for UnaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::Bang => "!",
                Self::Minus => "-",
            }
        )
    }
}

/// An [`Expr`] wrapped in [`WithSpan`].
pub type SpanExpr = WithSpan<Expr>;

/// A list of all the possible expressions.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    /// Nothing.
    Nil,

    /// A boolean.
    Boolean(bool),

    /// A number.
    Number(f64),

    /// A string.
    String(String),

    /// An array literal: `[a, b, c]`.
    Array(Vec<SpanExpr>),

    /// (left_expr, operator, right_expr).
    Binary(Box<SpanExpr>, WithSpan<BinaryOperator>, Box<SpanExpr>),

    /// (left_expr, operator, right_expr).
    Logical(Box<SpanExpr>, WithSpan<LogicalOperator>, Box<SpanExpr>),

    /// (operator, expr).
    Unary(WithSpan<UnaryOperator>, Box<SpanExpr>),

    /// Parens around expression.
    Grouping(Box<SpanExpr>),

    /// The name of a variable.
    Variable(String),

    /// (identifier, new_value).
    Assign(WithSpan<String>, Box<SpanExpr>),

    /// (callee, arguments, close_paren_span).
    Call(Box<SpanExpr>, Vec<SpanExpr>, Span),

    /// (object, index).
    ///
    /// Property access and array indexing are unified: `obj.name` lowers to
    /// an index that is a string literal, `obj[e]` keeps `e` as-is.
    Get(Box<SpanExpr>, Box<SpanExpr>),

    /// (object, index, new_value). The dual of [`Get`](Expr::Get).
    Set(Box<SpanExpr>, Box<SpanExpr>, Box<SpanExpr>),

    /// `this`.
    This,

    /// `super.method`.
    Super(WithSpan<String>),

    /// An anonymous function expression: (parameters, body).
    Function(Vec<WithSpan<String>>, Vec<SpanStmt>),
}

/// A [`Stmt`] wrapped in [`WithSpan`].
pub type SpanStmt = WithSpan<Stmt>;

/// A function or method declaration.
#[derive(Clone, Debug, PartialEq)]
pub struct FunDecl {
    /// The name of the function.
    pub name: WithSpan<String>,

    /// The parameters of the function.
    pub params: Vec<WithSpan<String>>,

    /// The body of the function.
    pub body: Vec<SpanStmt>,
}

/// A class declaration.
#[derive(Clone, Debug, PartialEq)]
pub struct ClassDecl {
    /// The name of the class.
    pub name: WithSpan<String>,

    /// The name of the superclass, if one was declared with `<`.
    pub superclass: Option<WithSpan<String>>,

    /// The instance methods of the class.
    pub methods: Vec<WithSpan<FunDecl>>,

    /// The static methods of the class, declared with a `class` prefix.
    pub static_methods: Vec<WithSpan<FunDecl>>,
}

/// A list of all the possible statements.
#[derive(Clone, Debug, PartialEq)]
pub enum Stmt {
    /// See [`Expr`].
    Expression(SpanExpr),

    /// (expr).
    Print(SpanExpr),

    /// (keyword_span, return_value).
    Return(Span, Option<SpanExpr>),

    /// (identifier, initializer).
    VarDecl(WithSpan<String>, Option<SpanExpr>),

    /// A named function declaration.
    FunDecl(FunDecl),

    /// A class declaration.
    ClassDecl(ClassDecl),

    /// (body).
    Block(Vec<SpanStmt>),

    /// (condition, then_block, else_block).
    If(SpanExpr, Box<SpanStmt>, Option<Box<SpanStmt>>),

    /// (condition, body).
    While(SpanExpr, Box<SpanStmt>),
}
