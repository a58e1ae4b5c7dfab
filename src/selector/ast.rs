//! AST and value types for the selector language.

use std::collections::HashMap;
use std::fmt;

use super::pattern::LikeMatcher;

/// A property value. Property maps never hold any other shape of data.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Real(f64),
    Str(String),
    /// Present in the map with no value, distinct from a missing key.
    Null,
}

/// The property context a selector is evaluated against.
pub type Properties = HashMap<String, Value>;

/// Comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq, // =
    Ne, // <>
    Lt, // <
    Le, // <=
    Gt, // >
    Ge, // >=
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompareOp::Eq => write!(f, "="),
            CompareOp::Ne => write!(f, "<>"),
            CompareOp::Lt => write!(f, "<"),
            CompareOp::Le => write!(f, "<="),
            CompareOp::Gt => write!(f, ">"),
            CompareOp::Ge => write!(f, ">="),
        }
    }
}

/// Arithmetic operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add, // +
    Sub, // -
    Mul, // *
    Div, // /
    Rem, // %
}

impl fmt::Display for ArithOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArithOp::Add => write!(f, "+"),
            ArithOp::Sub => write!(f, "-"),
            ArithOp::Mul => write!(f, "*"),
            ArithOp::Div => write!(f, "/"),
            ArithOp::Rem => write!(f, "%"),
        }
    }
}

/// A compiled selector expression.
///
/// Immutable after parsing: the tree owns its children exclusively, holds no
/// back-references, and can be shared across threads and reused for any
/// number of evaluations.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Property reference: `age`
    Ident(String),

    /// Boolean, integer, real, or string literal.
    Literal(Value),

    /// `left AND right`
    And(Box<Expr>, Box<Expr>),

    /// `left OR right`
    Or(Box<Expr>, Box<Expr>),

    /// `NOT operand`
    Not(Box<Expr>),

    /// `left <op> right` with op one of `= <> < <= > >=`
    Compare {
        op: CompareOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    /// `left <op> right` with op one of `+ - * / %`
    Arith {
        op: ArithOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    /// Unary minus.
    Neg(Box<Expr>),

    /// `subject [NOT] LIKE 'pattern' [ESCAPE 'c']`
    ///
    /// The pattern is restricted to a string literal, so the matcher is
    /// compiled once at parse time.
    Like {
        subject: Box<Expr>,
        pattern: String,
        escape: Option<char>,
        matcher: LikeMatcher,
        negated: bool,
    },

    /// `subject [NOT] BETWEEN low AND high`
    Between {
        subject: Box<Expr>,
        low: Box<Expr>,
        high: Box<Expr>,
        negated: bool,
    },

    /// `subject [NOT] IN ('a', 'b', ...)` over string literals only
    In {
        subject: Box<Expr>,
        set: Vec<String>,
        negated: bool,
    },

    /// `subject IS [NOT] NULL`
    IsNull {
        subject: Box<Expr>,
        negated: bool,
    },
}
