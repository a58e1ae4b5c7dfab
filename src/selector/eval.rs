//! Three-valued evaluation of selector expressions.

use super::ast::{ArithOp, CompareOp, Expr, Properties, Value};
use super::error::{Result, SelectorError};
use super::parser::parse;

/// Tri-state logic value. UNKNOWN models missing or type-incompatible data
/// and is carried explicitly through every evaluation path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Truth {
    True,
    False,
    Unknown,
}

impl Truth {
    fn from_bool(b: bool) -> Truth {
        if b { Truth::True } else { Truth::False }
    }

    /// TRUE and FALSE swap; NOT UNKNOWN stays UNKNOWN.
    fn negate(self) -> Truth {
        match self {
            Truth::True => Truth::False,
            Truth::False => Truth::True,
            Truth::Unknown => Truth::Unknown,
        }
    }
}

/// An operand reduced to a concrete value, or the lack of one.
#[derive(Debug, Clone, PartialEq)]
enum Operand {
    Bool(bool),
    Int(i64),
    Real(f64),
    Str(String),
    /// Explicitly present with no value.
    Null,
    /// No value at all: a missing property, a type mismatch, or an
    /// undefined arithmetic result.
    Absent,
}

/// Evaluate a compiled expression against a property context.
///
/// Returns true iff the expression is definitely TRUE; both FALSE and
/// UNKNOWN reduce to false, so a filter whose outcome depends on a missing
/// property is non-matching rather than an error.
pub fn evaluate(expr: &Expr, properties: &Properties) -> Result<bool> {
    for name in properties.keys() {
        if name.is_empty() {
            return Err(SelectorError::config("property names must be non-empty"));
        }
    }
    Ok(eval_truth(expr, properties) == Truth::True)
}

/// Parse and evaluate in one call.
pub fn matches(filter: &str, properties: &Properties) -> Result<bool> {
    let expr = parse(filter)?;
    evaluate(&expr, properties)
}

fn eval_truth(expr: &Expr, props: &Properties) -> Truth {
    match expr {
        // A FALSE operand decides AND without forcing the other side
        Expr::And(left, right) => match eval_truth(left, props) {
            Truth::False => Truth::False,
            left_truth => match (left_truth, eval_truth(right, props)) {
                (_, Truth::False) => Truth::False,
                (Truth::True, Truth::True) => Truth::True,
                _ => Truth::Unknown,
            },
        },

        // A TRUE operand decides OR without forcing the other side
        Expr::Or(left, right) => match eval_truth(left, props) {
            Truth::True => Truth::True,
            left_truth => match (left_truth, eval_truth(right, props)) {
                (_, Truth::True) => Truth::True,
                (Truth::False, Truth::False) => Truth::False,
                _ => Truth::Unknown,
            },
        },

        Expr::Not(operand) => eval_truth(operand, props).negate(),

        Expr::Compare { op, left, right } => compare(
            *op,
            eval_operand(left, props),
            eval_operand(right, props),
        ),

        Expr::Like {
            subject,
            matcher,
            negated,
            ..
        } => {
            let truth = match eval_operand(subject, props) {
                Operand::Str(s) => Truth::from_bool(matcher.test(&s)),
                _ => Truth::Unknown,
            };
            if *negated { truth.negate() } else { truth }
        }

        // low <= subject <= high, with the same coercion as comparisons
        Expr::Between {
            subject,
            low,
            high,
            negated,
        } => {
            let s = eval_operand(subject, props);
            let lower = compare(CompareOp::Ge, s.clone(), eval_operand(low, props));
            let upper = compare(CompareOp::Le, s, eval_operand(high, props));
            let truth = match (lower, upper) {
                (Truth::False, _) | (_, Truth::False) => Truth::False,
                (Truth::True, Truth::True) => Truth::True,
                _ => Truth::Unknown,
            };
            if *negated { truth.negate() } else { truth }
        }

        Expr::In {
            subject,
            set,
            negated,
        } => {
            let truth = match eval_operand(subject, props) {
                Operand::Str(s) => Truth::from_bool(set.iter().any(|item| *item == s)),
                _ => Truth::Unknown,
            };
            if *negated { truth.negate() } else { truth }
        }

        // The one construct that resolves a missing property: never UNKNOWN
        Expr::IsNull { subject, negated } => {
            let is_null = matches!(
                eval_operand(subject, props),
                Operand::Null | Operand::Absent
            );
            Truth::from_bool(if *negated { !is_null } else { is_null })
        }

        Expr::Ident(name) => match props.get(name) {
            Some(Value::Bool(b)) => Truth::from_bool(*b),
            _ => Truth::Unknown,
        },

        Expr::Literal(Value::Bool(b)) => Truth::from_bool(*b),
        Expr::Literal(_) => Truth::Unknown,

        // A bare numeric expression has no truth value
        Expr::Arith { .. } | Expr::Neg(_) => Truth::Unknown,
    }
}

fn eval_operand(expr: &Expr, props: &Properties) -> Operand {
    match expr {
        Expr::Ident(name) => match props.get(name) {
            Some(Value::Bool(b)) => Operand::Bool(*b),
            Some(Value::Int(n)) => Operand::Int(*n),
            Some(Value::Real(x)) => Operand::Real(*x),
            Some(Value::Str(s)) => Operand::Str(s.clone()),
            Some(Value::Null) => Operand::Null,
            None => Operand::Absent,
        },

        Expr::Literal(value) => match value {
            Value::Bool(b) => Operand::Bool(*b),
            Value::Int(n) => Operand::Int(*n),
            Value::Real(x) => Operand::Real(*x),
            Value::Str(s) => Operand::Str(s.clone()),
            Value::Null => Operand::Null,
        },

        Expr::Arith { op, left, right } => arith(
            *op,
            eval_operand(left, props),
            eval_operand(right, props),
        ),

        Expr::Neg(operand) => match eval_operand(operand, props) {
            Operand::Int(n) => n.checked_neg().map(Operand::Int).unwrap_or(Operand::Absent),
            Operand::Real(x) => Operand::Real(-x),
            _ => Operand::Absent,
        },

        // Boolean-yielding nodes in value position, e.g. parenthesized
        // logic compared against TRUE
        other => match eval_truth(other, props) {
            Truth::True => Operand::Bool(true),
            Truth::False => Operand::Bool(false),
            Truth::Unknown => Operand::Absent,
        },
    }
}

/// Compare two resolved operands. Integers promote to reals when mixed;
/// strings and booleans support equality only; a missing value on either
/// side or any type mismatch is UNKNOWN, never an error.
fn compare(op: CompareOp, left: Operand, right: Operand) -> Truth {
    use Operand::*;

    match (left, right) {
        (Null | Absent, _) | (_, Null | Absent) => Truth::Unknown,

        (Int(a), Int(b)) => Truth::from_bool(compare_i64(op, a, b)),
        (Int(a), Real(b)) => Truth::from_bool(compare_f64(op, a as f64, b)),
        (Real(a), Int(b)) => Truth::from_bool(compare_f64(op, a, b as f64)),
        (Real(a), Real(b)) => Truth::from_bool(compare_f64(op, a, b)),

        (Str(a), Str(b)) => match op {
            CompareOp::Eq => Truth::from_bool(a == b),
            CompareOp::Ne => Truth::from_bool(a != b),
            _ => Truth::Unknown,
        },

        (Bool(a), Bool(b)) => match op {
            CompareOp::Eq => Truth::from_bool(a == b),
            CompareOp::Ne => Truth::from_bool(a != b),
            _ => Truth::Unknown,
        },

        _ => Truth::Unknown,
    }
}

fn compare_i64(op: CompareOp, a: i64, b: i64) -> bool {
    match op {
        CompareOp::Eq => a == b,
        CompareOp::Ne => a != b,
        CompareOp::Lt => a < b,
        CompareOp::Le => a <= b,
        CompareOp::Gt => a > b,
        CompareOp::Ge => a >= b,
    }
}

// Boundary comparisons are direct; no tolerance is applied.
#[allow(clippy::float_cmp)]
fn compare_f64(op: CompareOp, a: f64, b: f64) -> bool {
    match op {
        CompareOp::Eq => a == b,
        CompareOp::Ne => a != b,
        CompareOp::Lt => a < b,
        CompareOp::Le => a <= b,
        CompareOp::Gt => a > b,
        CompareOp::Ge => a >= b,
    }
}

/// Arithmetic with Int → Real promotion. Division or modulo by zero and
/// integer overflow produce no value, which leaves the enclosing
/// comparison UNKNOWN instead of aborting the evaluation.
fn arith(op: ArithOp, left: Operand, right: Operand) -> Operand {
    use Operand::*;

    match (left, right) {
        (Int(a), Int(b)) => arith_i64(op, a, b),
        (Int(a), Real(b)) => arith_f64(op, a as f64, b),
        (Real(a), Int(b)) => arith_f64(op, a, b as f64),
        (Real(a), Real(b)) => arith_f64(op, a, b),
        _ => Absent,
    }
}

fn arith_i64(op: ArithOp, a: i64, b: i64) -> Operand {
    let result = match op {
        ArithOp::Add => a.checked_add(b),
        ArithOp::Sub => a.checked_sub(b),
        ArithOp::Mul => a.checked_mul(b),
        ArithOp::Div => {
            if b == 0 {
                None
            } else {
                a.checked_div(b)
            }
        }
        ArithOp::Rem => {
            if b == 0 {
                None
            } else {
                a.checked_rem(b)
            }
        }
    };
    result.map(Operand::Int).unwrap_or(Operand::Absent)
}

fn arith_f64(op: ArithOp, a: f64, b: f64) -> Operand {
    match op {
        ArithOp::Add => Operand::Real(a + b),
        ArithOp::Sub => Operand::Real(a - b),
        ArithOp::Mul => Operand::Real(a * b),
        ArithOp::Div if b == 0.0 => Operand::Absent,
        ArithOp::Div => Operand::Real(a / b),
        ArithOp::Rem if b == 0.0 => Operand::Absent,
        ArithOp::Rem => Operand::Real(a % b),
    }
}
