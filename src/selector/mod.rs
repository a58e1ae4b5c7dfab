//! SQL-92 selector language for filtering property sets.
//!
//! Syntax:
//!   name = 'Bud' AND tenant_id = 'iplantc.org'  - comparisons: = <> < <= > >=
//!   age + 2 * shift > 65                        - arithmetic: + - * / %
//!   name LIKE 'Jo%n' ESCAPE '#'                 - % any run, _ one character
//!   range BETWEEN 200 AND 300                   - inclusive bounds
//!   country IN ('UK', 'US')                     - string membership
//!   missing IS NULL                             - the only test that resolves absence
//!   NOT expr, (expr)                            - negation and grouping
//!
//! A filter compiles once into an immutable [`Expr`] and is then evaluated
//! repeatedly against property maps using SQL three-valued logic: clauses
//! over missing or type-mismatched values become UNKNOWN, and only a
//! definite TRUE at the root counts as a match.

mod ast;
mod error;
mod eval;
mod lexer;
mod parser;
mod pattern;

pub use ast::{ArithOp, CompareOp, Expr, Properties, Value};
pub use error::{Result, SelectorError, SyntaxError};
pub use eval::{evaluate, matches};
pub use parser::parse;
pub use pattern::LikeMatcher;
