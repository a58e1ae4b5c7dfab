//! `sift` filters JSON-lines records with SQL-92 selector expressions.
//!
//! The core lives in [`selector`]: a filter such as
//! `age > 18 AND status = 'active'` compiles once into an immutable
//! expression tree and is evaluated repeatedly against property maps using
//! SQL three-valued logic. The binary front-end ([`app`], [`config`])
//! streams records through compiled selectors for content-based routing.

pub mod app;
pub mod config;
pub mod selector;

pub use selector::{Expr, Properties, SelectorError, Value, evaluate, matches, parse};
