//! Error types for the selector language.

use std::fmt;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SelectorError>;

/// A parse-time diagnostic carrying the byte offset of the offending input.
///
/// When the failure has an inner cause (e.g. the tokenizer rejected a
/// literal), the rendered message combines both as `<outer> [<inner>]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub offset: usize,
    pub message: String,
    pub cause: Option<String>,
}

impl SyntaxError {
    pub fn new(offset: usize, message: impl Into<String>) -> Self {
        Self {
            offset,
            message: message.into(),
            cause: None,
        }
    }

    pub fn with_cause(
        offset: usize,
        message: impl Into<String>,
        cause: impl Into<String>,
    ) -> Self {
        Self {
            offset,
            message: message.into(),
            cause: Some(cause.into()),
        }
    }
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.cause {
            Some(cause) => write!(
                f,
                "{} [{}] at offset {}",
                self.message, cause, self.offset
            ),
            None => write!(f, "{} at offset {}", self.message, self.offset),
        }
    }
}

impl std::error::Error for SyntaxError {}

#[derive(Debug, Error)]
pub enum SelectorError {
    /// Filter text does not conform to the grammar. Raised during parse only.
    #[error("syntax error: {0}")]
    Syntax(#[from] SyntaxError),

    /// A property name, value shape, or pattern/escape specification is
    /// structurally invalid. Never absorbed into an UNKNOWN verdict.
    #[error("configuration error: {0}")]
    Config(String),

    /// Unexpected internal fault during evaluation.
    #[error("evaluation error: {0}")]
    Eval(String),
}

impl SelectorError {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        SelectorError::Config(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combines_outer_and_inner_messages() {
        let err = SyntaxError::with_cause(7, "invalid filter expression", "unterminated string literal");
        assert_eq!(
            err.to_string(),
            "invalid filter expression [unterminated string literal] at offset 7"
        );
    }

    #[test]
    fn plain_message_without_cause() {
        let err = SyntaxError::new(3, "expected ')', found end of input");
        assert_eq!(err.to_string(), "expected ')', found end of input at offset 3");
    }
}
