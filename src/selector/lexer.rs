//! Lexer/tokenizer for selector text.

use std::fmt;

use winnow::combinator::{alt, opt};
use winnow::prelude::*;
use winnow::token::{one_of, take_while};

use super::error::{SelectorError, SyntaxError};

/// Token kinds for the selector grammar.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Identifiers and literals
    Ident(String),
    Keyword(Keyword),
    Str(String),
    Int(i64),
    Real(f64),

    // Comparison operators
    Eq, // =
    Ne, // <>
    Lt, // <
    Le, // <=
    Gt, // >
    Ge, // >=

    // Arithmetic operators
    Plus,    // +
    Minus,   // -
    Star,    // *
    Slash,   // /
    Percent, // %

    // Punctuation
    LParen, // (
    RParen, // )
    Comma,  // ,

    // End of input
    Eof,
}

/// Reserved words, matched case-insensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    And,
    Or,
    Not,
    Like,
    Escape,
    Between,
    In,
    Is,
    Null,
    True,
    False,
}

impl Keyword {
    /// Closed keyword table, consulted once per identifier-shaped token.
    fn lookup(spelling: &str) -> Option<Keyword> {
        match spelling.to_ascii_uppercase().as_str() {
            "AND" => Some(Keyword::And),
            "OR" => Some(Keyword::Or),
            "NOT" => Some(Keyword::Not),
            "LIKE" => Some(Keyword::Like),
            "ESCAPE" => Some(Keyword::Escape),
            "BETWEEN" => Some(Keyword::Between),
            "IN" => Some(Keyword::In),
            "IS" => Some(Keyword::Is),
            "NULL" => Some(Keyword::Null),
            "TRUE" => Some(Keyword::True),
            "FALSE" => Some(Keyword::False),
            _ => None,
        }
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Keyword::And => "AND",
            Keyword::Or => "OR",
            Keyword::Not => "NOT",
            Keyword::Like => "LIKE",
            Keyword::Escape => "ESCAPE",
            Keyword::Between => "BETWEEN",
            Keyword::In => "IN",
            Keyword::Is => "IS",
            Keyword::Null => "NULL",
            Keyword::True => "TRUE",
            Keyword::False => "FALSE",
        };
        write!(f, "{name}")
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Ident(name) => write!(f, "identifier '{name}'"),
            TokenKind::Keyword(kw) => write!(f, "keyword {kw}"),
            TokenKind::Str(s) => write!(f, "string '{s}'"),
            TokenKind::Int(n) => write!(f, "number {n}"),
            TokenKind::Real(x) => write!(f, "number {x}"),
            TokenKind::Eq => write!(f, "'='"),
            TokenKind::Ne => write!(f, "'<>'"),
            TokenKind::Lt => write!(f, "'<'"),
            TokenKind::Le => write!(f, "'<='"),
            TokenKind::Gt => write!(f, "'>'"),
            TokenKind::Ge => write!(f, "'>='"),
            TokenKind::Plus => write!(f, "'+'"),
            TokenKind::Minus => write!(f, "'-'"),
            TokenKind::Star => write!(f, "'*'"),
            TokenKind::Slash => write!(f, "'/'"),
            TokenKind::Percent => write!(f, "'%'"),
            TokenKind::LParen => write!(f, "'('"),
            TokenKind::RParen => write!(f, "')'"),
            TokenKind::Comma => write!(f, "','"),
            TokenKind::Eof => write!(f, "end of input"),
        }
    }
}

/// A token plus the byte offset where it starts in the filter text.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub offset: usize,
}

// Manually define PResult for resilience against winnow version changes
type PResult<T> = Result<T, winnow::error::ErrMode<winnow::error::ContextError>>;

fn backtrack() -> winnow::error::ErrMode<winnow::error::ContextError> {
    winnow::error::ErrMode::Backtrack(winnow::error::ContextError::default())
}

/// Lex an identifier or keyword: letters/underscore, then alphanumerics.
fn lex_ident(input: &mut &str) -> PResult<TokenKind> {
    let first = one_of(|c: char| c.is_ascii_alphabetic() || c == '_').parse_next(input)?;
    let rest = take_while(0.., |c: char| c.is_ascii_alphanumeric() || c == '_')
        .parse_next(input)?;

    let mut spelling = String::with_capacity(1 + rest.len());
    spelling.push(first);
    spelling.push_str(rest);

    Ok(match Keyword::lookup(&spelling) {
        Some(kw) => TokenKind::Keyword(kw),
        None => TokenKind::Ident(spelling),
    })
}

fn exponent<'a>(input: &mut &'a str) -> PResult<&'a str> {
    (
        one_of(['e', 'E']),
        opt(one_of(['+', '-'])),
        take_while(1.., |c: char| c.is_ascii_digit()),
    )
        .take()
        .parse_next(input)
}

/// Lex an integer, decimal, or exponential numeric literal.
fn lex_number(input: &mut &str) -> PResult<TokenKind> {
    let digits = |c: char| c.is_ascii_digit();
    let text = alt((
        (
            take_while(1.., digits),
            opt(('.', take_while(0.., digits))),
            opt(exponent),
        )
            .take(),
        ('.', take_while(1.., digits), opt(exponent)).take(),
    ))
    .parse_next(input)?;

    if text.contains(['.', 'e', 'E']) {
        let value = text.parse::<f64>().map_err(|_| backtrack())?;
        Ok(TokenKind::Real(value))
    } else {
        let value = text.parse::<i64>().map_err(|_| backtrack())?;
        Ok(TokenKind::Int(value))
    }
}

/// Lex a single-quoted string literal; `''` is an escaped embedded quote.
fn lex_string(input: &mut &str) -> PResult<TokenKind> {
    '\''.parse_next(input)?;
    let mut value = String::new();
    loop {
        let chunk = take_while(0.., |c: char| c != '\'').parse_next(input)?;
        value.push_str(chunk);
        '\''.parse_next(input)?;
        if opt('\'').parse_next(input)?.is_some() {
            value.push('\'');
        } else {
            break;
        }
    }
    Ok(TokenKind::Str(value))
}

fn lex_operator(input: &mut &str) -> PResult<TokenKind> {
    alt((
        // Two-character operators before their single-character prefixes
        "<>".value(TokenKind::Ne),
        "<=".value(TokenKind::Le),
        ">=".value(TokenKind::Ge),
        "=".value(TokenKind::Eq),
        "<".value(TokenKind::Lt),
        ">".value(TokenKind::Gt),
        "+".value(TokenKind::Plus),
        "-".value(TokenKind::Minus),
        "*".value(TokenKind::Star),
        "/".value(TokenKind::Slash),
        "%".value(TokenKind::Percent),
        "(".value(TokenKind::LParen),
        ")".value(TokenKind::RParen),
        ",".value(TokenKind::Comma),
    ))
    .parse_next(input)
}

fn lex_token(input: &mut &str) -> PResult<TokenKind> {
    alt((lex_string, lex_number, lex_operator, lex_ident)).parse_next(input)
}

/// Tokenize the entire input, attaching byte offsets.
pub fn tokenize(text: &str) -> Result<Vec<Token>, SelectorError> {
    let mut remaining = text;
    let mut tokens = Vec::new();

    loop {
        remaining = remaining.trim_start();
        let offset = text.len() - remaining.len();
        if remaining.is_empty() {
            tokens.push(Token {
                kind: TokenKind::Eof,
                offset,
            });
            break;
        }
        match lex_token(&mut remaining) {
            Ok(kind) => tokens.push(Token { kind, offset }),
            Err(_) => return Err(lex_error(remaining, offset)),
        }
    }

    Ok(tokens)
}

/// Describe why lexing stopped at this point.
fn lex_error(remaining: &str, offset: usize) -> SelectorError {
    let message = match remaining.chars().next() {
        Some('\'') => "unterminated string literal".to_string(),
        Some(c) if c.is_ascii_digit() || c == '.' => "malformed numeric literal".to_string(),
        Some(c) => format!("unrecognized character '{c}'"),
        None => "unexpected end of input".to_string(),
    };
    SelectorError::Syntax(SyntaxError::new(offset, message))
}
