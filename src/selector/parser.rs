//! Parser for selector text.
//!
//! Grammar (in rough EBNF), lowest to highest precedence:
//!
//! expr           = or_expr
//! or_expr        = and_expr ("OR" and_expr)*
//! and_expr       = not_expr ("AND" not_expr)*
//! not_expr       = "NOT" not_expr | comparison
//! comparison     = additive ( comp_op additive
//!                           | ["NOT"] "LIKE" string ["ESCAPE" string]
//!                           | ["NOT"] "BETWEEN" additive "AND" additive
//!                           | ["NOT"] "IN" "(" string ("," string)* ")"
//!                           | "IS" ["NOT"] "NULL" )?
//! comp_op        = "=" | "<>" | "<" | "<=" | ">" | ">="
//! additive       = multiplicative (("+" | "-") multiplicative)*
//! multiplicative = unary (("*" | "/" | "%") unary)*
//! unary          = "-" unary | primary
//! primary        = literal | identifier | "(" expr ")"
//!
//! The comparison suffix binds to a single left operand, so `a LIKE 'x'`
//! and `a BETWEEN 1 AND 2` are not re-entrant on the left side. LIKE
//! patterns and IN elements must be string literals.

use super::ast::{ArithOp, CompareOp, Expr, Value};
use super::error::{Result, SelectorError, SyntaxError};
use super::lexer::{Keyword, Token, TokenKind, tokenize};
use super::pattern::LikeMatcher;

/// Parser state.
struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Parser { tokens, pos: 0 }
    }

    fn peek(&self) -> &TokenKind {
        self.tokens
            .get(self.pos)
            .map(|t| &t.kind)
            .unwrap_or(&TokenKind::Eof)
    }

    fn offset(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|t| t.offset)
            .unwrap_or(0)
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek() == kind {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, kw: Keyword) -> bool {
        self.eat(&TokenKind::Keyword(kw))
    }

    fn expect(&mut self, expected: TokenKind) -> Result<()> {
        if *self.peek() == expected {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.unexpected(&format!("expected {expected}")))
        }
    }

    fn expect_string(&mut self, what: &str) -> Result<String> {
        if let TokenKind::Str(s) = self.peek() {
            let s = s.clone();
            self.pos += 1;
            Ok(s)
        } else {
            Err(self.unexpected(what))
        }
    }

    fn unexpected(&self, what: &str) -> SelectorError {
        SelectorError::Syntax(SyntaxError::new(
            self.offset(),
            format!("{what}, found {}", self.peek()),
        ))
    }

    fn parse_expr(&mut self) -> Result<Expr> {
        self.parse_or()
    }

    /// or_expr = and_expr ("OR" and_expr)*
    fn parse_or(&mut self) -> Result<Expr> {
        let mut left = self.parse_and()?;
        while self.eat_keyword(Keyword::Or) {
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    /// and_expr = not_expr ("AND" not_expr)*
    fn parse_and(&mut self) -> Result<Expr> {
        let mut left = self.parse_not()?;
        while self.eat_keyword(Keyword::And) {
            let right = self.parse_not()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    /// not_expr = "NOT" not_expr | comparison
    fn parse_not(&mut self) -> Result<Expr> {
        if self.eat_keyword(Keyword::Not) {
            let operand = self.parse_not()?;
            Ok(Expr::Not(Box::new(operand)))
        } else {
            self.parse_comparison()
        }
    }

    /// comparison = additive with an optional suffix bound to it
    fn parse_comparison(&mut self) -> Result<Expr> {
        let left = self.parse_additive()?;

        let op = match self.peek() {
            TokenKind::Eq => Some(CompareOp::Eq),
            TokenKind::Ne => Some(CompareOp::Ne),
            TokenKind::Lt => Some(CompareOp::Lt),
            TokenKind::Le => Some(CompareOp::Le),
            TokenKind::Gt => Some(CompareOp::Gt),
            TokenKind::Ge => Some(CompareOp::Ge),
            _ => None,
        };
        if let Some(op) = op {
            self.pos += 1;
            let right = self.parse_additive()?;
            return Ok(Expr::Compare {
                op,
                left: Box::new(left),
                right: Box::new(right),
            });
        }

        match self.peek() {
            TokenKind::Keyword(Keyword::Not) => {
                self.pos += 1;
                match self.peek() {
                    TokenKind::Keyword(Keyword::Like) => self.parse_like(left, true),
                    TokenKind::Keyword(Keyword::Between) => self.parse_between(left, true),
                    TokenKind::Keyword(Keyword::In) => self.parse_in(left, true),
                    _ => Err(self.unexpected("expected LIKE, BETWEEN, or IN after NOT")),
                }
            }
            TokenKind::Keyword(Keyword::Like) => self.parse_like(left, false),
            TokenKind::Keyword(Keyword::Between) => self.parse_between(left, false),
            TokenKind::Keyword(Keyword::In) => self.parse_in(left, false),
            TokenKind::Keyword(Keyword::Is) => {
                self.pos += 1;
                let negated = self.eat_keyword(Keyword::Not);
                self.expect(TokenKind::Keyword(Keyword::Null))?;
                Ok(Expr::IsNull {
                    subject: Box::new(left),
                    negated,
                })
            }
            _ => Ok(left),
        }
    }

    /// "LIKE" string ["ESCAPE" string]; the matcher compiles here so a bad
    /// pattern fails at parse time.
    fn parse_like(&mut self, subject: Expr, negated: bool) -> Result<Expr> {
        self.pos += 1; // consume LIKE
        let pattern = self.expect_string("expected string literal after LIKE")?;

        let escape = if self.eat_keyword(Keyword::Escape) {
            let text = self.expect_string("expected string literal after ESCAPE")?;
            let mut chars = text.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Some(c),
                _ => {
                    return Err(SelectorError::config(format!(
                        "ESCAPE must be a single character, got '{text}'"
                    )));
                }
            }
        } else {
            None
        };

        let matcher = LikeMatcher::compile(&pattern, escape)?;
        Ok(Expr::Like {
            subject: Box::new(subject),
            pattern,
            escape,
            matcher,
            negated,
        })
    }

    /// "BETWEEN" additive "AND" additive
    fn parse_between(&mut self, subject: Expr, negated: bool) -> Result<Expr> {
        self.pos += 1; // consume BETWEEN
        let low = self.parse_additive()?;
        self.expect(TokenKind::Keyword(Keyword::And))?;
        let high = self.parse_additive()?;
        Ok(Expr::Between {
            subject: Box::new(subject),
            low: Box::new(low),
            high: Box::new(high),
            negated,
        })
    }

    /// "IN" "(" string ("," string)* ")"
    fn parse_in(&mut self, subject: Expr, negated: bool) -> Result<Expr> {
        self.pos += 1; // consume IN
        self.expect(TokenKind::LParen)?;
        let mut set = vec![self.expect_string("expected string literal in IN list")?];
        while self.eat(&TokenKind::Comma) {
            set.push(self.expect_string("expected string literal in IN list")?);
        }
        self.expect(TokenKind::RParen)?;
        Ok(Expr::In {
            subject: Box::new(subject),
            set,
            negated,
        })
    }

    /// additive = multiplicative (("+" | "-") multiplicative)*
    fn parse_additive(&mut self) -> Result<Expr> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                TokenKind::Plus => ArithOp::Add,
                TokenKind::Minus => ArithOp::Sub,
                _ => break,
            };
            self.pos += 1;
            let right = self.parse_multiplicative()?;
            left = Expr::Arith {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    /// multiplicative = unary (("*" | "/" | "%") unary)*
    fn parse_multiplicative(&mut self) -> Result<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                TokenKind::Star => ArithOp::Mul,
                TokenKind::Slash => ArithOp::Div,
                TokenKind::Percent => ArithOp::Rem,
                _ => break,
            };
            self.pos += 1;
            let right = self.parse_unary()?;
            left = Expr::Arith {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    /// unary = "-" unary | primary
    fn parse_unary(&mut self) -> Result<Expr> {
        if self.eat(&TokenKind::Minus) {
            let operand = self.parse_unary()?;
            Ok(Expr::Neg(Box::new(operand)))
        } else {
            self.parse_primary()
        }
    }

    /// primary = literal | identifier | "(" expr ")"
    fn parse_primary(&mut self) -> Result<Expr> {
        match self.peek().clone() {
            TokenKind::Ident(name) => {
                self.pos += 1;
                Ok(Expr::Ident(name))
            }
            TokenKind::Str(s) => {
                self.pos += 1;
                Ok(Expr::Literal(Value::Str(s)))
            }
            TokenKind::Int(n) => {
                self.pos += 1;
                Ok(Expr::Literal(Value::Int(n)))
            }
            TokenKind::Real(x) => {
                self.pos += 1;
                Ok(Expr::Literal(Value::Real(x)))
            }
            TokenKind::Keyword(Keyword::True) => {
                self.pos += 1;
                Ok(Expr::Literal(Value::Bool(true)))
            }
            TokenKind::Keyword(Keyword::False) => {
                self.pos += 1;
                Ok(Expr::Literal(Value::Bool(false)))
            }
            TokenKind::LParen => {
                self.pos += 1;
                let inner = self.parse_expr()?;
                self.expect(TokenKind::RParen)?;
                Ok(inner)
            }
            TokenKind::Eof => Err(self.unexpected("expected an operand")),
            _ => Err(self.unexpected("expected a literal, identifier, or '('")),
        }
    }
}

/// Parse filter text into a compiled expression tree.
pub fn parse(text: &str) -> Result<Expr> {
    if text.trim().is_empty() {
        return Err(SelectorError::Syntax(SyntaxError::new(
            0,
            "filter text is empty or blank",
        )));
    }

    let tokens = match tokenize(text) {
        Ok(tokens) => tokens,
        Err(SelectorError::Syntax(inner)) => {
            return Err(SelectorError::Syntax(SyntaxError::with_cause(
                inner.offset,
                "invalid filter expression",
                inner.message,
            )));
        }
        Err(other) => return Err(other),
    };

    let mut parser = Parser::new(tokens);
    let expr = parser.parse_expr()?;

    if *parser.peek() != TokenKind::Eof {
        return Err(parser.unexpected("unexpected input after expression"));
    }

    Ok(expr)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_comparison() {
        let expr = parse("name = 'Bud'").unwrap();
        assert_eq!(
            expr,
            Expr::Compare {
                op: CompareOp::Eq,
                left: Box::new(Expr::Ident("name".into())),
                right: Box::new(Expr::Literal(Value::Str("Bud".into()))),
            }
        );
    }

    #[test]
    fn test_and_binds_tighter_than_or() {
        let expr = parse("a = 1 OR b = 2 AND c = 3").unwrap();
        let Expr::Or(_, right) = expr else {
            panic!("expected OR at the root");
        };
        assert!(matches!(*right, Expr::And(_, _)));
    }

    #[test]
    fn test_not_binds_tighter_than_and() {
        let expr = parse("NOT a = 1 AND b = 2").unwrap();
        let Expr::And(left, _) = expr else {
            panic!("expected AND at the root");
        };
        assert!(matches!(*left, Expr::Not(_)));
    }

    #[test]
    fn test_multiplication_binds_tighter_than_addition() {
        let expr = parse("a + b * 2 > 10").unwrap();
        let Expr::Compare { left, .. } = expr else {
            panic!("expected comparison at the root");
        };
        let Expr::Arith { op, right, .. } = *left else {
            panic!("expected arithmetic left operand");
        };
        assert_eq!(op, ArithOp::Add);
        assert!(matches!(
            *right,
            Expr::Arith {
                op: ArithOp::Mul,
                ..
            }
        ));
    }

    #[test]
    fn test_not_like_suffix() {
        let expr = parse("name NOT LIKE 'Bi__y'").unwrap();
        let Expr::Like {
            pattern, negated, ..
        } = expr
        else {
            panic!("expected LIKE");
        };
        assert_eq!(pattern, "Bi__y");
        assert!(negated);
    }

    #[test]
    fn test_like_with_escape() {
        let expr = parse("name LIKE 'George#_%' ESCAPE '#'").unwrap();
        let Expr::Like { escape, .. } = expr else {
            panic!("expected LIKE");
        };
        assert_eq!(escape, Some('#'));
    }

    #[test]
    fn test_between_consumes_its_and() {
        let expr = parse("range BETWEEN 200 AND 300 AND name = 'x'").unwrap();
        let Expr::And(left, _) = expr else {
            panic!("expected logical AND at the root");
        };
        assert!(matches!(*left, Expr::Between { .. }));
    }

    #[test]
    fn test_in_list_of_strings() {
        let expr = parse("country IN ('UK', 'US')").unwrap();
        let Expr::In { set, negated, .. } = expr else {
            panic!("expected IN");
        };
        assert_eq!(set, vec!["UK".to_string(), "US".to_string()]);
        assert!(!negated);
    }

    #[test]
    fn test_is_not_null() {
        let expr = parse("missing IS NOT NULL").unwrap();
        assert!(matches!(expr, Expr::IsNull { negated: true, .. }));
    }

    #[test]
    fn test_nested_parentheses() {
        let expr = parse("((a = 1 OR b = 2)) AND c = 3").unwrap();
        let Expr::And(left, _) = expr else {
            panic!("expected AND at the root");
        };
        assert!(matches!(*left, Expr::Or(_, _)));
    }

    #[test]
    fn test_adjacent_terms_are_rejected() {
        let err = parse("name = 'Bud' tenant_id = 'iplantc.org'").unwrap_err();
        assert!(err.to_string().contains("unexpected input after expression"));
    }

    #[test]
    fn test_missing_operand_is_rejected() {
        assert!(parse("int1 > AND int2 <> 5").is_err());
        assert!(parse("date BETWEEN 100 AND ").is_err());
        assert!(parse("a = ").is_err());
    }

    #[test]
    fn test_unterminated_string_is_wrapped() {
        let err = parse("name NOT LIKE '").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("invalid filter expression"));
        assert!(msg.contains("[unterminated string literal]"));
    }

    #[test]
    fn test_in_requires_string_literals() {
        assert!(parse("price IN (10, 20)").is_err());
        assert!(parse("country IN ('UK', 'US'").is_err());
        assert!(parse("country IN ('UK',)").is_err());
    }

    #[test]
    fn test_like_pattern_must_be_a_string_literal() {
        assert!(parse("name LIKE pattern").is_err());
        assert!(parse("name LIKE 123").is_err());
    }

    #[test]
    fn test_escape_must_be_single_character() {
        let err = parse("name LIKE 'a%' ESCAPE '##'").unwrap_err();
        assert!(matches!(err, SelectorError::Config(_)));
    }

    #[test]
    fn test_dangling_escape_fails_at_parse_time() {
        let err = parse("name LIKE 'abc#' ESCAPE '#'").unwrap_err();
        assert!(matches!(err, SelectorError::Config(_)));
    }

    #[test]
    fn test_function_call_shapes_are_rejected() {
        assert!(parse("REGEX('^a.c', 'abc')").is_err());
    }

    #[test]
    fn test_empty_filter_is_rejected() {
        assert!(parse("").is_err());
        assert!(parse("   ").is_err());
    }

    #[test]
    fn test_null_is_not_a_literal_operand() {
        assert!(parse("a = NULL").is_err());
    }
}
