//! SQL LIKE pattern matching.

use super::error::{Result, SelectorError};

/// One element of a compiled pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Wild {
    /// `%`: any run of zero or more characters.
    AnyRun,
    /// `_`: exactly one character.
    AnyOne,
    /// A character matched verbatim.
    Lit(char),
}

/// A compiled LIKE pattern. Matches the whole subject, anchored at both
/// ends, never as a substring search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LikeMatcher {
    ops: Vec<Wild>,
}

impl LikeMatcher {
    /// Compile a pattern with an optional escape character. The escape
    /// character makes the character after it literal, whatever it is; a
    /// trailing escape with nothing left to escape fails compilation.
    pub fn compile(pattern: &str, escape: Option<char>) -> Result<Self> {
        let mut ops = Vec::new();
        let mut chars = pattern.chars();

        while let Some(c) = chars.next() {
            if escape == Some(c) {
                match chars.next() {
                    Some(next) => ops.push(Wild::Lit(next)),
                    None => {
                        return Err(SelectorError::config(format!(
                            "LIKE pattern '{pattern}' ends with a dangling escape character"
                        )));
                    }
                }
            } else if c == '%' {
                // Runs of % collapse to one
                if ops.last() != Some(&Wild::AnyRun) {
                    ops.push(Wild::AnyRun);
                }
            } else if c == '_' {
                ops.push(Wild::AnyOne);
            } else {
                ops.push(Wild::Lit(c));
            }
        }

        Ok(Self { ops })
    }

    /// Test a subject string against the compiled pattern.
    pub fn test(&self, subject: &str) -> bool {
        let chars: Vec<char> = subject.chars().collect();
        match_from(&self.ops, &chars)
    }
}

fn match_from(ops: &[Wild], subject: &[char]) -> bool {
    match ops.split_first() {
        None => subject.is_empty(),
        Some((Wild::Lit(c), rest)) => {
            subject.first() == Some(c) && match_from(rest, &subject[1..])
        }
        Some((Wild::AnyOne, rest)) => !subject.is_empty() && match_from(rest, &subject[1..]),
        Some((Wild::AnyRun, rest)) => {
            (0..=subject.len()).any(|skip| match_from(rest, &subject[skip..]))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(pattern: &str, escape: Option<char>) -> LikeMatcher {
        LikeMatcher::compile(pattern, escape).unwrap()
    }

    #[test]
    fn percent_matches_any_run() {
        let m = compile("Jo%n", None);
        assert!(m.test("John"));
        assert!(m.test("Jon"));
        assert!(m.test("Jonathon"));
        assert!(!m.test("Joan of Arc"));
    }

    #[test]
    fn underscore_matches_exactly_one() {
        let m = compile("Bi__y", None);
        assert!(m.test("Billy"));
        assert!(!m.test("Bily"));
        assert!(!m.test("Billly"));
    }

    #[test]
    fn matching_is_anchored() {
        let m = compile("bud", None);
        assert!(m.test("bud"));
        assert!(!m.test("rosebud"));
        assert!(!m.test("buddy"));
    }

    #[test]
    fn escape_turns_wildcards_literal() {
        let m = compile("George#_%", Some('#'));
        assert!(m.test("George_"));
        assert!(m.test("George_123"));
        assert!(!m.test("George"));
        assert!(!m.test("George123"));
    }

    #[test]
    fn escape_escapes_itself() {
        let m = compile("50##%", Some('#'));
        assert!(m.test("50#"));
        assert!(m.test("50#off"));
        assert!(!m.test("50"));
    }

    #[test]
    fn dangling_escape_is_rejected() {
        let err = LikeMatcher::compile("abc#", Some('#')).unwrap_err();
        assert!(matches!(err, SelectorError::Config(_)));
    }

    #[test]
    fn empty_pattern_matches_only_empty() {
        let m = compile("", None);
        assert!(m.test(""));
        assert!(!m.test("x"));
    }

    #[test]
    fn consecutive_percents_collapse() {
        let m = compile("a%%b", None);
        assert!(m.test("ab"));
        assert!(m.test("a123b"));
    }
}
