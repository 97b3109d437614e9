//! Matcher implementations

use super::number::{numerals, NumeralKind};
use regex::Regex;

/// Location of a match inside the text handed to [`Matcher::find`]
#[derive(Debug, Clone, PartialEq)]
pub struct Found {
    /// Start position of the match
    pub start: usize,
    /// End position of the match
    pub end: usize,
    /// Captured groups (for regex)
    pub captures: Vec<String>,
}

impl Found {
    fn span(start: usize, end: usize) -> Self {
        Self {
            start,
            end,
            captures: vec![],
        }
    }
}

/// Trait for pattern matching against unconsumed output
pub trait Matcher: Send + Sync {
    /// Find the first match anywhere in `text`
    fn find(&self, text: &str) -> Option<Found>;
}

/// Literal matcher using Boyer-Moore-Horspool
pub struct LiteralMatcher {
    pattern: Vec<u8>,
    bad_char_table: [usize; 256],
}

impl LiteralMatcher {
    pub fn new(pattern: &str) -> Self {
        let pattern = pattern.as_bytes().to_vec();

        let mut bad_char_table = [pattern.len(); 256];
        for (i, &byte) in pattern.iter().enumerate().take(pattern.len().saturating_sub(1)) {
            bad_char_table[byte as usize] = pattern.len() - 1 - i;
        }

        Self {
            pattern,
            bad_char_table,
        }
    }
}

impl Matcher for LiteralMatcher {
    fn find(&self, text: &str) -> Option<Found> {
        let buffer = text.as_bytes();
        let len = self.pattern.len();

        if len == 0 {
            return Some(Found::span(0, 0));
        }

        // A valid UTF-8 needle can only match on char boundaries of valid UTF-8.
        let mut pos = 0;
        while pos + len <= buffer.len() {
            if buffer[pos..pos + len] == self.pattern[..] {
                return Some(Found::span(pos, pos + len));
            }
            pos += self.bad_char_table[buffer[pos + len - 1] as usize];
        }

        None
    }
}

/// Regex matcher
pub struct RegexMatcher {
    regex: Regex,
}

impl RegexMatcher {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            regex: Regex::new(pattern)?,
        })
    }
}

impl Matcher for RegexMatcher {
    fn find(&self, text: &str) -> Option<Found> {
        let captures = self.regex.captures(text)?;
        let full_match = captures.get(0)?;

        let captures = captures
            .iter()
            .map(|cap| cap.map(|c| c.as_str().to_string()).unwrap_or_default())
            .collect();

        Some(Found {
            start: full_match.start(),
            end: full_match.end(),
            captures,
        })
    }
}

/// Matches the first numeral run equal to an integer
pub struct IntegerMatcher {
    target: i64,
}

impl IntegerMatcher {
    pub fn new(target: i64) -> Self {
        Self { target }
    }
}

impl Matcher for IntegerMatcher {
    fn find(&self, text: &str) -> Option<Found> {
        numerals(text)
            .filter(|n| n.kind == NumeralKind::Integer)
            .find(|n| n.text.parse::<i64>().is_ok_and(|value| value == self.target))
            .map(|n| Found::span(n.start, n.end))
    }
}

/// Matches the first decimal run whose value is exactly a float
pub struct FloatMatcher {
    target: f64,
}

impl FloatMatcher {
    pub fn new(target: f64) -> Self {
        Self { target }
    }
}

impl Matcher for FloatMatcher {
    fn find(&self, text: &str) -> Option<Found> {
        numerals(text)
            .filter(|n| n.kind == NumeralKind::Decimal)
            .find(|n| n.text.parse::<f64>().is_ok_and(|value| value == self.target))
            .map(|n| Found::span(n.start, n.end))
    }
}
