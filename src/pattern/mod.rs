//! Expectations and the matchers behind them

mod matcher;
mod number;

pub(crate) use matcher::Matcher;

use matcher::{FloatMatcher, IntegerMatcher, LiteralMatcher, RegexMatcher};
use std::fmt;
use std::io::{self, Read};

/// The value a [`stdout`](crate::Process::stdout) assertion looks for.
#[derive(Debug, Clone, PartialEq)]
pub enum Expected {
    /// Text, matched as a regex or verbatim depending on the expectation's flag.
    Text(String),

    /// An integer numeral such as `42` or `-1`.
    ///
    /// Only a whole numeral run counts: `1` matches `a1b` but not `21` or `1.0`.
    Int(i64),

    /// A decimal numeral such as `1.0`, compared by exact value.
    ///
    /// Integer-only output never matches: `1.0` does not match `1`.
    Float(f64),
}

impl fmt::Display for Expected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expected::Text(text) => write!(f, "{text:?}"),
            Expected::Int(n) => write!(f, "{n}"),
            Expected::Float(x) => write!(f, "{x:?}"),
        }
    }
}

/// One expectation on the output of a process.
///
/// Text is matched as a regular expression by default. Turn that off with
/// [`Expectation::literal`] or [`Expectation::regex`] when the expected text
/// contains characters like `.` or `(` that should be taken verbatim.
///
/// Most callers never build one explicitly: strings, integers and floats
/// convert into an `Expectation` wherever one is accepted.
///
/// # Examples
///
/// ```
/// use checkproc::{Expectation, Expected};
///
/// let pattern: Expectation = "total: \\d+".into();
/// let verbatim = Expectation::literal("3.14 (approx)");
/// let number: Expectation = 42.into();
///
/// assert!(pattern.is_regex());
/// assert!(!verbatim.is_regex());
/// assert_eq!(number.expected(), &Expected::Int(42));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Expectation {
    expected: Expected,
    regex: bool,
    label: Option<String>,
}

impl Expectation {
    /// Create an expectation with regex matching enabled.
    pub fn new(expected: impl Into<Expected>) -> Self {
        Self {
            expected: expected.into(),
            regex: true,
            label: None,
        }
    }

    /// Create a text expectation matched verbatim.
    pub fn literal(text: impl Into<String>) -> Self {
        Self::new(Expected::Text(text.into())).regex(false)
    }

    /// Read a reference text in full and expect it in the output.
    ///
    /// The content is treated exactly like a string expectation, regex
    /// matching included.
    ///
    /// # Errors
    ///
    /// Returns an error if the reader fails or yields invalid UTF-8.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use checkproc::Expectation;
    /// use std::fs::File;
    ///
    /// # fn example() -> std::io::Result<()> {
    /// let expected = Expectation::from_reader(File::open("expected.txt")?)?.regex(false);
    /// # Ok(())
    /// # }
    /// ```
    pub fn from_reader(mut reader: impl Read) -> io::Result<Self> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        Ok(Self::new(Expected::Text(text)))
    }

    /// Enable or disable regex matching for text expectations.
    ///
    /// Has no effect on numeric expectations.
    pub fn regex(mut self, enabled: bool) -> Self {
        self.regex = enabled;
        self
    }

    /// Use `label` instead of the raw expectation in failure messages.
    pub fn described_as(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// The expected value.
    pub fn expected(&self) -> &Expected {
        &self.expected
    }

    /// Whether text is matched as a regex.
    pub fn is_regex(&self) -> bool {
        self.regex
    }

    /// Human-readable description used in failure messages.
    pub fn describe(&self) -> String {
        match &self.label {
            Some(label) => label.clone(),
            None => self.expected.to_string(),
        }
    }

    /// Whether this expectation matches numerals rather than text.
    pub(crate) fn is_numeric(&self) -> bool {
        matches!(self.expected, Expected::Int(_) | Expected::Float(_))
    }

    pub(crate) fn to_matcher(&self) -> Result<Box<dyn Matcher>, regex::Error> {
        Ok(match &self.expected {
            Expected::Text(text) if self.regex => Box::new(RegexMatcher::new(text)?),
            Expected::Text(text) => Box::new(LiteralMatcher::new(text)),
            Expected::Int(n) => Box::new(IntegerMatcher::new(*n)),
            Expected::Float(x) => Box::new(FloatMatcher::new(*x)),
        })
    }
}

macro_rules! impl_from {
    ($($ty:ty => |$v:ident| $body:expr),* $(,)?) => {
        $(
            impl From<$ty> for Expected {
                fn from($v: $ty) -> Self {
                    $body
                }
            }

            impl From<$ty> for Expectation {
                fn from(value: $ty) -> Self {
                    Expectation::new(value)
                }
            }
        )*
    };
}

impl_from! {
    &str => |v| Expected::Text(v.to_string()),
    String => |v| Expected::Text(v),
    &String => |v| Expected::Text(v.clone()),
    i64 => |v| Expected::Int(v),
    i32 => |v| Expected::Int(i64::from(v)),
    u32 => |v| Expected::Int(i64::from(v)),
    f64 => |v| Expected::Float(v),
    f32 => |v| Expected::Float(f64::from(v)),
}

impl From<Expected> for Expectation {
    fn from(expected: Expected) -> Self {
        Expectation::new(expected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_regex() {
        let expectation = Expectation::from(".o.");
        assert!(expectation.is_regex());
        assert!(expectation.to_matcher().unwrap().find("foo").is_some());
    }

    #[test]
    fn test_literal_disables_regex() {
        let expectation = Expectation::literal(".o.");
        assert!(expectation.to_matcher().unwrap().find("foo").is_none());
    }

    #[test]
    fn test_numeric_ignores_regex_flag() {
        let expectation = Expectation::from(1).regex(false);
        assert!(expectation.to_matcher().unwrap().find("a1b").is_some());
    }

    #[test]
    fn test_invalid_regex() {
        assert!(Expectation::from("(unclosed").to_matcher().is_err());
        assert!(Expectation::literal("(unclosed").to_matcher().is_ok());
    }

    #[test]
    fn test_from_reader() {
        let expectation = Expectation::from_reader(".a.".as_bytes()).unwrap();
        assert_eq!(expectation.expected(), &Expected::Text(".a.".into()));
        assert!(expectation.is_regex());
        assert!(expectation.to_matcher().unwrap().find("bar\n").is_some());
    }

    #[test]
    fn test_from_reader_invalid_utf8() {
        let bytes: &[u8] = &[0xFF, 0xFE];
        assert!(Expectation::from_reader(bytes).is_err());
    }

    #[test]
    fn test_is_numeric() {
        assert!(Expectation::from(2).is_numeric());
        assert!(Expectation::from(2.5).is_numeric());
        assert!(!Expectation::from("2").is_numeric());
    }

    #[test]
    fn test_describe() {
        assert_eq!(Expectation::from("foo\n").describe(), "\"foo\\n\"");
        assert_eq!(Expectation::from(-3).describe(), "-3");
        assert_eq!(Expectation::from(1.0).describe(), "1.0");
        assert_eq!(
            Expectation::from(r"\d+ items").described_as("an item count").describe(),
            "an item count"
        );
    }
}
