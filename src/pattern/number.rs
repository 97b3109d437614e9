//! Numeral tokenizing for numeric expectations
//!
//! Output is split into maximal numeral runs. A run starts at a digit, or at a
//! `-` directly followed by a digit, and never starts in the middle of another
//! run. This is what keeps `1` from matching inside `21` while still accepting
//! it inside `a1b`.

/// Shape of a numeral run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumeralKind {
    /// `-?digits`
    Integer,
    /// `-?digits.digits`
    Decimal,
    /// More than one fractional group, such as `1.2.3`
    Malformed,
}

/// A numeral run found in text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Numeral<'a> {
    pub start: usize,
    pub end: usize,
    pub text: &'a str,
    pub kind: NumeralKind,
}

/// Iterator over the numeral runs of a string, left to right.
pub struct Numerals<'a> {
    text: &'a str,
    pos: usize,
}

/// Tokenize `text` into numeral runs.
pub fn numerals(text: &str) -> Numerals<'_> {
    Numerals { text, pos: 0 }
}

fn is_digit_at(bytes: &[u8], index: usize) -> bool {
    bytes.get(index).is_some_and(u8::is_ascii_digit)
}

fn skip_digits(bytes: &[u8], mut index: usize) -> usize {
    while is_digit_at(bytes, index) {
        index += 1;
    }
    index
}

impl<'a> Iterator for Numerals<'a> {
    type Item = Numeral<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let bytes = self.text.as_bytes();

        while self.pos < bytes.len() {
            let start = self.pos;
            let signed = bytes[start] == b'-' && is_digit_at(bytes, start + 1);

            if !signed && !bytes[start].is_ascii_digit() {
                self.pos += 1;
                continue;
            }

            let mut end = skip_digits(bytes, start + usize::from(signed));
            let mut kind = NumeralKind::Integer;

            while bytes.get(end) == Some(&b'.') && is_digit_at(bytes, end + 1) {
                kind = match kind {
                    NumeralKind::Integer => NumeralKind::Decimal,
                    _ => NumeralKind::Malformed,
                };
                end = skip_digits(bytes, end + 1);
            }

            self.pos = end;

            // Runs begin and end on ASCII bytes, so these are char boundaries.
            return Some(Numeral {
                start,
                end,
                text: &self.text[start..end],
                kind,
            });
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runs(text: &str) -> Vec<(&str, NumeralKind)> {
        numerals(text).map(|n| (n.text, n.kind)).collect()
    }

    #[test]
    fn test_integer_runs() {
        assert_eq!(runs("21"), vec![("21", NumeralKind::Integer)]);
        assert_eq!(runs("a1b"), vec![("1", NumeralKind::Integer)]);
        assert_eq!(
            runs("1 and 22\n"),
            vec![("1", NumeralKind::Integer), ("22", NumeralKind::Integer)]
        );
    }

    #[test]
    fn test_negative_runs() {
        assert_eq!(runs("-1"), vec![("-1", NumeralKind::Integer)]);
        assert_eq!(
            runs("2-1"),
            vec![("2", NumeralKind::Integer), ("-1", NumeralKind::Integer)]
        );
        assert_eq!(runs("--5"), vec![("-5", NumeralKind::Integer)]);
        assert_eq!(runs("x - 5"), vec![("5", NumeralKind::Integer)]);
    }

    #[test]
    fn test_decimal_runs() {
        assert_eq!(runs("1.0"), vec![("1.0", NumeralKind::Decimal)]);
        assert_eq!(runs("a1.0b"), vec![("1.0", NumeralKind::Decimal)]);
        assert_eq!(runs("-3.25"), vec![("-3.25", NumeralKind::Decimal)]);
    }

    #[test]
    fn test_trailing_dot_is_not_decimal() {
        assert_eq!(runs("The answer is 1."), vec![("1", NumeralKind::Integer)]);
    }

    #[test]
    fn test_malformed_runs() {
        assert_eq!(runs("1.2.3"), vec![("1.2.3", NumeralKind::Malformed)]);
    }

    #[test]
    fn test_offsets_with_multibyte_text() {
        let text = "größe: 42";
        let numeral = numerals(text).next().unwrap();
        assert_eq!(&text[numeral.start..numeral.end], "42");
    }

    #[test]
    fn test_no_numerals() {
        assert!(runs("no digits here - at all.").is_empty());
    }
}
