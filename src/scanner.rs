//! # Lexical Scanner
//!
//! Pure scanning primitives over a configuration string. Every operation takes a
//! [`Cursor`] by value and hands back a new one; nothing is mutated in place, so a
//! failed match leaves the caller holding the position it started from.
//!
//! ## Character Classes
//!
//! Only ASCII is interpreted. Whitespace is the C locale class `{0x20, 0x09..=0x0D}`
//! (space, tab, LF, VT, FF, CR) and case folding maps `A..=Z` onto `a..=z`. Any
//! other byte, including every byte of a multi-byte UTF-8 sequence, is compared
//! verbatim and never folded.
//!
//! ## Operations
//!
//! * [`skip_whitespace`]: advance past the whitespace class
//! * [`match_case_insensitive`]: prefix match against a label, then skip trailing whitespace
//! * [`match_exact`]: forgiving equality (case and surrounding whitespace ignored,
//!   full consumption required)
//! * [`parse_float`]: floating-point literal with optional sign, fraction, exponent,
//!   and the `inf`/`infinity`/`nan` spellings
//!
//! ## Example
//!
//! ```
//! use objective_select::scanner::{match_case_insensitive, match_exact, parse_float, Cursor};
//!
//! let cursor = Cursor::new("Pseudo_Huber : delta = 2.5");
//! let after_name = match_case_insensitive(cursor, "pseudo_huber").unwrap();
//! assert_eq!(after_name.rest(), ": delta = 2.5");
//!
//! assert!(match_exact(Cursor::new("  RMSE \t"), "rmse"));
//!
//! let (value, after) = parse_float(Cursor::new(" -1.5e2 ;")).unwrap();
//! assert_eq!(value, -150.0);
//! assert_eq!(after.rest(), ";");
//! ```

use nom::{
    branch::alt,
    bytes::complete::{tag_no_case, take_till, take_while},
    character::complete::{char, digit0, digit1, one_of},
    combinator::{opt, recognize},
    error::{context, VerboseError},
    sequence::{pair, tuple},
    IResult,
};

pub type ParserResult<'a, T> = IResult<&'a str, T, VerboseError<&'a str>>;

/// An immutable position inside a configuration string.
///
/// The offset is always a UTF-8 character boundary in `0..=text.len()`. Cursors
/// are `Copy`; comparing two of them tells whether anything was consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor<'a> {
    text: &'a str,
    offset: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(text: &'a str) -> Self {
        Self { text, offset: 0 }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    /// The unconsumed remainder of the text.
    pub fn rest(&self) -> &'a str {
        &self.text[self.offset..]
    }

    pub fn is_at_end(&self) -> bool {
        self.offset == self.text.len()
    }

    /// The next byte, if any.
    pub fn peek(&self) -> Option<u8> {
        self.text.as_bytes().get(self.offset).copied()
    }

    /// Text consumed between `earlier` and this cursor.
    pub fn consumed_since(&self, earlier: Cursor<'a>) -> &'a str {
        debug_assert!(std::ptr::eq(self.text, earlier.text));
        &self.text[earlier.offset..self.offset]
    }

    /// Steps over `len` bytes. Callers only pass lengths of ASCII text they have
    /// already matched, which keeps the offset on a character boundary.
    pub(crate) fn advanced_by(self, len: usize) -> Self {
        debug_assert!(self.offset + len <= self.text.len());
        Self {
            text: self.text,
            offset: self.offset + len,
        }
    }

    /// Repositions the cursor onto `rest`, which must be a suffix of the text.
    fn with_rest(self, rest: &'a str) -> Self {
        debug_assert!(rest.len() <= self.text.len());
        Self {
            text: self.text,
            offset: self.text.len() - rest.len(),
        }
    }
}

/// The whitespace class recognised by the scanner.
pub fn is_whitespace(c: char) -> bool {
    c == ' ' || ('\t'..='\r').contains(&c)
}

fn whitespace0(input: &str) -> ParserResult<&str> {
    take_while(is_whitespace)(input)
}

/// Advances past any run of whitespace. Idempotent and infallible.
pub fn skip_whitespace(cursor: Cursor<'_>) -> Cursor<'_> {
    match whitespace0(cursor.rest()) {
        Ok((rest, _)) => cursor.with_rest(rest),
        Err(_) => cursor,
    }
}

/// Compares the remaining input against `label` with ASCII case folding.
///
/// On a full match of `label` the trailing whitespace is skipped as well and the
/// resulting cursor returned. Whatever follows is left for the caller to judge:
/// `"rmseX"` matches `"rmse"` here with `"X"` remaining. An empty label matches
/// immediately.
pub fn match_case_insensitive<'a>(cursor: Cursor<'a>, label: &str) -> Option<Cursor<'a>> {
    let rest = cursor.rest().as_bytes();
    let label = label.as_bytes();
    if rest.len() < label.len() || !rest[..label.len()].eq_ignore_ascii_case(label) {
        return None;
    }
    Some(skip_whitespace(cursor.advanced_by(label.len())))
}

/// Forgiving equality: the remaining text is exactly `label` up to letter case and
/// surrounding whitespace.
#[tracing::instrument(level = "trace", skip(cursor), fields(rest = cursor.rest()))]
pub fn match_exact(cursor: Cursor<'_>, label: &str) -> bool {
    match_case_insensitive(skip_whitespace(cursor), label).is_some_and(|after| after.is_at_end())
}

/// Spans the text up to (not including) the first byte in `stops`, or to the end.
pub fn take_until<'a>(cursor: Cursor<'a>, stops: &[u8]) -> (&'a str, Cursor<'a>) {
    let result: ParserResult<&str> =
        take_till(|c: char| c.is_ascii() && stops.contains(&(c as u8)))(cursor.rest());
    match result {
        Ok((rest, taken)) => (taken, cursor.with_rest(rest)),
        Err(_) => ("", cursor),
    }
}

fn decimal_literal(input: &str) -> ParserResult<&str> {
    recognize(pair(
        alt((
            recognize(pair(digit1, opt(pair(char('.'), digit0)))),
            recognize(pair(char('.'), digit1)),
        )),
        opt(tuple((one_of("eE"), opt(one_of("+-")), digit1))),
    ))(input)
}

fn special_literal(input: &str) -> ParserResult<&str> {
    alt((
        tag_no_case("infinity"),
        tag_no_case("inf"),
        tag_no_case("nan"),
    ))(input)
}

fn float_literal(input: &str) -> ParserResult<&str> {
    context(
        "float literal",
        recognize(pair(
            opt(one_of("+-")),
            alt((decimal_literal, special_literal)),
        )),
    )(input)
}

/// Parses a floating-point literal.
///
/// Leading whitespace is part of the grammar and trailing whitespace is skipped
/// after the literal. Returns `None`, consuming nothing, when no literal starts at
/// the cursor. A literal is the longest prefix that fits; `"1e"` yields `1.0` with
/// `"e"` left over.
///
/// Only decimal notation and `inf`/`infinity`/`nan` are recognised. Hexadecimal
/// floats are not: `"0x1p3"` yields `0.0` with `"x1p3"` left over, so a parameter
/// value written that way is malformed.
#[tracing::instrument(level = "trace", skip(cursor), fields(rest = cursor.rest()))]
pub fn parse_float(cursor: Cursor<'_>) -> Option<(f64, Cursor<'_>)> {
    let start = skip_whitespace(cursor);
    let (rest, literal) = float_literal(start.rest()).ok()?;
    if literal.is_empty() {
        return None;
    }
    let value = literal.parse::<f64>().ok()?;
    Some((value, skip_whitespace(start.with_rest(rest))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_skip_whitespace() {
        let cursor = skip_whitespace(Cursor::new(" \t\n\x0b\x0c\r rmse"));
        assert_eq!(cursor.rest(), "rmse");
        assert_eq!(skip_whitespace(cursor), cursor);

        let cursor = skip_whitespace(Cursor::new("rmse"));
        assert_eq!(cursor.offset(), 0);

        let cursor = skip_whitespace(Cursor::new(""));
        assert!(cursor.is_at_end());
    }

    #[test]
    fn test_non_ascii_space_is_not_whitespace() {
        let cursor = skip_whitespace(Cursor::new("\u{a0}rmse"));
        assert_eq!(cursor.offset(), 0);
    }

    #[test]
    fn test_match_case_insensitive() {
        let after = match_case_insensitive(Cursor::new("LoG_LoSs  :x"), "log_loss").unwrap();
        assert_eq!(after.rest(), ":x");

        let after = match_case_insensitive(Cursor::new("rmseX"), "RMSE").unwrap();
        assert_eq!(after.rest(), "X");

        assert!(match_case_insensitive(Cursor::new("rms"), "rmse").is_none());
        assert!(match_case_insensitive(Cursor::new("rmsf"), "rmse").is_none());
    }

    #[test]
    fn test_empty_label_matches_immediately() {
        let after = match_case_insensitive(Cursor::new("anything"), "").unwrap();
        assert_eq!(after.offset(), 0);
    }

    #[test]
    fn test_non_ascii_is_not_folded() {
        assert!(match_case_insensitive(Cursor::new("É"), "é").is_none());
        assert!(match_case_insensitive(Cursor::new("éx"), "é").is_some());
    }

    #[test]
    fn test_match_exact() {
        assert!(match_exact(Cursor::new("  rMsE  "), "rmse"));
        assert!(match_exact(Cursor::new("rmse"), "RMSE"));
        assert!(!match_exact(Cursor::new("rmse_log"), "rmse"));
        assert!(!match_exact(Cursor::new("rmse x"), "rmse"));
        assert!(!match_exact(Cursor::new(""), "rmse"));
    }

    #[test]
    fn test_parse_float() {
        let (value, after) = parse_float(Cursor::new("1.5")).unwrap();
        assert_eq!(value, 1.5);
        assert!(after.is_at_end());

        let (value, after) = parse_float(Cursor::new("  +2e3  ;next")).unwrap();
        assert_eq!(value, 2000.0);
        assert_eq!(after.rest(), ";next");

        let (value, _) = parse_float(Cursor::new(".25")).unwrap();
        assert_eq!(value, 0.25);

        let (value, _) = parse_float(Cursor::new("3.")).unwrap();
        assert_eq!(value, 3.0);

        let (value, after) = parse_float(Cursor::new("1e")).unwrap();
        assert_eq!(value, 1.0);
        assert_eq!(after.rest(), "e");
    }

    #[test]
    fn test_parse_float_rejects_hex_notation() {
        let (value, after) = parse_float(Cursor::new("0x1p3")).unwrap();
        assert_eq!(value, 0.0);
        assert_eq!(after.rest(), "x1p3");
        assert_eq!(after.offset(), 1);
    }

    #[test]
    fn test_parse_float_special_values() {
        let (value, _) = parse_float(Cursor::new("-INF")).unwrap();
        assert_eq!(value, f64::NEG_INFINITY);

        let (value, _) = parse_float(Cursor::new("Infinity")).unwrap();
        assert_eq!(value, f64::INFINITY);

        let (value, _) = parse_float(Cursor::new("nan")).unwrap();
        assert!(value.is_nan());
    }

    #[test]
    fn test_parse_float_consumes_nothing_on_failure() {
        assert!(parse_float(Cursor::new("abc")).is_none());
        assert!(parse_float(Cursor::new("   ")).is_none());
        assert!(parse_float(Cursor::new("-")).is_none());
        assert!(parse_float(Cursor::new(".")).is_none());
        assert!(parse_float(Cursor::new("")).is_none());
    }

    #[test]
    fn test_parse_float_never_reparses() {
        let (first, after) = parse_float(Cursor::new("1.5 2.5")).unwrap();
        assert_eq!(first, 1.5);
        let (second, after) = parse_float(after).unwrap();
        assert_eq!(second, 2.5);
        assert!(parse_float(after).is_none());
    }

    #[test]
    fn test_take_until() {
        let (taken, after) = take_until(Cursor::new(" delta = 1;x"), b"=;");
        assert_eq!(taken, " delta ");
        assert_eq!(after.rest(), "= 1;x");

        let (taken, after) = take_until(Cursor::new("abc"), b";");
        assert_eq!(taken, "abc");
        assert!(after.is_at_end());
    }

    #[test]
    fn test_consumed_since() {
        let start = Cursor::new("rmse : x");
        let after = match_case_insensitive(start, "rmse").unwrap();
        assert_eq!(after.consumed_since(start), "rmse ");
    }

    fn whitespace_strategy() -> impl Strategy<Value = String> {
        prop::collection::vec(prop::sample::select(vec![' ', '\t', '\n', '\x0b', '\x0c', '\r']), 0..4)
            .prop_map(|chars| chars.into_iter().collect())
    }

    proptest! {
        #[test]
        fn test_match_exact_ignores_case_and_padding(
            label in "[a-z_][a-z0-9_]{0,12}",
            upper in prop::collection::vec(any::<bool>(), 13),
            leading in whitespace_strategy(),
            trailing in whitespace_strategy(),
        ) {
            let folded: String = label
                .chars()
                .zip(upper.iter())
                .map(|(c, up)| if *up { c.to_ascii_uppercase() } else { c })
                .collect();
            let input = format!("{leading}{folded}{trailing}");
            prop_assert!(match_exact(Cursor::new(&input), &label));
        }

        #[test]
        fn test_extension_is_prefix_match_but_not_exact(
            label in "[a-z][a-z0-9_]{0,12}",
            extra in "[!-~]{1,6}",
        ) {
            let input = format!("{label}{extra}");
            prop_assert!(!match_exact(Cursor::new(&input), &label));
            let after = match_case_insensitive(Cursor::new(&input), &label);
            prop_assert!(after.is_some());
            prop_assert_eq!(after.map(|c| c.offset()), Some(label.len()));
        }

        #[test]
        fn test_parse_float_round_trips_finite_values(value in -1.0e12f64..1.0e12) {
            let text = format!("{value}");
            let (parsed, after) = parse_float(Cursor::new(&text)).unwrap();
            prop_assert_eq!(parsed, value);
            prop_assert!(after.is_at_end());
        }
    }
}
