//! The numeric kinds a counter can hold.
//!
//! `Numeric` is everything the handles need from a number: how it parses
//! from store text, how it is written as a command argument, how an integer
//! reply widens into it, and how it renders.

use bytes::Bytes;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericKind {
    Int64,
    Float64,
}

pub trait Numeric: Copy + PartialEq + fmt::Debug + Send + Sync + 'static {
    const KIND: NumericKind;
    const ZERO: Self;
    const ONE: Self;
    const MINUS_ONE: Self;

    fn from_integer(n: i64) -> Self;

    /// Parse store text; `None` when it is not a number of this kind.
    fn parse(text: &str) -> Option<Self>;

    /// Argument bytes for a command.
    fn to_arg(self) -> Bytes;

    fn checked_neg(self) -> Option<Self>;

    /// Rendering used by `Display` on handles and caches.
    fn fmt_value(self, f: &mut fmt::Formatter<'_>) -> fmt::Result;
}

impl Numeric for i64 {
    const KIND: NumericKind = NumericKind::Int64;
    const ZERO: Self = 0;
    const ONE: Self = 1;
    const MINUS_ONE: Self = -1;

    fn from_integer(n: i64) -> Self {
        n
    }

    fn parse(text: &str) -> Option<Self> {
        text.parse().ok()
    }

    fn to_arg(self) -> Bytes {
        Bytes::from(self.to_string())
    }

    fn checked_neg(self) -> Option<Self> {
        i64::checked_neg(self)
    }

    fn fmt_value(self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl Numeric for f64 {
    const KIND: NumericKind = NumericKind::Float64;
    const ZERO: Self = 0.0;
    const ONE: Self = 1.0;
    const MINUS_ONE: Self = -1.0;

    fn from_integer(n: i64) -> Self {
        n as f64
    }

    fn parse(text: &str) -> Option<Self> {
        text.parse().ok()
    }

    /// Shortest text that round-trips; the store parses it with strtold.
    fn to_arg(self) -> Bytes {
        Bytes::from(self.to_string())
    }

    fn checked_neg(self) -> Option<Self> {
        Some(-self)
    }

    fn fmt_value(self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}", self)
    }
}

/// An optional value rendered as the number or `NaN`.
pub struct DisplayValue<N>(pub Option<N>);

impl<N: Numeric> fmt::Display for DisplayValue<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(value) => value.fmt_value(f),
            None => f.write_str("NaN"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_parse() {
        assert_eq!(i64::parse("123"), Some(123));
        assert_eq!(i64::parse("-9223372036854775808"), Some(i64::MIN));
        assert_eq!(i64::parse("1.5"), None);
        assert_eq!(i64::parse("Gary"), None);
        assert_eq!(i64::parse(""), None);
    }

    #[test]
    fn test_float_parse() {
        assert_eq!(f64::parse("1.5"), Some(1.5));
        assert_eq!(f64::parse("123"), Some(123.0));
        assert_eq!(f64::parse("-0.25e2"), Some(-25.0));
        assert_eq!(f64::parse("Gary"), None);
    }

    #[test]
    fn test_args() {
        assert_eq!(&(-555i64).to_arg()[..], b"-555");
        assert_eq!(&1.5f64.to_arg()[..], b"1.5");
        assert_eq!(&3.0f64.to_arg()[..], b"3");
    }

    #[test]
    fn test_negation() {
        assert_eq!(5i64.checked_neg(), Some(-5));
        assert_eq!(i64::MIN.checked_neg(), None);
        assert_eq!(Numeric::checked_neg(2.5f64), Some(-2.5));
    }

    #[test]
    fn test_display_value() {
        assert_eq!(DisplayValue(Some(678i64)).to_string(), "678");
        assert_eq!(DisplayValue(Some(1.5f64)).to_string(), "1.500000");
        assert_eq!(DisplayValue::<i64>(None).to_string(), "NaN");
    }
}
