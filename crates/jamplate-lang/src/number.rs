use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Rem, Sub};

/// A numeric value backed by an `f64`.
///
/// Rendering preserves integers: a value with no fractional part prints as
/// a signed 64-bit integer literal, anything else as the shortest
/// round-trip decimal.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Number(f64);

impl Number {
    pub fn new(value: f64) -> Self {
        Number(value)
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    pub fn to_int(self) -> i64 {
        self.0 as i64
    }

    /// Whether the value has no fractional part.
    pub fn is_int(&self) -> bool {
        self.0 % 1.0 == 0.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0.0
    }

    pub fn is_nan(&self) -> bool {
        self.0.is_nan()
    }

    /// Parse a numeric literal: decimal (optionally fractional), octal with
    /// a leading `0`, binary `0b…`, hex `0x…`. A trailing `D`, `d`, `L`,
    /// `l`, `F` or `f` is accepted and ignored.
    pub fn parse(text: &str) -> Option<Number> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        let (sign, digits) = match text.strip_prefix('-') {
            Some(rest) => (-1.0, rest),
            None => (1.0, text),
        };
        let digits = digits
            .strip_suffix(['D', 'd', 'L', 'l', 'F', 'f'])
            .filter(|_| !digits.starts_with("0x") && !digits.starts_with("0X"))
            .unwrap_or(digits);

        if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
            return i64::from_str_radix(hex, 16)
                .ok()
                .map(|v| Number(sign * v as f64));
        }
        if let Some(bin) = digits.strip_prefix("0b").or_else(|| digits.strip_prefix("0B")) {
            return i64::from_str_radix(bin, 2)
                .ok()
                .map(|v| Number(sign * v as f64));
        }
        if digits.len() > 1
            && digits.starts_with('0')
            && digits.bytes().all(|b| b.is_ascii_digit())
        {
            return i64::from_str_radix(digits, 8)
                .ok()
                .map(|v| Number(sign * v as f64));
        }
        digits.parse::<f64>().ok().map(|v| Number(sign * v))
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_int() {
            write!(f, "{}", self.0 as i64)
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl From<i64> for Number {
    fn from(value: i64) -> Self {
        Number(value as f64)
    }
}

impl From<i32> for Number {
    fn from(value: i32) -> Self {
        Number(value as f64)
    }
}

impl From<u32> for Number {
    fn from(value: u32) -> Self {
        Number(value as f64)
    }
}

impl From<usize> for Number {
    fn from(value: usize) -> Self {
        Number(value as f64)
    }
}

impl From<f64> for Number {
    fn from(value: f64) -> Self {
        Number(value)
    }
}

impl Neg for Number {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Number(-self.0)
    }
}

impl Add for Number {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Number(self.0 + other.0)
    }
}

impl Sub for Number {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Number(self.0 - other.0)
    }
}

impl Mul for Number {
    type Output = Self;

    fn mul(self, other: Self) -> Self {
        Number(self.0 * other.0)
    }
}

impl Div for Number {
    type Output = Self;

    fn div(self, other: Self) -> Self {
        Number(self.0 / other.0)
    }
}

impl Rem for Number {
    type Output = Self;

    fn rem(self, other: Self) -> Self {
        Number(self.0 % other.0)
    }
}

impl Eq for Number {}

impl PartialOrd for Number {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Number {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.0.is_nan(), other.0.is_nan()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => self.0.partial_cmp(&other.0).unwrap_or(Ordering::Less),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(42.0, "42")]
    #[case(-42.0, "-42")]
    #[case(42.5, "42.5")]
    #[case(0.1, "0.1")]
    #[case(0.0, "0")]
    #[case(17.0, "17")]
    #[case(1e17, "100000000000000000")]
    fn test_display(#[case] input: f64, #[case] expected: &str) {
        assert_eq!(Number::new(input).to_string(), expected);
    }

    #[rstest]
    #[case("42", Some(42.0))]
    #[case(" 42 ", Some(42.0))]
    #[case("42.5", Some(42.5))]
    #[case("-3", Some(-3.0))]
    #[case("0x1F", Some(31.0))]
    #[case("0X1f", Some(31.0))]
    #[case("0b101", Some(5.0))]
    #[case("010", Some(8.0))]
    #[case("0", Some(0.0))]
    #[case("12L", Some(12.0))]
    #[case("2.5f", Some(2.5))]
    #[case("3D", Some(3.0))]
    #[case("", None)]
    #[case("abc", None)]
    #[case("1+2", None)]
    fn test_parse(#[case] input: &str, #[case] expected: Option<f64>) {
        assert_eq!(Number::parse(input), expected.map(Number::new));
    }

    #[rstest]
    #[case(5.0, 2.0, "7", "3", "10", "2.5", "1")]
    #[case(-5.0, 2.0, "-3", "-7", "-10", "-2.5", "-1")]
    fn test_operations(
        #[case] a: f64,
        #[case] b: f64,
        #[case] add: &str,
        #[case] sub: &str,
        #[case] mul: &str,
        #[case] div: &str,
        #[case] rem: &str,
    ) {
        let a = Number::new(a);
        let b = Number::new(b);
        assert_eq!((a + b).to_string(), add);
        assert_eq!((a - b).to_string(), sub);
        assert_eq!((a * b).to_string(), mul);
        assert_eq!((a / b).to_string(), div);
        assert_eq!((a % b).to_string(), rem);
    }

    #[test]
    fn test_is_int() {
        assert!(Number::new(3.0).is_int());
        assert!(!Number::new(3.5).is_int());
        assert!(Number::new(-0.0).is_int());
    }
}
