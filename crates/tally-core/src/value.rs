//! Parsing of runtime variable values (panic-free).
//!
//! Values arrive as text from the host variable registry. Integers accept an
//! optional single leading `-` followed by ASCII digits only: no `+`, no
//! whitespace, no overflow. Classifier inputs are parsed as floats and must
//! consume the whole string.

/// Parse an integer update operand. Returns `None` on any malformed input or
/// on overflow.
pub fn parse_int(s: &str) -> Option<i64> {
    let (negative, digits) = match s.strip_prefix('-') {
        Some(rest) if !rest.is_empty() => (true, rest),
        _ => (false, s),
    };
    let magnitude = parse_unsigned(digits)?;
    Some(if negative { -magnitude } else { magnitude })
}

/// Parse a non-negative integer (no sign accepted).
pub fn parse_unsigned(s: &str) -> Option<i64> {
    if s.is_empty() {
        return None;
    }
    let mut acc: i64 = 0;
    for b in s.bytes() {
        if !b.is_ascii_digit() {
            return None;
        }
        acc = acc.checked_mul(10)?.checked_add(i64::from(b - b'0'))?;
    }
    Some(acc)
}

/// Parse a classifier input or a range boundary.
pub fn parse_number(s: &str) -> Option<f64> {
    if s.is_empty() || s.trim() != s {
        return None;
    }
    s.parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_accepts_sign_and_digits_only() {
        assert_eq!(parse_int("42"), Some(42));
        assert_eq!(parse_int("-42"), Some(-42));
        assert_eq!(parse_int("0"), Some(0));
        assert_eq!(parse_int("-"), None);
        assert_eq!(parse_int("+1"), None);
        assert_eq!(parse_int(" 1"), None);
        assert_eq!(parse_int("1a"), None);
        assert_eq!(parse_int("--1"), None);
        assert_eq!(parse_int(""), None);
    }

    #[test]
    fn int_rejects_overflow() {
        assert_eq!(parse_int("9223372036854775807"), Some(i64::MAX));
        assert_eq!(parse_int("9223372036854775808"), None);
    }

    #[test]
    fn number_requires_whole_string() {
        assert_eq!(parse_number("0.5"), Some(0.5));
        assert_eq!(parse_number("100"), Some(100.0));
        assert_eq!(parse_number("1e3"), Some(1000.0));
        assert_eq!(parse_number("0.5s"), None);
        assert_eq!(parse_number(" 1"), None);
        assert_eq!(parse_number("bad"), None);
    }
}
