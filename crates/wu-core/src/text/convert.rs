use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// Decimal or exponent notation with optional sign and surrounding whitespace.
static NUMERIC_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*[+-]?(?:[0-9]+(?:\.[0-9]*)?|\.[0-9]+)(?:[eE][+-]?[0-9]+)?\s*$").unwrap()
});

/// Whether `input` is a plain numeric string (`"12"`, `" -1.5e3 "`, `".5"`).
pub fn is_numeric(input: &str) -> bool {
    NUMERIC_RE.is_match(input)
}

/// Parse a numeric string as a float.
pub fn make_float(input: &str) -> Option<f64> {
    if !is_numeric(input) {
        return None;
    }
    input.trim().parse().ok()
}

/// Parse a numeric string as an integer. Fractions are truncated toward zero.
pub fn make_int(input: &str) -> Option<i64> {
    if !is_numeric(input) {
        return None;
    }
    let trimmed = input.trim();
    match trimmed.parse::<i64>() {
        Ok(n) => Some(n),
        Err(_) => trimmed.parse::<f64>().ok().map(|f| f.trunc() as i64),
    }
}

pub fn bool_to_int(input: bool) -> u8 {
    u8::from(input)
}

/// Two decimal places, optionally prefixed with `$`.
pub fn get_money(amount: f64, show_dollar: bool) -> String {
    let prefix = if show_dollar { "$" } else { "" };
    format!("{}{:.2}", prefix, amount)
}

/// A GST-inclusive price split into its parts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PriceParts {
    pub amount: f64,
    pub gst: f64,
    pub base: f64,
}

/// Split a GST-inclusive `price`. With `show_gst` off only `amount` is set.
pub fn get_price_parts(price: f64, show_gst: bool, gst_percent: f64) -> PriceParts {
    if !show_gst {
        return PriceParts {
            amount: price,
            gst: 0.0,
            base: 0.0,
        };
    }
    let base = price / (1.0 + gst_percent / 100.0);
    PriceParts {
        amount: price,
        gst: price - base,
        base,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_numeric() {
        assert!(is_numeric("12"));
        assert!(is_numeric(" -1.5e3 "));
        assert!(is_numeric(".5"));
        assert!(!is_numeric("1.2.3"));
        assert!(!is_numeric("0x1A"));
        assert!(!is_numeric(""));
    }

    #[test]
    fn test_make_float() {
        assert_eq!(make_float("1.23"), Some(1.23));
        assert_eq!(make_float("asdg-1.23").unwrap_or(0.0), 0.0);
        assert_eq!(make_float("-7"), Some(-7.0));
    }

    #[test]
    fn test_make_int() {
        assert_eq!(make_int("1.987"), Some(1));
        assert_eq!(make_int("-1.987"), Some(-1));
        assert_eq!(make_int("-erou45").unwrap_or(123), 123);
        assert_eq!(make_int("9007199254740993"), Some(9007199254740993));
    }

    #[test]
    fn test_bool_to_int() {
        assert_eq!(bool_to_int(true), 1);
        assert_eq!(bool_to_int(false), 0);
    }

    #[test]
    fn test_money() {
        assert_eq!(get_money(12.5, true), "$12.50");
        assert_eq!(get_money(3.0, false), "3.00");
    }

    #[test]
    fn test_price_parts() {
        let parts = get_price_parts(110.0, true, 10.0);
        assert!((parts.base - 100.0).abs() < 1e-9);
        assert!((parts.gst - 10.0).abs() < 1e-9);
        assert_eq!(parts.amount, 110.0);

        let plain = get_price_parts(110.0, false, 10.0);
        assert_eq!(plain.gst, 0.0);
        assert_eq!(plain.base, 0.0);
    }
}
