//! Numeric normalization for heterogeneous source text.
//!
//! Sources deliver numbers as plain floats, locale-formatted strings with
//! thousands separators and decimal commas ("1.234,56"), percentage strings
//! ("34,5%"), or one of several missing-value sentinels. `parse_numeric` is
//! total: every input maps to `Some(finite f64)` or `None`, and a malformed
//! cell degrades to missing for that cell instead of aborting the caller.

use serde_json::Value;
use tracing::warn;

/// Tokens that mean "no value available", distinct from zero or a parse
/// error. Matched case-insensitively against the trimmed input.
const MISSING_SENTINELS: &[&str] = &["", "#n/a", "n/a", "null", "-"];

/// Parse one textual cell into a number, or `None` when missing/malformed.
///
/// A decimal comma marks the locale form: dots are stripped as thousands
/// separators and the comma becomes the decimal point. Plain dot-decimal
/// tokens ("3.9") pass through unchanged. A single trailing percent sign is
/// dropped, and when `is_percentage` is set the result is expressed as a
/// fraction (12.5% -> 0.125).
pub fn parse_numeric(raw: &str, is_percentage: bool) -> Option<f64> {
    let token = raw.trim();
    if MISSING_SENTINELS
        .iter()
        .any(|s| token.eq_ignore_ascii_case(s))
    {
        return None;
    }

    let mut cleaned = if token.contains(',') {
        token.replace('.', "").replace(',', ".")
    } else {
        token.to_string()
    };
    if cleaned.ends_with('%') {
        cleaned.pop();
    }

    match cleaned.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => {
            if is_percentage {
                Some(value / 100.0)
            } else {
                Some(value)
            }
        }
        _ => {
            warn!("could not convert '{}' to a number, treating as missing", raw);
            None
        }
    }
}

/// JSON front end for `parse_numeric`: numbers pass through, strings are
/// parsed, null and anything non-scalar is missing.
pub fn parse_value(value: &Value, is_percentage: bool) -> Option<f64> {
    match value {
        Value::Null => None,
        Value::Number(n) => {
            let v = n.as_f64()?;
            if !v.is_finite() {
                return None;
            }
            if is_percentage {
                Some(v / 100.0)
            } else {
                Some(v)
            }
        }
        Value::String(s) => parse_numeric(s, is_percentage),
        other => {
            warn!("unexpected non-scalar value {:?}, treating as missing", other);
            None
        }
    }
}

/// Canonicalize a header cell for column mapping: trim, lowercase, spaces
/// to underscores.
pub fn normalize_header(raw: &str) -> String {
    raw.trim().to_lowercase().replace(' ', "_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_locale_thousands_and_decimal_comma() {
        assert_eq!(parse_numeric("1.234,56", false), Some(1234.56));
        assert_eq!(parse_numeric("12,5", false), Some(12.5));
    }

    #[test]
    fn plain_dot_decimal_passes_through() {
        assert_eq!(parse_numeric("3.9", false), Some(3.9));
        assert_eq!(parse_numeric("-0.25", false), Some(-0.25));
    }

    #[test]
    fn percentages_become_fractions() {
        assert_eq!(parse_numeric("12,5%", true), Some(0.125));
        assert_eq!(parse_numeric("34,5%", true), Some(0.345));
        // Percent sign stripped even when not interpreting as a fraction
        assert_eq!(parse_numeric("12%", false), Some(12.0));
    }

    #[test]
    fn missing_sentinels_are_none() {
        for raw in ["", "  ", "#N/A", "n/a", "N/A", "null", "-"] {
            assert_eq!(parse_numeric(raw, false), None, "sentinel {:?}", raw);
        }
    }

    #[test]
    fn parse_is_total_over_garbage() {
        for raw in ["abc", "12,34,56x", "%%", "1.2.3,4,5", "NaN", "inf", "--5"] {
            // Must not panic, must degrade to missing or a finite value
            if let Some(v) = parse_numeric(raw, true) {
                assert!(v.is_finite());
            }
        }
    }

    #[test]
    fn json_values_normalize() {
        assert_eq!(parse_value(&json!(4.1), false), Some(4.1));
        assert_eq!(parse_value(&json!("1.234,56"), false), Some(1234.56));
        assert_eq!(parse_value(&Value::Null, false), None);
        assert_eq!(parse_value(&json!(50), true), Some(0.5));
        assert_eq!(parse_value(&json!(["nested"]), false), None);
    }

    #[test]
    fn headers_canonicalize() {
        assert_eq!(normalize_header("  Reported Date "), "reported_date");
        assert_eq!(normalize_header("S&P500 Weekly Close"), "s&p500_weekly_close");
        assert_eq!(normalize_header("Bull-Bear Spread"), "bull-bear_spread");
    }
}
