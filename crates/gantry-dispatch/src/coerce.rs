//! Path parameter coercion.
//!
//! Path values always arrive as text. Values shaped like numbers are
//! converted: a decimal point makes a float, otherwise an integer.
//! Everything else stays text.

use serde_json::{Number, Value};

/// Coerce one raw path value.
pub fn coerce_path_value(raw: &str) -> Value {
    if !looks_numeric(raw) {
        return Value::String(raw.to_string());
    }

    if raw.contains('.') {
        if let Some(number) = raw.parse::<f64>().ok().and_then(Number::from_f64) {
            return Value::Number(number);
        }
    } else if let Ok(int) = raw.parse::<i64>() {
        return Value::Number(Number::from(int));
    } else if let Some(number) = raw.parse::<f64>().ok().and_then(Number::from_f64) {
        // out of integer range, keep the numeric reading
        return Value::Number(number);
    }

    Value::String(raw.to_string())
}

/// `[+-]?digits(.digits)?` with nothing before or after.
fn looks_numeric(raw: &str) -> bool {
    let rest = raw.strip_prefix(['+', '-']).unwrap_or(raw);
    if rest.is_empty() {
        return false;
    }
    let mut parts = rest.splitn(2, '.');
    let whole = parts.next().unwrap_or("");
    let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    match parts.next() {
        Some(fraction) => all_digits(whole) && all_digits(fraction),
        None => all_digits(whole),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn integers() {
        assert_eq!(coerce_path_value("2"), json!(2));
        assert_eq!(coerce_path_value("-17"), json!(-17));
        assert_eq!(coerce_path_value("+4"), json!(4));
    }

    #[test]
    fn floats() {
        assert_eq!(coerce_path_value("2.3"), json!(2.3));
        assert_eq!(coerce_path_value("-0.5"), json!(-0.5));
    }

    #[test]
    fn text_stays_text() {
        assert_eq!(coerce_path_value("abc"), json!("abc"));
        assert_eq!(coerce_path_value("2x"), json!("2x"));
        assert_eq!(coerce_path_value("1.2.3"), json!("1.2.3"));
        assert_eq!(coerce_path_value(".5"), json!(".5"));
        assert_eq!(coerce_path_value("2."), json!("2."));
        assert_eq!(coerce_path_value(""), json!(""));
        assert_eq!(coerce_path_value("-"), json!("-"));
    }
}
