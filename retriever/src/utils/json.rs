//! JSON utility functions

use serde_json::Value as JsonValue;

/// Render a scalar JSON value as a plain string.
///
/// Strings are returned without quotes, numbers and booleans in their JSON
/// form, and `null` as `None`. Arrays and objects are serialized so that no
/// information is lost.
pub fn json_to_opt_string(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::Null => None,
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Bool(b) => Some(b.to_string()),
        JsonValue::Number(n) => Some(n.to_string()),
        other => serde_json::to_string(other).ok(),
    }
}

/// Coerce a JSON value into an integer.
///
/// Accepts integers, finite floats (truncated toward zero) and strings that
/// parse as integers. Everything else yields `None`.
pub fn json_to_opt_i64(value: &JsonValue) -> Option<i64> {
    match value {
        JsonValue::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && *f >= i64::MIN as f64 && *f <= i64::MAX as f64)
                .map(|f| f.trunc() as i64)
        }),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Coerce a JSON value into a float (numbers and numeric strings).
pub fn json_to_opt_f64(value: &JsonValue) -> Option<f64> {
    let parsed: Option<f64> = match value {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    parsed.filter(|f| f.is_finite())
}
