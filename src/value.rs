//! JSON value helpers
//!
//! Schemas and instances are plain `serde_json::Value` trees. This module
//! adds the pieces the evaluator needs on top: deep equality with numeric
//! unification, type naming for error strings, and JSON pointer token
//! escaping.

use serde_json::Value;

/// Name of a JSON type as used in `type` keyword values and error strings.
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// True when the value is a number with zero fractional part.
///
/// `integer` is a sub-kind of `number`: `1.0` is an integer, `1.5` is not.
pub fn is_integer(value: &Value) -> bool {
    match value {
        Value::Number(n) => {
            if n.is_i64() || n.is_u64() {
                true
            } else {
                n.as_f64().map(|f| f.fract() == 0.0).unwrap_or(false)
            }
        }
        _ => false,
    }
}

/// Does the instance match a `type` keyword name?
pub fn matches_type(value: &Value, name: &str) -> bool {
    match name {
        "integer" => is_integer(value),
        other => type_name(value) == other,
    }
}

/// String length in Unicode code points, as required for `minLength` and
/// `maxLength`.
pub fn unicode_length(s: &str) -> usize {
    s.chars().count()
}

/// Deep structural equality.
///
/// Unlike `Value::eq`, numbers compare by mathematical value regardless of
/// their JSON representation: `1`, `1.0`, and `1e0` are all equal.
pub fn equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => {
            if let (Some(i), Some(j)) = (x.as_i64(), y.as_i64()) {
                return i == j;
            }
            if let (Some(i), Some(j)) = (x.as_u64(), y.as_u64()) {
                return i == j;
            }
            match (x.as_f64(), y.as_f64()) {
                (Some(i), Some(j)) => i == j,
                _ => false,
            }
        }
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(u, v)| equal(u, v))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(k, u)| y.get(k).map(|v| equal(u, v)).unwrap_or(false))
        }
        _ => false,
    }
}

/// Numeric value of an instance, when it is a number.
pub fn as_number(value: &Value) -> Option<f64> {
    value.as_f64()
}

/// Escape one JSON pointer reference token (`~` -> `~0`, `/` -> `~1`).
pub fn escape_token(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

/// Append an escaped token to a JSON pointer.
pub fn push_token(pointer: &str, token: &str) -> String {
    format!("{}/{}", pointer, escape_token(token))
}
