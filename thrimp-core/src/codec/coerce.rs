//! Write-path numeric coercion.
//!
//! The schema decides the wire width of every numeric field; callers supply whatever
//! JSON gave them. Values coerce from any integer width, from floats (truncating), and
//! from base-10 numeric strings. A `None` means the value is not coercible and the
//! caller reports a type mismatch for that field.
use serde_json::Value;

pub(crate) fn to_i8(value: &Value) -> Option<i8> {
    to_i64(value).map(|n| n as i8)
}

pub(crate) fn to_i16(value: &Value) -> Option<i16> {
    to_i64(value).map(|n| n as i16)
}

pub(crate) fn to_i32(value: &Value) -> Option<i32> {
    to_i64(value).map(|n| n as i32)
}

pub(crate) fn to_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_u64().map(|n| n as i64))
            .or_else(|| number.as_f64().map(|f| f as i64)),
        Value::String(text) => text.parse::<i64>().ok(),
        _ => None,
    }
}

pub(crate) fn to_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.parse::<f64>().ok(),
        _ => None,
    }
}
