//! The six scalar kinds a key or field may take, and the tagged values
//! that move through the public API.

use crate::config::{MAX_STRING_LEN, MIN_STRING_LEN};
use crate::error::TableError;
use crate::timefmt;
use crate::Result;
use std::cmp::Ordering;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    UInt32,
    Int32,
    Float64,
    Byte,
    /// Bounded string; the parameter is the maximum length in bytes,
    /// terminator excluded.
    String(u8),
    /// Seconds since the epoch. Textual form is governed by the global
    /// time format.
    Timestamp,
}

impl ValueKind {
    /// On-arena footprint in bytes.
    pub fn size(self) -> usize {
        match self {
            ValueKind::UInt32 | ValueKind::Int32 => 4,
            ValueKind::Float64 | ValueKind::Timestamp => 8,
            ValueKind::Byte => 1,
            ValueKind::String(max) => max as usize + 1,
        }
    }

    pub(crate) fn validate(self) -> Result<()> {
        if let ValueKind::String(max) = self {
            if !(MIN_STRING_LEN..=MAX_STRING_LEN).contains(&max) {
                return Err(TableError::FieldTooLong);
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    UInt32(u32),
    Int32(i32),
    Float64(f64),
    Byte(u8),
    Str(String),
    Timestamp(i64),
}

impl Value {
    /// Whether this value can be stored under `kind`. The string bound is a
    /// property of the schema, not of the value: any `Str` matches any
    /// `String(_)` and is truncated on write.
    pub fn matches(&self, kind: ValueKind) -> bool {
        matches!(
            (self, kind),
            (Value::UInt32(_), ValueKind::UInt32)
                | (Value::Int32(_), ValueKind::Int32)
                | (Value::Float64(_), ValueKind::Float64)
                | (Value::Byte(_), ValueKind::Byte)
                | (Value::Str(_), ValueKind::String(_))
                | (Value::Timestamp(_), ValueKind::Timestamp)
        )
    }

    /// The kind's zero value.
    pub fn zero(kind: ValueKind) -> Value {
        match kind {
            ValueKind::UInt32 => Value::UInt32(0),
            ValueKind::Int32 => Value::Int32(0),
            ValueKind::Float64 => Value::Float64(0.0),
            ValueKind::Byte => Value::Byte(0),
            ValueKind::String(_) => Value::Str(String::new()),
            ValueKind::Timestamp => Value::Timestamp(0),
        }
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Value {
        Value::UInt32(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Value {
        Value::Int32(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Value {
        Value::Float64(v)
    }
}

impl From<u8> for Value {
    fn from(v: u8) -> Value {
        Value::Byte(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Value {
        Value::Str(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Value {
        Value::Str(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Value {
        Value::Timestamp(v)
    }
}

/// Total order between two values of the same kind. Float64 uses the strict
/// IEEE total order; strings compare byte-wise.
pub(crate) fn cmp(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::UInt32(x), Value::UInt32(y)) => x.cmp(y),
        (Value::Int32(x), Value::Int32(y)) => x.cmp(y),
        (Value::Float64(x), Value::Float64(y)) => x.total_cmp(y),
        (Value::Byte(x), Value::Byte(y)) => x.cmp(y),
        (Value::Str(x), Value::Str(y)) => x.as_bytes().cmp(y.as_bytes()),
        (Value::Timestamp(x), Value::Timestamp(y)) => x.cmp(y),
        _ => {
            debug_assert!(false, "comparing values of different kinds");
            Ordering::Equal
        }
    }
}

/// Parse one delimited CSV token into a value of `kind`.
///
/// Malformed input does not fail: numeric kinds fall back to zero,
/// timestamps to the zero epoch, `Byte` takes the first byte of the token
/// (zero when empty). This keeps bulk import line-oriented rather than
/// field-content-sensitive.
pub(crate) fn parse_token(kind: ValueKind, token: &[u8]) -> Value {
    match kind {
        ValueKind::UInt32 => Value::UInt32(parse_num(token)),
        ValueKind::Int32 => Value::Int32(parse_num(token)),
        ValueKind::Float64 => Value::Float64(parse_num(token)),
        ValueKind::Byte => Value::Byte(token.first().copied().unwrap_or(0)),
        ValueKind::String(_) => Value::Str(String::from_utf8_lossy(token).into_owned()),
        ValueKind::Timestamp => {
            Value::Timestamp(timefmt::encode_timestamp(&String::from_utf8_lossy(token)))
        }
    }
}

/// Append the textual form of `value` to `out`.
pub(crate) fn format_into(value: &Value, out: &mut Vec<u8>) {
    match value {
        Value::UInt32(v) => out.extend_from_slice(v.to_string().as_bytes()),
        Value::Int32(v) => out.extend_from_slice(v.to_string().as_bytes()),
        Value::Float64(v) => out.extend_from_slice(format!("{:.6}", v).as_bytes()),
        Value::Byte(b) => out.push(*b),
        Value::Str(s) => out.extend_from_slice(s.as_bytes()),
        Value::Timestamp(t) => {
            out.extend_from_slice(timefmt::decode_timestamp(*t).as_bytes())
        }
    }
}

/// Longest prefix of `s` that fits in `max` bytes without splitting a
/// UTF-8 sequence.
pub(crate) fn truncate_str(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

fn parse_num<T: FromStr + Default>(token: &[u8]) -> T {
    std::str::from_utf8(token)
        .ok()
        .map(str::trim)
        .and_then(|text| text.parse().ok())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn footprints() {
        assert_eq!(ValueKind::UInt32.size(), 4);
        assert_eq!(ValueKind::Int32.size(), 4);
        assert_eq!(ValueKind::Float64.size(), 8);
        assert_eq!(ValueKind::Byte.size(), 1);
        assert_eq!(ValueKind::Timestamp.size(), 8);
        assert_eq!(ValueKind::String(32).size(), 33);
    }

    #[test]
    fn string_bound_validation() {
        assert!(ValueKind::String(1).validate().is_ok());
        assert!(ValueKind::String(64).validate().is_ok());
        assert_eq!(
            ValueKind::String(0).validate().unwrap_err(),
            TableError::FieldTooLong
        );
        assert_eq!(
            ValueKind::String(65).validate().unwrap_err(),
            TableError::FieldTooLong
        );
        assert!(ValueKind::UInt32.validate().is_ok());
    }

    #[test]
    fn malformed_tokens_fall_back() {
        // timestamps go through the process-wide format
        let _serial = timefmt::exclusive();

        assert_eq!(parse_token(ValueKind::UInt32, b"37"), Value::UInt32(37));
        assert_eq!(parse_token(ValueKind::UInt32, b"37x"), Value::UInt32(0));
        assert_eq!(parse_token(ValueKind::UInt32, b"-1"), Value::UInt32(0));
        assert_eq!(parse_token(ValueKind::Int32, b"-41"), Value::Int32(-41));
        assert_eq!(parse_token(ValueKind::Float64, b"2.5"), Value::Float64(2.5));
        assert_eq!(parse_token(ValueKind::Float64, b"nope"), Value::Float64(0.0));
        assert_eq!(parse_token(ValueKind::Byte, b"xy"), Value::Byte(b'x'));
        assert_eq!(parse_token(ValueKind::Byte, b""), Value::Byte(0));
        assert_eq!(
            parse_token(ValueKind::Timestamp, b"1624288135"),
            Value::Timestamp(1624288135)
        );
        assert_eq!(parse_token(ValueKind::Timestamp, b"later"), Value::Timestamp(0));
    }

    #[test]
    fn float_total_order() {
        let less = Value::Float64(-0.0);
        let more = Value::Float64(0.0);
        assert_eq!(cmp(&less, &more), Ordering::Less);
        assert_eq!(
            cmp(&Value::Float64(f64::NAN), &Value::Float64(f64::NAN)),
            Ordering::Equal
        );
        assert_eq!(
            cmp(&Value::Float64(1e300), &Value::Float64(1e300 + 1e280)),
            Ordering::Less
        );
    }

    #[test]
    fn conversions_pick_the_matching_kind() {
        assert_eq!(Value::from(7u32), Value::UInt32(7));
        assert_eq!(Value::from(-7i32), Value::Int32(-7));
        assert_eq!(Value::from(0.5f64), Value::Float64(0.5));
        assert_eq!(Value::from(b'q'), Value::Byte(b'q'));
        assert_eq!(Value::from("word"), Value::Str("word".into()));
        assert_eq!(Value::from(9i64), Value::Timestamp(9));
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_str("abcdef", 4), "abcd");
        assert_eq!(truncate_str("abc", 4), "abc");
        // 'é' is two bytes; cutting through it backs off
        assert_eq!(truncate_str("aé", 2), "a");
    }
}
