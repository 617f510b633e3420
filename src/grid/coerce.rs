//! # Filter Value Coercion
//!
//! Ad-hoc filter values arrive as loosely typed JSON. Each string goes
//! through an ordered chain of parsers (timestamp, then integer) and keeps
//! the first representation that succeeds, falling back to plain text. Every
//! step is a pure function returning `Option`, so a failed attempt simply
//! hands the value to the next one.

use chrono::{FixedOffset, NaiveDateTime, TimeZone};
use serde_json::Value;

/// Pattern accepted for timestamp filter values, e.g. `03/14/2024 09:30 PM`
pub const TIMESTAMP_PATTERN: &str = "%m/%d/%Y %I:%M %p";

/// Format timestamps are handed to the store in
pub const STORE_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// A filter value after coercion
#[derive(Debug, Clone, PartialEq)]
pub enum Coerced {
    /// UTC wall-clock time, offset dropped
    Timestamp(NaiveDateTime),
    Integer(i64),
    Flag(bool),
    Float(f64),
    Text(String),
    Null,
}

impl Coerced {
    /// Flag-shaped values are booleans and integers
    pub fn as_flag(&self) -> Option<bool> {
        match self {
            Coerced::Flag(b) => Some(*b),
            Coerced::Integer(n) => Some(*n != 0),
            _ => None,
        }
    }

    /// Text form, used for hashing and containment
    pub fn to_text(&self) -> String {
        match self {
            Coerced::Timestamp(ts) => ts.format(STORE_TIMESTAMP_FORMAT).to_string(),
            Coerced::Integer(n) => n.to_string(),
            Coerced::Flag(b) => b.to_string(),
            Coerced::Float(f) => f.to_string(),
            Coerced::Text(s) => s.clone(),
            Coerced::Null => String::new(),
        }
    }

    /// JSON value handed to the store
    pub fn to_value(&self) -> Value {
        match self {
            Coerced::Timestamp(ts) => Value::String(ts.format(STORE_TIMESTAMP_FORMAT).to_string()),
            Coerced::Integer(n) => Value::from(*n),
            Coerced::Flag(b) => Value::Bool(*b),
            Coerced::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Coerced::Text(s) => Value::String(s.clone()),
            Coerced::Null => Value::Null,
        }
    }
}

/// Parse a `TIMESTAMP_PATTERN` string as wall-clock time at `source`,
/// returning the equivalent UTC time without offset.
pub fn parse_timestamp(raw: &str, source: &FixedOffset) -> Option<NaiveDateTime> {
    let local = NaiveDateTime::parse_from_str(raw.trim(), TIMESTAMP_PATTERN).ok()?;
    let zoned = source.from_local_datetime(&local).single()?;
    Some(zoned.naive_utc())
}

/// Unsigned decimal digits only; signs, spaces and decimals are rejected
pub fn parse_integer(raw: &str) -> Option<i64> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

/// Coerce a string through the fallback chain
pub fn coerce_text(raw: &str, source: &FixedOffset) -> Coerced {
    parse_timestamp(raw, source)
        .map(Coerced::Timestamp)
        .or_else(|| parse_integer(raw).map(Coerced::Integer))
        .unwrap_or_else(|| Coerced::Text(raw.to_string()))
}

/// Coerce one scalar JSON value. Non-string scalars keep their JSON type;
/// nested arrays and objects are carried as their JSON text.
pub fn coerce_value(value: &Value, source: &FixedOffset) -> Coerced {
    match value {
        Value::String(s) => coerce_text(s, source),
        Value::Bool(b) => Coerced::Flag(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Coerced::Integer(i),
            None => n.as_f64().map(Coerced::Float).unwrap_or(Coerced::Null),
        },
        Value::Null => Coerced::Null,
        other => Coerced::Text(other.to_string()),
    }
}
