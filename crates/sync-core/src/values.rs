//! Runtime values for the abstract type model.
//!
//! `AbstractValue` is what a record carries before it is bound to a
//! destination statement, and what the read path reconstructs afterwards.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Runtime value of the abstract type model.
///
/// Objects own their children. Integers are wider than any destination
/// column; range checks happen when a value is bound.
#[derive(Debug, Clone, PartialEq)]
pub enum AbstractValue {
    /// Explicit null
    Null,

    /// Boolean value
    Boolean(bool),

    /// Integral value
    Integer(i128),

    /// Exact decimal value
    Number(Decimal),

    /// Numeric literal beyond both `i128` and `Decimal`, kept as its text
    OutOfRangeNumber(String),

    /// Text value
    String(String),

    /// Calendar date
    Date(NaiveDate),

    /// Time of day with its offset
    TimeWithTimezone(NaiveTime, FixedOffset),

    /// Time of day without offset
    TimeWithoutTimezone(NaiveTime),

    /// Instant with its offset
    TimestampWithTimezone(DateTime<FixedOffset>),

    /// Wall-clock timestamp
    TimestampWithoutTimezone(NaiveDateTime),

    /// Ordered list of values
    Array(Vec<AbstractValue>),

    /// Field name -> value
    Object(HashMap<String, AbstractValue>),
}

impl AbstractValue {
    /// Build an object value from `(name, value)` pairs.
    pub fn object<K, I>(fields: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, AbstractValue)>,
    {
        Self::Object(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Try to get this value as an object.
    pub fn as_object(&self) -> Option<&HashMap<String, AbstractValue>> {
        match self {
            Self::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Look up a field of an object value. `None` for absent fields and for
    /// non-object values.
    pub fn get(&self, name: &str) -> Option<&AbstractValue> {
        self.as_object().and_then(|obj| obj.get(name))
    }

    /// Try to get this value as an i128.
    pub fn as_integer(&self) -> Option<i128> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Try to get this value as a string reference.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Name of the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Boolean(_) => "boolean",
            Self::Integer(_) => "integer",
            Self::Number(_) | Self::OutOfRangeNumber(_) => "number",
            Self::String(_) => "string",
            Self::Date(_) => "date",
            Self::TimeWithTimezone(..) => "time_with_timezone",
            Self::TimeWithoutTimezone(_) => "time_without_timezone",
            Self::TimestampWithTimezone(_) => "timestamp_with_timezone",
            Self::TimestampWithoutTimezone(_) => "timestamp_without_timezone",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
        }
    }
}

impl From<bool> for AbstractValue {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<i64> for AbstractValue {
    fn from(i: i64) -> Self {
        Self::Integer(i as i128)
    }
}

impl From<i128> for AbstractValue {
    fn from(i: i128) -> Self {
        Self::Integer(i)
    }
}

impl From<Decimal> for AbstractValue {
    fn from(d: Decimal) -> Self {
        Self::Number(d)
    }
}

impl From<&str> for AbstractValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for AbstractValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

/// Why a value could not be converted to a destination representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The field is absent from the record
    Missing,
    /// The value does not fit the destination's range or size
    Overflow,
    /// The value has the wrong shape for the declared type
    Serialization,
}

/// Outcome of a failed value conversion.
///
/// Conversions return this as a plain `Err` so callers can branch on
/// [`FailureKind`] instead of inspecting error types.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ConversionFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl ConversionFailure {
    pub fn missing(field: &str) -> Self {
        Self {
            kind: FailureKind::Missing,
            message: format!("field '{field}' is absent from the record"),
        }
    }

    pub fn overflow(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Overflow,
            message: message.into(),
        }
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Serialization,
            message: message.into(),
        }
    }

    /// A value of the wrong variant for the expected type.
    pub fn mismatch(expected: &str, value: &AbstractValue) -> Self {
        Self::serialization(format!("expected {expected}, got {}", value.kind()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_lookup() {
        let value = AbstractValue::object([
            ("id", AbstractValue::from(42_i64)),
            ("name", "ok".into()),
        ]);

        assert_eq!(value.get("id"), Some(&AbstractValue::Integer(42)));
        assert_eq!(value.get("name").and_then(|v| v.as_str()), Some("ok"));
        assert_eq!(value.get("missing"), None);
        assert_eq!(AbstractValue::Integer(1).get("id"), None);
    }

    #[test]
    fn test_accessors() {
        assert_eq!(AbstractValue::Integer(7).as_integer(), Some(7));
        assert_eq!(AbstractValue::from("x").as_integer(), None);
        assert!(AbstractValue::Null.is_null());
        assert_eq!(AbstractValue::Array(vec![]).kind(), "array");
    }

    #[test]
    fn test_conversion_failure_mismatch_message() {
        let failure = ConversionFailure::mismatch("integer", &AbstractValue::from("abc"));
        assert_eq!(failure.kind, FailureKind::Serialization);
        assert_eq!(failure.to_string(), "expected integer, got string");
    }
}
