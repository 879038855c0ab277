//! Forward conversion: AbstractValue → PostgreSQL parameter
//!
//! This module converts sync-core values into parameters for a positional
//! INSERT. Conversion is fallible per value: [`to_param`] returns a
//! [`ConversionFailure`] whose [`FailureKind`](sync_core::FailureKind) tells
//! a capacity overflow apart from a value of the wrong shape, so the caller
//! can decide how to degrade the field.

use crate::ddl::SqlColumnType;
use crate::wire::{JsonText, TimeTz};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use postgres_types::ToSql;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use sync_core::json::to_json;
use sync_core::{AbstractType, AbstractValue, ConversionFailure};

/// Earliest year PostgreSQL date/time types can hold (4713 BC).
const MIN_YEAR: i32 = -4712;
/// Latest year PostgreSQL `TIMESTAMP` can hold.
const MAX_TIMESTAMP_YEAR: i32 = 294_276;

/// A positional parameter for a PostgreSQL statement.
///
/// Each variant carries an `Option` so that null parameters stay typed:
/// `Int8(None)` binds a `BIGINT` null rather than an untyped one.
#[derive(Debug, Clone, PartialEq)]
pub enum PostgreSQLParam {
    Bool(Option<bool>),
    Int8(Option<i64>),
    Numeric(Option<Decimal>),
    Text(Option<String>),
    Date(Option<NaiveDate>),
    Time(Option<NaiveTime>),
    TimeTz(Option<TimeTz>),
    Timestamp(Option<NaiveDateTime>),
    TimestampTz(Option<DateTime<Utc>>),
    Jsonb(Option<JsonText>),
}

impl PostgreSQLParam {
    /// Typed null for a column.
    pub fn null(column_type: SqlColumnType) -> Self {
        match column_type {
            SqlColumnType::Boolean => PostgreSQLParam::Bool(None),
            SqlColumnType::BigInt => PostgreSQLParam::Int8(None),
            SqlColumnType::Numeric => PostgreSQLParam::Numeric(None),
            SqlColumnType::Text => PostgreSQLParam::Text(None),
            SqlColumnType::Date => PostgreSQLParam::Date(None),
            SqlColumnType::Time => PostgreSQLParam::Time(None),
            SqlColumnType::TimeTz => PostgreSQLParam::TimeTz(None),
            SqlColumnType::Timestamp => PostgreSQLParam::Timestamp(None),
            SqlColumnType::TimestampTz => PostgreSQLParam::TimestampTz(None),
            SqlColumnType::Jsonb => PostgreSQLParam::Jsonb(None),
        }
    }

    /// Column type this parameter binds to.
    pub fn column_type(&self) -> SqlColumnType {
        match self {
            PostgreSQLParam::Bool(_) => SqlColumnType::Boolean,
            PostgreSQLParam::Int8(_) => SqlColumnType::BigInt,
            PostgreSQLParam::Numeric(_) => SqlColumnType::Numeric,
            PostgreSQLParam::Text(_) => SqlColumnType::Text,
            PostgreSQLParam::Date(_) => SqlColumnType::Date,
            PostgreSQLParam::Time(_) => SqlColumnType::Time,
            PostgreSQLParam::TimeTz(_) => SqlColumnType::TimeTz,
            PostgreSQLParam::Timestamp(_) => SqlColumnType::Timestamp,
            PostgreSQLParam::TimestampTz(_) => SqlColumnType::TimestampTz,
            PostgreSQLParam::Jsonb(_) => SqlColumnType::Jsonb,
        }
    }

    pub fn is_null(&self) -> bool {
        match self {
            PostgreSQLParam::Bool(v) => v.is_none(),
            PostgreSQLParam::Int8(v) => v.is_none(),
            PostgreSQLParam::Numeric(v) => v.is_none(),
            PostgreSQLParam::Text(v) => v.is_none(),
            PostgreSQLParam::Date(v) => v.is_none(),
            PostgreSQLParam::Time(v) => v.is_none(),
            PostgreSQLParam::TimeTz(v) => v.is_none(),
            PostgreSQLParam::Timestamp(v) => v.is_none(),
            PostgreSQLParam::TimestampTz(v) => v.is_none(),
            PostgreSQLParam::Jsonb(v) => v.is_none(),
        }
    }

    pub fn as_tosql(&self) -> &(dyn ToSql + Sync) {
        match self {
            PostgreSQLParam::Bool(value) => value,
            PostgreSQLParam::Int8(value) => value,
            PostgreSQLParam::Numeric(value) => value,
            PostgreSQLParam::Text(value) => value,
            PostgreSQLParam::Date(value) => value,
            PostgreSQLParam::Time(value) => value,
            PostgreSQLParam::TimeTz(value) => value,
            PostgreSQLParam::Timestamp(value) => value,
            PostgreSQLParam::TimestampTz(value) => value,
            PostgreSQLParam::Jsonb(value) => value,
        }
    }

    /// Human-readable JSON rendering, for dry runs and logs.
    pub fn to_json_value(&self) -> serde_json::Value {
        use serde_json::Value;
        match self {
            PostgreSQLParam::Bool(Some(b)) => Value::Bool(*b),
            PostgreSQLParam::Int8(Some(i)) => Value::from(*i),
            PostgreSQLParam::Numeric(Some(d)) => Value::String(d.to_string()),
            PostgreSQLParam::Text(Some(s)) => Value::String(s.clone()),
            PostgreSQLParam::Date(Some(d)) => Value::String(d.to_string()),
            PostgreSQLParam::Time(Some(t)) => Value::String(t.to_string()),
            PostgreSQLParam::TimeTz(Some(t)) => Value::String(format!("{}{}", t.time, t.offset)),
            PostgreSQLParam::Timestamp(Some(dt)) => Value::String(dt.to_string()),
            PostgreSQLParam::TimestampTz(Some(dt)) => Value::String(dt.to_rfc3339()),
            PostgreSQLParam::Jsonb(Some(text)) => {
                serde_json::from_str(text.as_str())
                    .unwrap_or_else(|_| Value::String(text.0.clone()))
            }
            _ => Value::Null,
        }
    }
}

/// Convert a value to a parameter for a column of `column_type` declared as
/// `declared`.
///
/// `Null` converts to the column's typed null. Any other value must match the
/// declared type; integers are range-checked against `BIGINT`, temporal
/// values against PostgreSQL's supported years.
pub fn to_param(
    value: &AbstractValue,
    declared: &AbstractType,
    column_type: SqlColumnType,
) -> Result<PostgreSQLParam, ConversionFailure> {
    if value.is_null() {
        return Ok(PostgreSQLParam::null(column_type));
    }

    match column_type {
        SqlColumnType::Boolean => match value {
            AbstractValue::Boolean(b) => Ok(PostgreSQLParam::Bool(Some(*b))),
            other => Err(ConversionFailure::mismatch("boolean", other)),
        },
        SqlColumnType::BigInt => integer_param(value),
        SqlColumnType::Numeric => match value {
            AbstractValue::Number(d) => Ok(PostgreSQLParam::Numeric(Some(*d))),
            AbstractValue::Integer(i) => Decimal::from_i128(*i)
                .map(|d| PostgreSQLParam::Numeric(Some(d)))
                .ok_or_else(|| {
                    ConversionFailure::overflow(format!("integer {i} exceeds NUMERIC precision"))
                }),
            AbstractValue::OutOfRangeNumber(text) => Err(out_of_range(text, "NUMERIC")),
            other => Err(ConversionFailure::mismatch("number", other)),
        },
        SqlColumnType::Text => match value {
            AbstractValue::String(s) if s.contains('\0') => Err(ConversionFailure::serialization(
                "text contains a NUL character",
            )),
            AbstractValue::String(s) => Ok(PostgreSQLParam::Text(Some(s.clone()))),
            other => Err(ConversionFailure::mismatch("string", other)),
        },
        SqlColumnType::Date => match value {
            AbstractValue::Date(d) => {
                check_year(d.year(), i32::MAX)?;
                Ok(PostgreSQLParam::Date(Some(*d)))
            }
            other => Err(ConversionFailure::mismatch("date", other)),
        },
        SqlColumnType::Time => match value {
            AbstractValue::TimeWithoutTimezone(t) => Ok(PostgreSQLParam::Time(Some(*t))),
            other => Err(ConversionFailure::mismatch("time_without_timezone", other)),
        },
        SqlColumnType::TimeTz => match value {
            AbstractValue::TimeWithTimezone(t, offset) => {
                Ok(PostgreSQLParam::TimeTz(Some(TimeTz::new(*t, *offset))))
            }
            other => Err(ConversionFailure::mismatch("time_with_timezone", other)),
        },
        SqlColumnType::Timestamp => match value {
            AbstractValue::TimestampWithoutTimezone(dt) => {
                check_year(dt.year(), MAX_TIMESTAMP_YEAR)?;
                Ok(PostgreSQLParam::Timestamp(Some(*dt)))
            }
            other => Err(ConversionFailure::mismatch(
                "timestamp_without_timezone",
                other,
            )),
        },
        SqlColumnType::TimestampTz => match value {
            AbstractValue::TimestampWithTimezone(dt) => {
                let utc = dt.with_timezone(&Utc);
                check_year(utc.year(), MAX_TIMESTAMP_YEAR)?;
                Ok(PostgreSQLParam::TimestampTz(Some(utc)))
            }
            other => Err(ConversionFailure::mismatch("timestamp_with_timezone", other)),
        },
        SqlColumnType::Jsonb => document_param(value, declared),
    }
}

fn integer_param(value: &AbstractValue) -> Result<PostgreSQLParam, ConversionFailure> {
    match value {
        AbstractValue::Integer(i) => i64::try_from(*i)
            .map(|v| PostgreSQLParam::Int8(Some(v)))
            .map_err(|_| ConversionFailure::overflow(format!("integer {i} exceeds BIGINT range"))),
        AbstractValue::Number(d) if d.fract().is_zero() => d
            .to_i64()
            .map(|v| PostgreSQLParam::Int8(Some(v)))
            .ok_or_else(|| ConversionFailure::overflow(format!("number {d} exceeds BIGINT range"))),
        AbstractValue::OutOfRangeNumber(text) => Err(out_of_range(text, "BIGINT")),
        other => Err(ConversionFailure::mismatch("integer", other)),
    }
}

fn out_of_range(text: &str, column: &str) -> ConversionFailure {
    ConversionFailure::overflow(format!("number {text} exceeds {column} range"))
}

fn document_param(
    value: &AbstractValue,
    declared: &AbstractType,
) -> Result<PostgreSQLParam, ConversionFailure> {
    let shape_ok = match declared {
        AbstractType::Array { .. } | AbstractType::ArrayWithoutSchema => {
            matches!(value, AbstractValue::Array(_))
        }
        AbstractType::Object { .. }
        | AbstractType::ObjectWithEmptySchema
        | AbstractType::ObjectWithoutSchema => matches!(value, AbstractValue::Object(_)),
        _ => true,
    };
    if !shape_ok {
        return Err(ConversionFailure::mismatch(declared.name(), value));
    }

    let document = to_json(value)?;
    // JSONB cannot store the NUL code point, even escaped.
    if contains_nul(&document) {
        return Err(ConversionFailure::serialization(
            "document contains a NUL character",
        ));
    }
    serde_json::to_string(&document)
        .map(|text| PostgreSQLParam::Jsonb(Some(JsonText(text))))
        .map_err(|e| ConversionFailure::serialization(e.to_string()))
}

fn contains_nul(document: &serde_json::Value) -> bool {
    match document {
        serde_json::Value::String(s) => s.contains('\0'),
        serde_json::Value::Array(items) => items.iter().any(contains_nul),
        serde_json::Value::Object(fields) => fields
            .iter()
            .any(|(k, v)| k.contains('\0') || contains_nul(v)),
        _ => false,
    }
}

fn check_year(year: i32, max_year: i32) -> Result<(), ConversionFailure> {
    if year < MIN_YEAR || year > max_year {
        return Err(ConversionFailure::overflow(format!(
            "year {year} is outside the PostgreSQL range"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone};
    use std::collections::HashMap;
    use sync_core::{FailureKind, FieldType};

    fn convert(
        value: AbstractValue,
        declared: AbstractType,
    ) -> Result<PostgreSQLParam, ConversionFailure> {
        let column_type = crate::PostgreSQLDdl.map(&declared).unwrap();
        to_param(&value, &declared, column_type)
    }

    #[test]
    fn test_null_is_typed() {
        let param = convert(AbstractValue::Null, AbstractType::Integer).unwrap();
        assert_eq!(param, PostgreSQLParam::Int8(None));
        assert!(param.is_null());
        assert_eq!(param.column_type(), SqlColumnType::BigInt);
    }

    #[test]
    fn test_scalars() {
        assert_eq!(
            convert(AbstractValue::Boolean(true), AbstractType::Boolean).unwrap(),
            PostgreSQLParam::Bool(Some(true))
        );
        assert_eq!(
            convert(AbstractValue::Integer(42), AbstractType::Integer).unwrap(),
            PostgreSQLParam::Int8(Some(42))
        );
        assert_eq!(
            convert(AbstractValue::from("ok"), AbstractType::String).unwrap(),
            PostgreSQLParam::Text(Some("ok".to_string()))
        );
        assert_eq!(
            convert(AbstractValue::Integer(7), AbstractType::Number).unwrap(),
            PostgreSQLParam::Numeric(Some(Decimal::from(7)))
        );
    }

    #[test]
    fn test_integer_overflow() {
        let err = convert(AbstractValue::Integer(i64::MAX as i128 + 1), AbstractType::Integer)
            .unwrap_err();
        assert_eq!(err.kind, FailureKind::Overflow);

        let err = convert(AbstractValue::Integer(i128::MIN), AbstractType::Number).unwrap_err();
        assert_eq!(err.kind, FailureKind::Overflow);
    }

    #[test]
    fn test_out_of_range_number_overflows() {
        let huge = || AbstractValue::OutOfRangeNumber("1e40".to_string());

        let err = convert(huge(), AbstractType::Integer).unwrap_err();
        assert_eq!(err.kind, FailureKind::Overflow);

        let err = convert(huge(), AbstractType::Number).unwrap_err();
        assert_eq!(err.kind, FailureKind::Overflow);

        let err = convert(
            AbstractValue::Array(vec![huge()]),
            AbstractType::ArrayWithoutSchema,
        )
        .unwrap_err();
        assert_eq!(err.kind, FailureKind::Overflow);
    }

    #[test]
    fn test_type_mismatch_is_serialization_failure() {
        let err = convert(AbstractValue::from("not-a-number"), AbstractType::Integer).unwrap_err();
        assert_eq!(err.kind, FailureKind::Serialization);
        assert_eq!(err.message, "expected integer, got string");

        let err = convert(AbstractValue::Integer(1), AbstractType::String).unwrap_err();
        assert_eq!(err.kind, FailureKind::Serialization);
    }

    #[test]
    fn test_text_rejects_nul() {
        let err = convert(AbstractValue::from("a\0b"), AbstractType::String).unwrap_err();
        assert_eq!(err.kind, FailureKind::Serialization);
    }

    #[test]
    fn test_temporal() {
        let offset = FixedOffset::east_opt(3600).unwrap();
        let dt = offset.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        assert_eq!(
            convert(
                AbstractValue::TimestampWithTimezone(dt),
                AbstractType::TimestampWithTimezone
            )
            .unwrap(),
            PostgreSQLParam::TimestampTz(Some(Utc.with_ymd_and_hms(2024, 5, 1, 11, 0, 0).unwrap()))
        );

        let time = NaiveTime::from_hms_opt(8, 15, 0).unwrap();
        assert_eq!(
            convert(
                AbstractValue::TimeWithTimezone(time, offset),
                AbstractType::TimeWithTimezone
            )
            .unwrap(),
            PostgreSQLParam::TimeTz(Some(TimeTz::new(time, offset)))
        );
    }

    #[test]
    fn test_date_before_postgres_range_overflows() {
        let ancient = NaiveDate::from_ymd_opt(-5000, 1, 1).unwrap();
        let err = convert(AbstractValue::Date(ancient), AbstractType::Date).unwrap_err();
        assert_eq!(err.kind, FailureKind::Overflow);
    }

    #[test]
    fn test_documents() {
        let declared = AbstractType::array(FieldType::nullable(AbstractType::Integer));
        let param = convert(
            AbstractValue::Array(vec![AbstractValue::Integer(1), AbstractValue::Integer(2)]),
            declared.clone(),
        )
        .unwrap();
        assert_eq!(param, PostgreSQLParam::Jsonb(Some(JsonText("[1,2]".to_string()))));

        let err = convert(AbstractValue::from("[1,2]"), declared).unwrap_err();
        assert_eq!(err.kind, FailureKind::Serialization);

        let obj = AbstractValue::Object(HashMap::from([(
            "k".to_string(),
            AbstractValue::Boolean(false),
        )]));
        assert_eq!(
            convert(obj, AbstractType::ObjectWithoutSchema).unwrap(),
            PostgreSQLParam::Jsonb(Some(JsonText(r#"{"k":false}"#.to_string())))
        );
    }

    #[test]
    fn test_document_rejects_nul() {
        let err = convert(
            AbstractValue::Array(vec![AbstractValue::from("a\0b")]),
            AbstractType::ArrayWithoutSchema,
        )
        .unwrap_err();
        assert_eq!(err.kind, FailureKind::Serialization);
    }

    #[test]
    fn test_union_accepts_any_shape() {
        let declared = AbstractType::union(vec![AbstractType::String, AbstractType::Integer]);
        assert_eq!(
            convert(AbstractValue::Integer(3), declared).unwrap(),
            PostgreSQLParam::Jsonb(Some(JsonText("3".to_string())))
        );
    }

    #[test]
    fn test_nested_overflow_in_document() {
        let err = convert(
            AbstractValue::Array(vec![AbstractValue::Integer(i128::MAX)]),
            AbstractType::ArrayWithoutSchema,
        )
        .unwrap_err();
        assert_eq!(err.kind, FailureKind::Overflow);
    }

    #[test]
    fn test_to_json_value_rendering() {
        assert_eq!(PostgreSQLParam::Int8(Some(5)).to_json_value(), serde_json::json!(5));
        assert_eq!(PostgreSQLParam::Text(None).to_json_value(), serde_json::Value::Null);
        assert_eq!(
            PostgreSQLParam::Jsonb(Some(JsonText(r#"{"a":[1]}"#.to_string()))).to_json_value(),
            serde_json::json!({"a": [1]})
        );
    }
}
