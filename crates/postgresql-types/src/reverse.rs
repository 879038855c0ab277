//! Reverse conversion: PostgreSQL value → AbstractValue
//!
//! This module converts column values read back from a target table into
//! sync-core's `AbstractValue`, guided by the field's declared type.

use crate::forward::PostgreSQLParam;
use sync_core::{AbstractType, AbstractValue};
use thiserror::Error;

/// Errors that can occur during PostgreSQL to AbstractValue conversion.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The stored value does not match the declared type
    #[error("Type mismatch in column '{column}': expected {expected}, got {actual}")]
    TypeMismatch {
        column: String,
        expected: String,
        actual: String,
    },

    /// A JSON document column holds invalid JSON
    #[error("Invalid JSON in column '{column}': {source}")]
    InvalidJson {
        column: String,
        #[source]
        source: serde_json::Error,
    },

    /// The column could not be read from the row
    #[error("Failed to read column '{column}': {message}")]
    Read { column: String, message: String },
}

/// Convert a column value back to an `AbstractValue` of the declared type.
///
/// SQL `NULL` of any type decodes to [`AbstractValue::Null`].
pub fn from_param(
    column: &str,
    param: PostgreSQLParam,
    declared: &AbstractType,
) -> Result<AbstractValue, DecodeError> {
    if param.is_null() {
        return Ok(AbstractValue::Null);
    }

    let mismatch = |param: &PostgreSQLParam| DecodeError::TypeMismatch {
        column: column.to_string(),
        expected: declared.name().to_string(),
        actual: param.column_type().ddl().to_string(),
    };

    match (declared, param) {
        (AbstractType::Boolean, PostgreSQLParam::Bool(Some(b))) => Ok(AbstractValue::Boolean(b)),
        (AbstractType::Integer, PostgreSQLParam::Int8(Some(i))) => {
            Ok(AbstractValue::Integer(i as i128))
        }
        (AbstractType::Number, PostgreSQLParam::Numeric(Some(d))) => Ok(AbstractValue::Number(d)),
        (AbstractType::String, PostgreSQLParam::Text(Some(s))) => Ok(AbstractValue::String(s)),
        (AbstractType::Date, PostgreSQLParam::Date(Some(d))) => Ok(AbstractValue::Date(d)),
        (AbstractType::TimeWithoutTimezone, PostgreSQLParam::Time(Some(t))) => {
            Ok(AbstractValue::TimeWithoutTimezone(t))
        }
        (AbstractType::TimeWithTimezone, PostgreSQLParam::TimeTz(Some(t))) => {
            Ok(AbstractValue::TimeWithTimezone(t.time, t.offset))
        }
        (AbstractType::TimestampWithoutTimezone, PostgreSQLParam::Timestamp(Some(dt))) => {
            Ok(AbstractValue::TimestampWithoutTimezone(dt))
        }
        (AbstractType::TimestampWithTimezone, PostgreSQLParam::TimestampTz(Some(dt))) => {
            Ok(AbstractValue::TimestampWithTimezone(dt.fixed_offset()))
        }
        (declared, PostgreSQLParam::Jsonb(Some(text))) if is_document_type(declared) => {
            let document: serde_json::Value =
                serde_json::from_str(text.as_str()).map_err(|source| DecodeError::InvalidJson {
                    column: column.to_string(),
                    source,
                })?;
            let shape_ok = match declared {
                AbstractType::Array { .. } | AbstractType::ArrayWithoutSchema => {
                    document.is_array()
                }
                AbstractType::Object { .. }
                | AbstractType::ObjectWithEmptySchema
                | AbstractType::ObjectWithoutSchema => document.is_object(),
                _ => true,
            };
            if !shape_ok {
                return Err(DecodeError::TypeMismatch {
                    column: column.to_string(),
                    expected: declared.name().to_string(),
                    actual: json_kind(&document).to_string(),
                });
            }
            Ok(AbstractValue::from_json_typed(document, declared))
        }
        (_, param) => Err(mismatch(&param)),
    }
}

fn is_document_type(declared: &AbstractType) -> bool {
    matches!(
        declared,
        AbstractType::Array { .. }
            | AbstractType::ArrayWithoutSchema
            | AbstractType::Object { .. }
            | AbstractType::ObjectWithEmptySchema
            | AbstractType::ObjectWithoutSchema
            | AbstractType::Union { .. }
    )
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::{JsonText, TimeTz};
    use chrono::{FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
    use rust_decimal::Decimal;
    use sync_core::{FieldType, NamedField};

    #[test]
    fn test_null_of_any_type() {
        assert_eq!(
            from_param("a", PostgreSQLParam::Int8(None), &AbstractType::Integer).unwrap(),
            AbstractValue::Null
        );
        assert_eq!(
            from_param("a", PostgreSQLParam::Jsonb(None), &AbstractType::ObjectWithoutSchema)
                .unwrap(),
            AbstractValue::Null
        );
    }

    #[test]
    fn test_scalars() {
        assert_eq!(
            from_param("a", PostgreSQLParam::Int8(Some(42)), &AbstractType::Integer).unwrap(),
            AbstractValue::Integer(42)
        );
        assert_eq!(
            from_param(
                "a",
                PostgreSQLParam::Numeric(Some(Decimal::new(314, 2))),
                &AbstractType::Number
            )
            .unwrap(),
            AbstractValue::Number(Decimal::new(314, 2))
        );
        assert_eq!(
            from_param("a", PostgreSQLParam::Text(Some("x".into())), &AbstractType::String)
                .unwrap(),
            AbstractValue::from("x")
        );
    }

    #[test]
    fn test_temporal() {
        let utc = Utc.with_ymd_and_hms(2024, 5, 1, 11, 0, 0).unwrap();
        let original = FixedOffset::east_opt(3600)
            .unwrap()
            .with_ymd_and_hms(2024, 5, 1, 12, 0, 0)
            .unwrap();
        assert_eq!(
            from_param(
                "ts",
                PostgreSQLParam::TimestampTz(Some(utc)),
                &AbstractType::TimestampWithTimezone
            )
            .unwrap(),
            AbstractValue::TimestampWithTimezone(original)
        );

        let time = NaiveTime::from_hms_opt(1, 2, 3).unwrap();
        let offset = FixedOffset::west_opt(1800).unwrap();
        assert_eq!(
            from_param(
                "t",
                PostgreSQLParam::TimeTz(Some(TimeTz::new(time, offset))),
                &AbstractType::TimeWithTimezone
            )
            .unwrap(),
            AbstractValue::TimeWithTimezone(time, offset)
        );
    }

    #[test]
    fn test_document_with_declared_element_type() {
        let declared = AbstractType::array(FieldType::nullable(AbstractType::Date));
        let value = from_param(
            "days",
            PostgreSQLParam::Jsonb(Some(JsonText(r#"["2024-01-01"]"#.into()))),
            &declared,
        )
        .unwrap();
        assert_eq!(
            value,
            AbstractValue::Array(vec![AbstractValue::Date(
                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
            )])
        );
    }

    #[test]
    fn test_document_object() {
        let declared = AbstractType::object(vec![NamedField::new(
            "n",
            FieldType::nullable(AbstractType::Integer),
        )]);
        let value = from_param(
            "o",
            PostgreSQLParam::Jsonb(Some(JsonText(r#"{"n":5}"#.into()))),
            &declared,
        )
        .unwrap();
        assert_eq!(value.get("n"), Some(&AbstractValue::Integer(5)));
    }

    #[test]
    fn test_mismatch_is_error() {
        let err = from_param("a", PostgreSQLParam::Text(Some("42".into())), &AbstractType::Integer)
            .unwrap_err();
        assert!(matches!(err, DecodeError::TypeMismatch { ref column, .. } if column == "a"));

        let err = from_param(
            "o",
            PostgreSQLParam::Jsonb(Some(JsonText("[1]".into()))),
            &AbstractType::ObjectWithoutSchema,
        )
        .unwrap_err();
        assert!(matches!(err, DecodeError::TypeMismatch { ref actual, .. } if actual == "array"));
    }

    #[test]
    fn test_invalid_json() {
        let err = from_param(
            "o",
            PostgreSQLParam::Jsonb(Some(JsonText("{oops".into()))),
            &AbstractType::ObjectWithoutSchema,
        )
        .unwrap_err();
        assert!(matches!(err, DecodeError::InvalidJson { .. }));
    }
}
