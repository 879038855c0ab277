//! JSON interop for the abstract model.
//!
//! Streams declare their records with JSON Schema and deliver them as JSON
//! documents. This module turns both into the abstract model:
//!
//! - [`parse_json_schema`] - JSON Schema → [`AbstractType`]
//! - [`AbstractValue::from_json`] - untyped JSON → [`AbstractValue`]
//! - [`coerce`] - upgrade an untyped value to its declared type where JSON has
//!   no native representation (dates, times, timestamps)
//! - [`to_json`] - [`AbstractValue`] → JSON, used for JSON-typed columns

use crate::types::{AbstractType, FieldType, NamedField};
use crate::values::{AbstractValue, ConversionFailure};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde_json::{Map, Value};
use std::str::FromStr;

/// Schema keyword refining `string`/`number` into a more specific type.
pub const TYPE_HINT_KEY: &str = "x-type";

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S%.f";
const NAIVE_TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parse a JSON Schema document into an [`AbstractType`].
///
/// Parsing is total: fragments that cannot be interpreted become
/// [`AbstractType::Unknown`], which destinations refuse to map.
///
/// # Example
///
/// ```
/// use serde_json::json;
/// use sync_core::json::parse_json_schema;
/// use sync_core::AbstractType;
///
/// let ty = parse_json_schema(&json!({"type": ["null", "integer"]}));
/// assert_eq!(ty, AbstractType::Integer);
/// ```
pub fn parse_json_schema(schema: &Value) -> AbstractType {
    parse_schema_node(schema).0
}

/// Parse a schema node into its type and whether it explicitly admits null.
fn parse_schema_node(schema: &Value) -> (AbstractType, bool) {
    let Some(node) = schema.as_object() else {
        return (AbstractType::Unknown(schema.clone()), true);
    };

    match node.get("type") {
        Some(Value::String(name)) if name == "null" => {
            (AbstractType::Unknown(schema.clone()), true)
        }
        Some(Value::String(name)) => (parse_named_type(name, node, schema), false),
        Some(Value::Array(names)) => {
            let mut admits_null = false;
            let mut options = Vec::new();
            for name in names.iter().filter_map(|n| n.as_str()) {
                if name == "null" {
                    admits_null = true;
                } else {
                    options.push(parse_named_type(name, node, schema));
                }
            }
            (collapse_options(options, schema), admits_null)
        }
        Some(_) => (AbstractType::Unknown(schema.clone()), true),
        None => {
            if let Some(Value::Array(variants)) = node.get("oneOf").or_else(|| node.get("anyOf")) {
                let mut admits_null = false;
                let mut options = Vec::new();
                for variant in variants {
                    let (type_, null) = parse_schema_node(variant);
                    if is_null_only(variant) {
                        admits_null = true;
                    } else {
                        admits_null |= null;
                        options.push(type_);
                    }
                }
                (collapse_options(options, schema), admits_null)
            } else if node.contains_key("properties") {
                (parse_object(node), false)
            } else {
                (AbstractType::Unknown(schema.clone()), true)
            }
        }
    }
}

fn is_null_only(schema: &Value) -> bool {
    schema.get("type").and_then(|t| t.as_str()) == Some("null")
}

fn collapse_options(mut options: Vec<AbstractType>, schema: &Value) -> AbstractType {
    match options.len() {
        0 => AbstractType::Unknown(schema.clone()),
        1 => options.remove(0),
        _ => AbstractType::union(options),
    }
}

fn type_hint(node: &Map<String, Value>) -> Option<&str> {
    node.get(TYPE_HINT_KEY).and_then(|v| v.as_str())
}

fn parse_named_type(name: &str, node: &Map<String, Value>, schema: &Value) -> AbstractType {
    match name {
        "boolean" => AbstractType::Boolean,
        "integer" => AbstractType::Integer,
        "number" => match type_hint(node) {
            Some("integer") => AbstractType::Integer,
            _ => AbstractType::Number,
        },
        "string" => {
            let format = node.get("format").and_then(|v| v.as_str());
            match (format, type_hint(node)) {
                (Some("date"), _) => AbstractType::Date,
                (Some("time"), Some("time_without_timezone")) => AbstractType::TimeWithoutTimezone,
                (Some("time"), _) => AbstractType::TimeWithTimezone,
                (Some("date-time"), Some("timestamp_without_timezone")) => {
                    AbstractType::TimestampWithoutTimezone
                }
                (Some("date-time"), _) => AbstractType::TimestampWithTimezone,
                (_, Some("integer")) => AbstractType::Integer,
                _ => AbstractType::String,
            }
        }
        "object" => parse_object(node),
        "array" => match node.get("items") {
            Some(items @ Value::Object(_)) => {
                let (type_, _) = parse_schema_node(items);
                AbstractType::array(FieldType::nullable(type_))
            }
            _ => AbstractType::ArrayWithoutSchema,
        },
        _ => AbstractType::Unknown(schema.clone()),
    }
}

fn parse_object(node: &Map<String, Value>) -> AbstractType {
    let Some(Value::Object(properties)) = node.get("properties") else {
        return AbstractType::ObjectWithoutSchema;
    };
    if properties.is_empty() {
        return AbstractType::ObjectWithEmptySchema;
    }

    let required: Vec<&str> = node
        .get("required")
        .and_then(|v| v.as_array())
        .map(|names| names.iter().filter_map(|n| n.as_str()).collect())
        .unwrap_or_default();

    let fields = properties
        .iter()
        .map(|(name, property)| {
            let (type_, admits_null) = parse_schema_node(property);
            let nullable = admits_null || !required.contains(&name.as_str());
            NamedField::new(name.clone(), FieldType::new(type_, nullable))
        })
        .collect();
    AbstractType::object(fields)
}

impl AbstractValue {
    /// Convert an untyped JSON value.
    ///
    /// Integral numbers become [`AbstractValue::Integer`], other numbers
    /// [`AbstractValue::Number`]. Numbers neither can hold are kept as
    /// [`AbstractValue::OutOfRangeNumber`].
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Null => AbstractValue::Null,
            Value::Bool(b) => AbstractValue::Boolean(b),
            Value::Number(n) => number_from_json(&n),
            Value::String(s) => AbstractValue::String(s),
            Value::Array(items) => {
                AbstractValue::Array(items.into_iter().map(AbstractValue::from_json).collect())
            }
            Value::Object(fields) => AbstractValue::Object(
                fields
                    .into_iter()
                    .map(|(k, v)| (k, AbstractValue::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Convert a JSON value and coerce it to the declared type.
    pub fn from_json_typed(value: Value, declared: &AbstractType) -> Self {
        coerce(AbstractValue::from_json(value), declared)
    }
}

fn number_from_json(n: &serde_json::Number) -> AbstractValue {
    if let Some(i) = n.as_i64() {
        return AbstractValue::Integer(i as i128);
    }
    if let Some(u) = n.as_u64() {
        return AbstractValue::Integer(u as i128);
    }
    // Numbers keep their literal text, so wide integers parse exactly.
    let text = n.to_string();
    if let Ok(i) = text.parse::<i128>() {
        return AbstractValue::Integer(i);
    }
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map(AbstractValue::Number)
        .unwrap_or(AbstractValue::OutOfRangeNumber(text))
}

/// Upgrade an untyped value to `declared` where possible.
///
/// Strings are parsed into temporal values and integers, integral numbers
/// into integers and integers into numbers. A union takes the first option
/// that upgrades the value. Values that cannot be upgraded are returned
/// unchanged; the destination then reports the mismatch.
pub fn coerce(value: AbstractValue, declared: &AbstractType) -> AbstractValue {
    match (declared, value) {
        (AbstractType::Integer, AbstractValue::Number(d)) if d.fract().is_zero() => {
            match d.to_i128() {
                Some(i) => AbstractValue::Integer(i),
                None => AbstractValue::Number(d),
            }
        }
        (AbstractType::Integer, AbstractValue::String(s)) => match s.trim().parse::<i128>() {
            Ok(i) => AbstractValue::Integer(i),
            Err(_) => AbstractValue::String(s),
        },
        (AbstractType::Number, AbstractValue::Integer(i)) => match Decimal::from_i128(i) {
            Some(d) => AbstractValue::Number(d),
            None => AbstractValue::Integer(i),
        },
        (AbstractType::Date, AbstractValue::String(s)) => {
            match NaiveDate::parse_from_str(&s, DATE_FORMAT) {
                Ok(d) => AbstractValue::Date(d),
                Err(_) => AbstractValue::String(s),
            }
        }
        (AbstractType::TimeWithoutTimezone, AbstractValue::String(s)) => {
            match NaiveTime::parse_from_str(&s, TIME_FORMAT) {
                Ok(t) => AbstractValue::TimeWithoutTimezone(t),
                Err(_) => AbstractValue::String(s),
            }
        }
        (AbstractType::TimeWithTimezone, AbstractValue::String(s)) => {
            match parse_time_with_offset(&s) {
                Some((t, offset)) => AbstractValue::TimeWithTimezone(t, offset),
                None => AbstractValue::String(s),
            }
        }
        (AbstractType::TimestampWithTimezone, AbstractValue::String(s)) => {
            match parse_timestamp_with_offset(&s) {
                Some(dt) => AbstractValue::TimestampWithTimezone(dt),
                None => AbstractValue::String(s),
            }
        }
        (AbstractType::TimestampWithoutTimezone, AbstractValue::String(s)) => {
            match parse_naive_timestamp(&s) {
                Some(dt) => AbstractValue::TimestampWithoutTimezone(dt),
                None => AbstractValue::String(s),
            }
        }
        (AbstractType::Array { items }, AbstractValue::Array(values)) => AbstractValue::Array(
            values
                .into_iter()
                .map(|v| coerce(v, &items.type_))
                .collect(),
        ),
        (AbstractType::Object { properties }, AbstractValue::Object(mut fields)) => {
            for property in properties {
                if let Some(v) = fields.remove(&property.name) {
                    fields.insert(property.name.clone(), coerce(v, property.abstract_type()));
                }
            }
            AbstractValue::Object(fields)
        }
        (AbstractType::Union { options }, value) => {
            if let Some(option) = options.iter().find(|option| conforms(&value, option)) {
                return coerce(value, option);
            }
            for option in options {
                let upgraded = coerce(value.clone(), option);
                if upgraded != value {
                    return upgraded;
                }
            }
            value
        }
        (_, value) => value,
    }
}

/// Whether `value` already has the variant `declared` asks for.
fn conforms(value: &AbstractValue, declared: &AbstractType) -> bool {
    matches!(
        (declared, value),
        (AbstractType::Boolean, AbstractValue::Boolean(_))
            | (AbstractType::Integer, AbstractValue::Integer(_))
            | (AbstractType::Number, AbstractValue::Number(_))
            | (AbstractType::String, AbstractValue::String(_))
            | (AbstractType::Date, AbstractValue::Date(_))
            | (AbstractType::TimeWithTimezone, AbstractValue::TimeWithTimezone(..))
            | (AbstractType::TimeWithoutTimezone, AbstractValue::TimeWithoutTimezone(_))
            | (AbstractType::TimestampWithTimezone, AbstractValue::TimestampWithTimezone(_))
            | (AbstractType::TimestampWithoutTimezone, AbstractValue::TimestampWithoutTimezone(_))
            | (AbstractType::Array { .. }, AbstractValue::Array(_))
            | (AbstractType::ArrayWithoutSchema, AbstractValue::Array(_))
            | (AbstractType::Object { .. }, AbstractValue::Object(_))
            | (AbstractType::ObjectWithEmptySchema, AbstractValue::Object(_))
            | (AbstractType::ObjectWithoutSchema, AbstractValue::Object(_))
    )
}

fn parse_time_with_offset(s: &str) -> Option<(NaiveTime, FixedOffset)> {
    let dt = DateTime::parse_from_rfc3339(&format!("1970-01-01T{s}")).ok()?;
    Some((dt.time(), *dt.offset()))
}

fn parse_timestamp_with_offset(s: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt);
    }
    // Offset-less timestamps are taken as UTC.
    parse_naive_timestamp(s).map(|naive| naive.and_utc().fixed_offset())
}

fn parse_naive_timestamp(s: &str) -> Option<NaiveDateTime> {
    NAIVE_TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(s, format).ok())
        .or_else(|| {
            DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|dt| dt.naive_local())
        })
}

/// Convert a value to JSON.
///
/// Temporal values become ISO 8601 strings and numbers keep every digit.
/// Integers outside the 64-bit range cannot be represented.
pub fn to_json(value: &AbstractValue) -> Result<Value, ConversionFailure> {
    Ok(match value {
        AbstractValue::Null => Value::Null,
        AbstractValue::Boolean(b) => Value::Bool(*b),
        AbstractValue::Integer(i) => {
            if let Ok(v) = i64::try_from(*i) {
                Value::from(v)
            } else if let Ok(v) = u64::try_from(*i) {
                Value::from(v)
            } else {
                return Err(ConversionFailure::overflow(format!(
                    "integer {i} does not fit a JSON number"
                )));
            }
        }
        AbstractValue::Number(d) => number_to_json(d)?,
        AbstractValue::OutOfRangeNumber(text) => {
            return Err(ConversionFailure::overflow(format!(
                "number {text} exceeds the supported numeric range"
            )));
        }
        AbstractValue::String(s) => Value::String(s.clone()),
        AbstractValue::Date(d) => Value::String(d.format(DATE_FORMAT).to_string()),
        AbstractValue::TimeWithTimezone(t, offset) => {
            Value::String(format!("{}{}", t.format(TIME_FORMAT), offset))
        }
        AbstractValue::TimeWithoutTimezone(t) => Value::String(t.format(TIME_FORMAT).to_string()),
        AbstractValue::TimestampWithTimezone(dt) => Value::String(dt.to_rfc3339()),
        AbstractValue::TimestampWithoutTimezone(dt) => {
            Value::String(dt.format(NAIVE_TIMESTAMP_FORMATS[0]).to_string())
        }
        AbstractValue::Array(items) => {
            Value::Array(items.iter().map(to_json).collect::<Result<_, _>>()?)
        }
        AbstractValue::Object(fields) => Value::Object(
            fields
                .iter()
                .map(|(k, v)| Ok((k.clone(), to_json(v)?)))
                .collect::<Result<Map<_, _>, ConversionFailure>>()?,
        ),
    })
}

fn number_to_json(d: &Decimal) -> Result<Value, ConversionFailure> {
    serde_json::Number::from_str(&d.to_string())
        .map(Value::Number)
        .map_err(|e| ConversionFailure::serialization(format!("number {d}: {e}")))
}
