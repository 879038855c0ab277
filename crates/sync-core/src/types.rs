//! Abstract type model for stream-loader.
//!
//! This module defines `AbstractType`, the source-agnostic type universe used to
//! describe the records of a stream before they are mapped onto a relational
//! destination.

use std::fmt;

/// Abstract data type of a stream field.
///
/// `AbstractType` describes what a value *is* rather than how any destination
/// stores it. Each destination crate derives its column types from an
/// `AbstractType` (see `postgresql_types::ToDdl`).
///
/// # Design Principles
///
/// 1. **Destination-agnostic**: a stream schema is described once and mapped per dialect
/// 2. **Composite aware**: objects and arrays may or may not declare a schema
/// 3. **Open but explicit**: schema fragments that cannot be understood are kept as `Unknown`
///    so that mapping them fails loudly instead of being coerced
#[derive(Debug, Clone, PartialEq)]
pub enum AbstractType {
    // Scalars
    /// `true` / `false`
    Boolean,

    /// Integral number of unbounded width
    Integer,

    /// Exact decimal number
    Number,

    /// Unicode text
    String,

    // Temporal types
    /// Calendar date (YYYY-MM-DD)
    Date,

    /// Time of day with a UTC offset
    TimeWithTimezone,

    /// Time of day without an offset
    TimeWithoutTimezone,

    /// Instant with a UTC offset
    TimestampWithTimezone,

    /// Wall-clock timestamp without an offset
    TimestampWithoutTimezone,

    // Composite types
    /// Array whose elements share a declared type
    Array {
        /// Element type
        items: Box<FieldType>,
    },

    /// Array without a declared element type
    ArrayWithoutSchema,

    /// Object with declared properties, in declaration order
    Object {
        /// Declared properties
        properties: Vec<NamedField>,
    },

    /// Object that declares an empty property list
    ObjectWithEmptySchema,

    /// Object whose properties are not declared at all
    ObjectWithoutSchema,

    /// Value that may be any of several types
    Union {
        /// Candidate types
        options: Vec<AbstractType>,
    },

    /// Schema fragment that could not be interpreted
    Unknown(serde_json::Value),
}

impl AbstractType {
    /// Create an object type from its declared properties.
    pub fn object(properties: Vec<NamedField>) -> Self {
        Self::Object { properties }
    }

    /// Create an array type with the given element type.
    pub fn array(items: FieldType) -> Self {
        Self::Array {
            items: Box::new(items),
        }
    }

    /// Create a union of the given options.
    pub fn union(options: Vec<AbstractType>) -> Self {
        Self::Union { options }
    }

    /// Check if this type is a scalar.
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            Self::Boolean | Self::Integer | Self::Number | Self::String
        ) || self.is_temporal()
    }

    /// Check if this type represents a temporal type.
    pub fn is_temporal(&self) -> bool {
        matches!(
            self,
            Self::Date
                | Self::TimeWithTimezone
                | Self::TimeWithoutTimezone
                | Self::TimestampWithTimezone
                | Self::TimestampWithoutTimezone
        )
    }

    /// Check if this type is an object of any flavour.
    pub fn is_object(&self) -> bool {
        matches!(
            self,
            Self::Object { .. } | Self::ObjectWithEmptySchema | Self::ObjectWithoutSchema
        )
    }

    /// Short name of the type, used in error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::String => "string",
            Self::Date => "date",
            Self::TimeWithTimezone => "time_with_timezone",
            Self::TimeWithoutTimezone => "time_without_timezone",
            Self::TimestampWithTimezone => "timestamp_with_timezone",
            Self::TimestampWithoutTimezone => "timestamp_without_timezone",
            Self::Array { .. } => "array",
            Self::ArrayWithoutSchema => "array_without_schema",
            Self::Object { .. } => "object",
            Self::ObjectWithEmptySchema => "object_with_empty_schema",
            Self::ObjectWithoutSchema => "object_without_schema",
            Self::Union { .. } => "union",
            Self::Unknown(_) => "unknown",
        }
    }
}

impl fmt::Display for AbstractType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An `AbstractType` together with its nullability.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldType {
    pub type_: AbstractType,
    pub nullable: bool,
}

impl FieldType {
    pub fn new(type_: AbstractType, nullable: bool) -> Self {
        Self { type_, nullable }
    }

    /// Nullable field of the given type.
    pub fn nullable(type_: AbstractType) -> Self {
        Self::new(type_, true)
    }

    /// Non-nullable field of the given type.
    pub fn required(type_: AbstractType) -> Self {
        Self::new(type_, false)
    }
}

/// A named field of an object type or target schema.
///
/// Names are case-sensitive and unique within one schema.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedField {
    pub name: String,
    pub field_type: FieldType,
}

impl NamedField {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
        }
    }

    /// The field's abstract type.
    pub fn abstract_type(&self) -> &AbstractType {
        &self.field_type.type_
    }
}
