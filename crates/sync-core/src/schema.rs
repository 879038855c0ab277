//! Target table schema derived from a stream's declared type.
//!
//! A [`TargetSchema`] is the ordered column list a stream maps to: the four
//! loader-generated system fields followed by the stream's own properties.
//! The order fixes both the DDL column order and the positional parameter
//! index each field is bound to.

use crate::types::{AbstractType, FieldType, NamedField};
use std::collections::HashSet;

/// Error type for schema extraction.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchemaError {
    /// The stream's top-level type cannot be laid out as columns
    #[error("Unsupported stream schema shape: expected an object with properties, got {0}")]
    UnsupportedSchemaShape(String),

    /// A declared property uses a reserved system field name
    #[error("Field '{0}' collides with a reserved system field name")]
    ReservedFieldName(String),

    /// A property name is declared more than once
    #[error("Field '{0}' is declared more than once")]
    DuplicateField(String),
}

/// Loader-generated columns present in every target table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SystemField {
    /// Fresh random identifier of the row
    RawId,
    /// Record emission time in epoch milliseconds
    ExtractedAt,
    /// Serialized [`crate::MetaEnvelope`]
    Meta,
    /// Generation the record belongs to
    GenerationId,
}

impl SystemField {
    /// All system fields in column order.
    pub const ALL: [SystemField; 4] = [
        SystemField::RawId,
        SystemField::ExtractedAt,
        SystemField::Meta,
        SystemField::GenerationId,
    ];

    /// Column name of the field.
    pub fn name(self) -> &'static str {
        match self {
            SystemField::RawId => "_sync_raw_id",
            SystemField::ExtractedAt => "_sync_extracted_at",
            SystemField::Meta => "_sync_meta",
            SystemField::GenerationId => "_sync_generation_id",
        }
    }

    /// Resolve a column name to a system field.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }

    /// Declared type of the field.
    pub fn field_type(self) -> FieldType {
        let type_ = match self {
            SystemField::RawId => AbstractType::String,
            SystemField::ExtractedAt | SystemField::GenerationId => AbstractType::Integer,
            SystemField::Meta => AbstractType::ObjectWithoutSchema,
        };
        FieldType::required(type_)
    }

    pub fn named_field(self) -> NamedField {
        NamedField::new(self.name(), self.field_type())
    }
}

/// Ordered column list of a stream's target table.
///
/// Built once per stream and read-only afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetSchema {
    fields: Vec<NamedField>,
}

impl TargetSchema {
    /// Derive the target schema from a stream's declared top-level type.
    ///
    /// The declared type must be an object. Properties keep their declaration
    /// order and follow the system fields.
    pub fn extract(declared: &AbstractType) -> Result<Self, SchemaError> {
        let properties: &[NamedField] = match declared {
            AbstractType::Object { properties } => properties,
            AbstractType::ObjectWithEmptySchema => &[],
            AbstractType::Boolean
            | AbstractType::Integer
            | AbstractType::Number
            | AbstractType::String
            | AbstractType::Date
            | AbstractType::TimeWithTimezone
            | AbstractType::TimeWithoutTimezone
            | AbstractType::TimestampWithTimezone
            | AbstractType::TimestampWithoutTimezone
            | AbstractType::Array { .. }
            | AbstractType::ArrayWithoutSchema
            | AbstractType::ObjectWithoutSchema
            | AbstractType::Union { .. }
            | AbstractType::Unknown(_) => {
                return Err(SchemaError::UnsupportedSchemaShape(
                    declared.name().to_string(),
                ))
            }
        };

        let mut seen = HashSet::with_capacity(properties.len());
        for property in properties {
            if SystemField::from_name(&property.name).is_some() {
                return Err(SchemaError::ReservedFieldName(property.name.clone()));
            }
            if !seen.insert(property.name.as_str()) {
                return Err(SchemaError::DuplicateField(property.name.clone()));
            }
        }

        let mut fields: Vec<NamedField> =
            SystemField::ALL.iter().map(|f| f.named_field()).collect();
        fields.extend(properties.iter().cloned());
        Ok(Self { fields })
    }

    /// All fields in column order.
    pub fn fields(&self) -> &[NamedField] {
        &self.fields
    }

    /// Fields declared by the stream, in column order.
    pub fn user_fields(&self) -> &[NamedField] {
        &self.fields[SystemField::ALL.len()..]
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Look up a field by name.
    pub fn get(&self, name: &str) -> Option<&NamedField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Column names in order.
    pub fn column_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }
}
