//! Row decoding: the reverse of binding.

use crate::traits::RowSource;
use postgresql_types::{
    from_param, DecodeError, PostgreSQLDdl, PostgreSQLParam, SqlColumnType, UnsupportedTypeError,
};
use std::collections::HashMap;
use std::sync::Arc;
use sync_core::{AbstractValue, MetaEnvelope, SystemField, TargetSchema};

/// Reads rows of a stream's table back into abstract values.
#[derive(Debug, Clone)]
pub struct ResultDecoder {
    schema: Arc<TargetSchema>,
    column_types: Arc<[SqlColumnType]>,
}

impl ResultDecoder {
    pub fn new(schema: Arc<TargetSchema>) -> Result<Self, UnsupportedTypeError> {
        let column_types = PostgreSQLDdl.map_schema(&schema)?;
        Ok(Self::from_parts(schema, column_types.into()))
    }

    pub(crate) fn from_parts(
        schema: Arc<TargetSchema>,
        column_types: Arc<[SqlColumnType]>,
    ) -> Self {
        Self {
            schema,
            column_types,
        }
    }

    /// Decode the user fields of `row` into an object keyed by field name.
    /// System columns are not read.
    pub fn decode<R>(&self, row: &R) -> Result<AbstractValue, DecodeError>
    where
        R: RowSource + ?Sized,
    {
        let mut fields = HashMap::with_capacity(self.schema.user_fields().len());
        let columns = self.schema.fields().iter().zip(self.column_types.iter());
        for (field, &column_type) in columns {
            if SystemField::from_name(&field.name).is_some() {
                continue;
            }
            let param = row.read(&field.name, column_type)?;
            let value = from_param(&field.name, param, field.abstract_type())?;
            fields.insert(field.name.clone(), value);
        }
        Ok(AbstractValue::Object(fields))
    }

    /// Read the meta envelope stored with a row. A SQL `NULL` meta column
    /// yields an empty envelope.
    pub fn decode_meta<R>(&self, row: &R) -> Result<MetaEnvelope, DecodeError>
    where
        R: RowSource + ?Sized,
    {
        let column = SystemField::Meta.name();
        match row.read(column, SqlColumnType::Jsonb)? {
            PostgreSQLParam::Jsonb(Some(text)) => {
                MetaEnvelope::from_json_str(text.as_str()).map_err(|source| {
                    DecodeError::InvalidJson {
                        column: column.to_string(),
                        source,
                    }
                })
            }
            _ => Ok(MetaEnvelope::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::MemoryRow;
    use postgresql_types::JsonText;
    use sync_core::{AbstractType, FieldType, NamedField};

    fn decoder() -> ResultDecoder {
        let declared = AbstractType::object(vec![
            NamedField::new("a", FieldType::nullable(AbstractType::Integer)),
            NamedField::new("b", FieldType::nullable(AbstractType::String)),
        ]);
        ResultDecoder::new(Arc::new(TargetSchema::extract(&declared).unwrap())).unwrap()
    }

    #[test]
    fn test_decode_skips_system_fields() {
        let mut row = MemoryRow::new();
        row.insert("a", PostgreSQLParam::Int8(Some(3)));
        row.insert("b", PostgreSQLParam::Text(None));

        let value = decoder().decode(&row).unwrap();
        let object = value.as_object().unwrap();
        assert_eq!(object.len(), 2);
        assert_eq!(object["a"], AbstractValue::Integer(3));
        assert_eq!(object["b"], AbstractValue::Null);
    }

    #[test]
    fn test_decode_missing_column() {
        let mut row = MemoryRow::new();
        row.insert("a", PostgreSQLParam::Int8(Some(3)));
        assert!(matches!(
            decoder().decode(&row),
            Err(DecodeError::Read { ref column, .. }) if column == "b"
        ));
    }

    #[test]
    fn test_decode_meta() {
        let mut row = MemoryRow::new();
        row.insert(
            "_sync_meta",
            PostgreSQLParam::Jsonb(Some(JsonText(r#"{"changes":[],"syncId":"s1"}"#.into()))),
        );
        let envelope = decoder().decode_meta(&row).unwrap();
        assert!(envelope.changes.is_empty());
        assert_eq!(envelope.sync_id(), Some("s1"));

        let mut null_meta = MemoryRow::new();
        null_meta.insert("_sync_meta", PostgreSQLParam::Jsonb(None));
        assert_eq!(decoder().decode_meta(&null_meta).unwrap(), MetaEnvelope::default());
    }
}
