//! Per-record statement binding.
//!
//! Every field of the target schema gets exactly one parameter. System
//! fields are generated from the record envelope; user fields are converted
//! from the record payload. A user field that cannot be converted is bound as
//! a typed null and recorded in the record's meta envelope, so one bad value
//! never fails the whole record.

use crate::traits::BindTarget;
use postgresql_types::{
    to_param, JsonText, PostgreSQLDdl, PostgreSQLParam, SqlColumnType, UnsupportedTypeError,
};
use std::sync::Arc;
use sync_core::{
    ChangeRecord, ConversionFailure, MetaEnvelope, NamedField, Reason, Record, SystemField,
    TargetSchema,
};
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

/// Errors that make a statement unusable for a record.
///
/// Per-field conversion failures are not errors; they end up in
/// [`BindReport::envelope`].
#[derive(Debug, Error)]
pub enum BindError {
    #[error("Parameter index {index} is out of range for a statement with {count} parameters")]
    ParameterOutOfRange { index: usize, count: usize },

    #[error("Parameter {index} expects {expected}, got {actual}")]
    ParameterType {
        index: usize,
        expected: SqlColumnType,
        actual: SqlColumnType,
    },

    #[error("Parameter {index} is already bound")]
    AlreadyBound { index: usize },

    #[error("Parameter {index} is not bound")]
    Unbound { index: usize },

    #[error("Failed to serialize meta envelope: {0}")]
    Envelope(#[from] serde_json::Error),
}

/// Outcome of binding one record.
#[derive(Debug, Clone, PartialEq)]
pub struct BindReport {
    /// The envelope bound into the meta column: upstream changes followed by
    /// the fields nulled while binding.
    pub envelope: MetaEnvelope,

    /// Number of changes added while binding.
    pub nulled: usize,
}

impl BindReport {
    /// Changes added while binding, in field order.
    pub fn destination_changes(&self) -> &[ChangeRecord] {
        let changes = &self.envelope.changes;
        &changes[changes.len() - self.nulled..]
    }
}

/// Binds records into write statements for one stream.
///
/// Holds only shared, immutable schema data and can be used from several
/// threads at once, each binding into its own statement.
#[derive(Debug, Clone)]
pub struct StatementBinder {
    schema: Arc<TargetSchema>,
    column_types: Arc<[SqlColumnType]>,
}

impl StatementBinder {
    /// Build a binder for `schema`, mapping every field to its column type.
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

    pub fn schema(&self) -> &TargetSchema {
        &self.schema
    }

    /// Bind `record` into `statement`, one parameter per schema field at its
    /// 1-based position. The meta column is bound last.
    pub fn bind<T>(&self, statement: &mut T, record: &Record) -> Result<BindReport, BindError>
    where
        T: BindTarget + ?Sized,
    {
        let mut envelope = MetaEnvelope::for_sync(record.sync_id.as_str());
        for change in &record.changes {
            envelope.push(change.clone());
        }
        let upstream = envelope.changes.len();
        let mut meta_index = None;

        let columns = self.schema.fields().iter().zip(self.column_types.iter());
        for (position, (field, &column_type)) in columns.enumerate() {
            let index = position + 1;

            let param = match SystemField::from_name(&field.name) {
                Some(SystemField::RawId) => {
                    PostgreSQLParam::Text(Some(Uuid::new_v4().to_string()))
                }
                Some(SystemField::ExtractedAt) => {
                    PostgreSQLParam::Int8(Some(record.emitted_at_ms))
                }
                Some(SystemField::GenerationId) => {
                    PostgreSQLParam::Int8(Some(record.generation_id))
                }
                Some(SystemField::Meta) => {
                    meta_index = Some(index);
                    continue;
                }
                None => match convert_field(field, column_type, record) {
                    Ok(param) => param,
                    Err(failure) => {
                        let reason = Reason::from(failure.kind);
                        debug!(
                            field = %field.name,
                            ?reason,
                            cause = %failure,
                            "Binding null for field that failed conversion"
                        );
                        envelope.push(ChangeRecord::nulled(field.name.as_str(), reason));
                        PostgreSQLParam::null(column_type)
                    }
                },
            };
            statement.bind_param(index, param)?;
        }

        let nulled = envelope.changes.len() - upstream;
        if nulled > 0 {
            warn!(
                sync_id = %record.sync_id,
                nulled,
                "Record bound with nulled fields"
            );
        }

        if let Some(index) = meta_index {
            let text = envelope.to_json_string()?;
            statement.bind_param(index, PostgreSQLParam::Jsonb(Some(JsonText(text))))?;
        }

        Ok(BindReport { envelope, nulled })
    }
}

fn convert_field(
    field: &NamedField,
    column_type: SqlColumnType,
    record: &Record,
) -> Result<PostgreSQLParam, ConversionFailure> {
    let value = record
        .field(&field.name)
        .ok_or_else(|| ConversionFailure::missing(&field.name))?;
    to_param(value, field.abstract_type(), column_type)
}
