//! Row sources: `tokio_postgres::Row` and an in-memory row.

use crate::statement::BoundStatement;
use crate::traits::RowSource;
use postgresql_types::{DecodeError, PostgreSQLParam, SqlColumnType};
use std::collections::HashMap;
use sync_core::TargetSchema;
use tokio_postgres::types::FromSql;
use tokio_postgres::Row;

impl RowSource for Row {
    fn read(
        &self,
        column: &str,
        column_type: SqlColumnType,
    ) -> Result<PostgreSQLParam, DecodeError> {
        let param = match column_type {
            SqlColumnType::Boolean => PostgreSQLParam::Bool(cell(self, column)?),
            SqlColumnType::BigInt => PostgreSQLParam::Int8(cell(self, column)?),
            SqlColumnType::Numeric => PostgreSQLParam::Numeric(cell(self, column)?),
            SqlColumnType::Text => PostgreSQLParam::Text(cell(self, column)?),
            SqlColumnType::Date => PostgreSQLParam::Date(cell(self, column)?),
            SqlColumnType::Time => PostgreSQLParam::Time(cell(self, column)?),
            SqlColumnType::TimeTz => PostgreSQLParam::TimeTz(cell(self, column)?),
            SqlColumnType::Timestamp => PostgreSQLParam::Timestamp(cell(self, column)?),
            SqlColumnType::TimestampTz => PostgreSQLParam::TimestampTz(cell(self, column)?),
            SqlColumnType::Jsonb => PostgreSQLParam::Jsonb(cell(self, column)?),
        };
        Ok(param)
    }
}

/// Read a nullable column, reporting driver errors against the column name.
fn cell<'a, T: FromSql<'a>>(row: &'a Row, column: &str) -> Result<Option<T>, DecodeError> {
    row.try_get::<_, Option<T>>(column).map_err(|e| DecodeError::Read {
        column: column.to_string(),
        message: e.to_string(),
    })
}

/// A row held in memory, keyed by column name.
///
/// Mirrors what a table stores for a bound statement, which makes it useful
/// for dry runs and for checking that decoding reverses binding.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryRow {
    columns: HashMap<String, PostgreSQLParam>,
}

impl MemoryRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// The row a bound statement would insert. Unbound slots are left out.
    pub fn from_statement(schema: &TargetSchema, statement: &BoundStatement) -> Self {
        let columns = schema
            .fields()
            .iter()
            .enumerate()
            .filter_map(|(i, field)| {
                statement
                    .param(i + 1)
                    .map(|param| (field.name.clone(), param.clone()))
            })
            .collect();
        Self { columns }
    }

    pub fn insert(&mut self, column: impl Into<String>, param: PostgreSQLParam) {
        self.columns.insert(column.into(), param);
    }

    pub fn get(&self, column: &str) -> Option<&PostgreSQLParam> {
        self.columns.get(column)
    }
}

impl RowSource for MemoryRow {
    fn read(
        &self,
        column: &str,
        column_type: SqlColumnType,
    ) -> Result<PostgreSQLParam, DecodeError> {
        let param = self.columns.get(column).ok_or_else(|| DecodeError::Read {
            column: column.to_string(),
            message: "column not present in row".to_string(),
        })?;
        if param.column_type() != column_type {
            return Err(DecodeError::TypeMismatch {
                column: column.to_string(),
                expected: column_type.to_string(),
                actual: param.column_type().to_string(),
            });
        }
        Ok(param.clone())
    }
}
