//! Everything the loader needs to write and read one stream's table.

use crate::binder::StatementBinder;
use crate::decoder::ResultDecoder;
use crate::statement::BoundStatement;
use postgresql_types::{PostgreSQLDdl, SqlColumnType, TableName, UnsupportedTypeError};
use std::sync::Arc;
use sync_core::{AbstractType, SchemaError, TargetSchema};
use thiserror::Error;
use tokio_postgres::types::Type;
use tracing::debug;

/// Errors that make a stream unloadable. Raised before any record is bound.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("Invalid schema for stream {table}: {source}")]
    Schema {
        table: String,
        #[source]
        source: SchemaError,
    },

    #[error("Unsupported type for stream {table}: {source}")]
    UnsupportedType {
        table: String,
        #[source]
        source: UnsupportedTypeError,
    },
}

/// Compiled statements and shared schema of one stream's table.
///
/// Built once per stream. Clones share the schema.
#[derive(Debug, Clone)]
pub struct PostgreSQLStream {
    table: TableName,
    schema: Arc<TargetSchema>,
    column_types: Arc<[SqlColumnType]>,
    schema_sql: String,
    table_sql: String,
    insert_sql: Arc<str>,
    select_sql: String,
}

impl PostgreSQLStream {
    /// Extract the target schema from the stream's declared type and render
    /// its statements.
    pub fn new(table: TableName, declared: &AbstractType) -> Result<Self, StreamError> {
        let schema = TargetSchema::extract(declared).map_err(|source| StreamError::Schema {
            table: table.to_string(),
            source,
        })?;
        let unsupported = |source| StreamError::UnsupportedType {
            table: table.to_string(),
            source,
        };

        let ddl = PostgreSQLDdl;
        let column_types = ddl.map_schema(&schema).map_err(unsupported)?;
        let table_sql = ddl.table_statement(&table, &schema).map_err(unsupported)?;
        let schema_sql = ddl.schema_statement(&table.namespace);
        let insert_sql = ddl.insert_statement(&table, &schema);
        let select_sql = ddl.select_statement(&table, &schema);

        debug!(
            table = %table,
            columns = schema.len(),
            "Compiled stream statements"
        );

        Ok(Self {
            table,
            schema: Arc::new(schema),
            column_types: column_types.into(),
            schema_sql,
            table_sql,
            insert_sql: insert_sql.into(),
            select_sql,
        })
    }

    pub fn table(&self) -> &TableName {
        &self.table
    }

    pub fn schema(&self) -> &Arc<TargetSchema> {
        &self.schema
    }

    pub fn column_types(&self) -> &[SqlColumnType] {
        &self.column_types
    }

    /// `CREATE SCHEMA IF NOT EXISTS` for the table's namespace.
    pub fn schema_statement(&self) -> &str {
        &self.schema_sql
    }

    /// `CREATE TABLE IF NOT EXISTS` with every column nullable.
    pub fn table_statement(&self) -> &str {
        &self.table_sql
    }

    pub fn insert_statement(&self) -> &str {
        &self.insert_sql
    }

    pub fn select_statement(&self) -> &str {
        &self.select_sql
    }

    /// Placeholder types of the insert statement.
    pub fn param_types(&self) -> Vec<Type> {
        self.column_types.iter().map(|t| t.pg_type()).collect()
    }

    /// A fresh insert statement to bind one record into.
    pub fn new_statement(&self) -> BoundStatement {
        BoundStatement::new(Arc::clone(&self.insert_sql), Arc::clone(&self.column_types))
    }

    pub fn binder(&self) -> StatementBinder {
        StatementBinder::from_parts(Arc::clone(&self.schema), Arc::clone(&self.column_types))
    }

    pub fn decoder(&self) -> ResultDecoder {
        ResultDecoder::from_parts(Arc::clone(&self.schema), Arc::clone(&self.column_types))
    }
}
