//! PostgreSQL DDL generation from AbstractType.
//!
//! This module maps sync-core's `AbstractType` to PostgreSQL column types and
//! renders the statements a stream needs: idempotent schema and table
//! creation, the positional INSERT template and the full-table SELECT.

use postgres_types::Type;
use std::fmt;
use sync_core::{AbstractType, TargetSchema};

/// Error returned for an `AbstractType` with no PostgreSQL column type.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Unsupported type for column '{column}': {type_name}")]
pub struct UnsupportedTypeError {
    /// Column being mapped, empty when mapping a bare type
    pub column: String,
    pub type_name: String,
}

impl UnsupportedTypeError {
    fn for_type(abstract_type: &AbstractType) -> Self {
        Self {
            column: String::new(),
            type_name: abstract_type.name().to_string(),
        }
    }

    fn in_column(mut self, column: &str) -> Self {
        self.column = column.to_string();
        self
    }
}

/// PostgreSQL column type of a target table column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlColumnType {
    Boolean,
    BigInt,
    Numeric,
    Text,
    Date,
    Time,
    TimeTz,
    Timestamp,
    TimestampTz,
    Jsonb,
}

impl SqlColumnType {
    /// DDL type name.
    pub fn ddl(self) -> &'static str {
        match self {
            SqlColumnType::Boolean => "BOOLEAN",
            SqlColumnType::BigInt => "BIGINT",
            SqlColumnType::Numeric => "NUMERIC",
            SqlColumnType::Text => "TEXT",
            SqlColumnType::Date => "DATE",
            SqlColumnType::Time => "TIME",
            SqlColumnType::TimeTz => "TIME WITH TIME ZONE",
            SqlColumnType::Timestamp => "TIMESTAMP",
            SqlColumnType::TimestampTz => "TIMESTAMP WITH TIME ZONE",
            SqlColumnType::Jsonb => "JSONB",
        }
    }

    /// Wire type, for `prepare_typed`.
    pub fn pg_type(self) -> Type {
        match self {
            SqlColumnType::Boolean => Type::BOOL,
            SqlColumnType::BigInt => Type::INT8,
            SqlColumnType::Numeric => Type::NUMERIC,
            SqlColumnType::Text => Type::TEXT,
            SqlColumnType::Date => Type::DATE,
            SqlColumnType::Time => Type::TIME,
            SqlColumnType::TimeTz => Type::TIMETZ,
            SqlColumnType::Timestamp => Type::TIMESTAMP,
            SqlColumnType::TimestampTz => Type::TIMESTAMPTZ,
            SqlColumnType::Jsonb => Type::JSONB,
        }
    }
}

impl fmt::Display for SqlColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.ddl())
    }
}

/// Schema-qualified table name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableName {
    pub namespace: String,
    pub name: String,
}

impl TableName {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// `"namespace"."name"`
    pub fn qualified(&self) -> String {
        format!(
            "{}.{}",
            quote_identifier(&self.namespace),
            quote_identifier(&self.name)
        )
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.namespace, self.name)
    }
}

/// Double-quote an identifier, doubling embedded quotes.
pub fn quote_identifier(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

/// Trait for generating DDL type strings.
pub trait ToDdl {
    /// Convert an AbstractType to a DDL type string.
    fn to_ddl(&self, abstract_type: &AbstractType) -> Result<String, UnsupportedTypeError>;

    /// Generate an idempotent CREATE TABLE statement for a target schema.
    fn to_create_table(
        &self,
        table: &TableName,
        schema: &TargetSchema,
    ) -> Result<String, UnsupportedTypeError>;
}

/// PostgreSQL DDL generator.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgreSQLDdl;

impl PostgreSQLDdl {
    /// Map an abstract type to its column type.
    pub fn map(&self, abstract_type: &AbstractType) -> Result<SqlColumnType, UnsupportedTypeError> {
        match abstract_type {
            AbstractType::Boolean => Ok(SqlColumnType::Boolean),
            AbstractType::Integer => Ok(SqlColumnType::BigInt),
            AbstractType::Number => Ok(SqlColumnType::Numeric),
            AbstractType::String => Ok(SqlColumnType::Text),
            AbstractType::Date => Ok(SqlColumnType::Date),
            AbstractType::TimeWithTimezone => Ok(SqlColumnType::TimeTz),
            AbstractType::TimeWithoutTimezone => Ok(SqlColumnType::Time),
            AbstractType::TimestampWithTimezone => Ok(SqlColumnType::TimestampTz),
            AbstractType::TimestampWithoutTimezone => Ok(SqlColumnType::Timestamp),

            // Composite values are stored as documents
            AbstractType::Array { .. }
            | AbstractType::ArrayWithoutSchema
            | AbstractType::Object { .. }
            | AbstractType::ObjectWithEmptySchema
            | AbstractType::ObjectWithoutSchema
            | AbstractType::Union { .. } => Ok(SqlColumnType::Jsonb),

            AbstractType::Unknown(_) => Err(UnsupportedTypeError::for_type(abstract_type)),
        }
    }

    /// Map every field of a target schema, in column order.
    pub fn map_schema(
        &self,
        schema: &TargetSchema,
    ) -> Result<Vec<SqlColumnType>, UnsupportedTypeError> {
        schema
            .fields()
            .iter()
            .map(|field| {
                self.map(field.abstract_type())
                    .map_err(|e| e.in_column(&field.name))
            })
            .collect()
    }

    /// Generate a CREATE SCHEMA statement that is a no-op when the schema exists.
    pub fn schema_statement(&self, schema_name: &str) -> String {
        format!(
            "CREATE SCHEMA IF NOT EXISTS {};",
            quote_identifier(schema_name)
        )
    }

    /// Generate a CREATE TABLE statement that is a no-op when the table exists.
    ///
    /// Every column is nullable, system columns included.
    pub fn table_statement(
        &self,
        table: &TableName,
        schema: &TargetSchema,
    ) -> Result<String, UnsupportedTypeError> {
        let column_types = self.map_schema(schema)?;
        let column_defs: Vec<String> = schema
            .fields()
            .iter()
            .zip(column_types)
            .map(|(field, column_type)| {
                format!("  {} {}", quote_identifier(&field.name), column_type.ddl())
            })
            .collect();

        Ok(format!(
            "CREATE TABLE IF NOT EXISTS {} (\n{}\n);",
            table.qualified(),
            column_defs.join(",\n")
        ))
    }

    /// Generate an INSERT statement template with one placeholder per column.
    pub fn insert_statement(&self, table: &TableName, schema: &TargetSchema) -> String {
        let placeholders: Vec<String> = (1..=schema.len()).map(|i| format!("${i}")).collect();
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table.qualified(),
            quoted_columns(schema),
            placeholders.join(", ")
        )
    }

    /// Generate a SELECT of every column, in schema order.
    pub fn select_statement(&self, table: &TableName, schema: &TargetSchema) -> String {
        format!(
            "SELECT {} FROM {}",
            quoted_columns(schema),
            table.qualified()
        )
    }
}

impl ToDdl for PostgreSQLDdl {
    fn to_ddl(&self, abstract_type: &AbstractType) -> Result<String, UnsupportedTypeError> {
        self.map(abstract_type).map(|t| t.ddl().to_string())
    }

    fn to_create_table(
        &self,
        table: &TableName,
        schema: &TargetSchema,
    ) -> Result<String, UnsupportedTypeError> {
        self.table_statement(table, schema)
    }
}

fn quoted_columns(schema: &TargetSchema) -> String {
    schema
        .column_names()
        .into_iter()
        .map(quote_identifier)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sync_core::{FieldType, NamedField};

    fn users_schema() -> TargetSchema {
        TargetSchema::extract(&AbstractType::object(vec![
            NamedField::new("id", FieldType::nullable(AbstractType::Integer)),
            NamedField::new("name", FieldType::nullable(AbstractType::String)),
        ]))
        .unwrap()
    }

    #[test]
    fn test_scalar_ddl() {
        let ddl = PostgreSQLDdl;
        assert_eq!(ddl.to_ddl(&AbstractType::Boolean).unwrap(), "BOOLEAN");
        assert_eq!(ddl.to_ddl(&AbstractType::Integer).unwrap(), "BIGINT");
        assert_eq!(ddl.to_ddl(&AbstractType::Number).unwrap(), "NUMERIC");
        assert_eq!(ddl.to_ddl(&AbstractType::String).unwrap(), "TEXT");
    }

    #[test]
    fn test_temporal_ddl() {
        let ddl = PostgreSQLDdl;
        assert_eq!(ddl.to_ddl(&AbstractType::Date).unwrap(), "DATE");
        assert_eq!(ddl.to_ddl(&AbstractType::TimeWithoutTimezone).unwrap(), "TIME");
        assert_eq!(
            ddl.to_ddl(&AbstractType::TimeWithTimezone).unwrap(),
            "TIME WITH TIME ZONE"
        );
        assert_eq!(
            ddl.to_ddl(&AbstractType::TimestampWithoutTimezone).unwrap(),
            "TIMESTAMP"
        );
        assert_eq!(
            ddl.to_ddl(&AbstractType::TimestampWithTimezone).unwrap(),
            "TIMESTAMP WITH TIME ZONE"
        );
    }

    #[test]
    fn test_composite_ddl() {
        let ddl = PostgreSQLDdl;
        for t in [
            AbstractType::array(FieldType::nullable(AbstractType::Integer)),
            AbstractType::ArrayWithoutSchema,
            AbstractType::object(vec![]),
            AbstractType::ObjectWithEmptySchema,
            AbstractType::ObjectWithoutSchema,
            AbstractType::union(vec![AbstractType::String, AbstractType::Integer]),
        ] {
            assert_eq!(ddl.map(&t).unwrap(), SqlColumnType::Jsonb, "{t}");
        }
    }

    #[test]
    fn test_mapping_is_deterministic() {
        let ddl = PostgreSQLDdl;
        let t = AbstractType::TimestampWithTimezone;
        assert_eq!(ddl.map(&t), ddl.map(&t.clone()));
    }

    #[test]
    fn test_unknown_is_unsupported() {
        let ddl = PostgreSQLDdl;
        let err = ddl
            .map(&AbstractType::Unknown(json!({"type": "weird"})))
            .unwrap_err();
        assert_eq!(err.type_name, "unknown");
    }

    #[test]
    fn test_unknown_field_fails_table_statement() {
        let schema = TargetSchema::extract(&AbstractType::object(vec![NamedField::new(
            "mystery",
            FieldType::nullable(AbstractType::Unknown(json!({}))),
        )]))
        .unwrap();
        let err = PostgreSQLDdl
            .table_statement(&TableName::new("public", "t"), &schema)
            .unwrap_err();
        assert_eq!(err.column, "mystery");
    }

    #[test]
    fn test_schema_statement() {
        assert_eq!(
            PostgreSQLDdl.schema_statement("public"),
            "CREATE SCHEMA IF NOT EXISTS \"public\";"
        );
    }

    #[test]
    fn test_table_statement() {
        let sql = PostgreSQLDdl
            .table_statement(&TableName::new("public", "users"), &users_schema())
            .unwrap();
        assert_eq!(
            sql,
            "CREATE TABLE IF NOT EXISTS \"public\".\"users\" (\n  \
             \"_sync_raw_id\" TEXT,\n  \
             \"_sync_extracted_at\" BIGINT,\n  \
             \"_sync_meta\" JSONB,\n  \
             \"_sync_generation_id\" BIGINT,\n  \
             \"id\" BIGINT,\n  \
             \"name\" TEXT\n);"
        );
        assert!(!sql.contains("NOT NULL"));
    }

    #[test]
    fn test_insert_statement() {
        let table = TableName::new("public", "users");
        let sql = PostgreSQLDdl.insert_statement(&table, &users_schema());
        assert_eq!(
            sql,
            "INSERT INTO \"public\".\"users\" (\"_sync_raw_id\", \"_sync_extracted_at\", \
             \"_sync_meta\", \"_sync_generation_id\", \"id\", \"name\") \
             VALUES ($1, $2, $3, $4, $5, $6)"
        );
    }

    #[test]
    fn test_select_statement() {
        let sql = PostgreSQLDdl.select_statement(&TableName::new("s", "t"), &users_schema());
        assert!(sql.starts_with("SELECT \"_sync_raw_id\", "));
        assert!(sql.ends_with("\"name\" FROM \"s\".\"t\""));
    }

    #[test]
    fn test_identifier_quoting() {
        assert_eq!(quote_identifier("we\"ird"), "\"we\"\"ird\"");
        assert_eq!(TableName::new("a b", "c").qualified(), "\"a b\".\"c\"");
    }
}
