//! PostgreSQL sink for stream-loader.
//!
//! This crate turns records into bound `INSERT` statements and rows of a
//! stream's table back into values. It never talks to a database itself:
//! executing statements and iterating cursors is left to the caller's
//! `tokio_postgres::Client`.
//!
//! A field that cannot be written is bound as NULL and listed in the row's
//! `_sync_meta` column instead of failing the record.
//!
//! # Example
//!
//! ```
//! use postgresql_sink::PostgreSQLStream;
//! use postgresql_types::TableName;
//! use sync_core::{AbstractType, AbstractValue, FieldType, NamedField, Record};
//!
//! let declared = AbstractType::object(vec![NamedField::new(
//!     "id",
//!     FieldType::nullable(AbstractType::Integer),
//! )]);
//! let stream = PostgreSQLStream::new(TableName::new("public", "users"), &declared).unwrap();
//!
//! let data = AbstractValue::object([("id", AbstractValue::from(42i64))]);
//! let record = Record::new(data, 0, 1, "s1");
//! let mut statement = stream.new_statement();
//! let report = stream.binder().bind(&mut statement, &record).unwrap();
//! assert!(report.envelope.changes.is_empty());
//! assert!(statement.is_complete());
//! ```

mod binder;
mod decoder;
mod row;
mod statement;
mod stream;
mod traits;

pub use binder::{BindError, BindReport, StatementBinder};
pub use decoder::ResultDecoder;
pub use row::MemoryRow;
pub use statement::BoundStatement;
pub use stream::{PostgreSQLStream, StreamError};
pub use traits::{BindTarget, RowSource};
