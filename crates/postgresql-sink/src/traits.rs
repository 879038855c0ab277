//! Seams between the loader and the statement/row objects of a driver.
//!
//! The binder only ever writes positional parameters and the decoder only
//! ever reads named columns, so both are written against these two traits
//! instead of a concrete driver type. `tokio_postgres::Row` and the
//! in-memory [`BoundStatement`](crate::BoundStatement) /
//! [`MemoryRow`](crate::MemoryRow) implement them.

use crate::binder::BindError;
use postgresql_types::{DecodeError, PostgreSQLParam, SqlColumnType};

/// Something positional parameters can be bound into.
///
/// # Usage Pattern
///
/// ```ignore
/// let mut statement = stream.new_statement();
/// let report = stream.binder().bind(&mut statement, &record)?;
/// client.execute(statement.sql(), &statement.params()?).await?;
/// ```
///
/// Implementations must reject an index outside `1..=parameter_count`.
pub trait BindTarget {
    /// Bind `param` at the 1-based position `index`.
    fn bind_param(&mut self, index: usize, param: PostgreSQLParam) -> Result<(), BindError>;
}

/// A row of a query result that columns can be read from by name.
pub trait RowSource {
    /// Read `column` as a parameter of `column_type`. SQL `NULL` is returned
    /// as the typed null of that column type.
    fn read(&self, column: &str, column_type: SqlColumnType)
        -> Result<PostgreSQLParam, DecodeError>;
}

impl<T: BindTarget + ?Sized> BindTarget for &mut T {
    fn bind_param(&mut self, index: usize, param: PostgreSQLParam) -> Result<(), BindError> {
        (**self).bind_param(index, param)
    }
}

impl<T: RowSource + ?Sized> RowSource for &T {
    fn read(
        &self,
        column: &str,
        column_type: SqlColumnType,
    ) -> Result<PostgreSQLParam, DecodeError> {
        (**self).read(column, column_type)
    }
}
