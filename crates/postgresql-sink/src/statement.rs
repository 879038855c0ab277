//! In-memory parameterized statement.

use crate::binder::BindError;
use crate::traits::BindTarget;
use postgresql_types::{PostgreSQLParam, SqlColumnType};
use std::sync::Arc;
use tokio_postgres::types::{ToSql, Type};

/// A write statement template with one slot per placeholder.
///
/// Each slot accepts exactly one parameter of its column's type. A fresh
/// instance is used per record; binding the same slot twice is an error.
#[derive(Debug, Clone)]
pub struct BoundStatement {
    sql: Arc<str>,
    column_types: Arc<[SqlColumnType]>,
    slots: Vec<Option<PostgreSQLParam>>,
}

impl BoundStatement {
    pub fn new(sql: Arc<str>, column_types: Arc<[SqlColumnType]>) -> Self {
        let slots = vec![None; column_types.len()];
        Self {
            sql,
            column_types,
            slots,
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Number of placeholders.
    pub fn parameter_count(&self) -> usize {
        self.slots.len()
    }

    /// Parameter bound at the 1-based position `index`, if any.
    pub fn param(&self, index: usize) -> Option<&PostgreSQLParam> {
        index
            .checked_sub(1)
            .and_then(|i| self.slots.get(i))
            .and_then(Option::as_ref)
    }

    pub fn is_complete(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }

    /// Placeholder types, for `Client::prepare_typed`.
    pub fn param_types(&self) -> Vec<Type> {
        self.column_types.iter().map(|t| t.pg_type()).collect()
    }

    /// Parameters in placeholder order, ready for `Client::execute`.
    pub fn params(&self) -> Result<Vec<&(dyn ToSql + Sync)>, BindError> {
        self.slots
            .iter()
            .enumerate()
            .map(|(i, slot)| {
                slot.as_ref()
                    .map(PostgreSQLParam::as_tosql)
                    .ok_or(BindError::Unbound { index: i + 1 })
            })
            .collect()
    }

    /// Parameters rendered as JSON, unbound slots as `null`.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Array(
            self.slots
                .iter()
                .map(|slot| {
                    slot.as_ref()
                        .map_or(serde_json::Value::Null, PostgreSQLParam::to_json_value)
                })
                .collect(),
        )
    }
}

impl BindTarget for BoundStatement {
    fn bind_param(&mut self, index: usize, param: PostgreSQLParam) -> Result<(), BindError> {
        let count = self.slots.len();
        let position = index
            .checked_sub(1)
            .filter(|i| *i < count)
            .ok_or(BindError::ParameterOutOfRange { index, count })?;

        let expected = self.column_types[position];
        if param.column_type() != expected {
            return Err(BindError::ParameterType {
                index,
                expected,
                actual: param.column_type(),
            });
        }

        let slot = &mut self.slots[position];
        if slot.is_some() {
            return Err(BindError::AlreadyBound { index });
        }
        *slot = Some(param);
        Ok(())
    }
}
