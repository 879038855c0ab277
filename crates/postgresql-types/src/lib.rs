//! PostgreSQL type conversions for sync-core types.
//!
//! This crate maps sync-core's abstract model onto PostgreSQL columns and
//! `tokio-postgres` parameters, in both directions.
//!
//! # Modules
//!
//! - [`ddl`] - AbstractType → column type, and the statements a stream needs
//! - [`forward`] - AbstractValue → positional parameter (fallible per value)
//! - [`reverse`] - column value → AbstractValue
//! - [`wire`] - binary encodings for `TIMETZ` and pre-serialized JSON
//!
//! # Example
//!
//! ```
//! use postgresql_types::{PostgreSQLDdl, SqlColumnType, ToDdl};
//! use sync_core::AbstractType;
//!
//! let ddl = PostgreSQLDdl;
//! assert_eq!(ddl.map(&AbstractType::Integer).unwrap(), SqlColumnType::BigInt);
//! assert_eq!(ddl.to_ddl(&AbstractType::String).unwrap(), "TEXT");
//! ```

pub mod ddl;
pub mod forward;
pub mod reverse;
pub mod wire;

pub use ddl::{
    quote_identifier, PostgreSQLDdl, SqlColumnType, TableName, ToDdl, UnsupportedTypeError,
};
pub use forward::{to_param, PostgreSQLParam};
pub use reverse::{from_param, DecodeError};
pub use wire::{JsonText, TimeTz};
