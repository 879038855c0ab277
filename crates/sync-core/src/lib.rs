//! Core types for stream-loader.
//!
//! This crate provides the destination-agnostic model shared by every
//! loader crate:
//!
//! - [`AbstractType`] - Type universe used to declare stream schemas
//! - [`AbstractValue`] - Runtime values carried by records
//! - [`Record`] - One incoming unit of data
//! - [`TargetSchema`] - Ordered column list (system + user fields) of a stream's table
//! - [`MetaEnvelope`] - Per-record audit of degraded fields
//!
//! # Architecture
//!
//! ```text
//! sync-core (this crate)
//!    │
//!    ├─── postgresql-types   (SQL type mapping, DDL, value conversion)
//!    │
//!    └─── postgresql-sink    (statement binding and row decoding)
//! ```
//!
//! # Example
//!
//! ```rust
//! use sync_core::{AbstractType, FieldType, NamedField, TargetSchema};
//!
//! let declared = AbstractType::object(vec![
//!     NamedField::new("id", FieldType::nullable(AbstractType::Integer)),
//!     NamedField::new("name", FieldType::nullable(AbstractType::String)),
//! ]);
//!
//! let schema = TargetSchema::extract(&declared).unwrap();
//! assert_eq!(schema.len(), 6);
//! ```

pub mod json;
pub mod meta;
pub mod record;
pub mod schema;
pub mod types;
pub mod values;

// Re-exports for convenience
pub use meta::{Change, ChangeRecord, MetaEnvelope, Reason};
pub use record::Record;
pub use schema::{SchemaError, SystemField, TargetSchema};
pub use types::{AbstractType, FieldType, NamedField};
pub use values::{AbstractValue, ConversionFailure, FailureKind};
