//! stream-loader library
//!
//! Loads typed record streams into PostgreSQL tables. Each stream declares
//! its records with a JSON Schema; the loader derives a table from it, binds
//! records into insert statements and records every field it had to null in
//! the row's `_sync_meta` column.
//!
//! # CLI Usage
//!
//! ```bash
//! # Print CREATE SCHEMA / CREATE TABLE / INSERT for every stream
//! stream-loader ddl --catalog catalog.yaml
//!
//! # Bind records without executing anything
//! stream-loader bind --catalog catalog.yaml --stream users --records users.jsonl
//! ```

use clap::Args;

pub mod catalog;
pub mod commands;
pub mod records;

#[derive(Args, Debug, Clone)]
pub struct LoaderOpts {
    /// Namespace for streams that do not set one
    #[arg(
        long,
        default_value = "public",
        env = "STREAM_LOADER_DEFAULT_NAMESPACE"
    )]
    pub default_namespace: String,
}
