//! Stream catalog: which streams exist and what their records look like.
//!
//! ```yaml
//! streams:
//!   - namespace: sales        # optional, falls back to --default-namespace
//!     name: orders
//!     sync_id: sync-42
//!     generation_id: 3
//!     json_schema:
//!       type: object
//!       properties:
//!         id: { type: integer }
//!         placed_at: { type: string, format: date-time }
//! ```

use anyhow::Context;
use postgresql_sink::{PostgreSQLStream, StreamError};
use postgresql_types::TableName;
use serde::Deserialize;
use std::path::Path;
use sync_core::json::parse_json_schema;
use sync_core::AbstractType;

#[derive(Debug, Clone, Deserialize)]
pub struct Catalog {
    pub streams: Vec<StreamConfig>,
}

/// One configured stream.
#[derive(Debug, Clone, Deserialize)]
pub struct StreamConfig {
    #[serde(default)]
    pub namespace: Option<String>,
    pub name: String,
    pub sync_id: String,
    #[serde(default)]
    pub generation_id: i64,
    pub json_schema: serde_json::Value,
}

impl Catalog {
    /// Load a catalog from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog file: {path:?}"))?;
        Self::from_yaml(&content).with_context(|| format!("Failed to parse catalog: {path:?}"))
    }

    pub fn from_yaml(yaml: &str) -> anyhow::Result<Self> {
        let catalog: Catalog = serde_yaml::from_str(yaml)?;
        Ok(catalog)
    }

    /// Find a stream by name.
    pub fn stream(&self, name: &str) -> anyhow::Result<&StreamConfig> {
        self.streams
            .iter()
            .find(|s| s.name == name)
            .with_context(|| format!("Stream '{name}' not found in catalog"))
    }
}

impl StreamConfig {
    pub fn table_name(&self, default_namespace: &str) -> TableName {
        let namespace = self.namespace.as_deref().unwrap_or(default_namespace);
        TableName::new(namespace, self.name.as_str())
    }

    /// The declared type of the stream's records.
    pub fn declared_type(&self) -> AbstractType {
        parse_json_schema(&self.json_schema)
    }

    /// Compile the stream's statements.
    pub fn compile(&self, default_namespace: &str) -> Result<PostgreSQLStream, StreamError> {
        PostgreSQLStream::new(self.table_name(default_namespace), &self.declared_type())
    }
}
