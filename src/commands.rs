//! Subcommand handlers.

use crate::catalog::{Catalog, StreamConfig};
use crate::records::read_messages;
use crate::LoaderOpts;
use anyhow::Context;
use clap::Args;
use serde_json::json;
use std::path::PathBuf;

#[derive(Args, Debug, Clone)]
pub struct DdlArgs {
    /// Catalog file (YAML)
    #[arg(long, value_name = "PATH")]
    pub catalog: PathBuf,

    /// Only print statements for this stream
    #[arg(long)]
    pub stream: Option<String>,

    #[command(flatten)]
    pub opts: LoaderOpts,
}

#[derive(Args, Debug, Clone)]
pub struct BindArgs {
    /// Catalog file (YAML)
    #[arg(long, value_name = "PATH")]
    pub catalog: PathBuf,

    /// Stream the records belong to
    #[arg(long)]
    pub stream: String,

    /// Records file (JSONL)
    #[arg(long, value_name = "PATH")]
    pub records: PathBuf,

    #[command(flatten)]
    pub opts: LoaderOpts,
}

/// Render the schema, table and insert statements of the selected streams.
pub fn run_ddl(args: &DdlArgs) -> anyhow::Result<String> {
    let catalog = Catalog::from_file(&args.catalog)?;
    let streams: Vec<&StreamConfig> = match &args.stream {
        Some(name) => vec![catalog.stream(name)?],
        None => catalog.streams.iter().collect(),
    };

    let mut out = String::new();
    for config in streams {
        let stream = config
            .compile(&args.opts.default_namespace)
            .with_context(|| format!("Failed to compile stream '{}'", config.name))?;
        tracing::info!("Compiled stream {} ({} columns)", stream.table(), stream.schema().len());

        out.push_str(stream.schema_statement());
        out.push('\n');
        out.push_str(stream.table_statement());
        out.push('\n');
        out.push_str(stream.insert_statement());
        out.push_str(";\n\n");
    }
    Ok(out)
}

/// Bind every record of the records file and render one JSON object per
/// record. Nothing is executed.
pub fn run_bind(args: &BindArgs) -> anyhow::Result<Vec<serde_json::Value>> {
    let catalog = Catalog::from_file(&args.catalog)?;
    let config = catalog.stream(&args.stream)?;
    let declared = config.declared_type();
    let stream = config
        .compile(&args.opts.default_namespace)
        .with_context(|| format!("Failed to compile stream '{}'", config.name))?;
    let binder = stream.binder();

    let messages = read_messages(&args.records)?;
    tracing::info!("Binding {} records into {}", messages.len(), stream.table());

    let mut bound = Vec::with_capacity(messages.len());
    for (i, message) in messages.into_iter().enumerate() {
        let record = message.into_record(config, &declared);
        let mut statement = stream.new_statement();
        let report = binder
            .bind(&mut statement, &record)
            .with_context(|| format!("Failed to bind record {}", i + 1))?;

        bound.push(json!({
            "params": statement.to_json(),
            "nulled": report.destination_changes(),
        }));
    }
    Ok(bound)
}
