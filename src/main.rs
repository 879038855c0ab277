//! Command-line interface for stream-loader
//!
//! # Usage Examples
//!
//! ## Table definitions
//! ```bash
//! # Statements for every stream in the catalog
//! stream-loader ddl --catalog catalog.yaml
//!
//! # A single stream, placed in another default namespace
//! STREAM_LOADER_DEFAULT_NAMESPACE=staging \
//!   stream-loader ddl --catalog catalog.yaml --stream users
//! ```
//!
//! ## Dry-run binding
//! ```bash
//! # One JSON line per record with the bound parameters
//! stream-loader bind --catalog catalog.yaml --stream users --records users.jsonl
//! ```
//!
//! Set `RUST_LOG=debug` to see every nulled field.

use clap::{Parser, Subcommand};
use stream_loader::commands::{run_bind, run_ddl, BindArgs, DdlArgs};

#[derive(Parser)]
#[command(name = "stream-loader")]
#[command(about = "Load typed record streams into PostgreSQL tables")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the schema, table and insert statements of catalog streams
    Ddl(DdlArgs),

    /// Bind JSONL records against a stream's insert statement (dry run)
    Bind(BindArgs),
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Ddl(args) => {
            print!("{}", run_ddl(&args)?);
        }
        Commands::Bind(args) => {
            for line in run_bind(&args)? {
                println!("{line}");
            }
        }
    }

    Ok(())
}
