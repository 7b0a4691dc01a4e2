//! SearchGate CLI - Run search pipeline steps by hand.
//!
//! # Usage
//!
//! ```bash
//! # Create the index and data source, then the indexer
//! sg-cli provision
//!
//! # Create the index from a schema file
//! sg-cli index --schema schema.json
//!
//! # Register the data source / define the indexer
//! sg-cli data-source
//! sg-cli indexer
//!
//! # Upload documents into the configured container
//! sg-cli upload report.pdf notes.txt
//!
//! # Trigger an indexer run
//! sg-cli run
//! ```
//!
//! Configuration comes from the same environment as the server; set
//! `SEARCH_BACKEND=memory` to dry-run against in-process fakes.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "sg-cli")]
#[command(author, version, about = "SearchGate CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the index and data source, then the indexer
    Provision {
        /// JSON index schema (default layout if omitted)
        #[arg(short, long)]
        schema: Option<PathBuf>,
    },
    /// Create or update the index
    Index {
        /// JSON index schema (default layout if omitted)
        #[arg(short, long)]
        schema: Option<PathBuf>,
    },
    /// Register the blob data source
    DataSource,
    /// Register the data source, then define the indexer
    Indexer,
    /// Upload documents into the configured container
    Upload {
        /// Files to upload
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Trigger an indexer run
    Run,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    let pipeline = commands::load_pipeline()?;

    match cli.command {
        Commands::Provision { schema } => {
            commands::pipeline::provision(&pipeline, schema.as_deref()).await?;
        }
        Commands::Index { schema } => {
            commands::pipeline::index(&pipeline, schema.as_deref()).await?;
        }
        Commands::DataSource => commands::pipeline::data_source(&pipeline).await?,
        Commands::Indexer => commands::pipeline::indexer(&pipeline).await?,
        Commands::Upload { paths } => commands::upload::files(&pipeline, &paths).await?,
        Commands::Run => commands::pipeline::run(&pipeline).await?,
    }
    Ok(())
}
