//! ConditionLog CLI - photo ingestion for property condition reports.
//!
//! Validates selected photos, extracts capture metadata, compresses them to
//! the upload budget and stores them with a record per photo.
//!
//! # Usage
//!
//! ```bash
//! # Ingest a folder of photos into a room
//! conditionlog ingest ./kitchen --user u1 --report r1 --room kitchen
//!
//! # Try a batch without storing anything
//! conditionlog ingest ./kitchen --user u1 --report r1 --room kitchen --dry-run
//!
//! # Look at what a single photo carries
//! conditionlog inspect IMG_0001.jpg
//!
//! # View configuration
//! conditionlog config show
//! ```

use clap::{Parser, Subcommand};

mod cli;
mod logging;

/// ConditionLog - photo ingestion for property condition reports.
#[derive(Parser, Debug)]
#[command(name = "conditionlog")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate, compress and store photos for a room
    Ingest(cli::ingest::IngestArgs),

    /// Show validation and extracted metadata for one photo
    Inspect(cli::inspect::InspectArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging isn't initialized yet, so use eprintln for config warnings.
    let config = match conditionlog_core::Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Check your config file with `conditionlog config path`."
            );
            conditionlog_core::Config::default()
        }
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("ConditionLog v{}", conditionlog_core::VERSION);

    match cli.command {
        Commands::Ingest(args) => cli::ingest::execute(args, config).await,
        Commands::Inspect(args) => cli::inspect::execute(args, config).await,
        Commands::Config(args) => cli::config::execute(args).await,
    }
}
