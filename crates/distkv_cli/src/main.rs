//! DistKV CLI
//!
//! Command-line tools for DistKV predicates and sync.
//!
//! # Commands
//!
//! - `translate` - Translate a predicate file into a query
//! - `keys` - Extract the keys of a key-set predicate
//! - `encode` - Encode a typed field value
//! - `pull` - Run an incremental sync over a JSON fixture

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// DistKV command-line tools.
#[derive(Parser)]
#[command(name = "distkv")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Translate a JSON predicate file into a query
    Translate {
        /// Path to a JSON array of operations
        file: PathBuf,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Extract the keys of a key-set predicate file
    Keys {
        /// Path to a JSON array of operations
        file: PathBuf,
    },

    /// Encode a JSON field value, e.g. '{"Integer": -1}'
    Encode {
        /// Field value as JSON
        value: String,
    },

    /// Pull a table's changes from a JSON fixture
    Pull {
        /// Path to the fixture
        file: PathBuf,

        /// Table to pull
        #[arg(short, long)]
        table: String,

        /// Rows per batch
        #[arg(short, long, default_value = "128")]
        batch_size: usize,

        /// Stop after this many batches
        #[arg(short, long)]
        max_batches: Option<usize>,

        /// Checkpoint file to resume from and write back to
        #[arg(short, long)]
        checkpoint: Option<PathBuf>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Translate { file, format } => {
            commands::translate::run(&file, &format)?;
        }
        Commands::Keys { file } => {
            commands::keys::run(&file)?;
        }
        Commands::Encode { value } => {
            commands::encode::run(&value)?;
        }
        Commands::Pull {
            file,
            table,
            batch_size,
            max_batches,
            checkpoint,
            format,
        } => {
            let options = commands::pull::PullOptions {
                table: &table,
                batch_size,
                max_batches,
                checkpoint: checkpoint.as_deref(),
                format: &format,
            };
            commands::pull::run(&file, &options)?;
        }
        Commands::Version => {
            println!("DistKV CLI v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
