//! Command-line interface definitions using clap

use clap::{Parser, Subcommand};

/// shortdigest - deterministic URL digests backed by a durable store
#[derive(Parser)]
#[command(name = "shortdigest")]
#[command(version)]
#[command(about = "Register URLs under deterministic short digests", long_about = None)]
pub struct Cli {
    /// Config file (default: ./config.toml if present)
    #[arg(long, short = 'c', global = true)]
    pub config: Option<String>,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Probe every backend, create the schema and reserve the filters
    Init,

    /// Register a URL and print its digest
    Store {
        url: String,
    },

    /// Print the URL registered for a digest
    Resolve {
        digest: String,
    },

    /// Generate example configuration file
    ConfigGen {
        /// Output path (default: stdout)
        output_path: Option<String>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}
