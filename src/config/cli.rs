use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "airport-resolver")]
#[command(about = "Resolve place names to airport and metro-area codes")]
pub struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long, env = "AIRPORT_RESOLVER_CONFIG")]
    pub config: Option<PathBuf>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Log process CPU and memory usage")]
    pub monitor: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Resolve one or more queries
    Resolve {
        #[arg(required = true)]
        queries: Vec<String>,

        /// Prefer individual airports over metro areas
        #[arg(long)]
        airport_only: bool,

        /// Exact code matches only, no fuzzy search or provider
        #[arg(long)]
        exact: bool,

        #[arg(long)]
        max_results: Option<usize>,

        /// Print full results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Resolve queries from a file, one per line
    Batch {
        file: PathBuf,

        #[arg(long)]
        airport_only: bool,
    },

    /// Load reference data from CSV files
    Import {
        #[arg(long)]
        airports: Option<PathBuf>,

        #[arg(long)]
        metros: Option<PathBuf>,

        #[arg(long)]
        aliases: Option<PathBuf>,
    },

    /// Delete persisted lookups older than the cutoff
    Purge {
        #[arg(long, default_value = "30")]
        older_than_days: u32,
    },
}
