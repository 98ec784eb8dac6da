//! CLI argument parsing for the subtopic binary.
//!
//! CLI flags override all other config sources.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Subtopic network search
///
/// Locates keywords in a taxonomy grown on demand by a language model.
#[derive(Parser, Debug)]
#[command(name = "subtopic")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default ~/.config/subtopic-search/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    /// Override database path
    #[arg(long, global = true)]
    pub db_path: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Search one keyword
    Search {
        /// Keyword to locate
        keyword: String,

        /// Override the maximum path length
        #[arg(long)]
        max_depth: Option<usize>,
    },

    /// Search every keyword of a newline-delimited file
    Batch {
        /// Keyword file, one keyword per line
        #[arg(short, long)]
        keywords: PathBuf,

        /// Override the maximum path length
        #[arg(long)]
        max_depth: Option<usize>,
    },

    /// Write every stored search path
    Export {
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Walk the topic graph interactively
    Browse {
        /// Topic to start from (root when omitted)
        topic_id: Option<u64>,
    },

    /// Run non-memoized trial searches into a JSON-lines log
    Trial {
        /// Keyword file, one keyword per line
        #[arg(short, long)]
        keywords: PathBuf,

        /// Trial log to create; an existing file is never overwritten
        #[arg(short, long)]
        output: PathBuf,

        /// Times the whole keyword list is run
        #[arg(long, default_value = "1")]
        repeat: usize,
    },

    /// Print statistics for a trial log or the stored searches
    Stats {
        /// Trial log to read
        #[arg(short, long, required_unless_present = "from_store", conflicts_with = "from_store")]
        input: Option<PathBuf>,

        /// Use the stored keyword searches instead of a trial log
        #[arg(long)]
        from_store: bool,
    },

    /// Show store counts
    Status,
}
