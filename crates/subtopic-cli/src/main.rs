//! Subtopic network search
//!
//! Locates keywords in a taxonomy that a language model grows on demand.
//!
//! # Usage
//!
//! ```bash
//! subtopic search <KEYWORD> [--max-depth N]
//! subtopic batch --keywords FILE
//! subtopic export [--output FILE]
//! subtopic browse [TOPIC_ID]
//! subtopic trial --keywords FILE --output FILE [--repeat N]
//! subtopic stats (--input FILE | --from-store)
//! subtopic status
//! ```
//!
//! # Configuration
//!
//! Configuration is loaded in order (later sources override earlier):
//! 1. Built-in defaults
//! 2. Config file (~/.config/subtopic-search/config.toml)
//! 3. Environment variables (SUBTOPIC_*)
//! 4. CLI flags

use anyhow::Result;
use clap::Parser;

use subtopic_cli::{
    handle_batch, handle_browse, handle_export, handle_search, handle_stats, handle_status,
    handle_trial, init_logging, load_settings, Cli, Commands,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = load_settings(
        cli.config.as_deref(),
        cli.db_path.as_deref(),
        cli.log_level.as_deref(),
    )?;
    init_logging(&settings.log_level)?;

    match cli.command {
        Commands::Search { keyword, max_depth } => {
            handle_search(&settings, &keyword, max_depth).await?;
        }
        Commands::Batch {
            keywords,
            max_depth,
        } => {
            handle_batch(&settings, &keywords, max_depth).await?;
        }
        Commands::Export { output } => {
            handle_export(&settings, output.as_deref())?;
        }
        Commands::Browse { topic_id } => {
            handle_browse(&settings, topic_id)?;
        }
        Commands::Trial {
            keywords,
            output,
            repeat,
        } => {
            handle_trial(&settings, &keywords, &output, repeat).await?;
        }
        Commands::Stats { input, from_store } => {
            handle_stats(&settings, input.as_deref(), from_store)?;
        }
        Commands::Status => {
            handle_status(&settings)?;
        }
    }

    Ok(())
}
