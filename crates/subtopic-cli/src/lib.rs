//! Subtopic CLI library exports.
//!
//! # Modules
//!
//! - `cli`: Command-line argument parsing with clap
//! - `commands`: Command implementations

pub mod cli;
pub mod commands;

pub use cli::{Cli, Commands};
pub use commands::{
    browse, build_gateway, export_paths, handle_batch, handle_browse, handle_export,
    handle_search, handle_stats, handle_status, handle_trial, init_logging, load_settings,
    open_storage, read_keywords, run_batch, run_search, run_trials, show_status,
    stats_from_log, stats_from_store,
};
