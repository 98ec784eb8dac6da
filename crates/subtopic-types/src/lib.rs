//! # subtopic-types
//!
//! Shared configuration types for the subtopic network search.
//!
//! - `Settings`: layered application settings (defaults, file, env)
//! - `SearchConfig`: root topic, depth bound, attempt budget and seeding
//! - `OracleSettings`: backend selection for the text oracle

pub mod config;
pub mod error;

pub use config::{OracleProvider, OracleSettings, SearchConfig, Settings};
pub use error::ConfigError;
