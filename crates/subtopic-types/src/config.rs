//! Configuration loading for subtopic-search.
//!
//! Layered config: defaults -> config file -> env vars -> CLI flags.
//! The default config file lives at ~/.config/subtopic-search/config.toml.

use config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Search engine configuration.
///
/// Passed to the engine at construction instead of process-wide constants.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchConfig {
    /// Name of the pre-seeded root topic
    #[serde(default = "default_root_topic")]
    pub root_topic: String,

    /// Maximum search path length (root included)
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Oracle attempts per enumeration or selection before giving up
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Seed of the first attempt; attempt `i` uses `base_seed + i`
    #[serde(default)]
    pub base_seed: u64,

    /// Draw a random seed for every attempt instead of counting up
    #[serde(default)]
    pub random_seeds: bool,
}

fn default_root_topic() -> String {
    "physics".to_string()
}

fn default_max_depth() -> usize {
    10
}

fn default_max_attempts() -> u32 {
    10
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            root_topic: default_root_topic(),
            max_depth: default_max_depth(),
            max_attempts: default_max_attempts(),
            base_seed: 0,
            random_seeds: false,
        }
    }
}

impl SearchConfig {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.root_topic.trim().is_empty() {
            return Err(ConfigError::Invalid("root_topic must not be empty".to_string()));
        }
        if self.max_depth == 0 {
            return Err(ConfigError::Invalid("max_depth must be > 0".to_string()));
        }
        if self.max_attempts == 0 {
            return Err(ConfigError::Invalid("max_attempts must be > 0".to_string()));
        }
        Ok(())
    }
}

/// Wire flavor of the oracle backend.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OracleProvider {
    /// OpenAI-compatible `/chat/completions`
    #[default]
    Chat,
    /// OpenAI-compatible `/completions` with a USER/SYSTEM framed prompt
    Completions,
    /// Anthropic `/messages`
    Anthropic,
}

/// Oracle backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleSettings {
    /// Wire flavor
    #[serde(default)]
    pub provider: OracleProvider,

    /// Model name (e.g., "gpt-3.5-turbo")
    #[serde(default = "default_oracle_model")]
    pub model: String,

    /// API base URL; provider default when unset
    #[serde(default)]
    pub base_url: Option<String>,

    /// API key (usually supplied through the environment)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Transport retries (rate limit, network) within one oracle attempt
    #[serde(default = "default_transport_retries")]
    pub max_retries: u32,

    /// Sampling temperature, omitted from requests when unset
    #[serde(default)]
    pub temperature: Option<f32>,

    /// Completion token limit
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_oracle_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_transport_retries() -> u32 {
    3
}

fn default_max_tokens() -> u32 {
    500
}

impl Default for OracleSettings {
    fn default() -> Self {
        Self {
            provider: OracleProvider::default(),
            model: default_oracle_model(),
            base_url: None,
            api_key: None,
            timeout_secs: default_timeout_secs(),
            max_retries: default_transport_retries(),
            temperature: None,
            max_tokens: default_max_tokens(),
        }
    }
}

impl OracleSettings {
    /// Base URL with the provider default applied.
    pub fn resolved_base_url(&self) -> String {
        if let Some(url) = &self.base_url {
            return url.trim_end_matches('/').to_string();
        }
        match self.provider {
            OracleProvider::Anthropic => "https://api.anthropic.com/v1".to_string(),
            OracleProvider::Chat | OracleProvider::Completions => {
                "https://api.openai.com/v1".to_string()
            }
        }
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Path to RocksDB storage directory
    #[serde(default = "default_db_path")]
    pub db_path: String,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Search engine configuration
    #[serde(default)]
    pub search: SearchConfig,

    /// Primary oracle backend
    #[serde(default)]
    pub oracle: OracleSettings,

    /// Optional backend that reformats malformed subtopic lists
    #[serde(default)]
    pub repair: Option<OracleSettings>,
}

fn default_db_path() -> String {
    ProjectDirs::from("", "", "subtopic-search")
        .map(|p| p.data_local_dir().join("db"))
        .unwrap_or_else(|| PathBuf::from("./subtopic-network-search"))
        .to_string_lossy()
        .to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            log_level: default_log_level(),
            search: SearchConfig::default(),
            oracle: OracleSettings::default(),
            repair: None,
        }
    }
}

impl Settings {
    /// Load settings with layered precedence:
    /// 1. Built-in defaults
    /// 2. Config file (~/.config/subtopic-search/config.toml)
    /// 3. CLI-specified config file (optional)
    /// 4. Environment variables (SUBTOPIC_*, nested keys joined by `__`)
    ///
    /// CLI flags should be applied by the caller after this returns.
    pub fn load(cli_config_path: Option<&str>) -> Result<Self, ConfigError> {
        let config_dir = ProjectDirs::from("", "", "subtopic-search")
            .map(|p| p.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        let default_config_path = config_dir.join("config");
        Self::load_from(
            Some(&default_config_path),
            cli_config_path,
            Self::environment(),
        )
    }

    // SUBTOPIC_DB_PATH, SUBTOPIC_SEARCH__MAX_DEPTH, SUBTOPIC_ORACLE__API_KEY, ...
    fn environment() -> Environment {
        Environment::with_prefix("SUBTOPIC")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
    }

    fn load_from(
        user_config_path: Option<&Path>,
        cli_config_path: Option<&str>,
        environment: Environment,
    ) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("db_path", default_db_path())?
            .set_default("log_level", default_log_level())?
            .set_default("search.root_topic", default_root_topic())?
            .set_default("search.max_depth", default_max_depth() as i64)?
            .set_default("search.max_attempts", default_max_attempts() as i64)?
            .set_default("oracle.model", default_oracle_model())?;

        if let Some(path) = user_config_path {
            builder = builder.add_source(File::with_name(&path.to_string_lossy()).required(false));
        }
        if let Some(path) = cli_config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }
        builder = builder.add_source(environment);

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.search.validate()?;
        Ok(settings)
    }

    /// Expand ~ in db_path to the home directory
    pub fn expanded_db_path(&self) -> PathBuf {
        if let Some(rest) = self.db_path.strip_prefix("~/") {
            if let Some(home) = std::env::var_os("HOME") {
                return PathBuf::from(home).join(rest);
            }
        }
        PathBuf::from(&self.db_path)
    }
}
