//! Statistics error types.

use thiserror::Error;

/// Errors reading or writing outcome logs.
#[derive(Debug, Error)]
pub enum StatsError {
    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A log line did not decode as an outcome
    #[error("Invalid outcome on line {line}: {source}")]
    InvalidLine {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Refusing to overwrite an existing log
    #[error("Outcome log already exists: {0}")]
    AlreadyExists(String),
}
