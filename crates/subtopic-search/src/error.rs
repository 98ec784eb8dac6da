//! Search error types.

use thiserror::Error;

use crate::types::TopicId;

/// Errors that can occur during graph and search operations.
///
/// Oracle exhaustion is not an error: it ends a search with `failed = true`.
#[derive(Debug, Error)]
pub enum SearchError {
    /// Storage error
    #[error("Storage error: {0}")]
    Storage(#[from] subtopic_storage::StorageError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A record the graph relies on is missing or corrupt
    #[error("Store inconsistency: {0}")]
    StoreInconsistency(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] subtopic_types::ConfigError),

    /// Outcome log error
    #[error("Outcome log error: {0}")]
    OutcomeLog(#[from] subtopic_stats::StatsError),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl SearchError {
    /// A topic id that should exist does not.
    pub fn missing_topic(topic_id: TopicId) -> Self {
        SearchError::StoreInconsistency(format!("topic {} not found", topic_id))
    }
}
