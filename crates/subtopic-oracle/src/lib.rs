//! # subtopic-oracle
//!
//! Gateway to the nondeterministic text oracle that grows the taxonomy.
//!
//! The oracle is any backend implementing [`Oracle`]: it receives a prompt
//! and a seed and returns free-form text. [`OracleGateway`] turns the two
//! questions the search asks (enumerate subtopics, select a subtopic) into
//! prompts and validates the answers with [`parse_subtopic_list`] and
//! [`parse_selection`]. A gateway call is exactly one attempt; callers
//! retry with a fresh seed from [`AttemptPolicy`].

mod api;
mod attempts;
mod gateway;
pub mod mock;
pub mod prompts;
mod validate;

pub use api::ApiOracle;
pub use attempts::AttemptPolicy;
pub use gateway::OracleGateway;
pub use mock::ScriptedOracle;
pub use validate::{parse_selection, parse_subtopic_list};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for oracle operations.
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("API request failed: {0}")]
    ApiError(String),

    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Timeout waiting for response")]
    Timeout,

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// The answer arrived but does not satisfy the expected shape.
    #[error("Malformed oracle response: {reason}")]
    MalformedResponse { reason: String },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl OracleError {
    /// Build a malformed-response error.
    pub fn malformed(reason: impl Into<String>) -> Self {
        OracleError::MalformedResponse {
            reason: reason.into(),
        }
    }

    /// Whether the transport layer should retry the same request.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            OracleError::ApiError(_) | OracleError::RateLimitExceeded | OracleError::Timeout
        )
    }
}

/// What a request asks, kept next to the rendered prompt so test doubles
/// and logs do not have to re-parse prompt text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestKind {
    /// List the subtopics of `topic`
    Enumerate { topic: String },
    /// Pick the candidate most likely to contain `keyword`
    Select {
        keyword: String,
        candidates: Vec<String>,
    },
    /// Reformat a malformed subtopic list
    Repair { answer: String },
}

/// A single oracle round trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleRequest {
    /// Prompt text sent to the backend
    pub prompt: String,
    /// Sampling seed
    pub seed: u64,
    /// Structured form of the question
    pub kind: RequestKind,
}

impl OracleRequest {
    /// Build an enumeration request.
    pub fn enumerate(topic: &str, seed: u64) -> Self {
        Self {
            prompt: prompts::enumerate_prompt(topic),
            seed,
            kind: RequestKind::Enumerate {
                topic: topic.to_string(),
            },
        }
    }

    /// Build a selection request.
    pub fn select(keyword: &str, candidates: &[String], seed: u64) -> Self {
        Self {
            prompt: prompts::select_prompt(keyword, candidates),
            seed,
            kind: RequestKind::Select {
                keyword: keyword.to_string(),
                candidates: candidates.to_vec(),
            },
        }
    }

    /// Build a repair request for a malformed enumeration answer.
    pub fn repair(answer: &str, seed: u64) -> Self {
        Self {
            prompt: prompts::repair_prompt(answer),
            seed,
            kind: RequestKind::Repair {
                answer: answer.to_string(),
            },
        }
    }
}

/// Pluggable text oracle.
///
/// Implementations return the raw completion text; validation happens in
/// the gateway, never in the backend.
#[async_trait]
pub trait Oracle: Send + Sync {
    /// Complete the prompt using the given seed.
    async fn complete(&self, request: &OracleRequest) -> Result<String, OracleError>;
}
