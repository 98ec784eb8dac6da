//! The two validated questions the search asks the oracle.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::validate::{parse_selection, parse_subtopic_list};
use crate::{Oracle, OracleError, OracleRequest};

/// Oracle gateway: prompt construction plus answer validation.
///
/// Each call is a single attempt. Retrying with a fresh seed is the
/// caller's job so the attempt budget and the failure signal stay with the
/// operation that owns them.
#[derive(Clone)]
pub struct OracleGateway {
    oracle: Arc<dyn Oracle>,
    /// Optional second backend that reformats malformed subtopic lists
    repair: Option<Arc<dyn Oracle>>,
}

impl OracleGateway {
    /// Create a gateway over a backend.
    pub fn new(oracle: Arc<dyn Oracle>) -> Self {
        Self {
            oracle,
            repair: None,
        }
    }

    /// Route malformed enumeration answers through a repair backend.
    pub fn with_repair(mut self, repair: Arc<dyn Oracle>) -> Self {
        self.repair = Some(repair);
        self
    }

    /// Whether a repair backend is configured.
    pub fn has_repair(&self) -> bool {
        self.repair.is_some()
    }

    /// Ask for the subtopics of `topic` (one attempt).
    pub async fn enumerate_subtopics(
        &self,
        topic: &str,
        seed: u64,
    ) -> Result<Vec<String>, OracleError> {
        let request = OracleRequest::enumerate(topic, seed);
        let answer = self.oracle.complete(&request).await?;

        match parse_subtopic_list(&answer) {
            Ok(subtopics) => {
                debug!(topic, seed, count = subtopics.len(), "Enumerated subtopics");
                Ok(subtopics)
            }
            Err(err) => match &self.repair {
                Some(repair) => {
                    warn!(topic, seed, error = %err, "Malformed subtopic list, asking repair backend");
                    let repaired = repair.complete(&OracleRequest::repair(&answer, seed)).await?;
                    parse_subtopic_list(&repaired)
                }
                None => Err(err),
            },
        }
    }

    /// Ask which of `candidates` most likely contains `keyword` (one attempt).
    ///
    /// Returns the index into `candidates`.
    pub async fn select_subtopic(
        &self,
        keyword: &str,
        candidates: &[String],
        seed: u64,
    ) -> Result<usize, OracleError> {
        if candidates.is_empty() {
            return Err(OracleError::InvalidRequest(
                "selection needs at least one candidate".to_string(),
            ));
        }

        let request = OracleRequest::select(keyword, candidates, seed);
        let answer = self.oracle.complete(&request).await?;
        let index = parse_selection(&answer, candidates.len())?;
        debug!(keyword, seed, index, chosen = %candidates[index], "Selected subtopic");
        Ok(index)
    }
}
