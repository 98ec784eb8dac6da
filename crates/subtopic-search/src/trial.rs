//! Non-memoized trial searches.
//!
//! A trial performs the same bounded greedy descent as [`SearchEngine`]
//! but asks for fresh subtopics at every step and never touches the store.
//! Repeating trials of one keyword shows how stable the oracle's answers
//! are.
//!
//! [`SearchEngine`]: crate::search::SearchEngine

use std::collections::HashSet;

use subtopic_oracle::{AttemptPolicy, OracleGateway};
use subtopic_stats::{OutcomeLog, SearchOutcome};
use subtopic_types::SearchConfig;
use tracing::{debug, info, instrument, warn};

use crate::error::SearchError;
use crate::search::{is_match, select_with_retries, Selection};
use crate::types::normalize_name;

/// Runs trial searches against the oracle alone.
pub struct TrialRunner {
    config: SearchConfig,
    gateway: OracleGateway,
    policy: AttemptPolicy,
}

impl TrialRunner {
    pub fn new(gateway: OracleGateway, config: SearchConfig) -> Result<Self, SearchError> {
        config.validate()?;
        let policy = AttemptPolicy::from_config(&config);
        Ok(Self {
            config,
            gateway,
            policy,
        })
    }

    /// Run one trial for `keyword`.
    #[instrument(skip(self))]
    pub async fn run(&self, keyword: &str) -> Result<SearchOutcome, SearchError> {
        if keyword.trim().is_empty() {
            return Err(SearchError::InvalidInput("keyword is empty".to_string()));
        }

        let mut outcome = SearchOutcome {
            keyword: keyword.to_string(),
            found: false,
            failed: false,
            path: vec![normalize_name(&self.config.root_topic)],
            steps: Vec::new(),
        };

        while outcome.path.len() < self.config.max_depth {
            let current = match outcome.path.last() {
                Some(current) => current.clone(),
                None => break,
            };

            let Some(subtopics) = self.enumerate(&current).await else {
                outcome.failed = true;
                break;
            };

            let mut seen: HashSet<&str> = outcome.path.iter().map(String::as_str).collect();
            let mut candidates = Vec::new();
            for name in &subtopics {
                if !name.is_empty() && seen.insert(name.as_str()) {
                    candidates.push(name.clone());
                }
            }
            outcome.steps.push(candidates.clone());

            if candidates.is_empty() {
                outcome.failed = true;
                break;
            }

            match select_with_retries(&self.gateway, &self.policy, keyword, &candidates).await {
                Selection::Chosen(index) => {
                    let name = candidates.swap_remove(index);
                    outcome.found = is_match(&name, keyword);
                    outcome.path.push(name);
                }
                Selection::Failed { .. } => {
                    outcome.failed = true;
                    break;
                }
            }

            if outcome.found {
                break;
            }
        }

        debug!(
            path_len = outcome.path.len(),
            found = outcome.found,
            failed = outcome.failed,
            "Trial finished"
        );
        Ok(outcome)
    }

    /// Run every keyword `repeat` times, appending each outcome to `log`.
    ///
    /// The whole keyword list is run once per repetition, so repeats of a
    /// keyword come after its first occurrence.
    pub async fn run_all(
        &self,
        keywords: &[String],
        repeat: usize,
        log: &mut OutcomeLog,
    ) -> Result<Vec<SearchOutcome>, SearchError> {
        let mut outcomes = Vec::with_capacity(keywords.len() * repeat);
        for round in 0..repeat {
            for keyword in keywords {
                let outcome = self.run(keyword).await?;
                log.append(&outcome)?;
                outcomes.push(outcome);
            }
            info!(round = round + 1, repeat, "Trial round complete");
        }
        Ok(outcomes)
    }

    /// Fresh subtopic list for `topic`, normalized. `None` once every
    /// attempt was rejected.
    async fn enumerate(&self, topic: &str) -> Option<Vec<String>> {
        for (attempt, seed) in self.policy.seeds().enumerate() {
            match self.gateway.enumerate_subtopics(topic, seed).await {
                Ok(subtopics) => {
                    return Some(subtopics.iter().map(|s| normalize_name(s)).collect());
                }
                Err(err) => {
                    warn!(topic, seed, attempt = attempt + 1, error = %err, "Enumeration attempt rejected");
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use subtopic_oracle::{RequestKind, ScriptedOracle};
    use subtopic_stats::read_outcomes;
    use tempfile::TempDir;

    fn oracle() -> Arc<ScriptedOracle> {
        Arc::new(ScriptedOracle::from_fn(|request| match &request.kind {
            RequestKind::Enumerate { topic } if topic == "physics" => {
                Ok(r#"["Optics", "Mechanics", "optics", ""]"#.to_string())
            }
            RequestKind::Enumerate { topic } if topic == "optics" => {
                Ok(r#"["Lasers", "Physics"]"#.to_string())
            }
            RequestKind::Enumerate { .. } => Ok("[]".to_string()),
            RequestKind::Select { keyword, candidates } => Ok(candidates
                .iter()
                .position(|c| keyword.to_lowercase().contains(c.as_str()))
                .unwrap_or(0)
                .to_string()),
            RequestKind::Repair { .. } => Ok("[]".to_string()),
        }))
    }

    fn runner(oracle: Arc<ScriptedOracle>) -> TrialRunner {
        TrialRunner::new(OracleGateway::new(oracle), SearchConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_trial_records_steps() {
        let runner = runner(oracle());
        let outcome = runner.run("Optics lasers").await.unwrap();

        assert!(outcome.found);
        assert_eq!(outcome.path, vec!["physics", "optics"]);
        assert_eq!(outcome.steps, vec![vec!["optics".to_string(), "mechanics".to_string()]]);
    }

    #[tokio::test]
    async fn test_trial_does_not_memoize() {
        let oracle = oracle();
        let runner = runner(oracle.clone());

        runner.run("lasers").await.unwrap();
        let first = oracle.enumerate_calls();
        runner.run("lasers").await.unwrap();
        assert_eq!(oracle.enumerate_calls(), first * 2);
    }

    #[tokio::test]
    async fn test_trial_excludes_visited_names() {
        let runner = runner(oracle());
        let outcome = runner.run("lasers").await.unwrap();

        // physics -> optics -> lasers; "physics" is not offered under optics
        assert_eq!(outcome.path, vec!["physics", "optics", "lasers"]);
        assert_eq!(outcome.steps[1], vec!["lasers".to_string()]);
        assert!(outcome.found);
    }

    #[tokio::test]
    async fn test_trial_fails_on_empty_candidates() {
        let runner = runner(oracle());
        let outcome = runner.run("zzz").await.unwrap();

        // physics -> optics -> lasers -> []
        assert!(outcome.failed);
        assert!(!outcome.found);
        assert_eq!(outcome.steps.len(), 3);
        assert!(outcome.steps[2].is_empty());
    }

    #[tokio::test]
    async fn test_trial_fails_on_enumeration_exhaustion() {
        let oracle = Arc::new(ScriptedOracle::from_fn(|_| Ok("nope".to_string())));
        let runner = runner(oracle.clone());
        let outcome = runner.run("lasers").await.unwrap();

        assert!(outcome.failed);
        assert!(outcome.steps.is_empty());
        assert_eq!(oracle.call_count(), 10);
    }

    #[tokio::test]
    async fn test_run_all_logs_every_repeat() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("trials.jsonl");
        let mut log = OutcomeLog::create(&path).unwrap();

        let runner = runner(oracle());
        let keywords = vec!["lasers".to_string(), "mechanics".to_string()];
        let outcomes = runner.run_all(&keywords, 2, &mut log).await.unwrap();
        drop(log);

        assert_eq!(outcomes.len(), 4);
        let logged = read_outcomes(&path).unwrap();
        let order: Vec<&str> = logged.iter().map(|o| o.keyword.as_str()).collect();
        assert_eq!(order, vec!["lasers", "mechanics", "lasers", "mechanics"]);
    }
}
