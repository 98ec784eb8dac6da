//! Keyword localization search.
//!
//! Greedy descent from the root: expand the current topic, let the oracle
//! pick the child most likely to contain the keyword, stop when the chosen
//! topic's name occurs in the keyword. Progress is persisted after every
//! step so a search interrupted at any point resumes where it stopped.

use std::sync::Arc;

use subtopic_oracle::{AttemptPolicy, OracleGateway};
use subtopic_storage::Storage;
use subtopic_types::SearchConfig;
use tracing::{debug, info, instrument, warn};

use crate::error::SearchError;
use crate::expansion::Expander;
use crate::graph::TopicGraph;
use crate::records::SearchRecordStore;
use crate::types::{KeywordSearchRecord, SearchResult, TopicId};

/// Whether a topic name locates the keyword (case-insensitive substring).
pub fn is_match(topic_name: &str, keyword: &str) -> bool {
    keyword
        .to_lowercase()
        .contains(&topic_name.trim().to_lowercase())
}

/// Outcome of asking the oracle to choose among candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// Index into the candidate list
    Chosen(usize),
    /// Every attempt was rejected
    Failed { attempts: u32 },
}

/// Ask for a selection, retrying with a fresh seed per attempt.
pub(crate) async fn select_with_retries(
    gateway: &OracleGateway,
    policy: &AttemptPolicy,
    keyword: &str,
    candidates: &[String],
) -> Selection {
    let mut attempts = 0;
    for seed in policy.seeds() {
        attempts += 1;
        match gateway.select_subtopic(keyword, candidates, seed).await {
            Ok(index) => return Selection::Chosen(index),
            Err(err) => {
                warn!(keyword, seed, attempt = attempts, error = %err, "Selection attempt rejected");
            }
        }
    }
    Selection::Failed { attempts }
}

/// Memoized keyword search over the persistent topic graph.
pub struct SearchEngine {
    config: SearchConfig,
    graph: Arc<TopicGraph>,
    records: SearchRecordStore,
    expander: Expander,
    gateway: OracleGateway,
    policy: AttemptPolicy,
    root_id: TopicId,
}

impl SearchEngine {
    /// Create an engine, seeding the root topic if the store is new.
    pub fn new(
        storage: Arc<Storage>,
        gateway: OracleGateway,
        config: SearchConfig,
    ) -> Result<Self, SearchError> {
        config.validate()?;

        let graph = Arc::new(TopicGraph::open(storage.clone())?);
        let root_id = graph.get_or_create(&config.root_topic)?;
        let policy = AttemptPolicy::from_config(&config);
        let expander = Expander::new(graph.clone(), gateway.clone(), policy.clone());

        info!(root = %config.root_topic, root_id, max_depth = config.max_depth, "Search engine ready");

        Ok(Self {
            config,
            graph,
            records: SearchRecordStore::new(storage),
            expander,
            gateway,
            policy,
            root_id,
        })
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn graph(&self) -> &Arc<TopicGraph> {
        &self.graph
    }

    pub fn records(&self) -> &SearchRecordStore {
        &self.records
    }

    pub fn expander(&self) -> &Expander {
        &self.expander
    }

    pub fn root_id(&self) -> TopicId {
        self.root_id
    }

    /// Search with the configured depth bound.
    pub async fn search(&self, keyword: &str) -> Result<SearchResult, SearchError> {
        self.search_with_depth(keyword, self.config.max_depth).await
    }

    /// Search and also return the stored path as topic names.
    pub async fn search_with_path(
        &self,
        keyword: &str,
        max_depth: usize,
    ) -> Result<(SearchResult, Vec<String>), SearchError> {
        let result = self.search_with_depth(keyword, max_depth).await?;
        let path = match self.records.load(keyword)? {
            Some(record) => self.graph.resolve_path(&record.path)?,
            None => Vec::new(),
        };
        Ok((result, path))
    }

    /// Locate `keyword` with an explicit depth bound.
    ///
    /// `max_depth` bounds the stored path length, root included. A
    /// conclusive record is reported only when its path fits in
    /// `max_depth`; a deeper one reads as inconclusive and is left as is.
    #[instrument(skip(self))]
    pub async fn search_with_depth(
        &self,
        keyword: &str,
        max_depth: usize,
    ) -> Result<SearchResult, SearchError> {
        if keyword.trim().is_empty() {
            return Err(SearchError::InvalidInput("keyword is empty".to_string()));
        }

        let mut record = self.records.load_or_create(keyword, self.root_id)?;

        if record.found {
            if record.path.len() > max_depth {
                return Ok(SearchResult::inconclusive());
            }
            let last = Self::frontier(&record)?;
            return Ok(SearchResult::found(self.graph.name_of(last)?));
        }
        if record.failed {
            if record.path.len() > max_depth {
                return Ok(SearchResult::inconclusive());
            }
            return Ok(SearchResult::failed());
        }
        if record.path.len() >= max_depth {
            debug!(path_len = record.path.len(), "Depth bound already reached");
            return Ok(SearchResult::inconclusive());
        }

        let mut chosen_name = None;

        while record.path.len() < max_depth {
            let current = Self::frontier(&record)?;
            self.expander.ensure_expanded(current).await?;

            let candidates: Vec<TopicId> = self
                .graph
                .children_of(current)?
                .into_iter()
                .filter(|id| !record.path.contains(id))
                .collect();
            if candidates.is_empty() {
                debug!(topic_id = current, "No unvisited subtopics");
                record.failed = true;
                break;
            }

            let names = self.graph.resolve_path(&candidates)?;
            let index = match select_with_retries(&self.gateway, &self.policy, keyword, &names)
                .await
            {
                Selection::Chosen(index) => index,
                Selection::Failed { attempts } => {
                    debug!(attempts, "Selection failed");
                    record.failed = true;
                    break;
                }
            };

            record.path.push(candidates[index]);
            let name = &names[index];
            if is_match(name, keyword) {
                record.found = true;
                chosen_name = Some(name.clone());
            }
            self.records.save(&record)?;
            debug!(step = record.path.len() - 1, topic = %name, "Descended");

            if record.found {
                break;
            }
        }

        self.records.save(&record)?;
        info!(
            path_len = record.path.len(),
            found = record.found,
            failed = record.failed,
            "Search finished"
        );

        Ok(if record.found {
            SearchResult {
                topic: chosen_name,
                failed: false,
            }
        } else if record.failed {
            SearchResult::failed()
        } else {
            SearchResult::inconclusive()
        })
    }

    fn frontier(record: &KeywordSearchRecord) -> Result<TopicId, SearchError> {
        record.frontier().ok_or_else(|| {
            SearchError::StoreInconsistency(format!("empty path for keyword {}", record.keyword))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use subtopic_oracle::{RequestKind, ScriptedOracle};
    use tempfile::TempDir;

    /// Taxonomy oracle: fixed children per topic. Picks the candidate that
    /// occurs in the keyword, else one sharing a word with it, else the
    /// first one.
    fn taxonomy_oracle(tree: &'static [(&'static str, &'static [&'static str])]) -> ScriptedOracle {
        ScriptedOracle::from_fn(move |request| match &request.kind {
            RequestKind::Enumerate { topic } => {
                let children: Vec<&str> = tree
                    .iter()
                    .find(|(parent, _)| parent == topic)
                    .map(|(_, children)| children.to_vec())
                    .unwrap_or_default();
                Ok(serde_json::to_string(&children).unwrap())
            }
            RequestKind::Select {
                keyword,
                candidates,
            } => {
                let keyword = keyword.to_lowercase();
                let index = candidates
                    .iter()
                    .position(|c| keyword.contains(c.as_str()))
                    .or_else(|| {
                        candidates
                            .iter()
                            .position(|c| c.split(' ').any(|w| keyword.contains(w)))
                    })
                    .unwrap_or(0);
                Ok(index.to_string())
            }
            RequestKind::Repair { .. } => Ok("[]".to_string()),
        })
    }

    const TREE: &[(&str, &[&str])] = &[
        ("physics", &["Classical Mechanics", "Quantum Mechanics", "Optics"]),
        ("quantum mechanics", &["Quantum Entanglement", "Quantum Tunneling"]),
        ("optics", &["Lasers", "Lenses"]),
        ("classical mechanics", &["Kinematics"]),
    ];

    fn create_engine(oracle: Arc<ScriptedOracle>) -> (SearchEngine, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let storage = Arc::new(Storage::open(temp_dir.path()).unwrap());
        let engine =
            SearchEngine::new(storage, OracleGateway::new(oracle), SearchConfig::default()).unwrap();
        (engine, temp_dir)
    }

    #[test]
    fn test_is_match() {
        assert!(is_match("quantum entanglement", "Quantum Entanglement"));
        assert!(is_match("laser", "Laser cooling"));
        assert!(!is_match("lasers", "laser"));
    }

    #[tokio::test]
    async fn test_finds_keyword() {
        let oracle = Arc::new(taxonomy_oracle(TREE));
        let (engine, _dir) = create_engine(oracle);

        let (result, path) = engine
            .search_with_path("quantum entanglement", 10)
            .await
            .unwrap();
        assert_eq!(result.topic.as_deref(), Some("quantum entanglement"));
        assert!(!result.failed);
        assert_eq!(
            path,
            vec!["physics", "quantum mechanics", "quantum entanglement"]
        );
    }

    #[tokio::test]
    async fn test_conclusive_search_is_memoized() {
        let oracle = Arc::new(taxonomy_oracle(TREE));
        let (engine, _dir) = create_engine(oracle.clone());

        let first = engine.search("Quantum Tunneling").await.unwrap();
        let calls = oracle.call_count();

        let second = engine.search("Quantum Tunneling").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(oracle.call_count(), calls);
    }

    #[tokio::test]
    async fn test_leaf_without_children_fails() {
        let oracle = Arc::new(taxonomy_oracle(TREE));
        let (engine, _dir) = create_engine(oracle);

        // physics -> classical mechanics -> kinematics -> (no children)
        let result = engine.search("zzz").await.unwrap();
        assert_eq!(result, SearchResult::failed());

        let record = engine.records().load("zzz").unwrap().unwrap();
        assert!(record.failed);
        assert_eq!(
            engine.graph().resolve_path(&record.path).unwrap(),
            vec!["physics", "classical mechanics", "kinematics"]
        );
    }

    #[tokio::test]
    async fn test_depth_bound_is_inconclusive_and_resumable() {
        let oracle = Arc::new(taxonomy_oracle(TREE));
        let (engine, _dir) = create_engine(oracle);

        let result = engine.search_with_depth("Quantum Tunneling", 2).await.unwrap();
        assert_eq!(result, SearchResult::inconclusive());
        let record = engine.records().load("Quantum Tunneling").unwrap().unwrap();
        assert_eq!(record.path.len(), 2);

        // Depth already reached: nothing changes
        let again = engine.search_with_depth("Quantum Tunneling", 2).await.unwrap();
        assert_eq!(again, SearchResult::inconclusive());
        let unchanged = engine.records().load("Quantum Tunneling").unwrap().unwrap();
        assert_eq!(unchanged.path, record.path);

        // A larger bound resumes from the stored path
        let result = engine.search_with_depth("Quantum Tunneling", 3).await.unwrap();
        assert_eq!(result.topic.as_deref(), Some("quantum tunneling"));
    }

    #[tokio::test]
    async fn test_found_deeper_than_bound_reads_inconclusive() {
        let oracle = Arc::new(taxonomy_oracle(TREE));
        let (engine, _dir) = create_engine(oracle);

        engine.search("quantum entanglement").await.unwrap();
        let shallow = engine.search_with_depth("quantum entanglement", 2).await.unwrap();
        assert_eq!(shallow, SearchResult::inconclusive());

        let record = engine.records().load("quantum entanglement").unwrap().unwrap();
        assert!(record.found);
        assert_eq!(record.path.len(), 3);
    }

    #[tokio::test]
    async fn test_selection_exhaustion_fails() {
        let oracle = Arc::new(ScriptedOracle::from_fn(|request| match &request.kind {
            RequestKind::Enumerate { .. } => Ok(r#"["optics", "acoustics"]"#.to_string()),
            _ => Ok("7".to_string()),
        }));
        let (engine, _dir) = create_engine(oracle.clone());

        let result = engine.search("laser").await.unwrap();
        assert_eq!(result, SearchResult::failed());
        assert_eq!(oracle.select_calls(), 10);

        let record = engine.records().load("laser").unwrap().unwrap();
        assert_eq!(record.path, vec![engine.root_id()]);
    }

    #[tokio::test]
    async fn test_rejects_empty_keyword() {
        let oracle = Arc::new(taxonomy_oracle(TREE));
        let (engine, _dir) = create_engine(oracle);
        assert!(matches!(
            engine.search("  ").await,
            Err(SearchError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_visited_topics_are_not_offered_again() {
        // Every topic lists physics and optics as children
        let oracle = Arc::new(ScriptedOracle::from_fn(|request| match &request.kind {
            RequestKind::Enumerate { .. } => Ok(r#"["physics", "optics", "acoustics"]"#.to_string()),
            RequestKind::Select { candidates, .. } => {
                assert!(!candidates.contains(&"physics".to_string()));
                Ok("0".to_string())
            }
            RequestKind::Repair { .. } => Ok("[]".to_string()),
        }));
        let (engine, _dir) = create_engine(oracle);

        let result = engine.search("zzz").await.unwrap();
        assert!(result.failed);

        let record = engine.records().load("zzz").unwrap().unwrap();
        let mut ids = record.path.clone();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), record.path.len());
    }
}
