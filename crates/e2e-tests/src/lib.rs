//! End-to-end test infrastructure for subtopic-search.
//!
//! Provides a shared TestHarness and scripted taxonomies for E2E tests
//! covering expansion, search, persistence and statistics.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use subtopic_oracle::{OracleGateway, RequestKind, ScriptedOracle};
use subtopic_search::SearchEngine;
use subtopic_storage::Storage;
use subtopic_types::SearchConfig;

/// Shared test harness for E2E tests.
///
/// Owns a scratch RocksDB directory. Engines built from the same harness
/// share its storage, which is how the tests observe persistence.
pub struct TestHarness {
    /// Keeps temp dir alive for the lifetime of the harness
    pub _temp_dir: tempfile::TempDir,
    /// Shared storage instance
    pub storage: Arc<Storage>,
}

impl TestHarness {
    /// Create a new test harness with temp directory and storage.
    pub fn new() -> Self {
        let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let storage =
            Arc::new(Storage::open(temp_dir.path()).expect("Failed to open test storage"));

        Self {
            _temp_dir: temp_dir,
            storage,
        }
    }

    /// Engine with default configuration over the harness storage.
    pub fn engine(&self, oracle: Arc<ScriptedOracle>) -> SearchEngine {
        self.engine_with_config(oracle, SearchConfig::default())
    }

    /// Engine with explicit configuration over the harness storage.
    pub fn engine_with_config(
        &self,
        oracle: Arc<ScriptedOracle>,
        config: SearchConfig,
    ) -> SearchEngine {
        SearchEngine::new(self.storage.clone(), OracleGateway::new(oracle), config)
            .expect("Failed to create search engine")
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

type Tree = HashMap<String, Vec<String>>;

/// Whether `topic` or anything below it in `tree` occurs in `keyword`.
fn reaches(tree: &Tree, topic: &str, keyword: &str, visited: &mut HashSet<String>) -> bool {
    if keyword.contains(topic) {
        return true;
    }
    if !visited.insert(topic.to_string()) {
        return false;
    }
    tree.get(topic)
        .map(|children| {
            children
                .iter()
                .any(|child| reaches(tree, child, keyword, visited))
        })
        .unwrap_or(false)
}

/// Oracle answering from a fixed taxonomy.
///
/// Selection behaves like a model that knows the whole taxonomy: it picks
/// the first candidate whose subtree contains the keyword, else the first
/// candidate. Topics missing from `tree` have no subtopics.
pub fn taxonomy_oracle(tree: &[(&str, &[&str])]) -> ScriptedOracle {
    let answers: HashMap<String, Vec<String>> = tree
        .iter()
        .map(|(parent, children)| {
            (
                parent.to_string(),
                children.iter().map(|c| c.to_string()).collect(),
            )
        })
        .collect();
    let tree: Tree = answers
        .iter()
        .map(|(parent, children)| {
            (
                parent.to_lowercase(),
                children.iter().map(|c| c.to_lowercase()).collect(),
            )
        })
        .collect();

    ScriptedOracle::from_fn(move |request| match &request.kind {
        RequestKind::Enumerate { topic } => {
            let children = answers.get(topic).cloned().unwrap_or_default();
            Ok(serde_json::to_string(&children).expect("Failed to encode subtopics"))
        }
        RequestKind::Select {
            keyword,
            candidates,
        } => {
            let keyword = keyword.to_lowercase();
            let index = candidates
                .iter()
                .position(|c| reaches(&tree, c, &keyword, &mut HashSet::new()))
                .unwrap_or(0);
            Ok(index.to_string())
        }
        RequestKind::Repair { .. } => Ok("[]".to_string()),
    })
}

/// A small physics taxonomy.
pub const PHYSICS: &[(&str, &[&str])] = &[
    (
        "physics",
        &["Classical Mechanics", "Quantum Mechanics", "Optics", "Thermodynamics"],
    ),
    (
        "quantum mechanics",
        &["Quantum Entanglement", "Quantum Tunneling", "Wave Function"],
    ),
    ("optics", &["Lasers", "Lenses", "Diffraction"]),
    ("classical mechanics", &["Kinematics", "Dynamics"]),
    ("thermodynamics", &["Entropy", "Heat Engines"]),
];

/// Oracle answering from [`PHYSICS`].
pub fn physics_taxonomy() -> ScriptedOracle {
    taxonomy_oracle(PHYSICS)
}

/// Oracle whose taxonomy never ends: every topic has two fresh subtopics.
pub fn endless_oracle() -> ScriptedOracle {
    ScriptedOracle::from_fn(|request| match &request.kind {
        RequestKind::Enumerate { topic } => Ok(serde_json::to_string(&[
            format!("{} branch", topic),
            format!("{} twig", topic),
        ])
        .expect("Failed to encode subtopics")),
        RequestKind::Select { .. } => Ok("0".to_string()),
        RequestKind::Repair { .. } => Ok("[]".to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use subtopic_oracle::{Oracle, OracleRequest};

    #[tokio::test]
    async fn test_taxonomy_selection_follows_subtree() {
        let oracle = physics_taxonomy();
        let candidates = vec![
            "classical mechanics".to_string(),
            "quantum mechanics".to_string(),
            "optics".to_string(),
            "thermodynamics".to_string(),
        ];

        let pick = |keyword: &str| OracleRequest::select(keyword, &candidates, 0);
        assert_eq!(oracle.complete(&pick("Lasers")).await.unwrap(), "2");
        assert_eq!(oracle.complete(&pick("entropy")).await.unwrap(), "3");
        assert_eq!(oracle.complete(&pick("zzz")).await.unwrap(), "0");
    }

    #[tokio::test]
    async fn test_taxonomy_enumeration() {
        let oracle = physics_taxonomy();
        let answer = oracle
            .complete(&OracleRequest::enumerate("optics", 0))
            .await
            .unwrap();
        assert_eq!(answer, r#"["Lasers","Lenses","Diffraction"]"#);

        let leaf = oracle
            .complete(&OracleRequest::enumerate("lasers", 0))
            .await
            .unwrap();
        assert_eq!(leaf, "[]");
    }
}
