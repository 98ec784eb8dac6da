//! Topic and search record types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of a topic, allocated in creation order.
pub type TopicId = u64;

/// Normalize a topic name: trimmed and lowercased.
///
/// This is the only identity rule; near-synonyms stay distinct topics.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// A node of the taxonomy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    /// Unique identifier
    pub topic_id: TopicId,
    /// Normalized name (unique)
    pub name: String,
    /// Subtopics have been generated; set once, never reset
    pub expanded: bool,
    /// When the topic was first referenced
    pub created_at: DateTime<Utc>,
}

impl Topic {
    /// Create an unexpanded topic. `name` must already be normalized.
    pub fn new(topic_id: TopicId, name: String) -> Self {
        Self {
            topic_id,
            name,
            expanded: false,
            created_at: Utc::now(),
        }
    }
}

/// Where a keyword search currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchStatus {
    /// Depth bound reached without a conclusion; resumable
    Pending,
    /// Terminal topic is a substring of the keyword
    Found,
    /// No candidates left or the oracle could not select one
    Failed,
}

/// Persisted progress of one keyword search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordSearchRecord {
    /// Keyword with its original casing
    pub keyword: String,
    /// Visited topic ids; `path[0]` is the root
    pub path: Vec<TopicId>,
    pub found: bool,
    pub failed: bool,
    /// Last time the record was written
    pub updated_at: DateTime<Utc>,
}

impl KeywordSearchRecord {
    /// Fresh record positioned at the root.
    pub fn new(keyword: String, root_id: TopicId) -> Self {
        Self {
            keyword,
            path: vec![root_id],
            found: false,
            failed: false,
            updated_at: Utc::now(),
        }
    }

    /// Current status derived from the flags.
    pub fn status(&self) -> SearchStatus {
        if self.found {
            SearchStatus::Found
        } else if self.failed {
            SearchStatus::Failed
        } else {
            SearchStatus::Pending
        }
    }

    /// Last topic on the path.
    pub fn frontier(&self) -> Option<TopicId> {
        self.path.last().copied()
    }
}

/// Result of one search invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Name of the matching topic when found
    pub topic: Option<String>,
    /// The search is structurally unable to proceed
    pub failed: bool,
}

impl SearchResult {
    pub fn found(topic: String) -> Self {
        Self {
            topic: Some(topic),
            failed: false,
        }
    }

    pub fn failed() -> Self {
        Self {
            topic: None,
            failed: true,
        }
    }

    /// Neither found nor failed.
    pub fn inconclusive() -> Self {
        Self {
            topic: None,
            failed: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("  Quantum Mechanics \n"), "quantum mechanics");
        assert_eq!(normalize_name("OPTICS"), "optics");
        assert_eq!(normalize_name("   "), "");
    }

    #[test]
    fn test_new_record_starts_at_root() {
        let record = KeywordSearchRecord::new("Laser".to_string(), 1);
        assert_eq!(record.path, vec![1]);
        assert_eq!(record.frontier(), Some(1));
        assert_eq!(record.status(), SearchStatus::Pending);
    }

    #[test]
    fn test_record_status() {
        let mut record = KeywordSearchRecord::new("Laser".to_string(), 1);
        record.found = true;
        assert_eq!(record.status(), SearchStatus::Found);

        record.found = false;
        record.failed = true;
        assert_eq!(record.status(), SearchStatus::Failed);
    }

    #[test]
    fn test_record_serialization_preserves_keyword_case() {
        let record = KeywordSearchRecord::new("Bose-Einstein Condensate".to_string(), 1);
        let json = serde_json::to_vec(&record).unwrap();
        let decoded: KeywordSearchRecord = serde_json::from_slice(&json).unwrap();
        assert_eq!(decoded.keyword, "Bose-Einstein Condensate");
        assert_eq!(decoded, record);
    }
}
