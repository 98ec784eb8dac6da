//! Topic graph store.
//!
//! Topics, their unique names and parent/child edges in RocksDB column
//! families. Edges are stored in both directions so children and parents
//! are each a single prefix scan.

use std::collections::HashSet;
use std::sync::Arc;

use subtopic_storage::column_families::{CF_EDGES, CF_TOPICS, CF_TOPIC_NAMES};
use subtopic_storage::{BatchOp, Storage};
use tracing::{debug, info, instrument};

use crate::error::SearchError;
use crate::types::{normalize_name, Topic, TopicId};

const TOPIC_PREFIX: &str = "topic:";

/// Key format for topics: topic:{topic_id:020}
pub fn topic_key(topic_id: TopicId) -> String {
    format!("{}{:020}", TOPIC_PREFIX, topic_id)
}

/// Forward edge: child:{parent:020}:{child:020}
pub fn child_edge_key(parent: TopicId, child: TopicId) -> String {
    format!("child:{:020}:{:020}", parent, child)
}

/// Reverse edge: parent:{child:020}:{parent:020}
pub fn parent_edge_key(child: TopicId, parent: TopicId) -> String {
    format!("parent:{:020}:{:020}", child, parent)
}

fn parse_trailing_id(key: &[u8]) -> Result<TopicId, SearchError> {
    std::str::from_utf8(key)
        .ok()
        .and_then(|k| k.rsplit(':').next())
        .and_then(|id| id.parse().ok())
        .ok_or_else(|| {
            SearchError::StoreInconsistency(format!(
                "malformed key {}",
                String::from_utf8_lossy(key)
            ))
        })
}

/// Persistent topic graph.
///
/// Ids are allocated under the storage's allocation guard from the highest
/// stored topic key, so any number of graphs may share one `Storage`.
pub struct TopicGraph {
    storage: Arc<Storage>,
}

impl TopicGraph {
    /// Open the graph over existing storage.
    pub fn open(storage: Arc<Storage>) -> Result<Self, SearchError> {
        let graph = Self { storage };
        info!(next_id = graph.next_id()?, "Opened topic graph");
        Ok(graph)
    }

    /// Id the next created topic receives. Callers creating topics must
    /// hold the allocation guard between this read and their write.
    fn next_id(&self) -> Result<TopicId, SearchError> {
        match self.storage.last_key(CF_TOPICS)? {
            Some(key) => Ok(parse_trailing_id(&key)? + 1),
            None => Ok(1),
        }
    }

    /// Get underlying storage.
    pub fn storage(&self) -> &Arc<Storage> {
        &self.storage
    }

    // --- Topics ---

    /// Return the id for `name`, creating the topic if it does not exist.
    #[instrument(skip(self))]
    pub fn get_or_create(&self, name: &str) -> Result<TopicId, SearchError> {
        let name = normalize_name(name);
        if name.is_empty() {
            return Err(SearchError::InvalidInput("topic name is empty".to_string()));
        }

        let _guard = self.storage.allocation_guard();
        if let Some(topic_id) = self.find(&name)? {
            return Ok(topic_id);
        }

        let topic = Topic::new(self.next_id()?, name);
        self.storage.write_batch(&Self::insert_ops(&topic)?)?;
        debug!(topic_id = topic.topic_id, name = %topic.name, "Created topic");
        Ok(topic.topic_id)
    }

    /// Look up a topic id by name.
    pub fn find(&self, name: &str) -> Result<Option<TopicId>, SearchError> {
        let name = normalize_name(name);
        match self.storage.get(CF_TOPIC_NAMES, name.as_bytes())? {
            Some(bytes) => {
                let topic_id: TopicId = serde_json::from_slice(&bytes)?;
                Ok(Some(topic_id))
            }
            None => Ok(None),
        }
    }

    /// Get a topic by id.
    pub fn get_topic(&self, topic_id: TopicId) -> Result<Option<Topic>, SearchError> {
        match self.storage.get(CF_TOPICS, topic_key(topic_id).as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Get a topic that must exist.
    pub fn topic(&self, topic_id: TopicId) -> Result<Topic, SearchError> {
        self.get_topic(topic_id)?
            .ok_or_else(|| SearchError::missing_topic(topic_id))
    }

    /// Name of a topic that must exist.
    pub fn name_of(&self, topic_id: TopicId) -> Result<String, SearchError> {
        Ok(self.topic(topic_id)?.name)
    }

    /// Whether subtopics have been generated for this topic.
    pub fn is_expanded(&self, topic_id: TopicId) -> Result<bool, SearchError> {
        Ok(self.topic(topic_id)?.expanded)
    }

    /// Set the expanded flag.
    #[instrument(skip(self))]
    pub fn mark_expanded(&self, topic_id: TopicId) -> Result<(), SearchError> {
        let mut topic = self.topic(topic_id)?;
        if topic.expanded {
            return Ok(());
        }
        topic.expanded = true;
        let value = serde_json::to_vec(&topic)?;
        self.storage
            .put(CF_TOPICS, topic_key(topic_id).as_bytes(), &value)?;
        debug!("Marked topic expanded");
        Ok(())
    }

    /// All topics in id order.
    pub fn list_topics(&self) -> Result<Vec<Topic>, SearchError> {
        let mut topics = Vec::new();
        for (_, value) in self
            .storage
            .prefix_iterator(CF_TOPICS, TOPIC_PREFIX.as_bytes())?
        {
            topics.push(serde_json::from_slice(&value)?);
        }
        Ok(topics)
    }

    /// Map a stored id sequence back to topic names.
    pub fn resolve_path(&self, path: &[TopicId]) -> Result<Vec<String>, SearchError> {
        path.iter().map(|&id| self.name_of(id)).collect()
    }

    // --- Edges ---

    /// Link `parent` to `child`. Returns `false` if the edge already existed.
    #[instrument(skip(self))]
    pub fn add_edge(&self, parent: TopicId, child: TopicId) -> Result<bool, SearchError> {
        let forward = child_edge_key(parent, child);
        if self.storage.contains(CF_EDGES, forward.as_bytes())? {
            return Ok(false);
        }

        self.storage.write_batch(&Self::edge_ops(parent, child))?;
        debug!("Added edge");
        Ok(true)
    }

    /// Children of a topic, ascending by id.
    pub fn children_of(&self, topic_id: TopicId) -> Result<Vec<TopicId>, SearchError> {
        self.scan_edges(&format!("child:{:020}:", topic_id))
    }

    /// Parents of a topic, ascending by id.
    pub fn parents_of(&self, topic_id: TopicId) -> Result<Vec<TopicId>, SearchError> {
        self.scan_edges(&format!("parent:{:020}:", topic_id))
    }

    fn scan_edges(&self, prefix: &str) -> Result<Vec<TopicId>, SearchError> {
        self.storage
            .prefix_iterator(CF_EDGES, prefix.as_bytes())?
            .iter()
            .map(|(key, _)| parse_trailing_id(key))
            .collect()
    }

    /// Record the outcome of a successful expansion in one atomic batch:
    /// new child topics, edges in both directions and the parent's
    /// `expanded` flag.
    ///
    /// Names are normalized; empty names and the parent's own name are
    /// skipped. Returns the child ids in answer order, without duplicates.
    /// A parent that is already expanded keeps its children and the
    /// existing ids are returned in id order.
    #[instrument(skip(self, names), fields(count = names.len()))]
    pub fn add_children(
        &self,
        parent: TopicId,
        names: &[String],
    ) -> Result<Vec<TopicId>, SearchError> {
        let _guard = self.storage.allocation_guard();

        let mut parent_topic = self.topic(parent)?;
        if parent_topic.expanded {
            // Expanded through another handle; the first answer stands
            debug!("Topic already expanded");
            return self.children_of(parent);
        }

        let mut ops = Vec::new();
        let mut seen = HashSet::new();
        let mut children = Vec::new();
        let first_id = self.next_id()?;
        let mut allocated = first_id;

        for raw in names {
            let name = normalize_name(raw);
            if name.is_empty() || name == parent_topic.name || !seen.insert(name.clone()) {
                continue;
            }

            let child = match self.find(&name)? {
                Some(existing) => existing,
                None => {
                    let topic = Topic::new(allocated, name);
                    ops.extend(Self::insert_ops(&topic)?);
                    allocated += 1;
                    topic.topic_id
                }
            };

            if !self
                .storage
                .contains(CF_EDGES, child_edge_key(parent, child).as_bytes())?
            {
                ops.extend(Self::edge_ops(parent, child));
            }
            children.push(child);
        }

        parent_topic.expanded = true;
        ops.push(BatchOp::put(
            CF_TOPICS,
            topic_key(parent),
            serde_json::to_vec(&parent_topic)?,
        ));

        self.storage.write_batch(&ops)?;
        let created = allocated - first_id;
        debug!(children = children.len(), created, "Expanded topic");
        Ok(children)
    }

    fn insert_ops(topic: &Topic) -> Result<Vec<BatchOp>, SearchError> {
        Ok(vec![
            BatchOp::put(CF_TOPICS, topic_key(topic.topic_id), serde_json::to_vec(topic)?),
            BatchOp::put(
                CF_TOPIC_NAMES,
                topic.name.as_bytes(),
                serde_json::to_vec(&topic.topic_id)?,
            ),
        ])
    }

    fn edge_ops(parent: TopicId, child: TopicId) -> Vec<BatchOp> {
        vec![
            BatchOp::put(CF_EDGES, child_edge_key(parent, child), Vec::new()),
            BatchOp::put(CF_EDGES, parent_edge_key(child, parent), Vec::new()),
        ]
    }
}
