//! Memoized subtopic expansion.

use std::sync::Arc;

use dashmap::DashMap;
use subtopic_oracle::{AttemptPolicy, OracleGateway};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::error::SearchError;
use crate::graph::TopicGraph;
use crate::types::TopicId;

/// Result of asking for a topic's subtopics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expansion {
    /// Subtopics were generated earlier; nothing was asked
    AlreadyExpanded,
    /// Subtopics were generated now
    Expanded { children: Vec<TopicId> },
    /// Every attempt was rejected; the topic stays unexpanded
    Failed { attempts: u32 },
}

impl Expansion {
    /// Whether the topic has subtopics after this call.
    pub fn is_expanded(&self) -> bool {
        !matches!(self, Expansion::Failed { .. })
    }
}

/// Generates subtopics at most once per topic.
pub struct Expander {
    graph: Arc<TopicGraph>,
    gateway: OracleGateway,
    policy: AttemptPolicy,
    locks: DashMap<TopicId, Arc<Mutex<()>>>,
}

impl Expander {
    pub fn new(graph: Arc<TopicGraph>, gateway: OracleGateway, policy: AttemptPolicy) -> Self {
        Self {
            graph,
            gateway,
            policy,
            locks: DashMap::new(),
        }
    }

    /// Make sure `topic_id` has its subtopics in the graph.
    ///
    /// A topic that is already expanded costs no oracle call. On success the
    /// children, edges and expanded flag land in one write; on exhaustion
    /// nothing is written and a later call starts over.
    #[instrument(skip(self))]
    pub async fn ensure_expanded(&self, topic_id: TopicId) -> Result<Expansion, SearchError> {
        if self.graph.is_expanded(topic_id)? {
            return Ok(Expansion::AlreadyExpanded);
        }

        let lock = self
            .locks
            .entry(topic_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        // Another task may have finished while we waited.
        if self.graph.is_expanded(topic_id)? {
            return Ok(Expansion::AlreadyExpanded);
        }

        let name = self.graph.name_of(topic_id)?;
        let mut attempts = 0;

        for seed in self.policy.seeds() {
            attempts += 1;
            match self.gateway.enumerate_subtopics(&name, seed).await {
                Ok(subtopics) => {
                    let children = self.graph.add_children(topic_id, &subtopics)?;
                    // Later callers see the expanded flag before reaching the map
                    self.locks.remove(&topic_id);
                    info!(topic = %name, attempts, children = children.len(), "Expanded topic");
                    return Ok(Expansion::Expanded { children });
                }
                Err(err) => {
                    warn!(topic = %name, seed, attempt = attempts, error = %err, "Enumeration attempt rejected");
                }
            }
        }

        debug!(topic = %name, attempts, "Expansion failed");
        Ok(Expansion::Failed { attempts })
    }
}
