//! # subtopic-search
//!
//! Locates a keyword inside a taxonomy that an oracle grows on demand.
//!
//! Starting from a root topic, the engine asks the oracle for subtopics,
//! lets it pick the one most likely to contain the keyword, and descends
//! until a topic name occurs in the keyword. Both the taxonomy and every
//! search's progress are memoized in RocksDB, so repeated and resumed
//! searches reuse earlier oracle answers.
//!
//! ## Features
//! - Topic graph with unique normalized names and bidirectional edges
//! - Expansion performed at most once per topic
//! - Depth-bounded, resumable keyword search
//! - Non-memoized trial searches for stability measurements
//! - Outcome reconstruction from stored searches for statistics

pub mod error;
pub mod expansion;
pub mod graph;
pub mod outcome;
pub mod records;
pub mod search;
pub mod trial;
pub mod types;

pub use error::SearchError;
pub use expansion::{Expander, Expansion};
pub use graph::TopicGraph;
pub use outcome::outcome_from_record;
pub use records::SearchRecordStore;
pub use search::{is_match, SearchEngine, Selection};
pub use trial::TrialRunner;
pub use types::{
    normalize_name, KeywordSearchRecord, SearchResult, SearchStatus, Topic, TopicId,
};
