//! Column family definitions for RocksDB.
//!
//! - topics: topic records keyed by zero-padded id
//! - topic_names: unique normalized name -> topic id
//! - edges: parent->child and child->parent adjacency keys
//! - keyword_searches: one search record per keyword

use rocksdb::{ColumnFamilyDescriptor, Options};

/// Column family for topic records
pub const CF_TOPICS: &str = "topics";

/// Column family for the unique topic name index
pub const CF_TOPIC_NAMES: &str = "topic_names";

/// Column family for topic edges (both directions)
pub const CF_EDGES: &str = "edges";

/// Column family for keyword search records
pub const CF_KEYWORD_SEARCHES: &str = "keyword_searches";

/// All column family names
pub const ALL_CF_NAMES: &[&str] = &[CF_TOPICS, CF_TOPIC_NAMES, CF_EDGES, CF_KEYWORD_SEARCHES];

/// Edges carry no payload, only keys; keep them small on disk
fn edges_options() -> Options {
    let mut opts = Options::default();
    opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
    opts
}

/// Build all column family descriptors
pub fn build_cf_descriptors() -> Vec<ColumnFamilyDescriptor> {
    vec![
        ColumnFamilyDescriptor::new(CF_TOPICS, Options::default()),
        ColumnFamilyDescriptor::new(CF_TOPIC_NAMES, Options::default()),
        ColumnFamilyDescriptor::new(CF_EDGES, edges_options()),
        ColumnFamilyDescriptor::new(CF_KEYWORD_SEARCHES, Options::default()),
    ]
}
