//! Storage layer for the subtopic network search.
//!
//! Provides RocksDB-backed storage with:
//! - Column family isolation for topics, name index, edges and keyword searches
//! - Synced single-key writes and atomic write batches
//! - Prefix scans for adjacency and record listing

pub mod column_families;
pub mod db;
pub mod error;

pub use db::{BatchOp, Storage, StorageStats};
pub use error::StorageError;
