//! RocksDB wrapper for subtopic-search storage.
//!
//! Provides:
//! - Database open/close with column family setup
//! - Synced single-key writes and atomic write batches
//! - Single-key reads, prefix scans and reverse lookups

use rocksdb::{Direction, IteratorMode, Options, WriteBatch, WriteOptions, DB};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

use crate::column_families::{
    build_cf_descriptors, CF_EDGES, CF_KEYWORD_SEARCHES, CF_TOPICS, CF_TOPIC_NAMES,
};
use crate::error::StorageError;

/// A put inside an atomic write batch. The store is append-only, so a
/// batch never removes keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOp {
    /// Target column family
    pub cf: &'static str,
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

impl BatchOp {
    /// Write `value` under `key` in column family `cf`.
    pub fn put(cf: &'static str, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        BatchOp {
            cf,
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Main storage interface
pub struct Storage {
    db: DB,
    /// Serializes read-then-allocate sequences across every handle to this store
    allocation: Mutex<()>,
}

impl Storage {
    /// Open storage at the given path, creating if necessary
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        info!("Opening storage at {:?}", path);

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);
        db_opts.set_max_background_jobs(2);

        let cf_descriptors = build_cf_descriptors();
        let db = DB::open_cf_descriptors(&db_opts, path, cf_descriptors)?;

        Ok(Self {
            db,
            allocation: Mutex::new(()),
        })
    }

    /// Hold this guard while reading the highest id and writing the next one.
    ///
    /// All components sharing an `Arc<Storage>` allocate under the same
    /// guard, so no two of them can hand out the same id.
    pub fn allocation_guard(&self) -> MutexGuard<'_, ()> {
        self.allocation.lock().expect("allocation mutex poisoned")
    }

    fn cf(&self, cf_name: &str) -> Result<&rocksdb::ColumnFamily, StorageError> {
        self.db
            .cf_handle(cf_name)
            .ok_or_else(|| StorageError::ColumnFamilyNotFound(cf_name.to_string()))
    }

    /// Every write is synced to the WAL before returning, so a crash
    /// never loses an acknowledged step.
    fn synced() -> WriteOptions {
        let mut opts = WriteOptions::default();
        opts.set_sync(true);
        opts
    }

    /// Put a value into a specific column family.
    pub fn put(&self, cf_name: &str, key: &[u8], value: &[u8]) -> Result<(), StorageError> {
        let cf = self.cf(cf_name)?;
        self.db.put_cf_opt(cf, key, value, &Self::synced())?;
        Ok(())
    }

    /// Get a value from a specific column family.
    pub fn get(&self, cf_name: &str, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        let cf = self.cf(cf_name)?;
        let result = self.db.get_cf(cf, key)?;
        Ok(result)
    }

    /// Check whether a key exists without copying its value out.
    pub fn contains(&self, cf_name: &str, key: &[u8]) -> Result<bool, StorageError> {
        let cf = self.cf(cf_name)?;
        Ok(self.db.get_pinned_cf(cf, key)?.is_some())
    }

    /// Apply all operations atomically.
    pub fn write_batch(&self, ops: &[BatchOp]) -> Result<(), StorageError> {
        let mut batch = WriteBatch::default();
        for op in ops {
            batch.put_cf(self.cf(op.cf)?, &op.key, &op.value);
        }
        self.db.write_opt(batch, &Self::synced())?;
        debug!(ops = ops.len(), "Wrote batch");
        Ok(())
    }

    /// Iterate over entries with a given prefix in a column family.
    ///
    /// Returns (key, value) pairs in key order.
    #[allow(clippy::type_complexity)]
    pub fn prefix_iterator(
        &self,
        cf_name: &str,
        prefix: &[u8],
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StorageError> {
        let cf = self.cf(cf_name)?;

        let mut results = Vec::new();
        let iter = self
            .db
            .iterator_cf(cf, IteratorMode::From(prefix, Direction::Forward));

        for item in iter {
            let (key, value) = item?;
            if !key.starts_with(prefix) {
                break;
            }
            results.push((key.to_vec(), value.to_vec()));
        }

        Ok(results)
    }

    /// Highest key in a column family, if any.
    ///
    /// Used to resume monotonically increasing id sequences after reopen.
    pub fn last_key(&self, cf_name: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let cf = self.cf(cf_name)?;
        let mut iter = self.db.iterator_cf(cf, IteratorMode::End);
        match iter.next() {
            Some(item) => {
                let (key, _) = item?;
                Ok(Some(key.to_vec()))
            }
            None => Ok(None),
        }
    }

    /// Get database statistics.
    pub fn get_stats(&self) -> Result<StorageStats, StorageError> {
        let mut stats = StorageStats {
            topic_count: self.count_cf_entries(CF_TOPICS)?,
            name_count: self.count_cf_entries(CF_TOPIC_NAMES)?,
            edge_key_count: self.count_cf_entries(CF_EDGES)?,
            keyword_search_count: self.count_cf_entries(CF_KEYWORD_SEARCHES)?,
            disk_usage_bytes: 0,
        };
        stats.disk_usage_bytes = self.get_disk_usage();
        Ok(stats)
    }

    fn count_cf_entries(&self, cf_name: &str) -> Result<u64, StorageError> {
        let cf = self.cf(cf_name)?;
        let mut count = 0u64;
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            item?;
            count += 1;
        }
        Ok(count)
    }

    fn get_disk_usage(&self) -> u64 {
        let mut total_size = 0u64;
        if let Ok(entries) = std::fs::read_dir(self.db.path()) {
            for entry in entries.flatten() {
                if let Ok(metadata) = entry.metadata() {
                    total_size += metadata.len();
                }
            }
        }
        total_size
    }
}

/// Statistics about the storage.
#[derive(Debug, Default)]
pub struct StorageStats {
    /// Number of topics
    pub topic_count: u64,
    /// Number of entries in the name index
    pub name_count: u64,
    /// Number of edge keys (two per edge)
    pub edge_key_count: u64,
    /// Number of keyword search records
    pub keyword_search_count: u64,
    /// Total disk usage in bytes
    pub disk_usage_bytes: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column_families::ALL_CF_NAMES;
    use tempfile::TempDir;

    fn create_test_storage() -> (Storage, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let storage = Storage::open(temp_dir.path()).unwrap();
        (storage, temp_dir)
    }

    #[test]
    fn test_open_creates_column_families() {
        let (storage, _temp) = create_test_storage();
        for cf_name in ALL_CF_NAMES {
            assert!(
                storage.db.cf_handle(cf_name).is_some(),
                "CF {} should exist",
                cf_name
            );
        }
    }

    #[test]
    fn test_put_get_overwrite() {
        let (storage, _temp) = create_test_storage();

        assert!(!storage.contains(CF_TOPICS, b"topic:1").unwrap());
        storage.put(CF_TOPICS, b"topic:1", b"value").unwrap();
        assert!(storage.contains(CF_TOPICS, b"topic:1").unwrap());
        assert_eq!(
            storage.get(CF_TOPICS, b"topic:1").unwrap(),
            Some(b"value".to_vec())
        );

        storage.put(CF_TOPICS, b"topic:1", b"updated").unwrap();
        assert_eq!(
            storage.get(CF_TOPICS, b"topic:1").unwrap(),
            Some(b"updated".to_vec())
        );
        assert_eq!(storage.get(CF_TOPICS, b"topic:2").unwrap(), None);
    }

    #[test]
    fn test_unknown_column_family() {
        let (storage, _temp) = create_test_storage();
        let result = storage.get("nope", b"k");
        assert!(matches!(result, Err(StorageError::ColumnFamilyNotFound(_))));
    }

    #[test]
    fn test_write_batch_is_atomic_across_cfs() {
        let (storage, _temp) = create_test_storage();

        storage
            .write_batch(&[
                BatchOp::put(CF_TOPICS, b"topic:1".to_vec(), b"t".to_vec()),
                BatchOp::put(CF_TOPIC_NAMES, b"optics".to_vec(), b"1".to_vec()),
                BatchOp::put(CF_EDGES, b"child:0:1".to_vec(), Vec::new()),
            ])
            .unwrap();

        assert!(storage.contains(CF_TOPICS, b"topic:1").unwrap());
        assert!(storage.contains(CF_TOPIC_NAMES, b"optics").unwrap());
        assert!(storage.contains(CF_EDGES, b"child:0:1").unwrap());
    }

    #[test]
    fn test_write_batch_with_unknown_cf_writes_nothing() {
        let (storage, _temp) = create_test_storage();

        let result = storage.write_batch(&[
            BatchOp::put(CF_TOPICS, b"topic:1".to_vec(), b"t".to_vec()),
            BatchOp::put("nope", b"k".to_vec(), b"v".to_vec()),
        ]);

        assert!(matches!(result, Err(StorageError::ColumnFamilyNotFound(_))));
        assert!(!storage.contains(CF_TOPICS, b"topic:1").unwrap());
    }

    #[test]
    fn test_allocation_guard_is_shared() {
        let (storage, _temp) = create_test_storage();
        let storage = std::sync::Arc::new(storage);

        let guard = storage.allocation_guard();
        let other = storage.clone();
        let handle = std::thread::spawn(move || {
            let _guard = other.allocation_guard();
            other.put(CF_TOPICS, b"topic:2", b"").unwrap();
        });

        // The other handle cannot write until this guard is released
        storage.put(CF_TOPICS, b"topic:1", b"").unwrap();
        assert_eq!(storage.last_key(CF_TOPICS).unwrap(), Some(b"topic:1".to_vec()));
        drop(guard);

        handle.join().unwrap();
        assert_eq!(storage.last_key(CF_TOPICS).unwrap(), Some(b"topic:2".to_vec()));
    }

    #[test]
    fn test_prefix_iterator_stops_at_prefix_boundary() {
        let (storage, _temp) = create_test_storage();

        storage.put(CF_EDGES, b"child:1:2", b"").unwrap();
        storage.put(CF_EDGES, b"child:1:3", b"").unwrap();
        storage.put(CF_EDGES, b"child:2:4", b"").unwrap();
        storage.put(CF_EDGES, b"parent:2:1", b"").unwrap();

        let children = storage.prefix_iterator(CF_EDGES, b"child:1:").unwrap();
        let keys: Vec<_> = children.into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec![b"child:1:2".to_vec(), b"child:1:3".to_vec()]);
    }

    #[test]
    fn test_last_key() {
        let (storage, _temp) = create_test_storage();
        assert_eq!(storage.last_key(CF_TOPICS).unwrap(), None);

        storage.put(CF_TOPICS, b"topic:0002", b"").unwrap();
        storage.put(CF_TOPICS, b"topic:0010", b"").unwrap();
        storage.put(CF_TOPICS, b"topic:0003", b"").unwrap();

        assert_eq!(
            storage.last_key(CF_TOPICS).unwrap(),
            Some(b"topic:0010".to_vec())
        );
    }

    #[test]
    fn test_persistence_across_reopen() {
        let temp_dir = TempDir::new().unwrap();
        {
            let storage = Storage::open(temp_dir.path()).unwrap();
            storage.put(CF_KEYWORD_SEARCHES, b"kw:laser", b"{}").unwrap();
        }
        let storage = Storage::open(temp_dir.path()).unwrap();
        assert!(storage.contains(CF_KEYWORD_SEARCHES, b"kw:laser").unwrap());
    }

    #[test]
    fn test_get_stats() {
        let (storage, _temp) = create_test_storage();
        storage.put(CF_TOPICS, b"topic:1", b"").unwrap();
        storage.put(CF_TOPICS, b"topic:2", b"").unwrap();
        storage.put(CF_EDGES, b"child:1:2", b"").unwrap();
        storage.put(CF_EDGES, b"parent:2:1", b"").unwrap();

        let stats = storage.get_stats().unwrap();
        assert_eq!(stats.topic_count, 2);
        assert_eq!(stats.edge_key_count, 2);
        assert_eq!(stats.keyword_search_count, 0);
    }
}
