//! Keyword search record persistence.

use std::sync::Arc;

use chrono::Utc;
use subtopic_storage::column_families::CF_KEYWORD_SEARCHES;
use subtopic_storage::Storage;
use tracing::{debug, instrument};

use crate::error::SearchError;
use crate::types::{KeywordSearchRecord, TopicId};

const RECORD_PREFIX: &str = "kw:";

/// Key format for search records: kw:{keyword}
///
/// The keyword is stored verbatim; distinct casings are distinct records.
pub fn record_key(keyword: &str) -> String {
    format!("{}{}", RECORD_PREFIX, keyword)
}

/// Store of one record per searched keyword.
pub struct SearchRecordStore {
    storage: Arc<Storage>,
}

impl SearchRecordStore {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }

    /// Load the record for a keyword.
    pub fn load(&self, keyword: &str) -> Result<Option<KeywordSearchRecord>, SearchError> {
        match self
            .storage
            .get(CF_KEYWORD_SEARCHES, record_key(keyword).as_bytes())?
        {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Load the record for a keyword, creating it at `root` if absent.
    #[instrument(skip(self))]
    pub fn load_or_create(
        &self,
        keyword: &str,
        root: TopicId,
    ) -> Result<KeywordSearchRecord, SearchError> {
        if let Some(record) = self.load(keyword)? {
            return Ok(record);
        }

        let record = KeywordSearchRecord::new(keyword.to_string(), root);
        self.save(&record)?;
        debug!("Created search record");
        Ok(record)
    }

    /// Persist a record, stamping `updated_at`.
    pub fn save(&self, record: &KeywordSearchRecord) -> Result<(), SearchError> {
        let mut record = record.clone();
        record.updated_at = Utc::now();
        let value = serde_json::to_vec(&record)?;
        self.storage.put(
            CF_KEYWORD_SEARCHES,
            record_key(&record.keyword).as_bytes(),
            &value,
        )?;
        debug!(keyword = %record.keyword, path_len = record.path.len(), found = record.found, failed = record.failed, "Saved search record");
        Ok(())
    }

    /// All records in store iteration order.
    pub fn list(&self) -> Result<Vec<KeywordSearchRecord>, SearchError> {
        let mut records = Vec::new();
        for (_, value) in self
            .storage
            .prefix_iterator(CF_KEYWORD_SEARCHES, RECORD_PREFIX.as_bytes())?
        {
            records.push(serde_json::from_slice(&value)?);
        }
        Ok(records)
    }
}
