//! In-memory rate store.

use async_trait::async_trait;
use dashmap::DashMap;
use ratebridge_common::{RateKey, RateRecord, StoreError};
use ratebridge_resolver::RateStore;
use tracing::debug;

/// Process-local store backed by a concurrent map.
///
/// Default backend when no database is configured. Contents do not
/// survive a restart.
pub struct MemoryRateStore {
    records: DashMap<RateKey, RateRecord>,
}

impl MemoryRateStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
        }
    }

    /// Number of stored pairs.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether any pair is stored.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Default for MemoryRateStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RateStore for MemoryRateStore {
    async fn find(&self, key: &RateKey) -> Result<Option<RateRecord>, StoreError> {
        Ok(self.records.get(key).map(|record| record.clone()))
    }

    async fn upsert(&self, record: RateRecord) -> Result<(), StoreError> {
        debug!(pair = %record.key, "Upserting rate record");
        self.records.insert(record.key.clone(), record);
        Ok(())
    }
}
