//! Write-through cache over another rate store.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use ratebridge_common::{RateKey, RateRecord, StoreError};
use ratebridge_resolver::RateStore;
use tracing::debug;

/// Wraps a backing store with a process-local cache.
///
/// The cache fills on write, never on a read miss: a pair is cached only
/// once this process has upserted it. Entries carry no TTL of their own,
/// staleness is the resolver's concern, and every write refreshes the
/// cached copy.
pub struct CachedRateStore {
    inner: Arc<dyn RateStore>,
    cache: DashMap<RateKey, RateRecord>,
}

impl CachedRateStore {
    /// Wrap `inner` with an empty cache.
    pub fn new(inner: Arc<dyn RateStore>) -> Self {
        Self {
            inner,
            cache: DashMap::new(),
        }
    }

    /// Number of cached pairs.
    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }
}

#[async_trait]
impl RateStore for CachedRateStore {
    async fn find(&self, key: &RateKey) -> Result<Option<RateRecord>, StoreError> {
        if let Some(record) = self.cache.get(key) {
            debug!(pair = %key, "Rate store cache hit");
            return Ok(Some(record.clone()));
        }
        self.inner.find(key).await
    }

    async fn upsert(&self, record: RateRecord) -> Result<(), StoreError> {
        self.inner.upsert(record.clone()).await?;
        self.cache.insert(record.key.clone(), record);
        Ok(())
    }
}
