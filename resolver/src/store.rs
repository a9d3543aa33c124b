//! Rate store contract.

use async_trait::async_trait;
use ratebridge_common::{RateKey, RateRecord, StoreError};

/// Trait for durable rate stores.
///
/// `upsert` must be atomic per key: update when the key exists, insert
/// otherwise, with no exists-check/write race visible to callers.
#[async_trait]
pub trait RateStore: Send + Sync {
    /// Look up the stored record for a pair, if any.
    async fn find(&self, key: &RateKey) -> Result<Option<RateRecord>, StoreError>;

    /// Insert or update the record for its key.
    async fn upsert(&self, record: RateRecord) -> Result<(), StoreError>;
}

/// Mock store for testing.
#[cfg(any(test, feature = "test-utils"))]
pub struct MockStore {
    records: dashmap::DashMap<RateKey, RateRecord>,
    find_failure: parking_lot::Mutex<Option<StoreError>>,
    upsert_failure: parking_lot::Mutex<Option<StoreError>>,
    upserts: std::sync::atomic::AtomicU64,
}

#[cfg(any(test, feature = "test-utils"))]
impl MockStore {
    /// Create an empty mock store.
    pub fn new() -> Self {
        Self {
            records: dashmap::DashMap::new(),
            find_failure: parking_lot::Mutex::new(None),
            upsert_failure: parking_lot::Mutex::new(None),
            upserts: std::sync::atomic::AtomicU64::new(0),
        }
    }

    /// Seed a record without counting as an upsert.
    pub fn seed(&self, record: RateRecord) {
        self.records.insert(record.key.clone(), record);
    }

    /// Read a stored record directly.
    pub fn record(&self, key: &RateKey) -> Option<RateRecord> {
        self.records.get(key).map(|record| record.clone())
    }

    /// Make every subsequent find fail with `error`.
    pub fn fail_find_with(&self, error: StoreError) {
        *self.find_failure.lock() = Some(error);
    }

    /// Make every subsequent upsert fail with `error`.
    pub fn fail_upsert_with(&self, error: StoreError) {
        *self.upsert_failure.lock() = Some(error);
    }

    /// Number of successful upserts.
    pub fn upserts(&self) -> u64 {
        self.upserts.load(std::sync::atomic::Ordering::Relaxed)
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl Default for MockStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "test-utils"))]
#[async_trait]
impl RateStore for MockStore {
    async fn find(&self, key: &RateKey) -> Result<Option<RateRecord>, StoreError> {
        if let Some(error) = self.find_failure.lock().clone() {
            return Err(error);
        }
        Ok(self.records.get(key).map(|record| record.clone()))
    }

    async fn upsert(&self, record: RateRecord) -> Result<(), StoreError> {
        if let Some(error) = self.upsert_failure.lock().clone() {
            return Err(error);
        }
        self.records.insert(record.key.clone(), record);
        self.upserts
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        Ok(())
    }
}
