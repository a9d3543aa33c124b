//! RateBridge Store Backends
//!
//! [`RateStore`](ratebridge_resolver::RateStore) implementations: a
//! process-local memory store, a Postgres-backed store and a write-through
//! caching wrapper over either.

pub mod memory;
pub mod cached;
pub mod postgres;

pub use cached::CachedRateStore;
pub use memory::MemoryRateStore;
pub use postgres::PostgresRateStore;
