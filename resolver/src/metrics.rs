//! Metrics for rate resolution and the refresh pipeline.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Resolver metrics.
pub struct ResolverMetrics {
    /// Responses served from a successful live fetch.
    pub live_hits: AtomicU64,
    /// Responses served from a fresh stored record.
    pub stored_hits: AtomicU64,
    /// Responses served from the store after an upstream rate limit.
    pub rate_limit_fallbacks: AtomicU64,
    /// Resolutions that failed with an error.
    pub resolve_failures: AtomicU64,
    /// Refresh jobs successfully enqueued.
    pub refreshes_dispatched: AtomicU64,
    /// Refresh jobs whose upsert completed.
    pub refreshes_applied: AtomicU64,
    /// New-rate notifications published.
    pub notifications_published: AtomicU64,
}

impl ResolverMetrics {
    /// Create a new metrics instance.
    pub fn new() -> Self {
        Self {
            live_hits: AtomicU64::new(0),
            stored_hits: AtomicU64::new(0),
            rate_limit_fallbacks: AtomicU64::new(0),
            resolve_failures: AtomicU64::new(0),
            refreshes_dispatched: AtomicU64::new(0),
            refreshes_applied: AtomicU64::new(0),
            notifications_published: AtomicU64::new(0),
        }
    }

    /// Record a live resolution.
    pub fn live_hit(&self) {
        self.live_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a fresh stored resolution.
    pub fn stored_hit(&self) {
        self.stored_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a rate-limit fallback to the store.
    pub fn rate_limit_fallback(&self) {
        self.rate_limit_fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed resolution.
    pub fn resolve_failed(&self) {
        self.resolve_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a dispatched refresh job.
    pub fn refresh_dispatched(&self) {
        self.refreshes_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an applied refresh job.
    pub fn refresh_applied(&self) {
        self.refreshes_applied.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a published notification.
    pub fn notification_published(&self) {
        self.notifications_published.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current metrics snapshot.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            live_hits: self.live_hits.load(Ordering::Relaxed),
            stored_hits: self.stored_hits.load(Ordering::Relaxed),
            rate_limit_fallbacks: self.rate_limit_fallbacks.load(Ordering::Relaxed),
            resolve_failures: self.resolve_failures.load(Ordering::Relaxed),
            refreshes_dispatched: self.refreshes_dispatched.load(Ordering::Relaxed),
            refreshes_applied: self.refreshes_applied.load(Ordering::Relaxed),
            notifications_published: self.notifications_published.load(Ordering::Relaxed),
        }
    }
}

impl Default for ResolverMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of metrics at a point in time.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub live_hits: u64,
    pub stored_hits: u64,
    pub rate_limit_fallbacks: u64,
    pub resolve_failures: u64,
    pub refreshes_dispatched: u64,
    pub refreshes_applied: u64,
    pub notifications_published: u64,
}

/// Shared metrics instance.
pub type SharedMetrics = Arc<ResolverMetrics>;
