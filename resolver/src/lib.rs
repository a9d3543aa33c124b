//! RateBridge Resolver
//!
//! Exchange-rate resolution engine: strategy-driven reads across a live
//! gateway and a rate store, with background persistence and change
//! notifications.
//!
//! # Features
//!
//! - Prefer-live and prefer-stored resolution strategies
//! - Stored-rate fallback on upstream quota exhaustion
//! - Configurable staleness window for stored rates
//! - Fire-and-forget refresh pipeline with new-rate notifications
//!
//! # Example
//!
//! ```rust,ignore
//! use ratebridge_resolver::{RateResolver, ResolveOptions};
//! use ratebridge_common::RateRequest;
//!
//! let resolver = RateResolver::new(gateway, store, dispatcher, metrics);
//!
//! let request = RateRequest::new("USD", "EUR");
//! let response = resolver.resolve(&request, ResolveOptions::default()).await?;
//! ```

pub mod gateway;
pub mod store;
pub mod policy;
pub mod staleness;
pub mod queue;
pub mod refresh;
pub mod publisher;
pub mod metrics;

pub use gateway::RateGateway;
pub use store::RateStore;
pub use policy::{RateResolver, ResolveOptions, Strategy};
pub use staleness::is_expired;
pub use queue::{ChannelRefreshQueue, EnqueueError, RefreshJob, RefreshQueue};
pub use refresh::{RefreshApplier, RefreshDispatcher, RefreshWorker};
pub use publisher::{BroadcastPublisher, LogPublisher, RateEvent, RatePublisher, NEW_RATE_CHANNEL};
pub use metrics::{MetricsSnapshot, ResolverMetrics, SharedMetrics};

#[cfg(any(test, feature = "test-utils"))]
pub use gateway::MockGateway;
#[cfg(any(test, feature = "test-utils"))]
pub use publisher::RecordingPublisher;
#[cfg(any(test, feature = "test-utils"))]
pub use queue::RecordingQueue;
#[cfg(any(test, feature = "test-utils"))]
pub use store::MockStore;
