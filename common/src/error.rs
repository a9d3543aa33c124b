//! Error taxonomy for rate resolution.

use thiserror::Error;

/// Failures reported by an upstream gateway.
///
/// Clone-able so scripted test gateways can replay a failure per call.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// The upstream quota is exhausted.
    #[error("call limit reached for {provider}")]
    RateLimitExceeded { provider: String },

    /// The upstream rejected the request itself (typically bad currency codes).
    #[error("upstream rejected the request: {reason}")]
    InvalidRequest { reason: String },

    /// Transport failures, malformed payloads, anything else.
    #[error("unexpected upstream failure: {0}")]
    Upstream(String),
}

/// Failures reported by a rate store.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The store cannot be reached (pool exhausted, connection refused).
    #[error("rate store unavailable: {0}")]
    Unavailable(String),

    /// Any other store failure.
    #[error("unexpected store failure: {0}")]
    Internal(String),
}

/// Failure publishing a notification.
#[derive(Debug, Clone, Error)]
#[error("publish to '{channel}' failed: {reason}")]
pub struct PublishError {
    pub channel: String,
    pub reason: String,
}

impl PublishError {
    pub fn new(channel: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            reason: reason.into(),
        }
    }
}

/// Caller-facing errors produced by rate resolution.
#[derive(Debug, Error)]
pub enum RateError {
    /// The supplied currency codes were not recognized upstream.
    #[error("either the source or the target currency is not recognized as a valid code")]
    InvalidExchangeRate {
        #[source]
        source: GatewayError,
    },

    /// Upstream quota exhausted and no stored rate was available to fall
    /// back on.
    #[error("the call limit for {provider} has been reached and there is no stored rate available; retry later")]
    RateLimitExceeded {
        provider: String,
        #[source]
        source: GatewayError,
    },

    /// Any other gateway failure, propagated unchanged.
    #[error(transparent)]
    Gateway(GatewayError),

    /// Store failures are always fatal to the current call and are never
    /// masked by a gateway outcome.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Notification failure, surfaced from the background refresh path.
    #[error(transparent)]
    Publish(#[from] PublishError),
}

/// Result type alias for rate resolution operations.
pub type RateResult<T> = std::result::Result<T, RateError>;
