//! Upstream gateway contract.

use async_trait::async_trait;
use ratebridge_common::{GatewayError, RateKey, RateQuote};

/// Trait for upstream rate gateways.
#[async_trait]
pub trait RateGateway: Send + Sync {
    /// Get the provider name, used in errors and logs.
    fn name(&self) -> &str;

    /// Fetch a live quote for a currency pair.
    async fn fetch_quote(&self, key: &RateKey) -> Result<RateQuote, GatewayError>;
}

/// Mock gateway for testing.
#[cfg(any(test, feature = "test-utils"))]
pub struct MockGateway {
    name: String,
    quotes: dashmap::DashMap<RateKey, RateQuote>,
    failure: parking_lot::Mutex<Option<GatewayError>>,
    calls: std::sync::atomic::AtomicU64,
}

#[cfg(any(test, feature = "test-utils"))]
impl MockGateway {
    /// Create a new mock gateway.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            quotes: dashmap::DashMap::new(),
            failure: parking_lot::Mutex::new(None),
            calls: std::sync::atomic::AtomicU64::new(0),
        }
    }

    /// Script a quote for the pair it describes.
    pub fn set_quote(&self, quote: RateQuote) {
        self.quotes.insert(quote.key(), quote);
    }

    /// Make every subsequent fetch fail with `error`.
    pub fn fail_with(&self, error: GatewayError) {
        *self.failure.lock() = Some(error);
    }

    /// Number of fetches received so far.
    pub fn calls(&self) -> u64 {
        self.calls.load(std::sync::atomic::Ordering::Relaxed)
    }
}

#[cfg(any(test, feature = "test-utils"))]
#[async_trait]
impl RateGateway for MockGateway {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_quote(&self, key: &RateKey) -> Result<RateQuote, GatewayError> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::Relaxed);

        if let Some(error) = self.failure.lock().clone() {
            return Err(error);
        }

        self.quotes
            .get(key)
            .map(|quote| quote.clone())
            .ok_or_else(|| GatewayError::Upstream(format!("no scripted quote for {key}")))
    }
}
