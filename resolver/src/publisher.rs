//! Notification publisher contract and in-process implementations.

use async_trait::async_trait;
use ratebridge_common::{PublishError, RateResponse};
use tokio::sync::broadcast;
use tracing::{debug, info};

/// Channel that carries notifications about newly observed rates.
pub const NEW_RATE_CHANNEL: &str = "new-forex-rate";

/// Trait for rate notification publishers.
///
/// Delivery is at-least-once; the refresh path propagates publish failures
/// to its own log, never to the original caller.
#[async_trait]
pub trait RatePublisher: Send + Sync {
    /// Publish a rate notification on the given channel.
    async fn publish(&self, channel: &str, response: &RateResponse) -> Result<(), PublishError>;
}

/// Publisher for deployments without a message broker: logs the payload and
/// succeeds.
pub struct LogPublisher;

#[async_trait]
impl RatePublisher for LogPublisher {
    async fn publish(&self, channel: &str, response: &RateResponse) -> Result<(), PublishError> {
        let payload = serde_json::to_string(response)
            .map_err(|e| PublishError::new(channel, e.to_string()))?;

        info!(
            channel = channel,
            payload = %payload,
            "No message broker configured, logging rate notification"
        );
        Ok(())
    }
}

/// A published rate notification.
#[derive(Debug, Clone)]
pub struct RateEvent {
    pub channel: String,
    pub response: RateResponse,
}

/// In-process fan-out publisher backed by a tokio broadcast channel.
pub struct BroadcastPublisher {
    events: broadcast::Sender<RateEvent>,
}

impl BroadcastPublisher {
    /// Create a publisher buffering up to `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (events, _) = broadcast::channel(capacity);
        Self { events }
    }

    /// Subscribe to published events.
    pub fn subscribe(&self) -> broadcast::Receiver<RateEvent> {
        self.events.subscribe()
    }
}

#[async_trait]
impl RatePublisher for BroadcastPublisher {
    async fn publish(&self, channel: &str, response: &RateResponse) -> Result<(), PublishError> {
        let event = RateEvent {
            channel: channel.to_string(),
            response: response.clone(),
        };

        // A send error only means nobody is subscribed right now.
        if self.events.send(event).is_err() {
            debug!(channel = channel, "No subscribers for rate notification");
        }
        Ok(())
    }
}

/// Publisher that records notifications instead of delivering them, for
/// testing.
#[cfg(any(test, feature = "test-utils"))]
pub struct RecordingPublisher {
    events: parking_lot::Mutex<Vec<RateEvent>>,
    failure: parking_lot::Mutex<Option<PublishError>>,
}

#[cfg(any(test, feature = "test-utils"))]
impl RecordingPublisher {
    /// Create an empty recording publisher.
    pub fn new() -> Self {
        Self {
            events: parking_lot::Mutex::new(Vec::new()),
            failure: parking_lot::Mutex::new(None),
        }
    }

    /// Make every subsequent publish fail with `error`.
    pub fn fail_with(&self, error: PublishError) {
        *self.failure.lock() = Some(error);
    }

    /// Events recorded so far.
    pub fn events(&self) -> Vec<RateEvent> {
        self.events.lock().clone()
    }

    /// Number of notifications recorded.
    pub fn count(&self) -> usize {
        self.events.lock().len()
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl Default for RecordingPublisher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "test-utils"))]
#[async_trait]
impl RatePublisher for RecordingPublisher {
    async fn publish(&self, channel: &str, response: &RateResponse) -> Result<(), PublishError> {
        if let Some(error) = self.failure.lock().clone() {
            return Err(error);
        }
        self.events.lock().push(RateEvent {
            channel: channel.to_string(),
            response: response.clone(),
        });
        Ok(())
    }
}
