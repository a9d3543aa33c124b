//! Rate resolution strategies.
//!
//! `RateResolver` answers one question per call: given a currency pair,
//! which of the live gateway and the rate store should produce the
//! response, and what happens when the preferred source fails.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use ratebridge_common::{
    now, GatewayError, RateError, RateQuote, RateRecord, RateRequest, RateResponse, RateResult,
};
use tracing::{debug, info, instrument, warn};

use crate::gateway::RateGateway;
use crate::metrics::SharedMetrics;
use crate::refresh::RefreshDispatcher;
use crate::staleness::is_expired;
use crate::store::RateStore;

/// Which source the resolver consults first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Always fetch live, falling back to the stored rate only when the
    /// upstream quota is exhausted.
    PreferLive,
    /// Serve fresh stored rates and go live only when the record is
    /// missing or expired.
    PreferStored,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::PreferLive => write!(f, "prefer-live"),
            Strategy::PreferStored => write!(f, "prefer-stored"),
        }
    }
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "prefer-live" | "live" => Ok(Strategy::PreferLive),
            "prefer-stored" | "stored" => Ok(Strategy::PreferStored),
            other => Err(format!("unknown resolution strategy '{other}'")),
        }
    }
}

/// Per-call resolution options, snapshotted by the caller.
#[derive(Debug, Clone, Copy)]
pub struct ResolveOptions {
    pub strategy: Strategy,
    /// Minutes before a stored rate counts as expired.
    pub expiration_minutes: u32,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            strategy: Strategy::PreferStored,
            expiration_minutes: 5,
        }
    }
}

/// Resolves exchange rates against a gateway and a store.
///
/// Every live quote that reaches a caller is also handed to the refresh
/// dispatcher, so persistence and notification never sit on the request
/// path.
pub struct RateResolver {
    gateway: Arc<dyn RateGateway>,
    store: Arc<dyn RateStore>,
    dispatcher: RefreshDispatcher,
    metrics: SharedMetrics,
}

impl RateResolver {
    /// Create a resolver over the given gateway and store.
    pub fn new(
        gateway: Arc<dyn RateGateway>,
        store: Arc<dyn RateStore>,
        dispatcher: RefreshDispatcher,
        metrics: SharedMetrics,
    ) -> Self {
        Self {
            gateway,
            store,
            dispatcher,
            metrics,
        }
    }

    /// Resolve the pair in `request` according to `options`.
    ///
    /// Dropping the returned future cancels any in-flight gateway or store
    /// call. Refreshes already dispatched are owned by the worker and run
    /// to completion.
    #[instrument(
        skip(self, request, options),
        fields(pair = %request.key(), strategy = %options.strategy)
    )]
    pub async fn resolve(
        &self,
        request: &RateRequest,
        options: ResolveOptions,
    ) -> RateResult<RateResponse> {
        let result = match options.strategy {
            Strategy::PreferLive => self.resolve_live(request).await,
            Strategy::PreferStored => {
                self.resolve_stored(request, options.expiration_minutes).await
            }
        };
        if result.is_err() {
            self.metrics.resolve_failed();
        }
        result
    }

    /// Live-first: fetch and look up concurrently so the stored fallback
    /// is already at hand if the gateway reports quota exhaustion.
    async fn resolve_live(&self, request: &RateRequest) -> RateResult<RateResponse> {
        let key = request.key();
        let (fetched, stored) =
            tokio::join!(self.gateway.fetch_quote(&key), self.store.find(&key));

        // A store failure is fatal regardless of what the gateway produced.
        let stored = stored?;

        match fetched {
            Ok(quote) => Ok(self.accept_quote(quote, stored)),
            Err(err) => self.recover_with_stored(err, stored),
        }
    }

    /// Stored-first: the gateway is consulted only when the record is
    /// missing or expired.
    async fn resolve_stored(
        &self,
        request: &RateRequest,
        expiration_minutes: u32,
    ) -> RateResult<RateResponse> {
        let key = request.key();
        let stored = self.store.find(&key).await?;

        if let Some(record) = &stored {
            if !is_expired(record, expiration_minutes) {
                debug!("Serving fresh stored rate");
                self.metrics.stored_hit();
                return Ok(RateResponse::from(record.clone()));
            }
            debug!(expiration_minutes, "Stored rate expired, fetching live");
        }

        match self.gateway.fetch_quote(&key).await {
            Ok(quote) => Ok(self.accept_quote(quote, stored)),
            Err(err) => self.recover_with_stored(err, stored),
        }
    }

    /// Accept a live quote: merge the stored record's audit trail into the
    /// response and dispatch the background refresh.
    fn accept_quote(&self, quote: RateQuote, stored: Option<RateRecord>) -> RateResponse {
        let (created_at, updated_at, prior_observed_at) = match &stored {
            Some(record) => (record.created_at, Some(now()), Some(record.observed_at)),
            None => (now(), None, None),
        };
        let response = RateResponse::from_quote(quote, created_at, updated_at);

        self.dispatcher.dispatch(&response, prior_observed_at);
        self.metrics.live_hit();
        info!(
            provider = self.gateway.name(),
            rate = %response.rate,
            "Resolved live rate"
        );
        response
    }

    /// Classify a gateway failure, shared by both strategies.
    ///
    /// Quota exhaustion degrades to the stored rate when one exists, its
    /// freshness notwithstanding. Every other failure propagates even if a
    /// stored rate is on hand.
    fn recover_with_stored(
        &self,
        error: GatewayError,
        stored: Option<RateRecord>,
    ) -> RateResult<RateResponse> {
        match error {
            GatewayError::RateLimitExceeded { provider } => {
                if let Some(record) = stored {
                    warn!(provider = %provider, "Call limit reached, serving stored rate");
                    self.metrics.rate_limit_fallback();
                    return Ok(RateResponse::from(record));
                }
                Err(RateError::RateLimitExceeded {
                    provider: provider.clone(),
                    source: GatewayError::RateLimitExceeded { provider },
                })
            }
            GatewayError::InvalidRequest { .. } => {
                Err(RateError::InvalidExchangeRate { source: error })
            }
            GatewayError::Upstream(_) => Err(RateError::Gateway(error)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::MockGateway;
    use crate::metrics::ResolverMetrics;
    use crate::publisher::RecordingPublisher;
    use crate::queue::{ChannelRefreshQueue, RecordingQueue};
    use crate::refresh::{RefreshApplier, RefreshWorker};
    use crate::store::MockStore;
    use chrono::Duration;
    use ratebridge_common::{Currency, RateKey, StoreError};
    use rust_decimal_macros::dec;

    struct Rig {
        gateway: Arc<MockGateway>,
        store: Arc<MockStore>,
        queue: Arc<RecordingQueue>,
        metrics: SharedMetrics,
        resolver: RateResolver,
    }

    fn setup_resolver() -> Rig {
        let gateway = Arc::new(MockGateway::new("alpha-vantage"));
        let store = Arc::new(MockStore::new());
        let queue = Arc::new(RecordingQueue::new());
        let metrics: SharedMetrics = Arc::new(ResolverMetrics::new());
        let dispatcher = RefreshDispatcher::new(queue.clone(), metrics.clone());
        let resolver =
            RateResolver::new(gateway.clone(), store.clone(), dispatcher, metrics.clone());
        Rig {
            gateway,
            store,
            queue,
            metrics,
            resolver,
        }
    }

    fn usd_eur_request() -> RateRequest {
        RateRequest::new("USD", "EUR")
    }

    fn live_options() -> ResolveOptions {
        ResolveOptions {
            strategy: Strategy::PreferLive,
            ..ResolveOptions::default()
        }
    }

    fn usd_eur_quote() -> RateQuote {
        RateQuote {
            from: Currency::usd(),
            from_name: "United States Dollar".to_string(),
            to: Currency::eur(),
            to_name: "Euro".to_string(),
            rate: dec!(0.92),
            bid: dec!(0.9195),
            ask: dec!(0.9205),
            observed_at: now() - Duration::seconds(5),
            time_zone: "UTC".to_string(),
        }
    }

    fn stored_record(age_minutes: i64) -> RateRecord {
        let written_at = now() - Duration::minutes(age_minutes);
        RateRecord {
            key: RateKey::new(Currency::usd(), Currency::eur()),
            from_name: "United States Dollar".to_string(),
            to_name: "Euro".to_string(),
            rate: dec!(0.91),
            bid: dec!(0.9095),
            ask: dec!(0.9105),
            observed_at: written_at - Duration::seconds(10),
            created_at: written_at,
            updated_at: None,
        }
    }

    #[test]
    fn test_strategy_parses_both_forms() {
        assert_eq!("prefer-live".parse::<Strategy>(), Ok(Strategy::PreferLive));
        assert_eq!("LIVE".parse::<Strategy>(), Ok(Strategy::PreferLive));
        assert_eq!(
            "prefer-stored".parse::<Strategy>(),
            Ok(Strategy::PreferStored)
        );
        assert_eq!(" stored ".parse::<Strategy>(), Ok(Strategy::PreferStored));
        assert!("eager".parse::<Strategy>().is_err());
    }

    #[test]
    fn test_default_options_prefer_stored_five_minutes() {
        let options = ResolveOptions::default();
        assert_eq!(options.strategy, Strategy::PreferStored);
        assert_eq!(options.expiration_minutes, 5);
    }

    #[tokio::test]
    async fn test_prefer_stored_serves_fresh_record() {
        let rig = setup_resolver();
        let record = stored_record(1);
        rig.store.seed(record.clone());

        let response = rig
            .resolver
            .resolve(&usd_eur_request(), ResolveOptions::default())
            .await
            .unwrap();

        assert_eq!(response, RateResponse::from(record));
        assert_eq!(rig.gateway.calls(), 0);
        assert!(rig.queue.is_empty());
        assert_eq!(rig.metrics.snapshot().stored_hits, 1);
    }

    #[tokio::test]
    async fn test_prefer_stored_fetches_when_missing() {
        let rig = setup_resolver();
        let quote = usd_eur_quote();
        rig.gateway.set_quote(quote.clone());

        let response = rig
            .resolver
            .resolve(&usd_eur_request(), ResolveOptions::default())
            .await
            .unwrap();

        assert_eq!(response.rate, quote.rate);
        assert_eq!(response.observed_at, quote.observed_at);
        assert!(response.updated_at.is_none());

        let jobs = rig.queue.jobs();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].prior_observed_at, None);
        assert_eq!(jobs[0].response, response);
        assert_eq!(rig.metrics.snapshot().live_hits, 1);
    }

    #[tokio::test]
    async fn test_prefer_stored_fetches_when_expired() {
        let rig = setup_resolver();
        let record = stored_record(10);
        rig.store.seed(record.clone());
        rig.gateway.set_quote(usd_eur_quote());

        let response = rig
            .resolver
            .resolve(&usd_eur_request(), ResolveOptions::default())
            .await
            .unwrap();

        // The live quote wins but inherits the record's creation time.
        assert_eq!(response.rate, dec!(0.92));
        assert_eq!(response.created_at, record.created_at);
        assert!(response.updated_at.is_some());

        let jobs = rig.queue.jobs();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].prior_observed_at, Some(record.observed_at));
    }

    #[tokio::test]
    async fn test_concurrent_resolves_both_dispatch_refreshes() {
        let rig = setup_resolver();
        let record = stored_record(10);
        rig.store.seed(record.clone());
        rig.gateway.set_quote(usd_eur_quote());

        let request = usd_eur_request();
        let (first, second) = tokio::join!(
            rig.resolver
                .resolve(&request, ResolveOptions::default()),
            rig.resolver
                .resolve(&request, ResolveOptions::default())
        );

        // No per-key locking: each caller sees the expired record and
        // enqueues its own refresh.
        assert_eq!(first.unwrap().rate, dec!(0.92));
        assert_eq!(second.unwrap().rate, dec!(0.92));

        let jobs = rig.queue.jobs();
        assert_eq!(jobs.len(), 2);
        for job in &jobs {
            assert_eq!(job.prior_observed_at, Some(record.observed_at));
        }
        assert_eq!(rig.metrics.snapshot().refreshes_dispatched, 2);
    }

    #[tokio::test]
    async fn test_prefer_stored_store_failure_skips_gateway() {
        let rig = setup_resolver();
        rig.gateway.set_quote(usd_eur_quote());
        rig.store
            .fail_find_with(StoreError::Unavailable("connection refused".to_string()));

        let result = rig
            .resolver
            .resolve(&usd_eur_request(), ResolveOptions::default())
            .await;

        assert!(matches!(
            result,
            Err(RateError::Store(StoreError::Unavailable(_)))
        ));
        assert_eq!(rig.gateway.calls(), 0);
        assert_eq!(rig.metrics.snapshot().resolve_failures, 1);
    }

    #[tokio::test]
    async fn test_prefer_stored_rate_limit_serves_expired_record() {
        let rig = setup_resolver();
        let record = stored_record(10);
        rig.store.seed(record.clone());
        rig.gateway.fail_with(GatewayError::RateLimitExceeded {
            provider: "alpha-vantage".to_string(),
        });

        let response = rig
            .resolver
            .resolve(&usd_eur_request(), ResolveOptions::default())
            .await
            .unwrap();

        assert_eq!(response, RateResponse::from(record));
        assert!(rig.queue.is_empty());
        assert_eq!(rig.metrics.snapshot().rate_limit_fallbacks, 1);
    }

    #[tokio::test]
    async fn test_prefer_stored_rate_limit_without_record_errors() {
        let rig = setup_resolver();
        rig.gateway.fail_with(GatewayError::RateLimitExceeded {
            provider: "alpha-vantage".to_string(),
        });

        let result = rig
            .resolver
            .resolve(&usd_eur_request(), ResolveOptions::default())
            .await;

        match result {
            Err(RateError::RateLimitExceeded { provider, .. }) => {
                assert_eq!(provider, "alpha-vantage");
            }
            other => panic!("expected rate limit error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_invalid_request_maps_to_invalid_exchange_rate() {
        let rig = setup_resolver();
        // A stored record must not mask a rejected request.
        rig.store.seed(stored_record(10));
        rig.gateway.fail_with(GatewayError::InvalidRequest {
            reason: "Invalid API call".to_string(),
        });

        let result = rig
            .resolver
            .resolve(&usd_eur_request(), ResolveOptions::default())
            .await;

        assert!(matches!(
            result,
            Err(RateError::InvalidExchangeRate { .. })
        ));
    }

    #[tokio::test]
    async fn test_upstream_failure_propagates_despite_stored_record() {
        let rig = setup_resolver();
        rig.store.seed(stored_record(10));
        rig.gateway
            .fail_with(GatewayError::Upstream("connect timeout".to_string()));

        let result = rig
            .resolver
            .resolve(&usd_eur_request(), ResolveOptions::default())
            .await;

        assert!(matches!(
            result,
            Err(RateError::Gateway(GatewayError::Upstream(_)))
        ));
    }

    #[tokio::test]
    async fn test_prefer_live_merges_audit_trail() {
        let rig = setup_resolver();
        let record = stored_record(1);
        rig.store.seed(record.clone());
        rig.gateway.set_quote(usd_eur_quote());

        let response = rig
            .resolver
            .resolve(&usd_eur_request(), live_options())
            .await
            .unwrap();

        assert_eq!(response.rate, dec!(0.92));
        assert_eq!(response.created_at, record.created_at);
        assert!(response.updated_at.is_some());
        assert_eq!(rig.gateway.calls(), 1);
    }

    #[tokio::test]
    async fn test_prefer_live_goes_live_even_when_record_is_fresh() {
        let rig = setup_resolver();
        rig.store.seed(stored_record(0));
        rig.gateway.set_quote(usd_eur_quote());

        let response = rig
            .resolver
            .resolve(&usd_eur_request(), live_options())
            .await
            .unwrap();

        assert_eq!(rig.gateway.calls(), 1);
        assert_eq!(response.rate, dec!(0.92));
        assert_eq!(rig.metrics.snapshot().live_hits, 1);
    }

    #[tokio::test]
    async fn test_prefer_live_store_failure_wins_over_live_quote() {
        let rig = setup_resolver();
        rig.gateway.set_quote(usd_eur_quote());
        rig.store
            .fail_find_with(StoreError::Internal("row decode failed".to_string()));

        let result = rig
            .resolver
            .resolve(&usd_eur_request(), live_options())
            .await;

        assert!(matches!(
            result,
            Err(RateError::Store(StoreError::Internal(_)))
        ));
        assert!(rig.queue.is_empty());
    }

    #[tokio::test]
    async fn test_prefer_live_rate_limit_serves_stored() {
        let rig = setup_resolver();
        let record = stored_record(1);
        rig.store.seed(record.clone());
        rig.gateway.fail_with(GatewayError::RateLimitExceeded {
            provider: "alpha-vantage".to_string(),
        });

        let response = rig
            .resolver
            .resolve(&usd_eur_request(), live_options())
            .await
            .unwrap();

        assert_eq!(response, RateResponse::from(record));
        assert!(rig.queue.is_empty());
    }

    #[tokio::test]
    async fn test_prefer_live_rate_limit_without_record_errors() {
        let rig = setup_resolver();
        rig.gateway.fail_with(GatewayError::RateLimitExceeded {
            provider: "alpha-vantage".to_string(),
        });

        let result = rig
            .resolver
            .resolve(&usd_eur_request(), live_options())
            .await;

        match result {
            Err(RateError::RateLimitExceeded { provider, .. }) => {
                assert_eq!(provider, "alpha-vantage");
            }
            other => panic!("expected rate limit error, got {other:?}"),
        }
        assert!(rig.queue.is_empty());
    }

    #[tokio::test]
    async fn test_request_codes_are_normalized() {
        let rig = setup_resolver();
        rig.store.seed(stored_record(1));

        let response = rig
            .resolver
            .resolve(&RateRequest::new(" usd ", "eur"), ResolveOptions::default())
            .await
            .unwrap();

        assert_eq!(response.from, Currency::usd());
        assert_eq!(response.to, Currency::eur());
    }

    #[tokio::test]
    async fn test_resolution_flows_through_refresh_pipeline() {
        let gateway = Arc::new(MockGateway::new("alpha-vantage"));
        gateway.set_quote(usd_eur_quote());
        let store = Arc::new(MockStore::new());
        let publisher = Arc::new(RecordingPublisher::new());
        let metrics: SharedMetrics = Arc::new(ResolverMetrics::new());

        let (queue, jobs) = ChannelRefreshQueue::unbounded();
        let queue = Arc::new(queue);
        let dispatcher = RefreshDispatcher::new(queue.clone(), metrics.clone());
        let resolver = RateResolver::new(gateway, store.clone(), dispatcher, metrics.clone());
        let applier = RefreshApplier::new(store.clone(), publisher.clone(), metrics.clone());

        let response = resolver
            .resolve(&usd_eur_request(), ResolveOptions::default())
            .await
            .unwrap();

        // Release every queue handle so the worker drains and exits.
        drop(resolver);
        drop(queue);
        RefreshWorker::new(jobs, Arc::new(applier)).run().await;

        assert_eq!(
            store.record(&response.key()).unwrap(),
            RateRecord::from_response(&response)
        );
        assert_eq!(publisher.count(), 1);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.live_hits, 1);
        assert_eq!(snapshot.refreshes_dispatched, 1);
        assert_eq!(snapshot.refreshes_applied, 1);
        assert_eq!(snapshot.notifications_published, 1);
    }
}
