//! Background refresh: fire-and-forget dispatch, persist-and-notify, worker.

use std::sync::Arc;

use ratebridge_common::{RateRecord, RateResponse, RateResult, Timestamp};
use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument};

use crate::metrics::SharedMetrics;
use crate::publisher::{RatePublisher, NEW_RATE_CHANNEL};
use crate::queue::{RefreshJob, RefreshQueue};
use crate::store::RateStore;

/// Hands refresh jobs to the queue without ever failing the caller.
pub struct RefreshDispatcher {
    queue: Arc<dyn RefreshQueue>,
    metrics: SharedMetrics,
}

impl RefreshDispatcher {
    /// Create a new dispatcher.
    pub fn new(queue: Arc<dyn RefreshQueue>, metrics: SharedMetrics) -> Self {
        Self { queue, metrics }
    }

    /// Enqueue a persist-and-notify job for `response`.
    ///
    /// Fire and forget: an enqueue failure is an infrastructure problem and
    /// is logged at error level, never surfaced to the request.
    pub fn dispatch(&self, response: &RateResponse, prior_observed_at: Option<Timestamp>) {
        let job = RefreshJob::new(response.clone(), prior_observed_at);
        let job_id = job.id;

        debug!(
            job_id = %job_id,
            pair = %response.key(),
            "Dispatching rate refresh"
        );

        match self.queue.enqueue(job) {
            Ok(()) => self.metrics.refresh_dispatched(),
            Err(err) => {
                error!(job_id = %job_id, error = %err, "Failed to enqueue rate refresh");
            }
        }
    }
}

/// Persist-and-notify: writes a refreshed rate back and tells subscribers
/// when it is strictly newer than the baseline the dispatcher observed.
pub struct RefreshApplier {
    store: Arc<dyn RateStore>,
    publisher: Arc<dyn RatePublisher>,
    metrics: SharedMetrics,
}

impl RefreshApplier {
    /// Create a new applier.
    pub fn new(
        store: Arc<dyn RateStore>,
        publisher: Arc<dyn RatePublisher>,
        metrics: SharedMetrics,
    ) -> Self {
        Self {
            store,
            publisher,
            metrics,
        }
    }

    /// Upsert the record derived from `response`, then publish on the
    /// new-rate channel when `response.observed_at` is strictly newer than
    /// `prior_observed_at` (an absent baseline always counts as newer).
    #[instrument(skip(self, response), fields(pair = %response.key()))]
    pub async fn apply(
        &self,
        response: &RateResponse,
        prior_observed_at: Option<Timestamp>,
    ) -> RateResult<()> {
        let record = RateRecord::from_response(response);
        self.store.upsert(record).await?;
        self.metrics.refresh_applied();

        let is_newer =
            prior_observed_at.map_or(true, |baseline| baseline < response.observed_at);
        if !is_newer {
            debug!(
                observed_at = %response.observed_at,
                "Rate not newer than baseline, persisted without notification"
            );
            return Ok(());
        }

        self.publisher.publish(NEW_RATE_CHANNEL, response).await?;
        self.metrics.notification_published();
        info!(
            channel = NEW_RATE_CHANNEL,
            observed_at = %response.observed_at,
            "Published new rate notification"
        );
        Ok(())
    }
}

/// Drains the refresh queue, applying one job at a time.
pub struct RefreshWorker {
    jobs: mpsc::UnboundedReceiver<RefreshJob>,
    applier: Arc<RefreshApplier>,
}

impl RefreshWorker {
    /// Create a worker over the queue's receiving half.
    pub fn new(jobs: mpsc::UnboundedReceiver<RefreshJob>, applier: Arc<RefreshApplier>) -> Self {
        Self { jobs, applier }
    }

    /// Run until every queue handle has been dropped.
    pub async fn run(mut self) {
        while let Some(job) = self.jobs.recv().await {
            if let Err(err) = self
                .applier
                .apply(&job.response, job.prior_observed_at)
                .await
            {
                error!(job_id = %job.id, error = %err, "Rate refresh failed");
            }
        }
        info!("Refresh worker stopped");
    }
}
