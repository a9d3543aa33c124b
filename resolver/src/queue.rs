//! Refresh queue contract and the in-process tokio implementation.

use ratebridge_common::{RateResponse, Timestamp};
use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;

/// A queued persist-and-notify job.
#[derive(Debug, Clone)]
pub struct RefreshJob {
    /// Job id for log correlation.
    pub id: Uuid,
    /// The response to persist.
    pub response: RateResponse,
    /// The upstream timestamp of the record the dispatcher observed, used
    /// by the applier to decide whether the rate is actually newer.
    pub prior_observed_at: Option<Timestamp>,
}

impl RefreshJob {
    /// Create a new job with a fresh id.
    pub fn new(response: RateResponse, prior_observed_at: Option<Timestamp>) -> Self {
        Self {
            id: Uuid::now_v7(),
            response,
            prior_observed_at,
        }
    }
}

/// Enqueue failure. Infrastructure problem, never part of a request result.
#[derive(Debug, Clone, Error)]
#[error("refresh queue rejected the job: {reason}")]
pub struct EnqueueError {
    pub reason: String,
}

impl EnqueueError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Fire-and-forget scheduling primitive for refresh jobs.
pub trait RefreshQueue: Send + Sync {
    /// Enqueue a job for background execution.
    fn enqueue(&self, job: RefreshJob) -> Result<(), EnqueueError>;
}

/// In-process queue backed by an unbounded tokio channel.
///
/// The receiving half is handed to a [`RefreshWorker`](crate::refresh::RefreshWorker);
/// the worker exits when every sender is dropped.
pub struct ChannelRefreshQueue {
    jobs: mpsc::UnboundedSender<RefreshJob>,
}

impl ChannelRefreshQueue {
    /// Create the queue and its receiving half.
    pub fn unbounded() -> (Self, mpsc::UnboundedReceiver<RefreshJob>) {
        let (jobs, rx) = mpsc::unbounded_channel();
        (Self { jobs }, rx)
    }
}

impl RefreshQueue for ChannelRefreshQueue {
    fn enqueue(&self, job: RefreshJob) -> Result<(), EnqueueError> {
        self.jobs
            .send(job)
            .map_err(|_| EnqueueError::new("refresh worker is no longer running"))
    }
}

/// Queue that records jobs instead of running them, for testing.
#[cfg(any(test, feature = "test-utils"))]
pub struct RecordingQueue {
    jobs: parking_lot::Mutex<Vec<RefreshJob>>,
    reject: std::sync::atomic::AtomicBool,
}

#[cfg(any(test, feature = "test-utils"))]
impl RecordingQueue {
    /// Create an empty recording queue.
    pub fn new() -> Self {
        Self {
            jobs: parking_lot::Mutex::new(Vec::new()),
            reject: std::sync::atomic::AtomicBool::new(false),
        }
    }

    /// Make every subsequent enqueue fail.
    pub fn set_reject(&self, reject: bool) {
        self.reject
            .store(reject, std::sync::atomic::Ordering::Relaxed);
    }

    /// Jobs recorded so far.
    pub fn jobs(&self) -> Vec<RefreshJob> {
        self.jobs.lock().clone()
    }

    /// Number of jobs recorded.
    pub fn len(&self) -> usize {
        self.jobs.lock().len()
    }

    /// Whether no job has been recorded.
    pub fn is_empty(&self) -> bool {
        self.jobs.lock().is_empty()
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl Default for RecordingQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl RefreshQueue for RecordingQueue {
    fn enqueue(&self, job: RefreshJob) -> Result<(), EnqueueError> {
        if self.reject.load(std::sync::atomic::Ordering::Relaxed) {
            return Err(EnqueueError::new("rejected by test queue"));
        }
        self.jobs.lock().push(job);
        Ok(())
    }
}
