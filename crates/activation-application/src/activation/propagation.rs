//! Background queue for best-effort remote propagation.
//!
//! Jobs are spawned on a runtime handle captured at construction, so callers
//! on the synchronous UI path never await them. Outcomes are logged and
//! counted; a failed job never reaches the caller.

use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use activation_core::error::{ActivationError, Result};
use futures::FutureExt;
use tokio::runtime::Handle;
use tokio_util::task::TaskTracker;
use uuid::Uuid;

/// What a background job propagates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobKind {
    /// A partial profile update for one step.
    StepUpdate,
    /// One document upload.
    DocumentUpload,
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobKind::StepUpdate => write!(f, "step update"),
            JobKind::DocumentUpload => write!(f, "document upload"),
        }
    }
}

/// Finished job counters, per kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PropagationStats {
    pub step_updates_succeeded: u64,
    pub step_updates_failed: u64,
    pub uploads_succeeded: u64,
    pub uploads_failed: u64,
}

impl PropagationStats {
    pub fn total_failed(&self) -> u64 {
        self.step_updates_failed + self.uploads_failed
    }
}

#[derive(Debug, Default)]
struct Counters {
    step_updates_succeeded: AtomicU64,
    step_updates_failed: AtomicU64,
    uploads_succeeded: AtomicU64,
    uploads_failed: AtomicU64,
}

impl Counters {
    fn record(&self, kind: JobKind, succeeded: bool) {
        let counter = match (kind, succeeded) {
            (JobKind::StepUpdate, true) => &self.step_updates_succeeded,
            (JobKind::StepUpdate, false) => &self.step_updates_failed,
            (JobKind::DocumentUpload, true) => &self.uploads_succeeded,
            (JobKind::DocumentUpload, false) => &self.uploads_failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Fire-and-forget job queue with observable outcomes.
///
/// Cloning shares the tracker and the counters.
#[derive(Clone)]
pub struct PropagationQueue {
    tracker: TaskTracker,
    handle: Handle,
    counters: Arc<Counters>,
}

impl PropagationQueue {
    /// Creates a queue on the current tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error when called outside a runtime.
    pub fn new() -> Result<Self> {
        let handle = Handle::try_current().map_err(|e| {
            ActivationError::internal(format!("No tokio runtime for propagation: {}", e))
        })?;
        Ok(Self::with_handle(handle))
    }

    pub fn with_handle(handle: Handle) -> Self {
        Self {
            tracker: TaskTracker::new(),
            handle,
            counters: Arc::new(Counters::default()),
        }
    }

    /// Spawns `job` in the background and returns its id.
    ///
    /// Errors and panics inside the job are logged and counted as failures.
    pub fn spawn<F>(&self, kind: JobKind, label: impl Into<String>, job: F) -> Uuid
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        let job_id = Uuid::new_v4();
        let label = label.into();
        let counters = self.counters.clone();

        tracing::debug!("[Propagation] Queued {} {} ({})", kind, job_id, label);

        self.tracker.spawn_on(
            async move {
                let succeeded = match AssertUnwindSafe(job).catch_unwind().await {
                    Ok(Ok(())) => {
                        tracing::debug!("[Propagation] {} {} succeeded ({})", kind, job_id, label);
                        true
                    }
                    Ok(Err(e)) => {
                        tracing::warn!(
                            "[Propagation] {} {} failed ({}): {}",
                            kind,
                            job_id,
                            label,
                            e
                        );
                        false
                    }
                    Err(_) => {
                        tracing::error!("[Propagation] {} {} panicked ({})", kind, job_id, label);
                        false
                    }
                };
                counters.record(kind, succeeded);
            },
            &self.handle,
        );

        job_id
    }

    /// Number of jobs still running.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Waits until every spawned job has finished.
    ///
    /// The tracker stays closed afterwards; closing only affects waiting, so
    /// later spawns are still tracked.
    pub async fn wait_idle(&self) {
        self.tracker.close();
        self.tracker.wait().await;
    }

    pub fn stats(&self) -> PropagationStats {
        PropagationStats {
            step_updates_succeeded: self.counters.step_updates_succeeded.load(Ordering::Relaxed),
            step_updates_failed: self.counters.step_updates_failed.load(Ordering::Relaxed),
            uploads_succeeded: self.counters.uploads_succeeded.load(Ordering::Relaxed),
            uploads_failed: self.counters.uploads_failed.load(Ordering::Relaxed),
        }
    }
}

impl fmt::Debug for PropagationQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropagationQueue")
            .field("in_flight", &self.tracker.len())
            .field("stats", &self.stats())
            .finish()
    }
}
