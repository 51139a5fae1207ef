//! The activation state container.
//!
//! Owns the authoritative in-memory wizard state. Reads and writes from the
//! UI are synchronous: memory and the local cache are updated before the call
//! returns, while remote propagation and document uploads run on the
//! [`PropagationQueue`].

use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use activation_core::document::{DocumentField, DocumentType, LocalFile};
use activation_core::error::{ActivationError, Result};
use activation_core::profile::RemoteProfile;
use activation_core::remote::{DocumentUploader, ProfileGateway};
use activation_core::step::{StepData, StepPayload, WizardState, WizardStep};
use activation_core::user::UserIdentity;
use activation_infrastructure::mapper::StepDataMapper;
use activation_infrastructure::progress_cache::{CacheLoad, CacheWrite, ProgressCache};
use chrono::{DateTime, Utc};
use futures::FutureExt;
use tokio::runtime::Handle;
use uuid::Uuid;

use super::propagation::{JobKind, PropagationQueue, PropagationStats};
use super::uploads::UploadSideChannel;

/// A persistence failure shown to the user until dismissed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorState {
    pub message: String,
    pub raised_at: DateTime<Utc>,
}

impl ErrorState {
    fn from_error(error: &ActivationError) -> Self {
        let message = if error.is_quota_exceeded() {
            "Your progress could not be saved on this device because storage is full. \
             It will still be sent to the server."
                .to_string()
        } else {
            format!("Your progress could not be saved on this device: {}", error)
        };
        Self {
            message,
            raised_at: Utc::now(),
        }
    }
}

/// Where the state of a hydration came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HydrationOutcome {
    /// No authenticated user; state is empty.
    Anonymous,
    /// The remote profile was adopted.
    Remote,
    /// The remote was unavailable or had no profile; a valid cache was used.
    Cache,
    /// Neither source had usable data.
    Empty,
    /// A newer hydration or reset started while this one was in flight; its
    /// result was dropped.
    Superseded,
}

/// What a synchronous write did before returning.
#[derive(Debug, Clone, PartialEq)]
pub struct StepWriteReport {
    pub step: WizardStep,
    /// `None` when the local cache write failed; see `error`.
    pub cache: Option<CacheWrite>,
    /// The error state raised by this write, if any.
    pub error: Option<ErrorState>,
    /// Background job propagating the step to the remote.
    pub propagation_job: Option<Uuid>,
    /// One background job per attached document.
    pub upload_jobs: Vec<Uuid>,
}

impl StepWriteReport {
    pub fn is_cached(&self) -> bool {
        self.cache.is_some()
    }
}

#[derive(Debug, Default)]
struct Inner {
    wizard: WizardState,
    /// User the current state belongs to.
    user: Option<UserIdentity>,
    /// Last authenticated user ever hydrated. Survives logout.
    previous_user_id: Option<String>,
    remote_snapshot: Option<RemoteProfile>,
    attachments: BTreeMap<DocumentField, LocalFile>,
    error: Option<ErrorState>,
}

impl Inner {
    fn user_id(&self) -> Option<String> {
        self.user.as_ref().map(|u| u.id.clone())
    }
}

/// Orchestrates hydration, local caching and remote propagation of the
/// activation wizard.
pub struct ActivationStateContainer {
    gateway: Arc<dyn ProfileGateway>,
    cache: Arc<ProgressCache>,
    queue: PropagationQueue,
    uploads: UploadSideChannel,
    inner: Arc<RwLock<Inner>>,
    /// Bumped by every hydration and reset.
    generation: Arc<AtomicU64>,
}

impl ActivationStateContainer {
    /// Creates a container whose background jobs run on the current runtime.
    ///
    /// # Errors
    ///
    /// Returns an error when called outside a tokio runtime.
    pub fn new(
        gateway: Arc<dyn ProfileGateway>,
        uploader: Arc<dyn DocumentUploader>,
        cache: ProgressCache,
    ) -> Result<Self> {
        let handle = Handle::try_current().map_err(|e| {
            ActivationError::internal(format!("No tokio runtime for propagation: {}", e))
        })?;
        Ok(Self::with_handle(gateway, uploader, cache, handle))
    }

    /// Creates a container whose background jobs run on `handle`.
    pub fn with_handle(
        gateway: Arc<dyn ProfileGateway>,
        uploader: Arc<dyn DocumentUploader>,
        cache: ProgressCache,
        handle: Handle,
    ) -> Self {
        let queue = PropagationQueue::with_handle(handle);
        let generation = Arc::new(AtomicU64::new(0));
        let uploads = UploadSideChannel::new(uploader, queue.clone());

        Self {
            gateway,
            cache: Arc::new(cache),
            queue,
            uploads,
            inner: Arc::new(RwLock::new(Inner::default())),
            generation,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    // ============================================================================
    // Hydration
    // ============================================================================

    /// Loads the wizard state for `user`.
    ///
    /// The remote profile wins when available; otherwise a valid local cache
    /// is used; otherwise the state is empty. Switching to a different user
    /// first wipes the cache and the in-memory state. Never fails: unexpected
    /// errors are logged and leave the state empty.
    pub async fn hydrate(&self, user: Option<&UserIdentity>) -> HydrationOutcome {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let user_switched = {
            let mut inner = self.write();
            let switched = matches!(
                (&inner.previous_user_id, user),
                (Some(previous), Some(current)) if *previous != current.id
            );
            if switched {
                tracing::info!(
                    "[ActivationState] User changed from {:?} to {:?}; discarding local progress",
                    inner.previous_user_id,
                    user.map(|u| u.id.as_str())
                );
                inner.wizard.reset();
                inner.attachments.clear();
                inner.remote_snapshot = None;
                inner.error = None;
            }
            switched
        };
        if user_switched {
            self.uploads.clear_ledger();
            if let Err(e) = self.cache.clear() {
                tracing::warn!("[ActivationState] Failed to clear cache on user switch: {}", e);
            }
        }

        let Some(user) = user else {
            tracing::debug!("[ActivationState] No authenticated user; starting empty");
            let mut inner = self.write();
            inner.wizard.reset();
            inner.user = None;
            inner.remote_snapshot = None;
            inner.attachments.clear();
            return HydrationOutcome::Anonymous;
        };

        let (state, snapshot, outcome) = self.load_for(user).await;

        if self.generation.load(Ordering::SeqCst) != generation {
            tracing::debug!(
                "[ActivationState] Hydration for {} superseded; dropping result",
                user.id
            );
            return HydrationOutcome::Superseded;
        }

        let mut inner = self.write();
        tracing::info!(
            "[ActivationState] Hydrated {} step(s) for {} from {:?}, current step {}",
            state.steps.len(),
            user.id,
            outcome,
            state.current_step
        );
        inner.wizard = state;
        inner.user = Some(user.clone());
        inner.previous_user_id = Some(user.id.clone());
        inner.remote_snapshot = snapshot;
        outcome
    }

    async fn load_for(
        &self,
        user: &UserIdentity,
    ) -> (WizardState, Option<RemoteProfile>, HydrationOutcome) {
        let fetched = AssertUnwindSafe(self.gateway.fetch_profile())
            .catch_unwind()
            .await;

        match fetched {
            Ok(Ok(Some(profile))) => {
                let state = StepDataMapper::profile_to_state(&profile);
                return (state, Some(profile), HydrationOutcome::Remote);
            }
            Ok(Ok(None)) => {
                tracing::debug!("[ActivationState] Remote has no profile yet; trying cache");
            }
            Ok(Err(e)) => {
                tracing::warn!("[ActivationState] Remote profile unavailable ({}); trying cache", e);
            }
            Err(_) => {
                tracing::error!("[ActivationState] Profile fetch panicked; starting empty");
                return (WizardState::new(), None, HydrationOutcome::Empty);
            }
        }

        let loaded = std::panic::catch_unwind(AssertUnwindSafe(|| {
            self.cache.load(Some(user.id.as_str()))
        }));
        match loaded {
            Ok(Ok(CacheLoad::Restored(state))) => (state, None, HydrationOutcome::Cache),
            Ok(Ok(CacheLoad::Absent)) => (WizardState::new(), None, HydrationOutcome::Empty),
            Ok(Ok(CacheLoad::Discarded(reason))) => {
                tracing::info!("[ActivationState] Cached progress discarded: {}", reason);
                (WizardState::new(), None, HydrationOutcome::Empty)
            }
            Ok(Err(e)) => {
                tracing::error!("[ActivationState] Cache read failed: {}", e);
                (WizardState::new(), None, HydrationOutcome::Empty)
            }
            Err(_) => {
                tracing::error!("[ActivationState] Cache read panicked; starting empty");
                (WizardState::new(), None, HydrationOutcome::Empty)
            }
        }
    }

    // ============================================================================
    // Writes
    // ============================================================================

    /// Saves one step.
    ///
    /// Memory and the local cache are updated before returning. The remote
    /// update and any document uploads are queued in the background and
    /// never fail this call.
    ///
    /// # Errors
    ///
    /// Returns an error only when `payload` does not belong to `step`; the
    /// state is left untouched in that case.
    pub fn update_step_data(
        &self,
        step: WizardStep,
        payload: StepPayload,
    ) -> Result<StepWriteReport> {
        payload.validate_for(step)?;
        let StepPayload { data, attachments } = payload;

        let upload_jobs = if attachments.is_empty() {
            Vec::new()
        } else {
            let jobs = self.uploads.dispatch(&attachments);
            let mut inner = self.write();
            inner.attachments.extend(attachments);
            jobs
        };

        let (snapshot, user_id) = {
            let mut inner = self.write();
            inner.wizard.insert(data.clone());
            (inner.wizard.clone(), inner.user_id())
        };
        tracing::debug!("[ActivationState] Step {} saved in memory", step);

        let (cache, error) = self.persist(&snapshot, user_id.as_deref());
        let propagation_job = self.propagate(&data);

        Ok(StepWriteReport {
            step,
            cache,
            error,
            propagation_job,
            upload_jobs,
        })
    }

    /// Moves the wizard to `step` and re-writes the cache. The remote tracks
    /// its own step, so nothing is propagated.
    pub fn set_current_step(&self, step: WizardStep) -> StepWriteReport {
        let (snapshot, user_id) = {
            let mut inner = self.write();
            inner.wizard.current_step = step;
            (inner.wizard.clone(), inner.user_id())
        };
        let (cache, error) = self.persist(&snapshot, user_id.as_deref());

        StepWriteReport {
            step,
            cache,
            error,
            propagation_job: None,
            upload_jobs: Vec::new(),
        }
    }

    /// Writes the full state to the cache, raising the error state on failure.
    fn persist(
        &self,
        snapshot: &WizardState,
        user_id: Option<&str>,
    ) -> (Option<CacheWrite>, Option<ErrorState>) {
        match self.cache.save(snapshot, user_id) {
            Ok(write) => {
                if write == CacheWrite::WrittenAfterEviction {
                    tracing::info!("[ActivationState] Cache rewritten after evicting old entry");
                }
                (Some(write), None)
            }
            Err(e) => {
                tracing::error!("[ActivationState] Failed to cache progress: {}", e);
                let error = ErrorState::from_error(&e);
                self.write().error = Some(error.clone());
                (None, Some(error))
            }
        }
    }

    /// Queues the remote update for one step.
    fn propagate(&self, data: &StepData) -> Option<Uuid> {
        let update = match StepDataMapper::step_to_update(data) {
            Ok(update) => update,
            Err(e) => {
                tracing::error!(
                    "[ActivationState] Cannot build remote update for step {}: {}",
                    data.step(),
                    e
                );
                return None;
            }
        };

        let gateway = self.gateway.clone();
        let inner = self.inner.clone();
        let generation = self.generation.clone();
        let issued_at = generation.load(Ordering::SeqCst);
        let owner = self.read().user_id();
        let label = format!("step {}", update.step);

        Some(self.queue.spawn(JobKind::StepUpdate, label, async move {
            gateway.submit_step(update).await?;

            // Refresh the read-only snapshot unless the session moved on
            match gateway.fetch_profile().await {
                Ok(profile) => {
                    let mut inner = inner.write().unwrap_or_else(PoisonError::into_inner);
                    if generation.load(Ordering::SeqCst) == issued_at && inner.user_id() == owner {
                        inner.remote_snapshot = profile;
                    }
                }
                Err(e) => {
                    tracing::debug!("[ActivationState] Snapshot refresh skipped: {}", e);
                }
            }
            Ok(())
        }))
    }

    /// Resets to an empty wizard on the first step and deletes the cache.
    /// The remote is not touched.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache entry could not be deleted; memory is
    /// reset regardless.
    pub fn clear_data(&self) -> Result<()> {
        self.generation.fetch_add(1, Ordering::SeqCst);
        {
            let mut inner = self.write();
            inner.wizard.reset();
            inner.attachments.clear();
            inner.error = None;
        }
        self.uploads.clear_ledger();
        tracing::info!("[ActivationState] Progress cleared");
        self.cache.clear()
    }

    // ============================================================================
    // Reads
    // ============================================================================

    pub fn get_step_data(&self, step: WizardStep) -> Option<StepData> {
        self.read().wizard.get(step).cloned()
    }

    pub fn current_step(&self) -> WizardStep {
        self.read().wizard.current_step
    }

    /// A snapshot of the whole wizard state.
    pub fn state(&self) -> WizardState {
        self.read().wizard.clone()
    }

    /// Saved steps that pass their presence rule, in wizard order.
    pub fn completed_steps(&self) -> Vec<WizardStep> {
        self.read()
            .wizard
            .steps
            .values()
            .filter(|data| data.is_populated())
            .map(StepData::step)
            .collect()
    }

    pub fn current_user(&self) -> Option<UserIdentity> {
        self.read().user.clone()
    }

    pub fn error_state(&self) -> Option<ErrorState> {
        self.read().error.clone()
    }

    pub fn dismiss_error(&self) {
        self.write().error = None;
    }

    /// The last profile read from the remote, if any.
    pub fn remote_snapshot(&self) -> Option<RemoteProfile> {
        self.read().remote_snapshot.clone()
    }

    pub fn activation_status(&self) -> Option<String> {
        self.read()
            .remote_snapshot
            .as_ref()
            .and_then(|p| p.activation_status.clone())
    }

    /// The file bound to `field` during this session. Always `None` after a
    /// reload.
    pub fn session_attachment(&self, field: DocumentField) -> Option<LocalFile> {
        self.read().attachments.get(&field).cloned()
    }

    /// Document types the service accepted during this session.
    pub fn uploaded_documents(&self) -> Vec<DocumentType> {
        self.uploads.uploaded_documents()
    }

    // ============================================================================
    // Background work
    // ============================================================================

    /// Waits for every queued remote update and upload to finish.
    pub async fn wait_for_propagation(&self) {
        self.queue.wait_idle().await;
    }

    pub fn propagation_stats(&self) -> PropagationStats {
        self.queue.stats()
    }
}
