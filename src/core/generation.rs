//! Generation job orchestrator.
//!
//! Drives one job against the video provider as a state machine:
//!
//! ```text
//! Idle -> CredentialCheck -> Submitting -> Polling -> Downloading -> Completed
//!              \______________\_____________\___________\__________-> Failed
//! ```
//!
//! Every suspension point races the caller's [`CancellationToken`]; polling is
//! bounded by [`GenerationLimits`]. At most one job runs at a time. The
//! orchestrator never writes to the registry: a completed job only yields a
//! local locator that the caller may hand to the commit pipeline.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::adapters::{CredentialGate, JobRequest, ProviderError, VideoProvider};
use crate::domain::{GenerationRequest, JobSnapshot, JobState};

use super::blob_store::BlobStore;
use super::limits::{GenerationLimits, LimitViolation, PollTracker};

pub const STATUS_CHECKING_KEY: &str = "Checking API key...";
pub const STATUS_SELECTING_KEY: &str = "Waiting for API key selection...";
pub const STATUS_SUBMITTING: &str = "Submitting job request...";
pub const STATUS_GENERATING: &str = "Generating video... (about 1-2 minutes)";
pub const STATUS_RENDERING: &str = "Rendering video...";
pub const STATUS_DOWNLOADING: &str = "Downloading video...";
pub const STATUS_DONE: &str = "done";

/// Errors that end (or prevent) a generation job
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("A generation job is already running")]
    Busy,

    #[error("Reference image requested but none is staged")]
    MissingReference,

    #[error("Credential error: {0}")]
    Credential(ProviderError),

    #[error("Provider error: {0}")]
    Provider(ProviderError),

    #[error("Provider reported success without a result")]
    EmptyResult,

    #[error("Download failed: {0}")]
    Download(ProviderError),

    #[error("Generation timed out: {0}")]
    Timeout(LimitViolation),

    #[error("Generation cancelled")]
    Cancelled,

    #[error("Storage error: {0}")]
    Storage(String),
}

impl GenerationError {
    /// Underlying provider error, if any
    pub fn provider_error(&self) -> Option<&ProviderError> {
        match self {
            GenerationError::Credential(e)
            | GenerationError::Provider(e)
            | GenerationError::Download(e) => Some(e),
            _ => None,
        }
    }

    /// Whether credential re-selection should be offered
    pub fn is_stale_credential(&self) -> bool {
        self.provider_error()
            .map(ProviderError::is_stale_credential)
            .unwrap_or(false)
    }

    /// Final status text shown to the user
    pub fn status_message(&self) -> String {
        match self {
            GenerationError::Credential(_) => {
                "API key selection failed. Select a key and try again.".to_string()
            }
            GenerationError::Provider(e) if e.message.trim().is_empty() => {
                "Error: unknown error".to_string()
            }
            GenerationError::Provider(e) => format!("Error: {}", e.message),
            other => format!("Error: {}", other),
        }
    }
}

/// Holds the single-flight flag; releases it and marks an abandoned job on drop
struct ActiveGuard<'a> {
    flag: &'a AtomicBool,
    status: &'a watch::Sender<JobSnapshot>,
}

impl<'a> ActiveGuard<'a> {
    fn acquire(flag: &'a AtomicBool, status: &'a watch::Sender<JobSnapshot>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag, status })
    }
}

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        // A job future dropped mid-flight never reached a terminal state
        self.status.send_if_modified(|snapshot| {
            if !snapshot.is_active() {
                return false;
            }
            snapshot.state = JobState::Failed;
            snapshot.error = Some(GenerationError::Cancelled.to_string());
            snapshot.status_message = GenerationError::Cancelled.status_message();
            snapshot.updated_at = Utc::now();
            true
        });
        self.flag.store(false, Ordering::Release);
    }
}

/// Drives generation jobs against a video provider
pub struct GenerationOrchestrator {
    provider: Arc<dyn VideoProvider>,
    credentials: Arc<dyn CredentialGate>,
    blobs: BlobStore,
    limits: GenerationLimits,
    active: AtomicBool,
    status: watch::Sender<JobSnapshot>,
}

impl GenerationOrchestrator {
    pub fn new(
        provider: Arc<dyn VideoProvider>,
        credentials: Arc<dyn CredentialGate>,
        blobs: BlobStore,
        limits: GenerationLimits,
    ) -> Self {
        let (status, _) = watch::channel(JobSnapshot::idle());
        Self {
            provider,
            credentials,
            blobs,
            limits,
            active: AtomicBool::new(false),
            status,
        }
    }

    /// Current (or last) job state
    pub fn snapshot(&self) -> JobSnapshot {
        self.status.borrow().clone()
    }

    /// Observe every state and status message change
    pub fn subscribe(&self) -> watch::Receiver<JobSnapshot> {
        self.status.subscribe()
    }

    /// Whether a job is in flight
    pub fn is_busy(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Run a generation job to a terminal state.
    ///
    /// Input problems (`Validation`, `MissingReference`) and `Busy` are
    /// rejected before any state change. Every other failure moves the job
    /// to `Failed` and is returned. On success the returned snapshot is in
    /// `Completed` and carries the local result locator.
    #[instrument(skip_all, fields(job_id = tracing::field::Empty))]
    pub async fn start(
        &self,
        request: GenerationRequest,
        cancel: CancellationToken,
    ) -> Result<JobSnapshot, GenerationError> {
        let prompt = request.prompt.trim();
        if prompt.is_empty() {
            return Err(GenerationError::Validation(
                "a prompt is required to generate a video".to_string(),
            ));
        }
        if request.use_reference && request.reference_image.is_none() {
            return Err(GenerationError::MissingReference);
        }
        if let Some(image) = request.reference() {
            self.limits
                .validate_reference(&image.bytes)
                .map_err(|v| GenerationError::Validation(v.to_string()))?;
        }

        let _guard =
            ActiveGuard::acquire(&self.active, &self.status).ok_or(GenerationError::Busy)?;

        let job_id = Uuid::new_v4();
        tracing::Span::current().record("job_id", tracing::field::display(job_id));
        info!(with_reference = request.reference().is_some(), "Starting generation job");

        let mut job = JobSnapshot {
            job_id,
            ..JobSnapshot::idle()
        };
        let job_request = JobRequest {
            prompt: prompt.to_string(),
            reference_image: request.reference().cloned(),
        };

        match self.drive(&mut job, &job_request, &cancel).await {
            Ok(locator) => {
                job.result_locator = Some(locator);
                self.transition(&mut job, JobState::Completed, STATUS_DONE);
                info!(locator = ?job.result_locator, polls = job.polls, "Generation completed");
                Ok(job)
            }
            Err(err) => {
                self.fail(&mut job, &err).await;
                Err(err)
            }
        }
    }

    /// Execute the non-terminal phases; returns the stored artifact locator
    async fn drive(
        &self,
        job: &mut JobSnapshot,
        request: &JobRequest,
        cancel: &CancellationToken,
    ) -> Result<String, GenerationError> {
        self.transition(job, JobState::CredentialCheck, STATUS_CHECKING_KEY);
        let has_credential = guarded(cancel, self.credentials.has_credential())
            .await?
            .map_err(GenerationError::Credential)?;
        if !has_credential {
            self.set_message(job, STATUS_SELECTING_KEY);
            guarded(cancel, self.credentials.select_credential())
                .await?
                .map_err(GenerationError::Credential)?;
        }
        let credential = guarded(cancel, self.credentials.credential())
            .await?
            .map_err(GenerationError::Credential)?;

        self.transition(job, JobState::Submitting, STATUS_SUBMITTING);
        let mut handle = guarded(cancel, self.provider.create_job(request, &credential))
            .await?
            .map_err(GenerationError::Provider)?;
        info!(operation = %handle.name, provider = self.provider.name(), "Job submitted");

        self.transition(job, JobState::Polling, STATUS_GENERATING);
        let mut tracker = PollTracker::new();
        while !handle.done {
            guarded(cancel, tokio::time::sleep(self.limits.poll_interval())).await?;
            self.limits.check(&tracker).map_err(|violation| {
                warn!(%violation, polls = tracker.polls, "Polling bound reached");
                GenerationError::Timeout(violation)
            })?;

            handle = guarded(cancel, self.provider.poll_job(&handle, &credential))
                .await?
                .map_err(GenerationError::Provider)?;
            tracker.record_poll();
            job.polls = tracker.polls;
            debug!(poll = tracker.polls, done = handle.done, "Polled job");
            self.set_message(job, STATUS_RENDERING);
        }

        if let Some(failure) = handle.failure.take() {
            return Err(GenerationError::Provider(failure));
        }
        let descriptor = handle
            .results
            .first()
            .cloned()
            .ok_or(GenerationError::EmptyResult)?;

        self.transition(job, JobState::Downloading, STATUS_DOWNLOADING);
        let bytes = guarded(cancel, self.provider.fetch_artifact(&descriptor, &credential))
            .await?
            .map_err(GenerationError::Download)?;
        if bytes.is_empty() {
            return Err(GenerationError::Download(ProviderError::new(
                crate::adapters::ProviderErrorKind::Decode,
                "artifact body was empty",
            )));
        }

        let extension = descriptor
            .mime_type
            .as_deref()
            .map(extension_for_mime)
            .unwrap_or("mp4");
        let locator = guarded(cancel, self.blobs.put(&bytes, extension))
            .await?
            .map_err(|e| GenerationError::Storage(format!("{:#}", e)))?;

        Ok(locator)
    }

    /// Land in Failed and, for stale credentials, offer re-selection
    async fn fail(&self, job: &mut JobSnapshot, err: &GenerationError) {
        error!(error = %err, state = ?job.state, "Generation failed");
        job.error = Some(err.to_string());
        job.result_locator = None;
        self.transition(job, JobState::Failed, &err.status_message());

        if err.is_stale_credential() {
            warn!("Session expired or key is invalid; offering key re-selection");
            // Recovery offer only; the job is not resubmitted
            match self.credentials.select_credential().await {
                Ok(()) => info!("Credential re-selected"),
                Err(e) => warn!(error = %e, "Credential re-selection failed"),
            }
        }
    }

    fn transition(&self, job: &mut JobSnapshot, state: JobState, message: &str) {
        debug!(from = ?job.state, to = ?state, "Job transition");
        job.state = state;
        self.set_message(job, message);
    }

    fn set_message(&self, job: &mut JobSnapshot, message: &str) {
        job.status_message = message.to_string();
        job.updated_at = Utc::now();
        self.status.send_replace(job.clone());
    }
}

/// Await `fut` unless the token fires first
async fn guarded<T>(
    cancel: &CancellationToken,
    fut: impl Future<Output = T>,
) -> Result<T, GenerationError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(GenerationError::Cancelled),
        out = fut => Ok(out),
    }
}

fn extension_for_mime(mime: &str) -> &'static str {
    match mime {
        "video/webm" => "webm",
        "video/quicktime" => "mov",
        _ => "mp4",
    }
}
