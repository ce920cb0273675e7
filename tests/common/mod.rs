//! Shared fixtures: a scripted video provider and credential gate.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tempfile::TempDir;

use vidslot::adapters::{
    ArtifactDescriptor, Credential, CredentialGate, JobHandle, JobRequest, ProviderError,
    ProviderErrorKind, VideoProvider,
};
use vidslot::core::{BlobStore, GenerationLimits, GenerationOrchestrator};

pub const VIDEO_BYTES: &[u8] = b"\x00\x00\x00\x18ftypmp42";

/// What the scripted provider does at each step
#[derive(Debug, Clone)]
pub struct Script {
    /// Outcome of `create_job`
    pub submit: Result<(), ProviderError>,

    /// Delay before `create_job` answers
    pub submit_delay: Duration,

    /// Polls that report "not done" before the job finishes; `None` never finishes
    pub polls_until_done: Option<u32>,

    /// Error returned by the given poll (1-based)
    pub poll_error: Option<(u32, ProviderError)>,

    /// Operation-level failure reported when done
    pub failure: Option<ProviderError>,

    /// Artifacts reported when done
    pub results: Vec<ArtifactDescriptor>,

    /// Outcome of `fetch_artifact`
    pub download: Result<Bytes, ProviderError>,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            submit: Ok(()),
            submit_delay: Duration::ZERO,
            polls_until_done: Some(2),
            poll_error: None,
            failure: None,
            results: vec![ArtifactDescriptor {
                uri: "https://provider.test/files/abc:download".to_string(),
                mime_type: Some("video/mp4".to_string()),
            }],
            download: Ok(Bytes::from_static(VIDEO_BYTES)),
        }
    }
}

/// Provider that follows a [`Script`] and records what it was asked
#[derive(Default)]
pub struct ScriptedProvider {
    script: Script,
    pub submits: AtomicU32,
    pub polls: AtomicU32,
    pub downloads: AtomicU32,
    pub last_request: Mutex<Option<JobRequest>>,
}

impl ScriptedProvider {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            ..Default::default()
        }
    }

    pub fn submits(&self) -> u32 {
        self.submits.load(Ordering::SeqCst)
    }

    pub fn polls(&self) -> u32 {
        self.polls.load(Ordering::SeqCst)
    }

    pub fn downloads(&self) -> u32 {
        self.downloads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VideoProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn create_job(
        &self,
        request: &JobRequest,
        _credential: &Credential,
    ) -> Result<JobHandle, ProviderError> {
        self.submits.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request.clone());
        if !self.script.submit_delay.is_zero() {
            tokio::time::sleep(self.script.submit_delay).await;
        }

        self.script.submit.clone()?;
        Ok(JobHandle::pending("operations/scripted-1"))
    }

    async fn poll_job(
        &self,
        handle: &JobHandle,
        _credential: &Credential,
    ) -> Result<JobHandle, ProviderError> {
        let poll = self.polls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((at, ref err)) = self.script.poll_error {
            if poll == at {
                return Err(err.clone());
            }
        }

        let mut next = handle.clone();
        if self.script.polls_until_done.map_or(false, |n| poll >= n) {
            next.done = true;
            next.results = self.script.results.clone();
            next.failure = self.script.failure.clone();
        }
        Ok(next)
    }

    async fn fetch_artifact(
        &self,
        _descriptor: &ArtifactDescriptor,
        _credential: &Credential,
    ) -> Result<Bytes, ProviderError> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        self.script.download.clone()
    }
}

/// Credential gate with a switchable "selected" flag
pub struct ScriptedGate {
    selected: AtomicBool,
    selection: Result<(), ProviderError>,
    pub selections: AtomicU32,
}

impl ScriptedGate {
    /// A key is already selected
    pub fn ready() -> Self {
        Self {
            selected: AtomicBool::new(true),
            selection: Ok(()),
            selections: AtomicU32::new(0),
        }
    }

    /// No key yet; the selection flow succeeds
    pub fn unselected() -> Self {
        Self {
            selected: AtomicBool::new(false),
            ..Self::ready()
        }
    }

    /// No key and the selection flow raises
    pub fn broken() -> Self {
        Self {
            selected: AtomicBool::new(false),
            selection: Err(ProviderError::new(
                ProviderErrorKind::Unauthorized,
                "selection dialog dismissed",
            )),
            selections: AtomicU32::new(0),
        }
    }

    pub fn selections(&self) -> u32 {
        self.selections.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialGate for ScriptedGate {
    async fn has_credential(&self) -> Result<bool, ProviderError> {
        Ok(self.selected.load(Ordering::SeqCst))
    }

    async fn select_credential(&self) -> Result<(), ProviderError> {
        self.selections.fetch_add(1, Ordering::SeqCst);
        self.selection.clone()?;
        self.selected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn credential(&self) -> Result<Credential, ProviderError> {
        if self.selected.load(Ordering::SeqCst) {
            Ok(Credential::new("test-key"))
        } else {
            Err(ProviderError::new(ProviderErrorKind::Unauthorized, "no key"))
        }
    }
}

/// Orchestrator wired to scripted collaborators and a temp blob store
pub struct Harness {
    pub orchestrator: GenerationOrchestrator,
    pub provider: Arc<ScriptedProvider>,
    pub gate: Arc<ScriptedGate>,
    pub blobs: BlobStore,
    _temp: TempDir,
}

impl Harness {
    pub async fn new(script: Script, gate: ScriptedGate) -> Self {
        Self::with_limits(script, gate, GenerationLimits::default()).await
    }

    pub async fn with_limits(script: Script, gate: ScriptedGate, limits: GenerationLimits) -> Self {
        let temp = TempDir::new().unwrap();
        let blobs = BlobStore::open(temp.path().join("blobs")).await.unwrap();
        let provider = Arc::new(ScriptedProvider::new(script));
        let gate = Arc::new(gate);

        let orchestrator =
            GenerationOrchestrator::new(provider.clone(), gate.clone(), blobs.clone(), limits);

        Self {
            orchestrator,
            provider,
            gate,
            blobs,
            _temp: temp,
        }
    }
}

pub fn stale_key_error() -> ProviderError {
    ProviderError::new(
        ProviderErrorKind::EntityNotFound,
        "Requested entity was not found.",
    )
}
