//! Transient generation job state.
//!
//! A job is one run of the external generation workflow. It is never
//! persisted; observers read [`JobSnapshot`]s published by the orchestrator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Phase of a generation job
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    #[default]
    Idle,
    CredentialCheck,
    Submitting,
    Polling,
    Downloading,
    Completed,
    Failed,
}

impl JobState {
    /// Completed and Failed end a job
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }

    /// Position in the forward order of phases
    pub fn rank(self) -> u8 {
        match self {
            JobState::Idle => 0,
            JobState::CredentialCheck => 1,
            JobState::Submitting => 2,
            JobState::Polling => 3,
            JobState::Downloading => 4,
            JobState::Completed | JobState::Failed => 5,
        }
    }
}

/// Still image used to condition a generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl ReferenceImage {
    pub fn png(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            mime_type: "image/png".to_string(),
        }
    }

    /// Guess the mime type from a file extension, defaulting to PNG
    pub fn from_extension(bytes: Vec<u8>, extension: &str) -> Self {
        let mime_type = match extension.to_lowercase().as_str() {
            "jpg" | "jpeg" => "image/jpeg",
            "webp" => "image/webp",
            _ => "image/png",
        };
        Self {
            bytes,
            mime_type: mime_type.to_string(),
        }
    }
}

/// Caller input to a generation job
#[derive(Debug, Clone, Default)]
pub struct GenerationRequest {
    /// Required, non-empty
    pub prompt: String,

    /// "Use current poster as reference" toggle
    pub use_reference: bool,

    /// Staged reference artifact, if any
    pub reference_image: Option<ReferenceImage>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            use_reference: false,
            reference_image: None,
        }
    }

    /// Enable the reference toggle with whatever artifact is staged
    pub fn with_reference(mut self, reference_image: Option<ReferenceImage>) -> Self {
        self.use_reference = true;
        self.reference_image = reference_image;
        self
    }

    /// The reference image to submit, present only when the toggle is on
    pub fn reference(&self) -> Option<&ReferenceImage> {
        if self.use_reference {
            self.reference_image.as_ref()
        } else {
            None
        }
    }
}

/// Observable view of the current (or last) job
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobSnapshot {
    /// Job identifier (nil while idle)
    pub job_id: Uuid,

    pub state: JobState,

    /// Human-readable progress text
    pub status_message: String,

    /// Local locator of the downloaded artifact, set only in Completed
    pub result_locator: Option<String>,

    /// Final error text, set only in Failed
    pub error: Option<String>,

    /// Number of poll queries issued so far
    pub polls: u32,

    pub updated_at: DateTime<Utc>,
}

impl JobSnapshot {
    pub fn idle() -> Self {
        Self {
            job_id: Uuid::nil(),
            state: JobState::Idle,
            status_message: String::new(),
            result_locator: None,
            error: None,
            polls: 0,
            updated_at: Utc::now(),
        }
    }

    pub fn is_active(&self) -> bool {
        !matches!(self.state, JobState::Idle) && !self.state.is_terminal()
    }
}

impl Default for JobSnapshot {
    fn default() -> Self {
        Self::idle()
    }
}
