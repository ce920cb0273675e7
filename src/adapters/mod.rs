//! Adapter interfaces for the generative provider.
//!
//! The orchestrator only sees these traits. Wire formats belong to the
//! implementations (`gemini` for the hosted API, `credentials` for key
//! discovery).

pub mod credentials;
pub mod gemini;

use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use crate::domain::ReferenceImage;

pub use credentials::EnvCredentialGate;
pub use gemini::GeminiClient;

/// Typed provider failure codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    /// The referenced entity is gone; usually a stale or revoked credential
    EntityNotFound,

    /// Credential missing or rejected
    Unauthorized,

    /// Any other non-success API status
    Api { status: u16 },

    /// Network-level failure
    Transport,

    /// Response body did not match the expected shape
    Decode,
}

/// Error returned by any provider call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ProviderError {
    pub kind: ProviderErrorKind,

    /// Provider message, verbatim when one was returned
    pub message: String,
}

impl ProviderError {
    pub fn new(kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Whether the failure calls for re-selecting a credential
    pub fn is_stale_credential(&self) -> bool {
        self.kind == ProviderErrorKind::EntityNotFound
    }
}

/// An API key; never printed
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential(***)")
    }
}

/// Submission payload for a video job
#[derive(Debug, Clone)]
pub struct JobRequest {
    pub prompt: String,
    pub reference_image: Option<ReferenceImage>,
}

/// Reference to a finished artifact on the provider side
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactDescriptor {
    pub uri: String,
    pub mime_type: Option<String>,
}

/// Provider-side job state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobHandle {
    /// Operation name used for polling
    pub name: String,

    pub done: bool,

    /// Result references, present once done
    pub results: Vec<ArtifactDescriptor>,

    /// Failure reported by the operation itself
    pub failure: Option<ProviderError>,
}

impl JobHandle {
    /// A freshly submitted, unfinished job
    pub fn pending(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            done: false,
            results: Vec::new(),
            failure: None,
        }
    }
}

/// "Is a usable credential selected?" plus the external selection flow
#[async_trait]
pub trait CredentialGate: Send + Sync {
    /// Check whether a credential is currently selected
    async fn has_credential(&self) -> Result<bool, ProviderError>;

    /// Run the external selection flow; resolves once a credential is
    /// selected or fails if the flow raises
    async fn select_credential(&self) -> Result<(), ProviderError>;

    /// The active credential
    async fn credential(&self) -> Result<Credential, ProviderError>;
}

/// Long-running video generation
#[async_trait]
pub trait VideoProvider: Send + Sync {
    /// Human-readable provider name
    fn name(&self) -> &str;

    /// Submit a job
    async fn create_job(
        &self,
        request: &JobRequest,
        credential: &Credential,
    ) -> Result<JobHandle, ProviderError>;

    /// Refresh a job handle; safe to repeat
    async fn poll_job(
        &self,
        handle: &JobHandle,
        credential: &Credential,
    ) -> Result<JobHandle, ProviderError>;

    /// Download a finished artifact
    async fn fetch_artifact(
        &self,
        descriptor: &ArtifactDescriptor,
        credential: &Credential,
    ) -> Result<Bytes, ProviderError>;
}

/// One-shot text and image generation used for descriptions and posters
#[async_trait]
pub trait StudioProvider: Send + Sync {
    /// Generate a short text
    async fn write_text(&self, prompt: &str, credential: &Credential)
        -> Result<String, ProviderError>;

    /// Generate an image; `None` when the reply carried no image
    async fn render_image(
        &self,
        prompt: &str,
        credential: &Credential,
    ) -> Result<Option<Vec<u8>>, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_debug_is_redacted() {
        let credential = Credential::new("AIza-secret");
        assert_eq!(format!("{:?}", credential), "Credential(***)");
    }

    #[test]
    fn test_stale_credential_is_typed() {
        let stale = ProviderError::new(ProviderErrorKind::EntityNotFound, "anything");
        let other = ProviderError::new(
            ProviderErrorKind::Api { status: 500 },
            "Requested entity was not found.",
        );
        assert!(stale.is_stale_credential());
        assert!(!other.is_stale_credential());
    }
}
