//! Core slot management logic.
//!
//! This module contains:
//! - SlotRegistry: Lock-guarded table of current assets plus its journal
//! - UploadCommitPipeline: Versioned commits into the registry
//! - GenerationOrchestrator: Provider job state machine
//! - EngagementCounter: Play counts and the analytics report
//! - GenerationLimits: Polling bounds
//! - BlobStore: Content-addressed media staging
//! - Studio: Description, poster and prompt helpers

pub mod blob_store;
pub mod commit;
pub mod engagement;
pub mod generation;
pub mod limits;
pub mod registry;
pub mod studio;

// Re-export commonly used types
pub use blob_store::{BlobStore, MediaKind};
pub use commit::{confirmation, CommitError, CommitReceipt, CommitRequest, UploadCommitPipeline};
pub use engagement::{EngagementCounter, EngagementRow};
pub use generation::{GenerationError, GenerationOrchestrator};
pub use limits::{GenerationLimits, LimitViolation, PollTracker};
pub use registry::{SlotRegistry, SlotTable, VersionPolicy};
pub use studio::{default_poster_prompt, random_prompt, PromptLibrary, Studio};
