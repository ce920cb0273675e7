//! vidslot - Versioned media slots with a generative video pipeline
//!
//! Keeps one current video asset per presentation slot (brand film, service
//! demo, vision film), commits new versions into those slots, drives
//! long-running video generation jobs against a hosted provider, and counts
//! plays.
//!
//! # Architecture
//!
//! - The registry is an in-memory table behind one async lock; every
//!   read-modify-write (commit, delete, play) is a single transaction
//! - Commits derive id, version and play count from the slot's history
//! - Generation is a cancellable, bounded state machine that never writes to
//!   the registry; its output is committed like any other upload
//!
//! # Modules
//!
//! - `adapters`: Provider traits plus the Gemini client and credential gate
//! - `core`: Registry, commit pipeline, orchestrator, engagement, blobs
//! - `domain`: Data structures (Asset, Category, SlotEvent, JobSnapshot)
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Upload a local video into the brand slot
//! vidslot upload brand ./flow.mp4 --poster ./banner.png
//!
//! # Generate a video and install it as the vision film
//! vidslot generate "a drone shot of a futuristic campus" --commit vision
//!
//! # Several commands against one registry
//! vidslot shell
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;

// Re-export main types at crate root for convenience
pub use crate::core::{
    GenerationError, GenerationOrchestrator, SlotRegistry, UploadCommitPipeline, VersionPolicy,
};
pub use domain::{Asset, AssetId, Category, JobSnapshot, JobState, SlotEvent};
