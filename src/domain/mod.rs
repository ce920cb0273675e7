//! Domain types for the slot registry.
//!
//! This module contains the core data structures:
//! - Asset: The media artifact occupying a slot
//! - Category: The fixed set of slots
//! - Events: Registry journal entries
//! - Job: Transient generation job state

pub mod asset;
pub mod category;
pub mod events;
pub mod job;

// Re-export commonly used types
pub use asset::{Asset, AssetId};
pub use category::{Category, Exposure};
pub use events::{SlotEvent, SlotEventType};
pub use job::{GenerationRequest, JobSnapshot, JobState, ReferenceImage};
