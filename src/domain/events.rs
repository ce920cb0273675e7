//! Registry mutation events.
//!
//! Every mutation of the slot registry is recorded as an immutable event in
//! an in-memory append-only journal and published to subscribers. The journal
//! is what lineage queries replay.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::asset::AssetId;
use super::category::Category;

/// A single entry in the registry journal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotEvent {
    /// Unique identifier for this event
    pub id: Uuid,

    /// When this event occurred
    pub timestamp: DateTime<Utc>,

    /// Slot affected
    pub category: Category,

    /// Asset affected
    pub asset_id: AssetId,

    pub event_type: SlotEventType,

    /// Asset version at the time of the event
    pub version: u32,

    /// Human-readable summary
    pub summary: String,
}

impl SlotEvent {
    /// Create a new event with the current timestamp
    pub fn new(
        category: Category,
        asset_id: AssetId,
        event_type: SlotEventType,
        version: u32,
        summary: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            category,
            asset_id,
            event_type,
            version,
            summary,
        }
    }
}

/// Kinds of registry mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotEventType {
    /// A new asset became current for its category
    Committed,

    /// An asset was deleted from the registry
    Removed,

    /// A playback start was counted
    Played,
}
