//! Media assets held by the slot registry.
//!
//! An asset is immutable until it is replaced by a newer commit to the same
//! category; only its play count changes in place.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::category::Category;

/// Stable asset identifier, shared by every version of one slot lineage
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(String);

impl AssetId {
    /// Mint an id for a brand-new slot lineage
    pub fn fresh() -> Self {
        Self(format!("v-{}", Uuid::new_v4().simple()))
    }

    /// Get the raw string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AssetId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for AssetId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for AssetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One media artifact occupying a slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    /// Lineage identifier
    pub id: AssetId,

    /// Slot this asset occupies
    pub category: Category,

    /// Display title ("{label} Video v{version}")
    pub title: String,

    /// Opaque reference to the media content (blob locator or URL)
    pub locator: String,

    /// Opaque reference to a still preview
    #[serde(default)]
    pub poster_locator: Option<String>,

    /// Lineage version, starts at 1
    pub version: u32,

    /// Time of the last commit
    pub updated_at: DateTime<Utc>,

    #[serde(default)]
    pub description: Option<String>,

    /// Cumulative playback starts
    #[serde(default)]
    pub play_count: u64,
}

impl Asset {
    /// Create a first-version asset for a category
    pub fn new(category: Category, locator: impl Into<String>) -> Self {
        Self {
            id: AssetId::fresh(),
            category,
            title: Self::title_for(category, 1),
            locator: locator.into(),
            poster_locator: None,
            version: 1,
            updated_at: Utc::now(),
            description: None,
            play_count: 0,
        }
    }

    /// Title convention for a committed version
    pub fn title_for(category: Category, version: u32) -> String {
        format!("{} Video v{}", category.label(), version)
    }

    pub fn with_poster(mut self, poster_locator: impl Into<String>) -> Self {
        self.poster_locator = Some(poster_locator.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}
