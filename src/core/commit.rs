//! Upload commit pipeline.
//!
//! Installs a staged artifact (a local upload or a generated video) as the
//! current asset of a category. The whole derivation of id, version and play
//! count runs inside one registry transaction.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, instrument};

use crate::domain::{Asset, AssetId, Category};

use super::registry::SlotRegistry;

/// Errors raised by a commit
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommitError {
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Input to a commit
#[derive(Debug, Clone)]
pub struct CommitRequest {
    pub category: Category,

    /// Staged media locator
    pub locator: Option<String>,

    /// Staged poster; the existing poster is kept when absent
    pub poster_locator: Option<String>,

    /// Description; the existing description is kept when absent
    pub description: Option<String>,
}

impl CommitRequest {
    pub fn new(category: Category, locator: impl Into<String>) -> Self {
        Self {
            category,
            locator: Some(locator.into()),
            poster_locator: None,
            description: None,
        }
    }

    /// A request with nothing staged yet
    pub fn empty(category: Category) -> Self {
        Self {
            category,
            locator: None,
            poster_locator: None,
            description: None,
        }
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

/// Confirmation text shown after a successful commit
pub fn confirmation(asset: &Asset) -> String {
    format!("Uploaded successfully: {} (v{})", asset.category, asset.version)
}

/// What the caller is told once a commit lands
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitReceipt {
    pub category: Category,
    pub version: u32,
    pub message: String,
}

impl From<&Asset> for CommitReceipt {
    fn from(asset: &Asset) -> Self {
        Self {
            category: asset.category,
            version: asset.version,
            message: confirmation(asset),
        }
    }
}

/// Validates staged artifacts and commits them into the registry
pub struct UploadCommitPipeline {
    registry: Arc<SlotRegistry>,
}

impl UploadCommitPipeline {
    pub fn new(registry: Arc<SlotRegistry>) -> Self {
        Self { registry }
    }

    /// Commit a staged artifact as the category's current asset
    #[instrument(skip(self, request), fields(category = %request.category))]
    pub async fn commit(&self, request: CommitRequest) -> Result<Asset, CommitError> {
        let locator = non_blank(request.locator)
            .ok_or_else(|| CommitError::Validation("nothing staged to upload".to_string()))?;
        let poster_locator = non_blank(request.poster_locator);
        let description = non_blank(request.description);
        let category = request.category;

        let asset = self
            .registry
            .transact(|table| {
                let existing = table.current_for(category);
                let version = table.next_version(category);

                let asset = Asset {
                    id: existing
                        .map(|a| a.id.clone())
                        .unwrap_or_else(AssetId::fresh),
                    category,
                    title: Asset::title_for(category, version),
                    locator,
                    poster_locator: poster_locator
                        .or_else(|| existing.and_then(|a| a.poster_locator.clone())),
                    version,
                    updated_at: Utc::now(),
                    description: description
                        .or_else(|| existing.and_then(|a| a.description.clone())),
                    play_count: existing.map(|a| a.play_count).unwrap_or(0),
                };

                table.upsert(asset.clone());
                asset
            })
            .await;

        info!(
            id = %asset.id,
            version = asset.version,
            play_count = asset.play_count,
            "{}",
            confirmation(&asset)
        );

        Ok(asset)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
