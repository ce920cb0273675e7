//! Engagement counter.
//!
//! Counts playback starts per asset. A replay by the same viewer is a new
//! play. Counting never touches versions.

use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::domain::AssetId;

use super::registry::SlotRegistry;

/// One row of the views report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngagementRow {
    /// Short category name
    pub name: String,
    pub title: String,
    pub views: u64,
}

pub struct EngagementCounter {
    registry: Arc<SlotRegistry>,
}

impl EngagementCounter {
    pub fn new(registry: Arc<SlotRegistry>) -> Self {
        Self { registry }
    }

    /// Count one playback start; unknown ids are ignored
    pub async fn record_play(&self, id: &AssetId) {
        match self.registry.transact(|t| t.record_play(id)).await {
            Some(count) => debug!(%id, count, "Play recorded"),
            None => debug!(%id, "Play for unknown asset ignored"),
        }
    }

    /// Views per current asset, in registry order
    pub async fn report(&self) -> Vec<EngagementRow> {
        self.registry
            .all()
            .await
            .into_iter()
            .map(|asset| EngagementRow {
                name: asset.category.short_name().to_string(),
                title: asset.title,
                views: asset.play_count,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Asset, Category};

    #[tokio::test]
    async fn test_replays_count_separately() {
        let registry = Arc::new(SlotRegistry::default());
        let asset = Asset::new(Category::UseCase, "demo.mp4");
        let id = asset.id.clone();
        registry.upsert(asset).await;

        let counter = EngagementCounter::new(registry.clone());
        counter.record_play(&id).await;
        counter.record_play(&id).await;

        let report = counter.report().await;
        assert_eq!(report.len(), 1);
        assert_eq!(report[0].name, "AI");
        assert_eq!(report[0].views, 2);
        assert_eq!(registry.current_for(Category::UseCase).await.unwrap().version, 1);
    }
}
