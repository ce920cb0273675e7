//! Slot registry: the single source of truth for "current asset per category".
//!
//! The registry is an explicitly owned store, shared by reference with every
//! component that needs it. All mutation goes through [`SlotRegistry::transact`],
//! which holds the write lock for the whole read-modify-write so version
//! derivation and replacement happen without an interleaving window.

use std::collections::HashMap;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, RwLock};
use tracing::debug;

use crate::domain::{Asset, AssetId, Category, SlotEvent, SlotEventType};

/// Capacity of the event broadcast channel
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// How the next version is derived after a slot has been emptied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionPolicy {
    /// Versions keep rising from the category's high-water mark, even
    /// across delete-then-recreate
    #[default]
    Continue,

    /// Versions derive from the current occupant only; an empty slot
    /// restarts at 1
    Restart,
}

/// The mapping guarded by the registry lock
#[derive(Debug, Default)]
pub struct SlotTable {
    /// Current assets in insertion order
    assets: Vec<Asset>,

    /// Highest version ever committed per category
    high_water: HashMap<Category, u32>,

    /// Committed/removed history, oldest first. Unbounded; it lives only as
    /// long as the process, like the table itself
    journal: Vec<SlotEvent>,

    /// Events not yet published
    outbox: Vec<SlotEvent>,

    policy: VersionPolicy,
}

impl SlotTable {
    fn new(policy: VersionPolicy) -> Self {
        Self {
            policy,
            ..Default::default()
        }
    }

    /// Replace the entry for the asset's category, or insert it
    pub fn upsert(&mut self, asset: Asset) {
        let category = asset.category;
        let version = asset.version;
        let event = SlotEvent::new(
            category,
            asset.id.clone(),
            SlotEventType::Committed,
            version,
            format!("{} (v{})", category, version),
        );

        if let Some(existing) = self.assets.iter_mut().find(|a| a.category == category) {
            *existing = asset;
        } else {
            self.assets.push(asset);
        }

        let mark = self.high_water.entry(category).or_insert(0);
        *mark = (*mark).max(version);

        self.journal.push(event.clone());
        self.outbox.push(event);
    }

    /// Delete by id; unknown ids are ignored
    pub fn remove(&mut self, id: &AssetId) -> Option<Asset> {
        let pos = self.assets.iter().position(|a| &a.id == id)?;
        let removed = self.assets.remove(pos);

        let event = SlotEvent::new(
            removed.category,
            removed.id.clone(),
            SlotEventType::Removed,
            removed.version,
            format!("{} removed", removed.category),
        );
        self.journal.push(event.clone());
        self.outbox.push(event);

        Some(removed)
    }

    /// Add one to an asset's play count; returns the new count
    pub fn record_play(&mut self, id: &AssetId) -> Option<u64> {
        let asset = self.assets.iter_mut().find(|a| &a.id == id)?;
        asset.play_count += 1;
        let count = asset.play_count;

        // Plays are published but kept out of the journal
        self.outbox.push(SlotEvent::new(
            asset.category,
            asset.id.clone(),
            SlotEventType::Played,
            asset.version,
            format!("play #{}", count),
        ));

        Some(count)
    }

    pub fn current_for(&self, category: Category) -> Option<&Asset> {
        self.assets.iter().find(|a| a.category == category)
    }

    pub fn get(&self, id: &AssetId) -> Option<&Asset> {
        self.assets.iter().find(|a| &a.id == id)
    }

    pub fn all(&self) -> &[Asset] {
        &self.assets
    }

    /// Version the next commit to `category` must carry
    pub fn next_version(&self, category: Category) -> u32 {
        let current = self.current_for(category).map(|a| a.version).unwrap_or(0);
        match self.policy {
            VersionPolicy::Continue => {
                let mark = self.high_water.get(&category).copied().unwrap_or(0);
                current.max(mark) + 1
            }
            VersionPolicy::Restart => current + 1,
        }
    }

    /// Committed versions of a category, oldest first
    pub fn lineage(&self, category: Category) -> Vec<&SlotEvent> {
        self.journal
            .iter()
            .filter(|e| e.category == category && e.event_type == SlotEventType::Committed)
            .collect()
    }

    pub fn journal(&self) -> &[SlotEvent] {
        &self.journal
    }
}

/// Shared, lock-guarded slot registry
pub struct SlotRegistry {
    table: RwLock<SlotTable>,
    events: broadcast::Sender<SlotEvent>,
}

impl Default for SlotRegistry {
    fn default() -> Self {
        Self::new(VersionPolicy::default())
    }
}

impl SlotRegistry {
    /// Create an empty registry
    pub fn new(policy: VersionPolicy) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            table: RwLock::new(SlotTable::new(policy)),
            events,
        }
    }

    /// Create a registry pre-populated with seed assets
    pub fn with_seed(policy: VersionPolicy, seed: Vec<Asset>) -> Result<Self> {
        let mut table = SlotTable::new(policy);

        for asset in seed {
            if asset.version == 0 {
                anyhow::bail!("Seed asset '{}' has version 0", asset.id);
            }
            if table.current_for(asset.category).is_some() {
                anyhow::bail!("Seed has more than one asset for '{}'", asset.category);
            }
            if table.get(&asset.id).is_some() {
                anyhow::bail!("Seed reuses asset id '{}'", asset.id);
            }
            table.upsert(asset);
        }
        table.outbox.clear();

        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Ok(Self {
            table: RwLock::new(table),
            events,
        })
    }

    /// Run an atomic read-modify-write against the table, then publish
    /// whatever events it produced
    pub async fn transact<R>(&self, f: impl FnOnce(&mut SlotTable) -> R) -> R {
        let mut table = self.table.write().await;
        let result = f(&mut table);

        for event in table.outbox.drain(..) {
            debug!(category = %event.category, kind = ?event.event_type, "Registry event");
            // Nobody listening is fine
            let _ = self.events.send(event);
        }

        result
    }

    pub async fn upsert(&self, asset: Asset) {
        self.transact(|t| t.upsert(asset)).await
    }

    pub async fn remove(&self, id: &AssetId) -> Option<Asset> {
        self.transact(|t| t.remove(id)).await
    }

    pub async fn current_for(&self, category: Category) -> Option<Asset> {
        self.table.read().await.current_for(category).cloned()
    }

    pub async fn get(&self, id: &AssetId) -> Option<Asset> {
        self.table.read().await.get(id).cloned()
    }

    /// Snapshot of all current assets in registry order
    pub async fn all(&self) -> Vec<Asset> {
        self.table.read().await.all().to_vec()
    }

    /// Committed lineage of one category
    pub async fn history(&self, category: Category) -> Vec<SlotEvent> {
        self.table
            .read()
            .await
            .lineage(category)
            .into_iter()
            .cloned()
            .collect()
    }

    pub async fn journal(&self) -> Vec<SlotEvent> {
        self.table.read().await.journal().to_vec()
    }

    /// Receive every future registry event
    pub fn subscribe(&self) -> broadcast::Receiver<SlotEvent> {
        self.events.subscribe()
    }
}
