//! Personalization engine services
//!
//! The five cooperating services (interaction log, style counters,
//! similarity, feed selection, preference sync) plus the
//! [`PersonalizationEngine`] facade that wires them together for a host
//! application.

pub mod counters;
pub mod feed;
pub mod interactions;
pub mod similar;
pub mod sync;

pub use counters::StyleCounterStore;
pub use feed::{FeedRequest, FeedSelector, GUEST_VIEWER};
pub use interactions::InteractionLog;
pub use similar::SimilarityEngine;
pub use sync::SyncManager;

use crate::config::EngineConfig;
use crate::remote::{CatalogBackend, InteractionBackend, PreferenceBackend};
use crate::storage::{DeviceStore, KeyValueStore};
use crate::types::{FeedPage, InteractionType, Item, ItemId, ViewerId};
use std::sync::Arc;
use std::time::Duration;

/// One viewer session's personalization engine
///
/// Owns the local caches and learning state; talks to the remote
/// collaborators only through their trait boundaries. All operations
/// degrade gracefully: the worst case is an un-personalized cold-start
/// feed, never an error surfaced to the UI.
pub struct PersonalizationEngine {
    config: Arc<EngineConfig>,
    interactions: Arc<InteractionLog>,
    counters: Arc<StyleCounterStore>,
    similarity: Arc<SimilarityEngine>,
    feed: FeedSelector,
    sync: SyncManager,
}

impl PersonalizationEngine {
    pub fn new(
        device: Arc<dyn DeviceStore>,
        catalog: Arc<dyn CatalogBackend>,
        preferences: Arc<dyn PreferenceBackend>,
        interaction_backend: Arc<dyn InteractionBackend>,
        config: EngineConfig,
    ) -> Self {
        let config = Arc::new(config);
        let kv = Arc::new(KeyValueStore::new(device));

        let interactions = Arc::new(InteractionLog::new(
            kv.clone(),
            interaction_backend,
            config.clone(),
        ));
        let counters = Arc::new(StyleCounterStore::new(kv.clone()));
        let similarity = Arc::new(SimilarityEngine::new(
            kv.clone(),
            catalog.clone(),
            config.clone(),
        ));
        let feed = FeedSelector::new(
            kv.clone(),
            catalog,
            preferences.clone(),
            interactions.clone(),
            similarity.clone(),
            config.clone(),
        );
        let sync = SyncManager::new(kv, counters.clone(), preferences, config.clone());

        Self {
            config,
            interactions,
            counters,
            similarity,
            feed,
            sync,
        }
    }

    /// Fetch a feed page for a possibly-anonymous viewer
    pub async fn feed_page(&self, viewer: Option<&ViewerId>, request: FeedRequest) -> FeedPage {
        self.feed.feed_page(viewer, request).await
    }

    /// Record an interaction and run every downstream learning hook
    ///
    /// Returns whether the event was recorded (false when deduplicated or
    /// anonymous). A recorded interaction updates the style counters,
    /// marks dismissed items seen, and drives the sync triggers.
    pub async fn log_interaction(
        &self,
        viewer: Option<&ViewerId>,
        item: &Item,
        interaction_type: InteractionType,
    ) -> bool {
        if !self.interactions.log(viewer, &item.id, interaction_type).await {
            return false;
        }

        // log() only records for signed-in viewers
        let Some(viewer) = viewer else { return false };

        self.counters.update(viewer, item, interaction_type).await;
        if interaction_type == InteractionType::Dismiss {
            self.feed
                .mark_seen(Some(viewer), std::slice::from_ref(&item.id))
                .await;
        }
        self.sync.note_interaction(viewer, interaction_type).await;
        true
    }

    /// Ranked similar items, excluding what the viewer has already seen
    pub async fn similar_items(
        &self,
        viewer: Option<&ViewerId>,
        item: &Item,
        limit: usize,
    ) -> Vec<Item> {
        let exclude = self.feed.seen_ids(viewer).await;
        self.similarity.similar(item, limit, &exclude).await
    }

    /// Catalog item lookup through the product cache
    pub async fn product(&self, id: &ItemId) -> Option<Item> {
        self.similarity.item_by_id(id).await
    }

    /// Style-quiz retake: clear implicit learning and the cached feed
    pub async fn reset_style_profile(&self, viewer: &ViewerId) {
        self.counters.reset(viewer).await;
    }

    /// App moved to the background
    pub async fn on_app_background(&self, viewer: Option<&ViewerId>) {
        self.sync.on_app_background(viewer).await;
    }

    /// App returned to the foreground after `backgrounded_for`
    ///
    /// A long enough absence triggers a detached silent feed refresh; the
    /// UI keeps rendering the cached feed meanwhile.
    pub fn on_app_foreground(&self, viewer: Option<&ViewerId>, backgrounded_for: Duration) {
        if backgrounded_for.as_secs() as i64 >= self.config.foreground_refresh_after_secs {
            self.feed.silent_refresh(viewer.cloned());
        }
    }

    pub fn feed(&self) -> &FeedSelector {
        &self.feed
    }

    pub fn interactions(&self) -> &InteractionLog {
        &self.interactions
    }

    pub fn counters(&self) -> &StyleCounterStore {
        &self.counters
    }

    pub fn similarity(&self) -> &SimilarityEngine {
        &self.similarity
    }

    pub fn sync(&self) -> &SyncManager {
        &self.sync
    }
}
