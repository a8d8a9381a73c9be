//! Interaction logging with view deduplication
//!
//! Records typed user actions against catalog items. Low-value `view`
//! signals are deduplicated inside a 24-hour window per item; all other
//! types are always recorded. Remote persistence is a detached
//! fire-and-forget dispatch: the caller never blocks on it and never
//! observes its failure.

use crate::config::EngineConfig;
use crate::remote::InteractionBackend;
use crate::storage::{KeyValueStore, Namespace};
use crate::types::{InteractionType, ItemId, ViewerId};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Typed interaction log for one engine instance
pub struct InteractionLog {
    kv: Arc<KeyValueStore>,
    backend: Arc<dyn InteractionBackend>,
    config: Arc<EngineConfig>,
}

impl InteractionLog {
    pub fn new(
        kv: Arc<KeyValueStore>,
        backend: Arc<dyn InteractionBackend>,
        config: Arc<EngineConfig>,
    ) -> Self {
        Self {
            kv,
            backend,
            config,
        }
    }

    /// Record an interaction
    ///
    /// Returns whether the event was actually recorded: `false` for
    /// anonymous viewers and for views deduplicated inside the window.
    /// The remote write happens on a detached task; failures are logged
    /// and swallowed there.
    pub async fn log(
        &self,
        viewer: Option<&ViewerId>,
        item: &ItemId,
        interaction_type: InteractionType,
    ) -> bool {
        let Some(viewer) = viewer else {
            return false;
        };

        if interaction_type == InteractionType::View {
            let marker: Option<DateTime<Utc>> =
                self.kv.get(Namespace::LastView, item.as_str()).await;
            if marker.is_some() {
                debug!("Deduplicated view of {} for {}", item, viewer);
                return false;
            }

            self.kv
                .set(
                    Namespace::LastView,
                    item.as_str(),
                    &Utc::now(),
                    Some(self.config.view_dedup_ttl_secs),
                )
                .await;

            self.push_recently_viewed(viewer, item).await;
        }

        self.dispatch_remote(viewer.clone(), item.clone(), interaction_type);
        true
    }

    /// Whether the viewer has any interaction history inside the
    /// classification window
    ///
    /// Falls back to "recency list is non-empty" when the remote
    /// collaborator is unavailable; the fallback reads local state only.
    pub async fn has_history(&self, viewer: &ViewerId) -> bool {
        let since = Utc::now() - Duration::days(self.config.history_window_days);
        match self.backend.recent_interactions(viewer, since, 1).await {
            Ok(rows) => !rows.is_empty(),
            Err(e) => {
                warn!("History check failed for {}, using recency list: {}", viewer, e);
                !self.recently_viewed(viewer).await.is_empty()
            }
        }
    }

    /// Per-item interaction scores for behavioral ranking
    ///
    /// Sums per-type weights over the most recent remote rows. When the
    /// remote is unavailable, every recency-list item gets a flat weight
    /// instead.
    pub async fn scores(&self, viewer: &ViewerId) -> HashMap<ItemId, f32> {
        match self
            .backend
            .recent_interactions(
                viewer,
                DateTime::<Utc>::MIN_UTC,
                self.config.interaction_fetch_limit,
            )
            .await
        {
            Ok(rows) => {
                let mut scores: HashMap<ItemId, f32> = HashMap::new();
                for row in rows {
                    *scores.entry(row.item_id).or_insert(0.0) += row.weight;
                }
                scores
            }
            Err(e) => {
                warn!("Score fetch failed for {}, using flat weights: {}", viewer, e);
                self.recently_viewed(viewer)
                    .await
                    .into_iter()
                    .map(|id| (id, self.config.flat_fallback_weight))
                    .collect()
            }
        }
    }

    /// Most-recent-first list of recently viewed item ids
    pub async fn recently_viewed(&self, viewer: &ViewerId) -> Vec<ItemId> {
        self.kv
            .get::<Vec<String>>(Namespace::RecentlyViewed, viewer.as_str())
            .await
            .unwrap_or_default()
            .into_iter()
            .map(ItemId)
            .collect()
    }

    async fn push_recently_viewed(&self, viewer: &ViewerId, item: &ItemId) {
        let cap = self.config.recently_viewed_cap;
        let item = item.as_str().to_string();
        self.kv
            .update(
                Namespace::RecentlyViewed,
                viewer.as_str(),
                None,
                move |current: Option<Vec<String>>| {
                    let mut list = current.unwrap_or_default();
                    list.retain(|id| *id != item);
                    list.insert(0, item);
                    list.truncate(cap);
                    list
                },
            )
            .await;
    }

    fn dispatch_remote(&self, viewer: ViewerId, item: ItemId, interaction_type: InteractionType) {
        let backend = Arc::clone(&self.backend);
        tokio::spawn(async move {
            if let Err(e) = backend
                .insert_interaction(&viewer, &item, interaction_type, interaction_type.weight())
                .await
            {
                warn!(
                    "Failed to persist {} interaction on {} for {}: {}",
                    interaction_type, item, viewer, e
                );
            }
        });
    }
}
