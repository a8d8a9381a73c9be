//! Preference sync triggers
//!
//! Flushes the accumulated style counters to the remote preference
//! record. Triggers: any high-intent interaction (absolute weight at or
//! above the threshold, immediately followed by feed-cache invalidation
//! for that viewer), every Nth recorded view (persisted cadence counter,
//! survives restarts), and the app moving to the background.
//!
//! A flush always sends the current top-N of the all-time counters, not
//! a delta, so racing or retried flushes are harmless. Failures are
//! logged and swallowed; the counters stay intact locally and the next
//! trigger retries.

use crate::config::EngineConfig;
use crate::engine::counters::StyleCounterStore;
use crate::remote::PreferenceBackend;
use crate::storage::{KeyValueStore, Namespace};
use crate::types::{InteractionType, ViewerId};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, warn};

/// Preference flush orchestrator
pub struct SyncManager {
    kv: Arc<KeyValueStore>,
    counters: Arc<StyleCounterStore>,
    preferences: Arc<dyn PreferenceBackend>,
    config: Arc<EngineConfig>,
}

impl SyncManager {
    pub fn new(
        kv: Arc<KeyValueStore>,
        counters: Arc<StyleCounterStore>,
        preferences: Arc<dyn PreferenceBackend>,
        config: Arc<EngineConfig>,
    ) -> Self {
        Self {
            kv,
            counters,
            preferences,
            config,
        }
    }

    /// React to a recorded interaction
    ///
    /// High-intent interactions flush and then invalidate the viewer's
    /// feed cache entry in the same call, so personalization is visible
    /// on the next load. Views advance the persisted cadence counter.
    pub async fn note_interaction(&self, viewer: &ViewerId, interaction_type: InteractionType) {
        if interaction_type.weight().abs() >= self.config.sync_weight_threshold {
            self.flush(viewer).await;
            self.kv.delete(Namespace::FeedCache, viewer.as_str()).await;
            return;
        }

        if interaction_type == InteractionType::View {
            let count = self
                .kv
                .update(
                    Namespace::ViewCount,
                    viewer.as_str(),
                    None,
                    |current: Option<u64>| current.unwrap_or(0) + 1,
                )
                .await;
            if count % self.config.view_sync_cadence == 0 {
                debug!("Cadence flush for {} at view #{}", viewer, count);
                self.flush(viewer).await;
            }
        }
    }

    /// App moved to the background while a viewer session is active
    pub async fn on_app_background(&self, viewer: Option<&ViewerId>) {
        if let Some(viewer) = viewer {
            self.flush(viewer).await;
        }
    }

    /// Flush the current top-N counters to the remote preference record
    ///
    /// Idempotent; a failed upsert is swallowed and retried on the next
    /// trigger.
    pub async fn flush(&self, viewer: &ViewerId) {
        let counters = self.counters.counters(viewer).await;
        if counters.styles.is_empty() && counters.colors.is_empty() && counters.patterns.is_empty()
        {
            debug!("Nothing to flush for {}", viewer);
            return;
        }

        let n = self.config.sync_top_n;
        let style_tags = counters.styles.top_n(n);
        let favorite_colors = counters.colors.top_n(n);
        let pattern_prefs = counters.patterns.top_n(n);

        let now = Utc::now();
        match self
            .preferences
            .upsert_preferences(viewer, &style_tags, &favorite_colors, &pattern_prefs, now)
            .await
        {
            Ok(()) => {
                self.counters.mark_synced(viewer, now).await;
                debug!("Flushed preferences for {}", viewer);
            }
            Err(e) => {
                warn!("Preference flush failed for {}: {}", viewer, e);
            }
        }
    }
}
