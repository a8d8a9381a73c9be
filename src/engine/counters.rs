//! Style counter accumulation
//!
//! Every logged interaction bumps the viewer's style/color/pattern
//! counters by the absolute interaction weight. A dismiss therefore
//! still increments: negative signals shape candidate selection through
//! the seen-ids set, never by decrementing taste counters. Counters are
//! monotonic until an explicit reset (style quiz retake).

use crate::storage::{KeyValueStore, Namespace};
use crate::types::{InteractionType, Item, StyleCounters, ViewerId};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::debug;

/// Accumulating per-viewer taste counters
pub struct StyleCounterStore {
    kv: Arc<KeyValueStore>,
}

impl StyleCounterStore {
    pub fn new(kv: Arc<KeyValueStore>) -> Self {
        Self { kv }
    }

    /// Fold one interaction into the viewer's counters
    ///
    /// Each tag array on the item (styles, colors, and the singular
    /// pattern attribute) is incremented by `abs(weight)` in a single
    /// read-modify-write step.
    pub async fn update(&self, viewer: &ViewerId, item: &Item, interaction_type: InteractionType) {
        let delta = interaction_type.weight().abs();
        if delta == 0.0 {
            return;
        }

        let styles = item.styles.clone();
        let colors = item.colors.clone();
        let pattern = item.attributes.pattern.clone();

        self.kv
            .update(
                Namespace::StyleCounters,
                viewer.as_str(),
                None,
                move |current: Option<StyleCounters>| {
                    let mut counters = current.unwrap_or_default();
                    for tag in &styles {
                        counters.styles.increment(tag, delta);
                    }
                    for tag in &colors {
                        counters.colors.increment(tag, delta);
                    }
                    if let Some(pattern) = &pattern {
                        counters.patterns.increment(pattern, delta);
                    }
                    counters
                },
            )
            .await;
    }

    /// Current counters, zeroed when none are on record
    pub async fn counters(&self, viewer: &ViewerId) -> StyleCounters {
        self.kv
            .get(Namespace::StyleCounters, viewer.as_str())
            .await
            .unwrap_or_default()
    }

    /// Stamp the last successful preference flush
    pub async fn mark_synced(&self, viewer: &ViewerId, at: DateTime<Utc>) {
        self.kv
            .update(
                Namespace::StyleCounters,
                viewer.as_str(),
                None,
                move |current: Option<StyleCounters>| {
                    let mut counters = current.unwrap_or_default();
                    counters.last_synced_at = Some(at);
                    counters
                },
            )
            .await;
    }

    /// Clear counters and the viewer's feed cache entry
    ///
    /// Used when a viewer retakes the style quiz, so stale implicit
    /// learning does not re-surface through the cached feed.
    pub async fn reset(&self, viewer: &ViewerId) {
        debug!("Resetting style counters for {}", viewer);
        self.kv
            .delete_all(&[
                (Namespace::StyleCounters, viewer.as_str().to_string()),
                (Namespace::FeedCache, viewer.as_str().to_string()),
            ])
            .await;
    }
}
