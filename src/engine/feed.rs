//! Feed tier selection, ranking, and caching
//!
//! The feed selector decides which of three ranking tiers applies to a
//! viewer, executes the corresponding algorithm, enforces the brand
//! diversity cap, and manages the first-page feed cache with its refresh
//! policy:
//!
//! - `behavioral` when the viewer has interaction history
//! - `preference` when explicit style/color preferences are on file
//! - `cold_start` otherwise (anonymous viewers always)
//!
//! Behavioral (implicit, higher-fidelity) deliberately wins over explicit
//! preference when both are available.

use crate::config::EngineConfig;
use crate::engine::interactions::InteractionLog;
use crate::engine::similar::{overlap_count, SimilarityEngine};
use crate::remote::{CatalogBackend, CatalogFilter, CatalogOrder, PreferenceBackend};
use crate::storage::{KeyValueStore, Namespace};
use crate::types::{FeedCacheEntry, FeedPage, FeedTier, Item, ItemId, Preferences, ViewerId};
use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// Cache key for viewers without an account
pub const GUEST_VIEWER: &str = "guest";

/// A feed page request
#[derive(Debug, Clone)]
pub struct FeedRequest {
    pub offset: usize,
    pub limit: usize,
    /// Caller-supplied exclusions, applied on top of the seen-ids set
    pub exclude: Vec<ItemId>,
    /// Pull-to-refresh: clear the cache and fetch uncached
    pub force_refresh: bool,
}

impl Default for FeedRequest {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 20,
            exclude: Vec::new(),
            force_refresh: false,
        }
    }
}

/// Top-level feed orchestrator
///
/// Cheap to clone; clones share state. Background refreshes are detached
/// tasks over a clone, with "last write to the cache wins" semantics.
#[derive(Clone)]
pub struct FeedSelector {
    inner: Arc<FeedInner>,
}

struct FeedInner {
    kv: Arc<KeyValueStore>,
    catalog: Arc<dyn CatalogBackend>,
    preferences: Arc<dyn PreferenceBackend>,
    interactions: Arc<InteractionLog>,
    similarity: Arc<SimilarityEngine>,
    config: Arc<EngineConfig>,
    rng: Mutex<StdRng>,
}

impl FeedSelector {
    pub fn new(
        kv: Arc<KeyValueStore>,
        catalog: Arc<dyn CatalogBackend>,
        preferences: Arc<dyn PreferenceBackend>,
        interactions: Arc<InteractionLog>,
        similarity: Arc<SimilarityEngine>,
        config: Arc<EngineConfig>,
    ) -> Self {
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            inner: Arc::new(FeedInner {
                kv,
                catalog,
                preferences,
                interactions,
                similarity,
                config,
                rng: Mutex::new(rng),
            }),
        }
    }

    /// Cache key for a possibly-anonymous viewer
    pub fn cache_key(viewer: Option<&ViewerId>) -> &str {
        viewer.map(|v| v.as_str()).unwrap_or(GUEST_VIEWER)
    }

    /// Ranking tier for a viewer; check order is significant
    pub async fn determine_tier(&self, viewer: Option<&ViewerId>) -> FeedTier {
        self.classify(viewer).await.0
    }

    /// Fetch a feed page
    ///
    /// Only the first page is ever cached. A cache hit serves the cached
    /// items and triggers a detached silent refresh so the next read
    /// reflects any tier or content change. Pagination beyond the first
    /// page always bypasses the cache.
    pub async fn feed_page(&self, viewer: Option<&ViewerId>, request: FeedRequest) -> FeedPage {
        let key = Self::cache_key(viewer);

        if request.force_refresh {
            self.inner.kv.delete(Namespace::FeedCache, key).await;
        } else if request.offset == 0 {
            if let Some(entry) = self
                .inner
                .kv
                .get::<FeedCacheEntry>(Namespace::FeedCache, key)
                .await
            {
                // An empty entry is treated as absent: a transient empty
                // result must not become "the" feed
                if !entry.items.is_empty() {
                    debug!("Feed cache hit for {} ({})", key, entry.tier);
                    self.silent_refresh(viewer.cloned());
                    let mut items = entry.items;
                    items.truncate(request.limit);
                    return FeedPage {
                        items,
                        tier: entry.tier,
                        from_cache: true,
                    };
                }
            }
        }

        self.compute_page(viewer, &request).await
    }

    /// Forced uncached recompute of the first page, refreshing the cache
    pub async fn refresh(&self, viewer: Option<&ViewerId>) -> FeedPage {
        let request = FeedRequest {
            limit: self.inner.config.page_size,
            force_refresh: true,
            ..Default::default()
        };
        self.inner
            .kv
            .delete(Namespace::FeedCache, Self::cache_key(viewer))
            .await;
        self.compute_page(viewer, &request).await
    }

    /// Detached background refresh; the caller never blocks on it
    ///
    /// Last write to the cache wins. Consumers compare the served item-id
    /// sequence against what they display before swapping.
    pub fn silent_refresh(&self, viewer: Option<ViewerId>) {
        let selector = self.clone();
        tokio::spawn(async move {
            selector.refresh(viewer.as_ref()).await;
        });
    }

    /// Record item ids as seen, excluding them from future candidate pools
    ///
    /// Idempotent; strictly FIFO eviction once the bound is exceeded.
    pub async fn mark_seen(&self, viewer: Option<&ViewerId>, ids: &[ItemId]) {
        let cap = self.inner.config.seen_ids_cap;
        let new_ids: Vec<String> = ids.iter().map(|id| id.as_str().to_string()).collect();
        self.inner
            .kv
            .update(
                Namespace::SeenIds,
                Self::cache_key(viewer),
                None,
                move |current: Option<Vec<String>>| {
                    let mut seen = current.unwrap_or_default();
                    for id in new_ids {
                        if !seen.contains(&id) {
                            seen.push(id);
                        }
                    }
                    if seen.len() > cap {
                        seen.drain(0..seen.len() - cap);
                    }
                    seen
                },
            )
            .await;
    }

    /// Current seen-ids set for a viewer
    pub async fn seen_ids(&self, viewer: Option<&ViewerId>) -> Vec<ItemId> {
        self.inner
            .kv
            .get::<Vec<String>>(Namespace::SeenIds, Self::cache_key(viewer))
            .await
            .unwrap_or_default()
            .into_iter()
            .map(ItemId)
            .collect()
    }

    async fn classify(&self, viewer: Option<&ViewerId>) -> (FeedTier, Option<Preferences>) {
        let Some(viewer) = viewer else {
            return (FeedTier::ColdStart, None);
        };

        let prefs = match self.inner.preferences.read_preferences(viewer).await {
            Ok(prefs) => prefs,
            Err(e) => {
                warn!("Preference read failed for {}: {}", viewer, e);
                None
            }
        };

        if self.inner.interactions.has_history(viewer).await {
            return (FeedTier::Behavioral, prefs);
        }
        match prefs {
            Some(prefs) if !prefs.is_empty() => (FeedTier::Preference, Some(prefs)),
            prefs => (FeedTier::ColdStart, prefs),
        }
    }

    async fn compute_page(&self, viewer: Option<&ViewerId>, request: &FeedRequest) -> FeedPage {
        let (tier, prefs) = self.classify(viewer).await;

        let mut exclude: HashSet<ItemId> = self.seen_ids(viewer).await.into_iter().collect();
        exclude.extend(request.exclude.iter().cloned());

        let ranked = match tier {
            FeedTier::ColdStart => self.rank_cold_start(&prefs, &exclude).await,
            FeedTier::Preference => {
                let prefs = prefs.clone().unwrap_or_default();
                self.rank_preference(&prefs, &exclude).await
            }
            // classify() only returns behavioral for signed-in viewers
            FeedTier::Behavioral => match viewer {
                Some(viewer) => {
                    self.rank_behavioral(viewer, &prefs.clone().unwrap_or_default(), &exclude)
                        .await
                }
                None => self.rank_cold_start(&prefs, &exclude).await,
            },
        };

        let capped = self.diversity_cap(ranked);
        let items: Vec<Item> = capped
            .into_iter()
            .skip(request.offset)
            .take(request.limit)
            .collect();

        if request.offset == 0 && !items.is_empty() {
            self.inner
                .kv
                .set(
                    Namespace::FeedCache,
                    Self::cache_key(viewer),
                    &FeedCacheEntry {
                        items: items.clone(),
                        tier,
                        cached_at: Utc::now(),
                    },
                    Some(self.inner.config.feed_cache_ttl_secs),
                )
                .await;
        }

        FeedPage {
            items,
            tier,
            from_cache: false,
        }
    }

    async fn fetch_pool(&self, filter: &CatalogFilter, order: CatalogOrder) -> Vec<Item> {
        match self
            .inner
            .catalog
            .query(filter, order, self.inner.config.feed_pool_size, 0)
            .await
        {
            Ok(pool) => pool,
            Err(e) => {
                warn!("Feed candidate fetch failed: {}", e);
                Vec::new()
            }
        }
    }

    /// Broad pool ordered `(is_featured desc, created_at desc)`, unscored
    async fn rank_cold_start(
        &self,
        prefs: &Option<Preferences>,
        exclude: &HashSet<ItemId>,
    ) -> Vec<Item> {
        let filter = CatalogFilter {
            gender: prefs.as_ref().and_then(|p| p.gender),
            active_only: true,
            ..Default::default()
        };
        self.fetch_pool(&filter, CatalogOrder::FeaturedNewest)
            .await
            .into_iter()
            .filter(|item| !exclude.contains(&item.id))
            .collect()
    }

    /// Explicit-preference scoring with bounded jitter
    async fn rank_preference(&self, prefs: &Preferences, exclude: &HashSet<ItemId>) -> Vec<Item> {
        let filter = CatalogFilter {
            gender: prefs.gender,
            active_only: true,
            ..Default::default()
        };
        let pool = self.fetch_pool(&filter, CatalogOrder::Newest).await;

        let jitter_max = self.inner.config.preference_jitter_max;
        let mut scored: Vec<(f32, Item)> = pool
            .into_iter()
            .filter(|item| !exclude.contains(&item.id))
            .map(|item| {
                let score = preference_score(&item, prefs) + self.jitter(jitter_max);
                (score, item)
            })
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.into_iter().map(|(_, item)| item).collect()
    }

    /// Anchor-weighted behavioral scoring blended with preference score
    async fn rank_behavioral(
        &self,
        viewer: &ViewerId,
        prefs: &Preferences,
        exclude: &HashSet<ItemId>,
    ) -> Vec<Item> {
        let scores = self.inner.interactions.scores(viewer).await;
        let anchors = self.resolve_anchors(&scores).await;

        let filter = CatalogFilter {
            gender: prefs.gender,
            active_only: true,
            ..Default::default()
        };
        let pool = self.fetch_pool(&filter, CatalogOrder::Newest).await;

        let blend = self.inner.config.behavioral_blend;
        let fallback = self.inner.config.flat_fallback_weight;
        let jitter_max = self.inner.config.behavioral_jitter_max;

        let mut scored: Vec<(f32, Item)> = pool
            .into_iter()
            .filter(|item| !exclude.contains(&item.id))
            .map(|item| {
                let behavioral: f32 = anchors
                    .iter()
                    .map(|anchor| {
                        let anchor_weight = scores
                            .get(&anchor.id)
                            .copied()
                            .filter(|w| *w > 0.0)
                            .unwrap_or(fallback);
                        anchor_affinity(anchor, &item) * anchor_weight
                    })
                    .sum();
                let score = blend * behavioral
                    + (1.0 - blend) * preference_score(&item, prefs)
                    + self.jitter(jitter_max);
                (score, item)
            })
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.into_iter().map(|(_, item)| item).collect()
    }

    /// Resolve the top-scored interaction items into anchor items
    async fn resolve_anchors(&self, scores: &HashMap<ItemId, f32>) -> Vec<Item> {
        let mut ranked: Vec<(&ItemId, f32)> = scores.iter().map(|(id, s)| (id, *s)).collect();
        // Deterministic anchor order: score desc, then id
        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.as_str().cmp(b.0.as_str()))
        });

        let mut anchors = Vec::new();
        for (id, _) in ranked.into_iter().take(self.inner.config.anchor_count) {
            if let Some(item) = self.inner.similarity.item_by_id(id).await {
                anchors.push(item);
            }
        }
        anchors
    }

    /// Single linear pass enforcing the per-brand cap
    ///
    /// Items beyond the cap for their brand are dropped from this result
    /// set entirely, not deferred to a later page.
    fn diversity_cap(&self, items: Vec<Item>) -> Vec<Item> {
        let cap = self.inner.config.brand_cap;
        let mut counts: HashMap<String, usize> = HashMap::new();
        items
            .into_iter()
            .filter(|item| {
                let count = counts.entry(item.brand_key().to_string()).or_insert(0);
                *count += 1;
                *count <= cap
            })
            .collect()
    }

    fn jitter(&self, bound: f32) -> f32 {
        let mut rng = self.inner.rng.lock().unwrap_or_else(|e| e.into_inner());
        rng.gen::<f32>() * bound
    }
}

/// Explicit-preference score for one candidate
pub fn preference_score(item: &Item, prefs: &Preferences) -> f32 {
    let mut score = 3.0 * overlap_count(&item.styles, &prefs.style_tags) as f32;
    score += 2.0 * overlap_count(&item.colors, &prefs.favorite_colors) as f32;
    if let Some(pattern) = &item.attributes.pattern {
        if prefs.pattern_prefs.contains(pattern) {
            score += 1.5;
        }
    }
    if item.is_featured {
        score += 1.0;
    }
    score
}

/// Unweighted affinity between one anchor and one candidate
fn anchor_affinity(anchor: &Item, candidate: &Item) -> f32 {
    let mut affinity = 0.0;
    if anchor.category == candidate.category {
        affinity += 2.0;
    }
    affinity += 1.5 * overlap_count(&anchor.styles, &candidate.styles) as f32;
    affinity += 1.0 * overlap_count(&anchor.colors, &candidate.colors) as f32;
    if let (Some(a), Some(b)) = (&anchor.attributes.pattern, &candidate.attributes.pattern) {
        if a == b {
            affinity += 1.0;
        }
    }
    affinity
}
