//! Attribute-based similar-items scoring
//!
//! Scores catalog candidates against a source item with a weighted sum
//! over shared attributes. Results are cached per source item (not per
//! viewer): the cache holds a superset of top candidates and callers
//! post-filter with their own exclusion set. Embedding vectors are
//! opaque here and take no part in scoring.

use crate::config::EngineConfig;
use crate::remote::{CatalogBackend, CatalogFilter, CatalogOrder};
use crate::storage::{KeyValueStore, Namespace};
use crate::types::{Item, ItemId, SimilarCacheEntry};
use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Similar-items engine with its own result cache
pub struct SimilarityEngine {
    kv: Arc<KeyValueStore>,
    catalog: Arc<dyn CatalogBackend>,
    config: Arc<EngineConfig>,
}

impl SimilarityEngine {
    pub fn new(
        kv: Arc<KeyValueStore>,
        catalog: Arc<dyn CatalogBackend>,
        config: Arc<EngineConfig>,
    ) -> Self {
        Self {
            kv,
            catalog,
            config,
        }
    }

    /// Ranked similar items for a source item
    ///
    /// Serves from the per-item cache when possible, re-applying the
    /// caller's `exclude` set (which may differ from the set in effect
    /// when the cache was populated). An empty result is a legitimate
    /// terminal state, including on catalog failure.
    pub async fn similar(&self, item: &Item, limit: usize, exclude: &[ItemId]) -> Vec<Item> {
        if let Some(entry) = self
            .kv
            .get::<SimilarCacheEntry>(Namespace::SimilarCache, item.id.as_str())
            .await
        {
            debug!("Similar cache hit for {}", item.id);
            return Self::post_filter(entry.items, limit, exclude);
        }

        let filter = CatalogFilter {
            active_only: true,
            ..Default::default()
        };
        let pool = match self
            .catalog
            .query(&filter, CatalogOrder::Newest, self.config.similar_pool_size, 0)
            .await
        {
            Ok(pool) => pool,
            Err(e) => {
                warn!("Similar candidate fetch failed for {}: {}", item.id, e);
                return Vec::new();
            }
        };

        let excluded: HashSet<&ItemId> = exclude.iter().collect();
        let mut scored: Vec<(f32, Item)> = pool
            .into_iter()
            .filter(|candidate| candidate.id != item.id && !excluded.contains(&candidate.id))
            .map(|candidate| (score_similarity(item, &candidate), candidate))
            .collect();

        // Stable sort keeps pool order for equal scores
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        let top: Vec<Item> = scored
            .into_iter()
            .take(self.config.similar_cache_size)
            .map(|(_, item)| item)
            .collect();

        self.kv
            .set(
                Namespace::SimilarCache,
                item.id.as_str(),
                &SimilarCacheEntry {
                    items: top.clone(),
                    cached_at: Utc::now(),
                },
                Some(self.config.similar_cache_ttl_secs),
            )
            .await;

        Self::post_filter(top, limit, exclude)
    }

    /// Catalog item lookup through the product cache
    pub async fn item_by_id(&self, id: &ItemId) -> Option<Item> {
        if let Some(item) = self.kv.get::<Item>(Namespace::ProductCache, id.as_str()).await {
            return Some(item);
        }

        match self.catalog.item_by_id(id).await {
            Ok(Some(item)) => {
                self.kv
                    .set(
                        Namespace::ProductCache,
                        id.as_str(),
                        &item,
                        Some(self.config.product_cache_ttl_secs),
                    )
                    .await;
                Some(item)
            }
            Ok(None) => None,
            Err(e) => {
                warn!("Product fetch failed for {}: {}", id, e);
                None
            }
        }
    }

    fn post_filter(items: Vec<Item>, limit: usize, exclude: &[ItemId]) -> Vec<Item> {
        let excluded: HashSet<&ItemId> = exclude.iter().collect();
        items
            .into_iter()
            .filter(|item| !excluded.contains(&item.id))
            .take(limit)
            .collect()
    }
}

/// Weighted-sum similarity between a source item and a candidate
pub fn score_similarity(source: &Item, candidate: &Item) -> f32 {
    let mut score = 0.0;

    if source.category == candidate.category {
        score += 3.0;
    }
    if let (Some(a), Some(b)) = (&source.subcategory, &candidate.subcategory) {
        if a == b {
            score += 2.0;
        }
    }

    score += 2.0 * overlap_count(&source.styles, &candidate.styles) as f32;
    score += 1.5 * overlap_count(&source.colors, &candidate.colors) as f32;

    if let (Some(a), Some(b)) = (&source.attributes.pattern, &candidate.attributes.pattern) {
        if a == b {
            score += 1.5;
        }
    }

    if source.gender.compatible_with(candidate.gender) {
        score += 1.0;
    }

    score += 0.5 * overlap_count(&source.occasions, &candidate.occasions) as f32;

    // Price proximity, guarded so a near-zero price cannot dominate the
    // ranking through division asymmetry
    let (min, max) = if source.price <= candidate.price {
        (source.price, candidate.price)
    } else {
        (candidate.price, source.price)
    };
    if max > 0.0 {
        let ratio = (min / max) as f32;
        if ratio > 0.5 {
            score += ratio;
        }
    }

    score
}

/// Number of tags in `a` that also appear in `b`
pub fn overlap_count(a: &[String], b: &[String]) -> usize {
    a.iter().filter(|tag| b.contains(tag)).count()
}
