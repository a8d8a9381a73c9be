//! Engine configuration
//!
//! Every tuning knob in the engine lives here as a policy constant with
//! the original product defaults. None of these values have a documented
//! derivation; they are candidates for product-level tuning, not law.
//!
//! Configuration can be loaded from a TOML/JSON file with `VITRINE_`
//! environment overrides, or constructed via `Default` for embedded use.

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Policy constants for the personalization engine
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    // === Cache TTLs (seconds) ===
    /// Feed cache entry lifetime (first page only)
    pub feed_cache_ttl_secs: i64,

    /// Similar-items cache entry lifetime
    pub similar_cache_ttl_secs: i64,

    /// Product cache entry lifetime
    pub product_cache_ttl_secs: i64,

    /// View dedup window: repeat views of an item inside this window are
    /// suppressed entirely
    pub view_dedup_ttl_secs: i64,

    // === Bounds ===
    /// Rolling seen-ids set size per viewer, FIFO eviction beyond this
    pub seen_ids_cap: usize,

    /// Recently-viewed list size per viewer, most-recent-first
    pub recently_viewed_cap: usize,

    /// Maximum items per brand key in a single ranked page
    pub brand_cap: usize,

    /// Default feed page size
    pub page_size: usize,

    // === Candidate pools ===
    /// Catalog pool size fetched per feed ranking pass
    pub feed_pool_size: usize,

    /// Catalog pool size fetched per similarity pass
    pub similar_pool_size: usize,

    /// Similar-items superset size kept in cache
    pub similar_cache_size: usize,

    // === Behavioral ranking ===
    /// Number of anchor items derived from interaction scores
    pub anchor_count: usize,

    /// Remote interaction rows fetched when reducing scores
    pub interaction_fetch_limit: usize,

    /// Interaction history window for tier classification (days)
    pub history_window_days: i64,

    /// Weight assigned to recency-list items when the remote score
    /// reduction is unavailable
    pub flat_fallback_weight: f32,

    /// Behavioral/preference blend factor: final = blend × behavioral
    /// + (1 − blend) × preference
    pub behavioral_blend: f32,

    // === Jitter bounds ===
    /// Upper bound on random jitter added to preference scores
    pub preference_jitter_max: f32,

    /// Upper bound on random jitter added to behavioral scores
    pub behavioral_jitter_max: f32,

    /// Seed for the injected ranking RNG; `None` seeds from entropy.
    /// Tests pin this for reproducible ordering.
    pub rng_seed: Option<u64>,

    // === Sync policy ===
    /// Absolute interaction weight at or above which a preference flush
    /// (and feed cache invalidation) fires immediately
    pub sync_weight_threshold: f32,

    /// Every Nth recorded view triggers a cadence flush
    pub view_sync_cadence: u64,

    /// Tags per mapping sent in each preference upsert
    pub sync_top_n: usize,

    /// Background duration after which a foreground resume triggers a
    /// silent feed refresh (seconds)
    pub foreground_refresh_after_secs: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            feed_cache_ttl_secs: 15 * 60,
            similar_cache_ttl_secs: 30 * 60,
            product_cache_ttl_secs: 60 * 60,
            view_dedup_ttl_secs: 24 * 60 * 60,
            seen_ids_cap: 500,
            recently_viewed_cap: 30,
            brand_cap: 2,
            page_size: 20,
            feed_pool_size: 100,
            similar_pool_size: 150,
            similar_cache_size: 20,
            anchor_count: 5,
            interaction_fetch_limit: 200,
            history_window_days: 30,
            flat_fallback_weight: 0.2,
            behavioral_blend: 0.7,
            preference_jitter_max: 0.5,
            behavioral_jitter_max: 0.3,
            rng_seed: None,
            sync_weight_threshold: 0.5,
            view_sync_cadence: 10,
            sync_top_n: 10,
            foreground_refresh_after_secs: 5 * 60,
        }
    }
}

impl EngineConfig {
    /// Load configuration from a file, with `VITRINE_` environment
    /// variable overrides layered on top of the defaults.
    pub fn from_file(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::Config::try_from(&EngineConfig::default())?)
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("VITRINE"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
