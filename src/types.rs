//! Core data types for the Vitrine personalization engine
//!
//! This module defines the fundamental data structures used throughout the
//! engine: catalog items, viewer interactions, feed tiers, explicit
//! preferences, and the accumulated style counters that drive implicit
//! preference learning.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Unique identifier for catalog items
///
/// Wraps the remote store's string identifier to provide type safety and
/// prevent mixing item ids with other string-based identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub String);

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ItemId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Unique identifier for viewers
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ViewerId(pub String);

impl ViewerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ViewerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ViewerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Gender tag on catalog items and viewer preferences
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Women,
    Men,
    Unisex,
}

impl Gender {
    /// Gender compatibility rule used by similarity scoring: same gender,
    /// or the candidate is unisex.
    pub fn compatible_with(&self, candidate: Gender) -> bool {
        *self == candidate || candidate == Gender::Unisex
    }
}

/// Free-form attribute bag on catalog items
///
/// Pattern is singular and treated as a one-element tag set by the
/// counter and scoring code. Unknown attributes are preserved so the
/// engine round-trips records it does not interpret.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemAttributes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub materials: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fit: Option<String>,

    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// A catalog product
///
/// Read-only input from this engine's perspective: the remote catalog
/// owns items, the engine only caches and ranks them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    // === Identity ===
    pub id: ItemId,
    pub title: String,
    #[serde(default)]
    pub description: String,

    // === Pricing ===
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sale_price: Option<f64>,

    // === Classification ===
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subcategory: Option<String>,
    pub gender: Gender,

    // === Tags ===
    #[serde(default)]
    pub colors: Vec<String>,
    #[serde(default)]
    pub styles: Vec<String>,
    #[serde(default)]
    pub occasions: Vec<String>,
    #[serde(default)]
    pub seasons: Vec<String>,
    #[serde(default)]
    pub attributes: ItemAttributes,

    // === Media ===
    #[serde(default)]
    pub image_urls: Vec<String>,

    /// Opaque embedding vector; not used by attribute-based similarity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,

    // === Lifecycle ===
    pub is_active: bool,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub click_count: u64,
    pub created_at: DateTime<Utc>,

    // === Brand ===
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand_name: Option<String>,
}

impl Item {
    /// Brand key used by the diversity cap: brand name, falling back to
    /// brand id, falling back to a sentinel.
    pub fn brand_key(&self) -> &str {
        self.brand_name
            .as_deref()
            .or(self.brand_id.as_deref())
            .unwrap_or("unknown")
    }
}

/// Typed user action against a catalog item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionType {
    View,
    Like,
    Save,
    Dismiss,
    Purchase,
}

impl InteractionType {
    /// Signed signal weight, monotonic with intent strength.
    ///
    /// Policy constants preserved from the original design; consistency
    /// matters more than the exact values.
    pub fn weight(&self) -> f32 {
        match self {
            InteractionType::View => 0.2,
            InteractionType::Like => 0.5,
            InteractionType::Save => 0.7,
            InteractionType::Dismiss => -0.3,
            InteractionType::Purchase => 1.0,
        }
    }
}

impl std::fmt::Display for InteractionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            InteractionType::View => "view",
            InteractionType::Like => "like",
            InteractionType::Save => "save",
            InteractionType::Dismiss => "dismiss",
            InteractionType::Purchase => "purchase",
        };
        write!(f, "{}", s)
    }
}

/// An interaction row as stored by the remote collaborator
///
/// The engine appends these fire-and-forget and reads them back only in
/// aggregate; the remote store owns the durable history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interaction {
    pub id: Uuid,
    pub viewer_id: ViewerId,
    pub item_id: ItemId,
    pub interaction_type: InteractionType,
    pub weight: f32,
    pub created_at: DateTime<Utc>,
}

/// Ranking strategy selected for a viewer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedTier {
    ColdStart,
    Preference,
    Behavioral,
}

impl std::fmt::Display for FeedTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FeedTier::ColdStart => "cold_start",
            FeedTier::Preference => "preference",
            FeedTier::Behavioral => "behavioral",
        };
        write!(f, "{}", s)
    }
}

/// Explicit viewer preferences on file with the remote collaborator
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default)]
    pub style_tags: Vec<String>,
    #[serde(default)]
    pub favorite_colors: Vec<String>,
    #[serde(default)]
    pub pattern_prefs: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
}

impl Preferences {
    /// The preference tier applies only when style tags or favorite
    /// colors are present; pattern preferences alone do not qualify.
    pub fn is_empty(&self) -> bool {
        self.style_tags.is_empty() && self.favorite_colors.is_empty()
    }
}

/// Insertion-ordered tag → cumulative weight mapping
///
/// Kept as a vector of pairs rather than a map so that top-N ties break
/// by first-seen order, deterministically across runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagCounters(pub Vec<TagWeight>);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagWeight {
    pub tag: String,
    pub weight: f32,
}

impl TagCounters {
    /// Add `delta` to a tag's counter, appending the tag on first sight.
    pub fn increment(&mut self, tag: &str, delta: f32) {
        if let Some(entry) = self.0.iter_mut().find(|e| e.tag == tag) {
            entry.weight += delta;
        } else {
            self.0.push(TagWeight {
                tag: tag.to_string(),
                weight: delta,
            });
        }
    }

    pub fn get(&self, tag: &str) -> Option<f32> {
        self.0.iter().find(|e| e.tag == tag).map(|e| e.weight)
    }

    /// Top `n` tags by descending weight; ties keep first-seen order.
    pub fn top_n(&self, n: usize) -> Vec<String> {
        let mut entries: Vec<&TagWeight> = self.0.iter().collect();
        // sort_by is stable, so equal weights retain insertion order
        entries.sort_by(|a, b| b.weight.partial_cmp(&a.weight).unwrap_or(std::cmp::Ordering::Equal));
        entries.into_iter().take(n).map(|e| e.tag.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Accumulated implicit taste signal for one viewer
///
/// Counters are monotonically increasing until an explicit reset; even a
/// dismiss increments (dismiss shapes candidate selection via seen-ids,
/// not via counters).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StyleCounters {
    #[serde(default)]
    pub styles: TagCounters,
    #[serde(default)]
    pub colors: TagCounters,
    #[serde(default)]
    pub patterns: TagCounters,
    #[serde(default)]
    pub last_synced_at: Option<DateTime<Utc>>,
}

/// Cached first feed page for one viewer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedCacheEntry {
    pub items: Vec<Item>,
    pub tier: FeedTier,
    pub cached_at: DateTime<Utc>,
}

/// Cached similar-items superset for one source item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarCacheEntry {
    pub items: Vec<Item>,
    pub cached_at: DateTime<Utc>,
}

/// A page of ranked feed results
#[derive(Debug, Clone)]
pub struct FeedPage {
    pub items: Vec<Item>,
    pub tier: FeedTier,
    /// Whether this page was served from the feed cache
    pub from_cache: bool,
}
