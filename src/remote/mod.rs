//! Remote collaborator interfaces
//!
//! The engine treats the durable backend as three narrow collaborators:
//! a read-only catalog, a preference record, and an append-only
//! interaction log. Their internals (schema, query execution, transport)
//! are out of scope; the engine only depends on these traits and degrades
//! gracefully when any call fails.

use crate::error::Result;
use crate::types::{Gender, Interaction, InteractionType, Item, ItemId, Preferences, ViewerId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Catalog query filter
#[derive(Debug, Clone, Default)]
pub struct CatalogFilter {
    pub gender: Option<Gender>,
    pub category: Option<String>,
    /// Restrict to these ids (anchor resolution)
    pub ids: Option<Vec<ItemId>>,
    pub active_only: bool,
}

/// Catalog result ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogOrder {
    /// `(is_featured desc, created_at desc)`, the cold-start ordering
    FeaturedNewest,
    /// `created_at desc`
    Newest,
}

/// Read-only catalog collaborator; the engine never writes items
#[async_trait]
pub trait CatalogBackend: Send + Sync {
    async fn query(
        &self,
        filter: &CatalogFilter,
        order: CatalogOrder,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Item>>;

    async fn item_by_id(&self, id: &ItemId) -> Result<Option<Item>>;
}

/// Durable preference record collaborator
#[async_trait]
pub trait PreferenceBackend: Send + Sync {
    async fn read_preferences(&self, viewer: &ViewerId) -> Result<Option<Preferences>>;

    async fn upsert_preferences(
        &self,
        viewer: &ViewerId,
        style_tags: &[String],
        favorite_colors: &[String],
        pattern_prefs: &[String],
        updated_at: DateTime<Utc>,
    ) -> Result<()>;
}

/// Durable interaction history collaborator
#[async_trait]
pub trait InteractionBackend: Send + Sync {
    async fn insert_interaction(
        &self,
        viewer: &ViewerId,
        item: &ItemId,
        interaction_type: InteractionType,
        weight: f32,
    ) -> Result<()>;

    /// Most-recent-first rows since the given instant, up to `limit`
    async fn recent_interactions(
        &self,
        viewer: &ViewerId,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Interaction>>;
}
