//! Shared fixtures for integration tests
//!
//! In-memory fakes for the three remote collaborators, with failure
//! injection to exercise the engine's fallback paths, plus catalog item
//! builders.

// Each test binary uses its own subset of these fixtures
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use uuid::Uuid;
use vitrine::error::{EngineError, Result};
use vitrine::types::{
    Gender, Interaction, InteractionType, Item, ItemAttributes, ItemId, Preferences, ViewerId,
};
use vitrine::{CatalogBackend, CatalogFilter, CatalogOrder, InteractionBackend, PreferenceBackend};

/// Catalog item builder with sensible defaults
pub fn item(id: &str) -> Item {
    Item {
        id: ItemId::from(id),
        title: format!("Item {}", id),
        description: String::new(),
        price: 50.0,
        sale_price: None,
        category: "tops".to_string(),
        subcategory: None,
        gender: Gender::Women,
        colors: vec![],
        styles: vec![],
        occasions: vec![],
        seasons: vec![],
        attributes: ItemAttributes::default(),
        image_urls: vec![],
        embedding: None,
        is_active: true,
        is_featured: false,
        click_count: 0,
        created_at: Utc::now(),
        brand_id: None,
        brand_name: None,
    }
}

pub fn branded(id: &str, brand: &str) -> Item {
    let mut it = item(id);
    it.brand_name = Some(brand.to_string());
    it
}

pub fn styled(id: &str, styles: &[&str]) -> Item {
    let mut it = item(id);
    it.styles = styles.iter().map(|s| s.to_string()).collect();
    it
}

/// In-memory catalog collaborator
#[derive(Default)]
pub struct FakeCatalog {
    pub pool: Mutex<Vec<Item>>,
    pub failing: AtomicBool,
}

impl FakeCatalog {
    pub fn with_pool(pool: Vec<Item>) -> Self {
        Self {
            pool: Mutex::new(pool),
            failing: AtomicBool::new(false),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(EngineError::Remote("catalog unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl CatalogBackend for FakeCatalog {
    async fn query(
        &self,
        filter: &CatalogFilter,
        order: CatalogOrder,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Item>> {
        self.check()?;
        let mut items: Vec<Item> = self
            .pool
            .lock()
            .unwrap()
            .iter()
            .filter(|it| !filter.active_only || it.is_active)
            .filter(|it| filter.gender.map_or(true, |g| it.gender == g || it.gender == Gender::Unisex))
            .filter(|it| filter.category.as_ref().map_or(true, |c| it.category == *c))
            .filter(|it| {
                filter
                    .ids
                    .as_ref()
                    .map_or(true, |ids| ids.contains(&it.id))
            })
            .cloned()
            .collect();

        match order {
            CatalogOrder::FeaturedNewest => {
                items.sort_by(|a, b| {
                    b.is_featured
                        .cmp(&a.is_featured)
                        .then(b.created_at.cmp(&a.created_at))
                });
            }
            CatalogOrder::Newest => {
                items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            }
        }

        Ok(items.into_iter().skip(offset).take(limit).collect())
    }

    async fn item_by_id(&self, id: &ItemId) -> Result<Option<Item>> {
        self.check()?;
        Ok(self.pool.lock().unwrap().iter().find(|it| it.id == *id).cloned())
    }
}

/// In-memory preference collaborator
#[derive(Default)]
pub struct FakePreferences {
    pub records: Mutex<std::collections::HashMap<String, Preferences>>,
    pub upserts: Mutex<Vec<(ViewerId, Vec<String>, Vec<String>, Vec<String>)>>,
    pub failing: AtomicBool,
}

impl FakePreferences {
    pub fn seed(&self, viewer: &ViewerId, prefs: Preferences) {
        self.records
            .lock()
            .unwrap()
            .insert(viewer.as_str().to_string(), prefs);
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(EngineError::Remote("preferences unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl PreferenceBackend for FakePreferences {
    async fn read_preferences(&self, viewer: &ViewerId) -> Result<Option<Preferences>> {
        self.check()?;
        Ok(self.records.lock().unwrap().get(viewer.as_str()).cloned())
    }

    async fn upsert_preferences(
        &self,
        viewer: &ViewerId,
        style_tags: &[String],
        favorite_colors: &[String],
        pattern_prefs: &[String],
        _updated_at: DateTime<Utc>,
    ) -> Result<()> {
        self.check()?;
        self.upserts.lock().unwrap().push((
            viewer.clone(),
            style_tags.to_vec(),
            favorite_colors.to_vec(),
            pattern_prefs.to_vec(),
        ));
        Ok(())
    }
}

/// In-memory interaction collaborator
#[derive(Default)]
pub struct FakeInteractions {
    pub rows: Mutex<Vec<Interaction>>,
    pub failing: AtomicBool,
}

impl FakeInteractions {
    /// Seed a historical row directly, bypassing the engine
    pub fn seed(&self, viewer: &ViewerId, item: &ItemId, ty: InteractionType, age: Duration) {
        self.rows.lock().unwrap().push(Interaction {
            id: Uuid::new_v4(),
            viewer_id: viewer.clone(),
            item_id: item.clone(),
            interaction_type: ty,
            weight: ty.weight(),
            created_at: Utc::now() - age,
        });
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(EngineError::Remote("interactions unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl InteractionBackend for FakeInteractions {
    async fn insert_interaction(
        &self,
        viewer: &ViewerId,
        item: &ItemId,
        interaction_type: InteractionType,
        weight: f32,
    ) -> Result<()> {
        self.check()?;
        self.rows.lock().unwrap().push(Interaction {
            id: Uuid::new_v4(),
            viewer_id: viewer.clone(),
            item_id: item.clone(),
            interaction_type,
            weight,
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn recent_interactions(
        &self,
        viewer: &ViewerId,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Interaction>> {
        self.check()?;
        let rows = self.rows.lock().unwrap();
        let mut matching: Vec<Interaction> = rows
            .iter()
            .filter(|r| r.viewer_id == *viewer && r.created_at >= since)
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        matching.truncate(limit);
        Ok(matching)
    }
}

/// Let detached fire-and-forget tasks run to completion
pub async fn settle() {
    tokio::time::sleep(std::time::Duration::from_millis(25)).await;
}

/// Opt-in engine log output while debugging tests (RUST_LOG=debug)
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}
