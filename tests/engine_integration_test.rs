//! End-to-end flows through the engine facade: interaction logging,
//! counter learning, sync triggers, and their effect on the feed.

mod common;

use common::*;
use std::sync::Arc;
use vitrine::storage::memory::MemoryDeviceStore;
use vitrine::types::FeedCacheEntry;
use vitrine::{
    EngineConfig, FeedRequest, InteractionType, ItemId, KeyValueStore, Namespace,
    PersonalizationEngine, ViewerId,
};

struct World {
    catalog: Arc<FakeCatalog>,
    prefs: Arc<FakePreferences>,
    interactions: Arc<FakeInteractions>,
    kv: KeyValueStore,
    engine: PersonalizationEngine,
}

fn world(pool: Vec<vitrine::Item>) -> World {
    init_tracing();
    let catalog = Arc::new(FakeCatalog::with_pool(pool));
    let prefs = Arc::new(FakePreferences::default());
    let interactions = Arc::new(FakeInteractions::default());
    let device = Arc::new(MemoryDeviceStore::new());

    let config = EngineConfig {
        rng_seed: Some(11),
        ..Default::default()
    };
    let engine = PersonalizationEngine::new(
        device.clone(),
        catalog.clone(),
        prefs.clone(),
        interactions.clone(),
        config,
    );

    World {
        catalog,
        prefs,
        interactions,
        kv: KeyValueStore::new(device),
        engine,
    }
}

#[tokio::test]
async fn test_triple_like_accumulates_equal_counters() {
    let w = world(vec![]);
    let viewer = ViewerId::from("v1");
    let liked = styled("i1", &["minimalist", "classic"]);

    for _ in 0..3 {
        assert!(w.engine.log_interaction(Some(&viewer), &liked, InteractionType::Like).await);
    }

    let counters = w.engine.counters().counters(&viewer).await;
    assert_eq!(counters.styles.get("minimalist"), Some(1.5));
    assert_eq!(counters.styles.get("classic"), Some(1.5));

    // Tie broken deterministically by first-seen order
    assert_eq!(counters.styles.top_n(1), vec!["minimalist".to_string()]);
}

#[tokio::test]
async fn test_save_flushes_and_invalidates_feed_cache() {
    let w = world(vec![branded("a", "A"), branded("b", "B")]);
    let viewer = ViewerId::from("v1");

    // Populate the viewer's feed cache
    let page = w.engine.feed_page(Some(&viewer), FeedRequest::default()).await;
    assert!(!page.from_cache);
    let cached: Option<FeedCacheEntry> = w.kv.get(Namespace::FeedCache, "v1").await;
    assert!(cached.is_some());

    let saved = styled("s1", &["street"]);
    assert!(w.engine.log_interaction(Some(&viewer), &saved, InteractionType::Save).await);

    // Same logical operation: preferences upserted, cache entry gone
    assert_eq!(w.prefs.upserts.lock().unwrap().len(), 1);
    let cached: Option<FeedCacheEntry> = w.kv.get(Namespace::FeedCache, "v1").await;
    assert!(cached.is_none());
}

#[tokio::test]
async fn test_view_dedup_through_facade() {
    let w = world(vec![]);
    let viewer = ViewerId::from("v1");
    let viewed = styled("i1", &["boho"]);

    assert!(w.engine.log_interaction(Some(&viewer), &viewed, InteractionType::View).await);
    assert!(!w.engine.log_interaction(Some(&viewer), &viewed, InteractionType::View).await);

    // The deduplicated view left no trace anywhere
    let counters = w.engine.counters().counters(&viewer).await;
    assert_eq!(counters.styles.get("boho"), Some(0.2));
    settle().await;
    assert_eq!(w.interactions.rows.lock().unwrap().len(), 1);

    // A like right after still records
    assert!(w.engine.log_interaction(Some(&viewer), &viewed, InteractionType::Like).await);
}

#[tokio::test]
async fn test_anonymous_interactions_are_ignored() {
    let w = world(vec![]);
    let viewed = styled("i1", &["boho"]);

    assert!(!w.engine.log_interaction(None, &viewed, InteractionType::Purchase).await);
    settle().await;
    assert!(w.interactions.rows.lock().unwrap().is_empty());
    assert!(w.prefs.upserts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_dismiss_marks_seen_and_excludes_from_feed() {
    let w = world(vec![branded("a", "A"), branded("b", "B")]);
    let viewer = ViewerId::from("v1");

    let dismissed = w.catalog.pool.lock().unwrap()[0].clone();
    assert!(w.engine.log_interaction(Some(&viewer), &dismissed, InteractionType::Dismiss).await);

    let seen = w.engine.feed().seen_ids(Some(&viewer)).await;
    assert_eq!(seen, vec![ItemId::from("a")]);

    let page = w.engine.feed_page(Some(&viewer), FeedRequest::default()).await;
    assert!(page.items.iter().all(|i| i.id != ItemId::from("a")));
}

#[tokio::test]
async fn test_cadence_flush_on_tenth_view() {
    let w = world(vec![]);
    let viewer = ViewerId::from("v1");

    for i in 0..9 {
        let viewed = styled(&format!("i{}", i), &["street"]);
        w.engine.log_interaction(Some(&viewer), &viewed, InteractionType::View).await;
    }
    assert!(w.prefs.upserts.lock().unwrap().is_empty());

    let viewed = styled("i9", &["street"]);
    w.engine.log_interaction(Some(&viewer), &viewed, InteractionType::View).await;

    let upserts = w.prefs.upserts.lock().unwrap();
    assert_eq!(upserts.len(), 1);
    assert_eq!(upserts[0].1, vec!["street".to_string()]);
}

#[tokio::test]
async fn test_cadence_counter_survives_engine_restart() {
    let catalog = Arc::new(FakeCatalog::default());
    let prefs = Arc::new(FakePreferences::default());
    let interactions = Arc::new(FakeInteractions::default());
    let device = Arc::new(MemoryDeviceStore::new());
    let viewer = ViewerId::from("v1");

    let engine = PersonalizationEngine::new(
        device.clone(),
        catalog.clone(),
        prefs.clone(),
        interactions.clone(),
        EngineConfig::default(),
    );
    for i in 0..6 {
        let viewed = styled(&format!("i{}", i), &["street"]);
        engine.log_interaction(Some(&viewer), &viewed, InteractionType::View).await;
    }
    drop(engine);

    // A fresh engine over the same device picks up the cadence state
    let engine = PersonalizationEngine::new(
        device.clone(),
        catalog,
        prefs.clone(),
        interactions,
        EngineConfig::default(),
    );
    for i in 6..10 {
        let viewed = styled(&format!("i{}", i), &["street"]);
        engine.log_interaction(Some(&viewer), &viewed, InteractionType::View).await;
    }

    assert_eq!(prefs.upserts.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_reset_style_profile_clears_learning_and_cache() {
    let w = world(vec![branded("a", "A")]);
    let viewer = ViewerId::from("v1");

    let liked = styled("i1", &["boho"]);
    w.engine.log_interaction(Some(&viewer), &liked, InteractionType::Like).await;
    w.engine.feed_page(Some(&viewer), FeedRequest::default()).await;

    w.engine.reset_style_profile(&viewer).await;

    assert!(w.engine.counters().counters(&viewer).await.styles.is_empty());
    let cached: Option<FeedCacheEntry> = w.kv.get(Namespace::FeedCache, "v1").await;
    assert!(cached.is_none());
}

#[tokio::test]
async fn test_interaction_backend_down_feed_still_serves() {
    let w = world(vec![branded("a", "A"), branded("b", "B")]);
    let viewer = ViewerId::from("v1");
    w.interactions.set_failing(true);

    // The view records locally even though the remote write fails
    let viewed = w.catalog.pool.lock().unwrap()[0].clone();
    assert!(w.engine.log_interaction(Some(&viewer), &viewed, InteractionType::View).await);
    settle().await;

    // History falls back to the recency list, scores to flat weights
    let page = w.engine.feed_page(Some(&viewer), FeedRequest::default()).await;
    assert_eq!(page.tier, vitrine::FeedTier::Behavioral);
    assert!(!page.items.is_empty());
}

#[tokio::test]
async fn test_similar_items_respect_seen_ids() {
    let mut source = item("src");
    source.category = "dresses".to_string();
    let mut a = item("a");
    a.category = "dresses".to_string();
    let mut b = item("b");
    b.category = "dresses".to_string();

    let w = world(vec![source.clone(), a, b]);
    let viewer = ViewerId::from("v1");

    w.engine.feed().mark_seen(Some(&viewer), &[ItemId::from("a")]).await;

    let similar = w.engine.similar_items(Some(&viewer), &source, 10).await;
    let ids: Vec<ItemId> = similar.iter().map(|i| i.id.clone()).collect();
    assert!(ids.contains(&ItemId::from("b")));
    assert!(!ids.contains(&ItemId::from("a")));
    assert!(!ids.contains(&ItemId::from("src")));
}

#[tokio::test]
async fn test_product_lookup_uses_cache_after_first_fetch() {
    let w = world(vec![item("a")]);

    assert!(w.engine.product(&ItemId::from("a")).await.is_some());

    // Catalog can disappear; the product cache still answers
    w.catalog.set_failing(true);
    assert!(w.engine.product(&ItemId::from("a")).await.is_some());
    assert!(w.engine.product(&ItemId::from("missing")).await.is_none());
}

#[tokio::test]
async fn test_foreground_resume_refreshes_after_long_background() {
    let w = world(vec![branded("a", "A"), branded("b", "B")]);
    let viewer = ViewerId::from("v1");

    w.engine.feed_page(Some(&viewer), FeedRequest::default()).await;

    // Change the catalog while "backgrounded"
    w.catalog.pool.lock().unwrap().push(branded("c", "C"));

    // Short absence: no refresh scheduled, cache untouched
    w.engine.on_app_foreground(Some(&viewer), std::time::Duration::from_secs(60));
    settle().await;
    let cached: Option<FeedCacheEntry> = w.kv.get(Namespace::FeedCache, "v1").await;
    assert!(cached.unwrap().items.iter().all(|i| i.id != ItemId::from("c")));

    // Long absence: detached refresh rewrites the cache
    w.engine.on_app_foreground(Some(&viewer), std::time::Duration::from_secs(600));
    settle().await;

    let cached: Option<FeedCacheEntry> = w.kv.get(Namespace::FeedCache, "v1").await;
    let entry = cached.expect("refreshed cache entry");
    assert!(entry.items.iter().any(|i| i.id == ItemId::from("c")));
}

#[tokio::test]
async fn test_background_transition_flushes_counters() {
    let w = world(vec![]);
    let viewer = ViewerId::from("v1");

    let viewed = styled("i1", &["minimalist"]);
    w.engine.log_interaction(Some(&viewer), &viewed, InteractionType::View).await;

    w.engine.on_app_background(Some(&viewer)).await;
    assert_eq!(w.prefs.upserts.lock().unwrap().len(), 1);

    let synced = w.engine.counters().counters(&viewer).await;
    assert!(synced.last_synced_at.is_some());
}
