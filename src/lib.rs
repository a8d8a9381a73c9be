//! Vitrine - Client-Side Personalization and Caching Engine
//!
//! A Rust engine deciding which catalog items a viewer sees, learning
//! from their behavior, and minimizing redundant network/database access
//! through layered, time-bounded caches:
//! - Three-tier feed selection (cold-start / preference / behavioral)
//! - Attribute-based similar-items scoring with its own cache
//! - Interaction logging with time-windowed view deduplication
//! - Style/color/pattern counter learning with periodic preference sync
//! - Namespaced, TTL-aware local persistence over any async device store
//!
//! # Architecture
//!
//! The engine is organized into several layers:
//! - **Types**: Core data structures (Item, InteractionType, FeedTier, etc.)
//! - **Storage**: The typed TTL key/value layer and device store backends
//! - **Remote**: Trait boundaries for the catalog, preference, and
//!   interaction collaborators
//! - **Engine**: The cooperating services and the facade wiring them up
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use vitrine::{EngineConfig, FeedRequest, PersonalizationEngine, ViewerId};
//! use vitrine::storage::sqlite::SqliteDeviceStore;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let device = Arc::new(SqliteDeviceStore::open("vitrine.db".as_ref()).await?);
//!     let engine = PersonalizationEngine::new(
//!         device, catalog, preferences, interactions, EngineConfig::default());
//!
//!     let viewer = ViewerId::new("viewer-1");
//!     let page = engine.feed_page(Some(&viewer), FeedRequest::default()).await;
//!     println!("{} items via {:?}", page.items.len(), page.tier);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod remote;
pub mod storage;
pub mod types;

// Re-export commonly used types
pub use config::EngineConfig;
pub use engine::{
    FeedRequest, FeedSelector, InteractionLog, PersonalizationEngine, SimilarityEngine,
    StyleCounterStore, SyncManager, GUEST_VIEWER,
};
pub use error::{EngineError, Result};
pub use remote::{
    CatalogBackend, CatalogFilter, CatalogOrder, InteractionBackend, PreferenceBackend,
};
pub use storage::{DeviceStore, KeyValueStore, Namespace};
pub use types::{
    FeedPage, FeedTier, Gender, Interaction, InteractionType, Item, ItemAttributes, ItemId,
    Preferences, StyleCounters, TagCounters, ViewerId,
};
