//! Local storage layer for the personalization engine
//!
//! Provides the async device-store abstraction plus the typed, TTL-aware
//! key/value layer the engine components use for all local state: feed
//! cache, seen-ids, style counters, product/similar caches, view dedup
//! markers, recency lists, and the view cadence counter.
//!
//! Persistence is best-effort throughout: a failed read behaves like an
//! absent key and a failed write is logged and dropped. The engine must
//! keep working (un-personalized at worst) with no local store at all.

pub mod memory;
pub mod sqlite;

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// Async byte-oriented device store (the platform key/value facility)
#[async_trait]
pub trait DeviceStore: Send + Sync {
    /// Fetch the raw value for a key, `None` when absent
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Store the raw value for a key, replacing any existing value
    async fn set(&self, key: &str, value: Vec<u8>) -> Result<()>;

    /// Remove a key; removing an absent key is not an error
    async fn delete(&self, key: &str) -> Result<()>;

    /// Remove a batch of keys
    async fn delete_many(&self, keys: &[String]) -> Result<()>;
}

/// Record families in the local store, one per persisted key layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    /// `feed_cache:{viewerId}` → cached first feed page
    FeedCache,
    /// `seen_ids:{viewerId}` → rolling seen-item id list
    SeenIds,
    /// `style_counters:{viewerId}` → accumulated taste counters
    StyleCounters,
    /// `product_cache:{itemId}` → cached catalog item
    ProductCache,
    /// `similar_cache:{itemId}` → cached similar-items superset
    SimilarCache,
    /// `last_view:{itemId}` → view dedup marker
    LastView,
    /// `recently_viewed:{viewerId}` → most-recent-first item id list
    RecentlyViewed,
    /// `view_count:{viewerId}` → view cadence counter
    ViewCount,
}

impl Namespace {
    pub fn prefix(&self) -> &'static str {
        match self {
            Namespace::FeedCache => "feed_cache",
            Namespace::SeenIds => "seen_ids",
            Namespace::StyleCounters => "style_counters",
            Namespace::ProductCache => "product_cache",
            Namespace::SimilarCache => "similar_cache",
            Namespace::LastView => "last_view",
            Namespace::RecentlyViewed => "recently_viewed",
            Namespace::ViewCount => "view_count",
        }
    }

    /// Full storage key for an id within this namespace
    pub fn key(&self, id: &str) -> String {
        format!("{}:{}", self.prefix(), id)
    }
}

/// On-device record envelope carrying explicit TTL metadata
///
/// `ttl_secs = None` means the record never expires. Expiry is enforced
/// lazily at read time; stale records are left in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub value: T,
    pub cached_at: DateTime<Utc>,
    pub ttl_secs: Option<i64>,
}

impl<T> Envelope<T> {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.ttl_secs {
            Some(ttl) => now - self.cached_at > Duration::seconds(ttl),
            None => false,
        }
    }
}

/// Typed, TTL-aware view over a [`DeviceStore`]
///
/// All operations degrade: device failures and unparsable records read as
/// absent, failed writes are logged and dropped. Read-modify-write
/// sequences go through [`KeyValueStore::update`], which serializes them
/// so concurrent same-key writers cannot lose updates.
pub struct KeyValueStore {
    device: Arc<dyn DeviceStore>,
    write_lock: tokio::sync::Mutex<()>,
}

impl KeyValueStore {
    pub fn new(device: Arc<dyn DeviceStore>) -> Self {
        Self {
            device,
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Underlying device store (shared with any other owners)
    pub fn device(&self) -> &Arc<dyn DeviceStore> {
        &self.device
    }

    /// Typed read; expired, corrupt, and failed reads all return `None`
    pub async fn get<T: DeserializeOwned>(&self, ns: Namespace, id: &str) -> Option<T> {
        let key = ns.key(id);
        let bytes = match self.device.get(&key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                warn!("Device read failed for {}: {}", key, e);
                return None;
            }
        };

        let envelope: Envelope<T> = match serde_json::from_slice(&bytes) {
            Ok(envelope) => envelope,
            Err(e) => {
                // Corrupt entries are indistinguishable from misses
                warn!("Unparsable record at {}: {}", key, e);
                return None;
            }
        };

        if envelope.is_expired(Utc::now()) {
            debug!("Lazy-expired record at {}", key);
            return None;
        }

        Some(envelope.value)
    }

    /// Typed best-effort write
    pub async fn set<T: Serialize>(&self, ns: Namespace, id: &str, value: &T, ttl_secs: Option<i64>) {
        let key = ns.key(id);
        let envelope = Envelope {
            value,
            cached_at: Utc::now(),
            ttl_secs,
        };
        let bytes = match serde_json::to_vec(&envelope) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Failed to encode record for {}: {}", key, e);
                return;
            }
        };
        if let Err(e) = self.device.set(&key, bytes).await {
            warn!("Device write failed for {}: {}", key, e);
        }
    }

    /// Best-effort delete
    pub async fn delete(&self, ns: Namespace, id: &str) {
        let key = ns.key(id);
        if let Err(e) = self.device.delete(&key).await {
            warn!("Device delete failed for {}: {}", key, e);
        }
    }

    /// Best-effort batch delete
    pub async fn delete_all(&self, keys: &[(Namespace, String)]) {
        let full_keys: Vec<String> = keys.iter().map(|(ns, id)| ns.key(id)).collect();
        if let Err(e) = self.device.delete_many(&full_keys).await {
            warn!("Device batch delete failed: {}", e);
        }
    }

    /// Read-modify-write in one logical step
    ///
    /// Holds an internal lock across the read and the write so two
    /// updates of the same key cannot interleave and lose increments.
    /// The closure receives the current (unexpired) value and returns
    /// the replacement, which is also handed back to the caller.
    pub async fn update<T, F>(&self, ns: Namespace, id: &str, ttl_secs: Option<i64>, f: F) -> T
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(Option<T>) -> T,
    {
        let _guard = self.write_lock.lock().await;
        let current = self.get::<T>(ns, id).await;
        let next = f(current);
        self.set(ns, id, &next, ttl_secs).await;
        next
    }
}
