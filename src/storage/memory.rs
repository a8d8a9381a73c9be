//! In-memory device store
//!
//! Used by tests and as the default store when no durable device storage
//! is wired in. The failure toggle lets tests exercise the engine's
//! degrade-to-absent paths.

use crate::error::{EngineError, Result};
use crate::storage::DeviceStore;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

/// HashMap-backed [`DeviceStore`]
#[derive(Default)]
pub struct MemoryDeviceStore {
    entries: RwLock<HashMap<String, Vec<u8>>>,
    failing: AtomicBool,
}

impl MemoryDeviceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent operation fail, until reset
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(EngineError::Other("device store unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl DeviceStore for MemoryDeviceStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.check()?;
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<()> {
        self.check()?;
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.check()?;
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn delete_many(&self, keys: &[String]) -> Result<()> {
        self.check()?;
        let mut entries = self.entries.write().await;
        for key in keys {
            entries.remove(key);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_delete() {
        let store = MemoryDeviceStore::new();
        store.set("k", b"v".to_vec()).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(b"v".to_vec()));

        store.delete("k").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);

        // Deleting an absent key is fine
        store.delete("k").await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_many() {
        let store = MemoryDeviceStore::new();
        store.set("a", b"1".to_vec()).await.unwrap();
        store.set("b", b"2".to_vec()).await.unwrap();
        store.set("c", b"3".to_vec()).await.unwrap();

        store
            .delete_many(&["a".to_string(), "c".to_string()])
            .await
            .unwrap();
        assert!(store.get("a").await.unwrap().is_none());
        assert!(store.get("b").await.unwrap().is_some());
        assert!(store.get("c").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failure_toggle() {
        let store = MemoryDeviceStore::new();
        store.set_failing(true);
        assert!(store.get("k").await.is_err());
        store.set_failing(false);
        assert!(store.get("k").await.is_ok());
    }
}
