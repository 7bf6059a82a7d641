//! In-memory cache storage.
//!
//! Uses a BTreeMap with tokio RwLock for concurrent access, so names and keys
//! come back sorted without extra work.

use super::{CacheStorage, CacheUsage};
use crate::{Error, Response};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

type Generation = BTreeMap<String, Response>;

/// Process-local cache storage. Clones share the same underlying map.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    caches: Arc<RwLock<BTreeMap<String, Generation>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStorage for MemoryStorage {
    async fn open(&self, name: &str) -> Result<(), Error> {
        self.caches.write().await.entry(name.to_string()).or_default();
        Ok(())
    }

    async fn has(&self, name: &str) -> Result<bool, Error> {
        Ok(self.caches.read().await.contains_key(name))
    }

    async fn names(&self) -> Result<Vec<String>, Error> {
        Ok(self.caches.read().await.keys().cloned().collect())
    }

    async fn delete(&self, name: &str) -> Result<bool, Error> {
        Ok(self.caches.write().await.remove(name).is_some())
    }

    async fn match_url(&self, name: &str, url: &str) -> Result<Option<Response>, Error> {
        let caches = self.caches.read().await;
        Ok(caches.get(name).and_then(|generation| generation.get(url)).cloned())
    }

    async fn put(&self, name: &str, url: &str, response: &Response) -> Result<(), Error> {
        self.caches
            .write()
            .await
            .entry(name.to_string())
            .or_default()
            .insert(url.to_string(), response.clone());
        Ok(())
    }

    async fn put_all(&self, name: &str, entries: Vec<(String, Response)>) -> Result<(), Error> {
        let mut caches = self.caches.write().await;
        caches.entry(name.to_string()).or_default().extend(entries);
        Ok(())
    }

    async fn delete_entry(&self, name: &str, url: &str) -> Result<bool, Error> {
        let mut caches = self.caches.write().await;
        Ok(caches.get_mut(name).is_some_and(|generation| generation.remove(url).is_some()))
    }

    async fn keys(&self, name: &str) -> Result<Vec<String>, Error> {
        let caches = self.caches.read().await;
        Ok(caches
            .get(name)
            .map(|generation| generation.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn usage(&self, name: &str) -> Result<CacheUsage, Error> {
        let caches = self.caches.read().await;
        Ok(caches
            .get(name)
            .map(|generation| CacheUsage {
                entries: generation.len() as u64,
                bytes: generation.values().map(|r| r.body.len() as u64).sum(),
            })
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_round_trip_preserves_headers() {
        let storage = MemoryStorage::new();
        let url = "http://localhost:5173/assets/logo.svg";
        let response = Response::new(url, 200, "<svg/>").with_header("content-type", "image/svg+xml");

        storage.put("misfigus-v1", url, &response).await.unwrap();

        let cached = storage.match_url("misfigus-v1", url).await.unwrap().unwrap();
        assert_eq!(cached.headers, response.headers);
        assert_eq!(cached.body, response.body);
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let storage = MemoryStorage::new();
        let other = storage.clone();
        storage.open("misfigus-v1").await.unwrap();
        assert!(other.has("misfigus-v1").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_generation() {
        let storage = MemoryStorage::new();
        storage.open("misfigus-v1").await.unwrap();
        storage.open("misfigus-v2").await.unwrap();

        assert!(storage.delete("misfigus-v1").await.unwrap());
        assert_eq!(storage.names().await.unwrap(), vec!["misfigus-v2".to_string()]);
        assert!(storage.keys("misfigus-v1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_usage_of_missing_cache() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.usage("nope").await.unwrap(), CacheUsage::default());
        assert!(!storage.delete_entry("nope", "http://localhost/").await.unwrap());
    }
}
