//! In-memory cache storage.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::CacheStorage;
use crate::{Error, Response};

/// Counters of entry-level cache traffic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub matches: usize,
    pub puts: usize,
}

/// Cache storage held entirely in memory.
///
/// Uses nested BTreeMaps behind a tokio RwLock so listing order is stable.
#[derive(Default)]
pub struct MemoryCacheStorage {
    stores: RwLock<BTreeMap<String, BTreeMap<String, Response>>>,
    matches: AtomicUsize,
    puts: AtomicUsize,
}

impl MemoryCacheStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `match_url` and `put` calls served so far.
    pub fn stats(&self) -> CacheStats {
        CacheStats { matches: self.matches.load(Ordering::Relaxed), puts: self.puts.load(Ordering::Relaxed) }
    }
}

#[async_trait]
impl CacheStorage for MemoryCacheStorage {
    async fn open(&self, name: &str) -> Result<(), Error> {
        let mut stores = self.stores.write().await;
        stores.entry(name.to_string()).or_default();
        Ok(())
    }

    async fn names(&self) -> Result<Vec<String>, Error> {
        let stores = self.stores.read().await;
        Ok(stores.keys().cloned().collect())
    }

    async fn delete(&self, name: &str) -> Result<bool, Error> {
        let mut stores = self.stores.write().await;
        Ok(stores.remove(name).is_some())
    }

    async fn match_url(&self, name: &str, key: &str) -> Result<Option<Response>, Error> {
        self.matches.fetch_add(1, Ordering::Relaxed);
        let stores = self.stores.read().await;
        Ok(stores.get(name).and_then(|entries| entries.get(key)).cloned())
    }

    async fn put(&self, name: &str, key: &str, response: &Response) -> Result<(), Error> {
        self.puts.fetch_add(1, Ordering::Relaxed);
        let mut stores = self.stores.write().await;
        stores
            .entry(name.to_string())
            .or_default()
            .insert(key.to_string(), response.clone());
        Ok(())
    }

    async fn keys(&self, name: &str) -> Result<Vec<String>, Error> {
        let stores = self.stores.read().await;
        Ok(stores.get(name).map(|entries| entries.keys().cloned().collect()).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderMap;

    fn resp(body: &'static str) -> Response {
        Response::new(200, "OK", HeaderMap::new(), body)
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let storage = MemoryCacheStorage::new();
        storage.put("a", "https://example.com/x.css", &resp("one")).await.unwrap();
        storage.put("a", "https://example.com/x.css", &resp("two")).await.unwrap();

        let hit = storage.match_url("a", "https://example.com/x.css").await.unwrap().unwrap();
        assert_eq!(hit.body, "two");
        assert_eq!(storage.keys("a").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_store_is_a_miss() {
        let storage = MemoryCacheStorage::new();
        assert!(storage.match_url("nope", "k").await.unwrap().is_none());
        assert!(storage.keys("nope").await.unwrap().is_empty());
        assert!(!storage.delete("nope").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_drops_entries() {
        let storage = MemoryCacheStorage::new();
        storage.put("old", "k", &resp("x")).await.unwrap();
        storage.open("new").await.unwrap();

        assert!(storage.delete("old").await.unwrap());
        assert_eq!(storage.names().await.unwrap(), vec!["new".to_string()]);
        assert!(storage.match_url("old", "k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_stats_count_entry_traffic() {
        let storage = MemoryCacheStorage::new();
        storage.open("a").await.unwrap();
        storage.keys("a").await.unwrap();
        assert_eq!(storage.stats(), CacheStats::default());

        storage.put("a", "k", &resp("x")).await.unwrap();
        storage.match_url("a", "k").await.unwrap();
        storage.match_url("a", "missing").await.unwrap();
        assert_eq!(storage.stats(), CacheStats { matches: 2, puts: 1 });
    }
}
