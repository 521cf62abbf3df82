//! Named, versioned response caches.
//!
//! The controller talks to storage only through [`CacheStorage`], a small
//! key-value interface modelled on the browser cache API:
//!
//! - Stores are addressed by name; the current generation's name embeds the
//!   deploy version
//! - Entries are keyed by request URL and overwritten on every `put`
//! - Deleting a store drops all of its entries
//!
//! Two backends ship with the crate: [`MemoryCacheStorage`] for tests and
//! ephemeral hosts, and [`CacheDb`], a SQLite store that survives restarts.

pub mod connection;
pub mod entries;
pub mod hash;
pub mod memory;
pub mod migrations;

use std::sync::Arc;

use async_trait::async_trait;

pub use crate::Error;
use crate::Response;

pub use connection::CacheDb;
pub use hash::content_hash;
pub use memory::{CacheStats, MemoryCacheStorage};

/// Storage for named response caches.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Create the named store if it doesn't exist yet.
    async fn open(&self, name: &str) -> Result<(), Error>;

    /// Names of every store, sorted.
    async fn names(&self) -> Result<Vec<String>, Error>;

    /// Delete a store and its entries. Returns false if it didn't exist.
    async fn delete(&self, name: &str) -> Result<bool, Error>;

    /// Look up the entry stored under `key`. A missing store is a miss.
    async fn match_url(&self, name: &str, key: &str) -> Result<Option<Response>, Error>;

    /// Store `response` under `key`, replacing any previous entry.
    async fn put(&self, name: &str, key: &str, response: &Response) -> Result<(), Error>;

    /// Keys of every entry in the store. A missing store has no keys.
    async fn keys(&self, name: &str) -> Result<Vec<String>, Error>;
}

/// Handle on one cache generation.
#[derive(Clone)]
pub struct Generation {
    storage: Arc<dyn CacheStorage>,
    name: String,
}

impl Generation {
    /// Open (creating if needed) the generation called `name`.
    pub async fn open(storage: Arc<dyn CacheStorage>, name: impl Into<String>) -> Result<Self, Error> {
        let name = name.into();
        storage.open(&name).await?;
        Ok(Self { storage, name })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn get(&self, key: &str) -> Result<Option<Response>, Error> {
        self.storage.match_url(&self.name, key).await
    }

    pub async fn put(&self, key: &str, response: &Response) -> Result<(), Error> {
        self.storage.put(&self.name, key, response).await
    }

    pub async fn keys(&self) -> Result<Vec<String>, Error> {
        self.storage.keys(&self.name).await
    }
}

impl std::fmt::Debug for Generation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Generation").field("name", &self.name).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderMap;

    #[tokio::test]
    async fn test_generation_round_trip() {
        let storage: Arc<dyn CacheStorage> = Arc::new(MemoryCacheStorage::new());
        let generation = Generation::open(storage.clone(), "site-cache-v1").await.unwrap();
        assert_eq!(generation.name(), "site-cache-v1");
        assert_eq!(storage.names().await.unwrap(), vec!["site-cache-v1".to_string()]);

        let resp = Response::new(200, "OK", HeaderMap::new(), "icon");
        generation.put("https://example.com/favicon.ico", &resp).await.unwrap();

        let hit = generation.get("https://example.com/favicon.ico").await.unwrap();
        assert_eq!(hit, Some(resp));
        assert_eq!(generation.keys().await.unwrap(), vec!["https://example.com/favicon.ico".to_string()]);
    }
}
