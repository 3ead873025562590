//! In-memory unit state for tests and local simulation.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod error;

pub use error::Error;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use mongo_store::Store;
use tokio::sync::Mutex;

/// In-memory store. Clones share the same map, so a clone handed to a
/// "restarted" unit sees everything the previous one persisted.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    map: Arc<Mutex<BTreeMap<String, Bytes>>>,
}

impl MemoryStore {
    /// Creates a new, empty `MemoryStore`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    type Error = Error;

    async fn del<K: Into<String> + Send>(&self, key: K) -> Result<(), Self::Error> {
        self.map.lock().await.remove(&key.into());
        Ok(())
    }

    async fn get<K: Into<String> + Send>(&self, key: K) -> Result<Option<Bytes>, Self::Error> {
        Ok(self.map.lock().await.get(&key.into()).cloned())
    }

    async fn keys(&self) -> Result<Vec<String>, Self::Error> {
        Ok(self.map.lock().await.keys().cloned().collect())
    }

    async fn put<K: Into<String> + Send>(&self, key: K, bytes: Bytes) -> Result<(), Self::Error> {
        self.map.lock().await.insert(key.into(), bytes);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_and_get() {
        let store = MemoryStore::new();

        store
            .put("members", Bytes::from_static(b"{}"))
            .await
            .unwrap();

        assert_eq!(
            store.get("members").await.unwrap(),
            Some(Bytes::from_static(b"{}"))
        );
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let store = MemoryStore::new();
        let restarted = store.clone();

        store.put("deferred", Bytes::from_static(b"[]")).await.unwrap();

        assert_eq!(restarted.keys().await.unwrap(), vec!["deferred".to_string()]);

        restarted.del("deferred").await.unwrap();
        assert_eq!(store.get("deferred").await.unwrap(), None);
    }
}
