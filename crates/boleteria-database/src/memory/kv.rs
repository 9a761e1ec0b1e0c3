//! In-memory key-value store for tests and single-node deployments.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

use boleteria_core::result::AppResult;
use boleteria_core::traits::KeyValueStore;

/// Volatile key-value store. Survives nothing; useful wherever the
/// client profile does not need to outlive the process.
#[derive(Debug, Clone, Default)]
pub struct MemoryKvStore {
    entries: Arc<DashMap<String, String>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl KeyValueStore for MemoryKvStore {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self.entries.get(key).map(|entry| entry.value().clone()))
    }

    async fn put(&self, key: &str, value: &str) -> AppResult<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> AppResult<()> {
        self.entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_round_trip_and_remove() {
        let store = MemoryKvStore::new();
        assert!(store.get("anon_session_id").await.unwrap().is_none());

        store.put("anon_session_id", "abc-123").await.unwrap();
        assert_eq!(
            store.get("anon_session_id").await.unwrap().as_deref(),
            Some("abc-123")
        );

        store.remove("anon_session_id").await.unwrap();
        assert!(store.get("anon_session_id").await.unwrap().is_none());
        // Removing again is not an error.
        store.remove("anon_session_id").await.unwrap();
    }

    #[tokio::test]
    async fn test_json_helpers() {
        let store = MemoryKvStore::new();
        store.put_json("numbers", &vec![1, 2, 3]).await.unwrap();
        let back: Option<Vec<i32>> = store.get_json("numbers").await.unwrap();
        assert_eq!(back, Some(vec![1, 2, 3]));
    }
}
