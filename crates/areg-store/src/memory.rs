use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::{StoreError, StoreResult};
use crate::keys::{validate_key, validate_prefix};
use crate::traits::ObjectStorage;

/// In-memory, HashMap-based object storage.
///
/// Intended for tests and local runs. Containers are `BTreeMap`s so listings
/// come out sorted. `Bytes` values are reference-counted, so reads do not
/// copy payloads.
pub struct InMemoryObjectStorage {
    containers: RwLock<HashMap<String, BTreeMap<String, Bytes>>>,
}

impl InMemoryObjectStorage {
    pub fn new() -> Self {
        Self {
            containers: RwLock::new(HashMap::new()),
        }
    }

    /// Names of all containers, sorted.
    pub fn containers(&self) -> Vec<String> {
        let map = self.containers.read().expect("lock poisoned");
        let mut names: Vec<String> = map.keys().cloned().collect();
        names.sort();
        names
    }

    /// Total number of stored objects across all containers.
    pub fn len(&self) -> usize {
        self.containers
            .read()
            .expect("lock poisoned")
            .values()
            .map(BTreeMap::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryObjectStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ObjectStorage for InMemoryObjectStorage {
    async fn ensure_container(&self, prefix: &str) -> StoreResult<()> {
        validate_prefix(prefix)?;
        let mut map = self.containers.write().expect("lock poisoned");
        map.entry(prefix.to_string()).or_default();
        Ok(())
    }

    async fn put(&self, prefix: &str, key: &str, data: Bytes) -> StoreResult<()> {
        validate_prefix(prefix)?;
        validate_key(key)?;
        let mut map = self.containers.write().expect("lock poisoned");
        map.entry(prefix.to_string())
            .or_default()
            .insert(key.to_string(), data);
        Ok(())
    }

    async fn get(&self, prefix: &str, key: &str) -> StoreResult<Bytes> {
        validate_prefix(prefix)?;
        validate_key(key)?;
        let map = self.containers.read().expect("lock poisoned");
        map.get(prefix)
            .and_then(|c| c.get(key))
            .cloned()
            .ok_or_else(|| StoreError::not_found(prefix, key))
    }

    async fn exists(&self, prefix: &str, key: &str) -> StoreResult<bool> {
        validate_prefix(prefix)?;
        validate_key(key)?;
        let map = self.containers.read().expect("lock poisoned");
        Ok(map.get(prefix).is_some_and(|c| c.contains_key(key)))
    }

    async fn delete(&self, prefix: &str, key: &str) -> StoreResult<()> {
        validate_prefix(prefix)?;
        validate_key(key)?;
        let mut map = self.containers.write().expect("lock poisoned");
        if let Some(container) = map.get_mut(prefix) {
            container.remove(key);
        }
        Ok(())
    }

    async fn list(&self, prefix: &str) -> StoreResult<Vec<String>> {
        validate_prefix(prefix)?;
        let map = self.containers.read().expect("lock poisoned");
        Ok(map
            .get(prefix)
            .map(|c| c.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn delete_container(&self, prefix: &str) -> StoreResult<()> {
        validate_prefix(prefix)?;
        self.containers
            .write()
            .expect("lock poisoned")
            .remove(prefix);
        Ok(())
    }
}

impl std::fmt::Debug for InMemoryObjectStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryObjectStorage")
            .field("containers", &self.containers().len())
            .field("object_count", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn contract() {
        crate::contract::object_storage_contract(&InMemoryObjectStorage::new()).await;
    }

    #[tokio::test]
    async fn ensure_container_registers_prefix() {
        let store = InMemoryObjectStorage::new();
        store.ensure_container("registry-main").await.unwrap();
        store.ensure_container("registry-main").await.unwrap();
        assert_eq!(store.containers(), vec!["registry-main".to_string()]);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn len_counts_all_containers() {
        let store = InMemoryObjectStorage::new();
        store.put("a", "k1", Bytes::from_static(b"1")).await.unwrap();
        store.put("b", "k1", Bytes::from_static(b"2")).await.unwrap();
        store.put("b", "k2", Bytes::from_static(b"3")).await.unwrap();
        assert_eq!(store.len(), 3);
    }

    #[tokio::test]
    async fn concurrent_writers_and_readers() {
        use std::sync::Arc;

        let store = Arc::new(InMemoryObjectStorage::new());
        let mut handles = Vec::new();
        for i in 0..16 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                let key = format!("k{i}");
                store
                    .put("shared", &key, Bytes::from(i.to_string()))
                    .await
                    .unwrap();
                store.get("shared", &key).await.unwrap()
            }));
        }
        for (i, h) in handles.into_iter().enumerate() {
            assert_eq!(h.await.unwrap(), Bytes::from(i.to_string()));
        }
        assert_eq!(store.list("shared").await.unwrap().len(), 16);
    }

    #[test]
    fn debug_format() {
        let debug = format!("{:?}", InMemoryObjectStorage::new());
        assert!(debug.contains("InMemoryObjectStorage"));
        assert!(debug.contains("object_count"));
    }
}
