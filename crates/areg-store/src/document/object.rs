//! Documents persisted as JSON objects through an [`ObjectStorage`].
//!
//! Each database maps to the storage prefix of the same name. Documents sit
//! under a `_docs/` key prefix, which no app slug can produce, so they share
//! the prefix with tarballs without clashing:
//!
//! - `_docs/apps/{slug}.json`
//! - `_docs/versions/{slug}/{version}.json`

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;

use areg_types::{App, Version};

use crate::error::StoreResult;
use crate::traits::ObjectStorage;

use super::DocumentStore;

const APPS: &str = "_docs/apps/";
const VERSIONS: &str = "_docs/versions/";

fn app_key(slug: &str) -> String {
    format!("{APPS}{slug}.json")
}

fn version_key(slug: &str, version: &str) -> String {
    format!("{VERSIONS}{slug}/{version}.json")
}

/// Document store on top of any object storage engine.
#[derive(Clone)]
pub struct ObjectDocumentStore {
    storage: Arc<dyn ObjectStorage>,
}

impl ObjectDocumentStore {
    pub fn new(storage: Arc<dyn ObjectStorage>) -> Self {
        Self { storage }
    }

    async fn read<T: DeserializeOwned>(&self, db: &str, key: &str) -> StoreResult<Option<T>> {
        match self.storage.get(db, key).await {
            Ok(data) => Ok(Some(serde_json::from_slice(&data)?)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn write<T: Serialize + Sync>(&self, db: &str, key: &str, doc: &T) -> StoreResult<()> {
        let data = serde_json::to_vec(doc)?;
        self.storage.put(db, key, Bytes::from(data)).await
    }

    async fn read_all<T: DeserializeOwned>(&self, db: &str, keys: &[String]) -> StoreResult<Vec<T>> {
        let mut docs = Vec::with_capacity(keys.len());
        for key in keys {
            // A concurrent delete between list and get is not an error.
            if let Some(doc) = self.read(db, key).await? {
                docs.push(doc);
            }
        }
        Ok(docs)
    }
}

#[async_trait]
impl DocumentStore for ObjectDocumentStore {
    async fn ensure_database(&self, db: &str) -> StoreResult<()> {
        self.storage.ensure_container(db).await
    }

    async fn delete_database(&self, db: &str) -> StoreResult<()> {
        self.storage.delete_container(db).await
    }

    async fn get_app(&self, db: &str, slug: &str) -> StoreResult<Option<App>> {
        self.read(db, &app_key(slug)).await
    }

    async fn put_app(&self, db: &str, app: &App) -> StoreResult<()> {
        self.write(db, &app_key(&app.slug), app).await
    }

    async fn list_apps(&self, db: &str) -> StoreResult<Vec<App>> {
        let keys = self.storage.list_under(db, APPS).await?;
        self.read_all(db, &keys).await
    }

    async fn get_version(
        &self,
        db: &str,
        slug: &str,
        version: &str,
    ) -> StoreResult<Option<Version>> {
        self.read(db, &version_key(slug, version)).await
    }

    async fn put_version(&self, db: &str, version: &Version) -> StoreResult<()> {
        self.write(db, &version_key(&version.slug, &version.version), version)
            .await
    }

    async fn delete_version(&self, db: &str, slug: &str, version: &str) -> StoreResult<bool> {
        let key = version_key(slug, version);
        if !self.storage.exists(db, &key).await? {
            return Ok(false);
        }
        self.storage.delete(db, &key).await?;
        Ok(true)
    }

    async fn list_versions(&self, db: &str, slug: &str) -> StoreResult<Vec<Version>> {
        let keys = self
            .storage
            .list_under(db, &format!("{VERSIONS}{slug}/"))
            .await?;
        self.read_all(db, &keys).await
    }
}

impl std::fmt::Debug for ObjectDocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectDocumentStore").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryObjectStorage;
    use crate::remote::ObjectStoreStorage;
    use std::time::Duration;

    #[tokio::test]
    async fn contract_over_memory_storage() {
        let store = ObjectDocumentStore::new(Arc::new(InMemoryObjectStorage::new()));
        crate::contract::document_store_contract(&store).await;
    }

    #[tokio::test]
    async fn contract_over_object_store_engine() {
        let storage = ObjectStoreStorage::memory(Duration::from_secs(5));
        let store = ObjectDocumentStore::new(Arc::new(storage));
        crate::contract::document_store_contract(&store).await;
    }

    #[tokio::test]
    async fn documents_do_not_clash_with_tarballs() {
        let storage = Arc::new(InMemoryObjectStorage::new());
        let store = ObjectDocumentStore::new(storage.clone());
        storage
            .put("registry-main", "apps/1.0.0.tar.gz", Bytes::from_static(b"blob"))
            .await
            .unwrap();
        assert!(store.list_apps("registry-main").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn corrupt_document_is_a_serialization_error() {
        let storage = Arc::new(InMemoryObjectStorage::new());
        let store = ObjectDocumentStore::new(storage.clone());
        storage
            .put("registry-main", &app_key("drive"), Bytes::from_static(b"{not json"))
            .await
            .unwrap();
        let err = store.get_app("registry-main", "drive").await.unwrap_err();
        assert!(matches!(err, crate::StoreError::Serialization(_)));
    }

    #[test]
    fn key_layout() {
        assert_eq!(app_key("drive"), "_docs/apps/drive.json");
        assert_eq!(
            version_key("drive", "1.0.0-beta.1"),
            "_docs/versions/drive/1.0.0-beta.1.json"
        );
    }
}
