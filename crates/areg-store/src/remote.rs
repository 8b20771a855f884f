//! Object storage backed by the `object_store` crate.
//!
//! Supports S3 and S3-compatible services (MinIO, R2, ...) and a local
//! directory. The `object_store` in-memory engine is available through
//! [`ObjectStoreStorage::memory`] so the same code path can be exercised in
//! tests without network access.
//!
//! Layout: the value for `(prefix, key)` lives at `{prefix}/{key}`. Object
//! stores have no real containers, so `ensure_container` writes an empty
//! marker object at `{prefix}/.container`; listings skip it.

use std::path::Path as FsPath;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::TryStreamExt;
use object_store::path::Path;
use object_store::{ObjectStore, PutPayload};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::keys::{validate_key, validate_prefix, CONTAINER_MARKER};
use crate::timeout::with_timeout;
use crate::traits::ObjectStorage;

/// S3 connection settings.
#[derive(Clone, Debug, Default)]
pub struct S3Settings {
    pub bucket: String,
    pub region: Option<String>,
    pub endpoint: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub allow_http: bool,
}

/// [`ObjectStorage`] over any `object_store::ObjectStore`.
pub struct ObjectStoreStorage {
    inner: Arc<dyn ObjectStore>,
    timeout: Duration,
}

impl ObjectStoreStorage {
    pub fn new(inner: Arc<dyn ObjectStore>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    /// Backed by `object_store`'s in-memory engine.
    pub fn memory(timeout: Duration) -> Self {
        Self::new(Arc::new(object_store::memory::InMemory::new()), timeout)
    }

    /// Backed by a local directory, created if missing.
    pub fn local(root: &FsPath, timeout: Duration) -> StoreResult<Self> {
        std::fs::create_dir_all(root).map_err(|e| {
            StoreError::Config(format!("cannot create {}: {e}", root.display()))
        })?;
        let fs = object_store::local::LocalFileSystem::new_with_prefix(root)
            .map_err(|e| StoreError::Config(format!("cannot open {}: {e}", root.display())))?;
        Ok(Self::new(Arc::new(fs), timeout))
    }

    /// Backed by an S3 bucket. Unset credentials fall back to the standard
    /// AWS environment variables.
    pub fn s3(settings: &S3Settings, timeout: Duration) -> StoreResult<Self> {
        if settings.bucket.is_empty() {
            return Err(StoreError::Config("s3 bucket name must not be empty".into()));
        }
        let mut builder = object_store::aws::AmazonS3Builder::from_env()
            .with_bucket_name(&settings.bucket)
            .with_allow_http(settings.allow_http);
        if let Some(region) = &settings.region {
            builder = builder.with_region(region);
        }
        if let Some(endpoint) = &settings.endpoint {
            builder = builder.with_endpoint(endpoint);
        }
        if let Some(key_id) = &settings.access_key_id {
            builder = builder.with_access_key_id(key_id);
        }
        if let Some(secret) = &settings.secret_access_key {
            builder = builder.with_secret_access_key(secret);
        }
        let s3 = builder
            .build()
            .map_err(|e| StoreError::Config(format!("cannot create S3 client: {e}")))?;
        Ok(Self::new(Arc::new(s3), timeout))
    }

    fn location(prefix: &str, key: &str) -> Path {
        Path::from(format!("{prefix}/{key}"))
    }

    async fn list_raw(&self, prefix: &str) -> StoreResult<Vec<Path>> {
        let root = Path::from(prefix);
        let listed: Result<Vec<_>, _> = self.inner.list(Some(&root)).try_collect().await;
        match listed {
            Ok(entries) => Ok(entries.into_iter().map(|meta| meta.location).collect()),
            // Local directories that were never written to do not exist yet.
            Err(object_store::Error::NotFound { .. }) => Ok(Vec::new()),
            Err(e) => Err(StoreError::Unavailable(format!("list {prefix}: {e}"))),
        }
    }
}

fn map_err(prefix: &str, key: &str, err: object_store::Error) -> StoreError {
    match err {
        object_store::Error::NotFound { .. } => StoreError::not_found(prefix, key),
        other => StoreError::Unavailable(format!("{prefix}/{key}: {other}")),
    }
}

fn relative_key(prefix: &str, location: &Path) -> Option<String> {
    let key = location.as_ref().strip_prefix(prefix)?.strip_prefix('/')?;
    (key != CONTAINER_MARKER).then(|| key.to_string())
}

#[async_trait]
impl ObjectStorage for ObjectStoreStorage {
    async fn ensure_container(&self, prefix: &str) -> StoreResult<()> {
        validate_prefix(prefix)?;
        let marker = Self::location(prefix, CONTAINER_MARKER);
        with_timeout("ensure_container", self.timeout, async {
            match self.inner.head(&marker).await {
                Ok(_) => Ok(()),
                Err(object_store::Error::NotFound { .. }) => {
                    self.inner
                        .put(&marker, PutPayload::new())
                        .await
                        .map_err(|e| map_err(prefix, CONTAINER_MARKER, e))?;
                    debug!(prefix, "container created");
                    Ok(())
                }
                Err(e) => Err(map_err(prefix, CONTAINER_MARKER, e)),
            }
        })
        .await
    }

    async fn put(&self, prefix: &str, key: &str, data: Bytes) -> StoreResult<()> {
        validate_prefix(prefix)?;
        validate_key(key)?;
        let location = Self::location(prefix, key);
        with_timeout("put", self.timeout, async {
            self.inner
                .put(&location, PutPayload::from_bytes(data))
                .await
                .map_err(|e| map_err(prefix, key, e))?;
            Ok(())
        })
        .await
    }

    async fn get(&self, prefix: &str, key: &str) -> StoreResult<Bytes> {
        validate_prefix(prefix)?;
        validate_key(key)?;
        let location = Self::location(prefix, key);
        with_timeout("get", self.timeout, async {
            let result = self
                .inner
                .get(&location)
                .await
                .map_err(|e| map_err(prefix, key, e))?;
            result.bytes().await.map_err(|e| map_err(prefix, key, e))
        })
        .await
    }

    async fn exists(&self, prefix: &str, key: &str) -> StoreResult<bool> {
        validate_prefix(prefix)?;
        validate_key(key)?;
        let location = Self::location(prefix, key);
        with_timeout("exists", self.timeout, async {
            match self.inner.head(&location).await {
                Ok(_) => Ok(true),
                Err(object_store::Error::NotFound { .. }) => Ok(false),
                Err(e) => Err(map_err(prefix, key, e)),
            }
        })
        .await
    }

    async fn delete(&self, prefix: &str, key: &str) -> StoreResult<()> {
        validate_prefix(prefix)?;
        validate_key(key)?;
        let location = Self::location(prefix, key);
        with_timeout("delete", self.timeout, async {
            match self.inner.delete(&location).await {
                Ok(()) | Err(object_store::Error::NotFound { .. }) => Ok(()),
                Err(e) => Err(map_err(prefix, key, e)),
            }
        })
        .await
    }

    async fn list(&self, prefix: &str) -> StoreResult<Vec<String>> {
        validate_prefix(prefix)?;
        with_timeout("list", self.timeout, async {
            let mut keys: Vec<String> = self
                .list_raw(prefix)
                .await?
                .iter()
                .filter_map(|location| relative_key(prefix, location))
                .collect();
            keys.sort();
            Ok(keys)
        })
        .await
    }

    async fn delete_container(&self, prefix: &str) -> StoreResult<()> {
        validate_prefix(prefix)?;
        with_timeout("delete_container", self.timeout, async {
            let locations = self.list_raw(prefix).await?;
            for location in &locations {
                match self.inner.delete(location).await {
                    Ok(()) | Err(object_store::Error::NotFound { .. }) => {}
                    Err(e) => {
                        return Err(StoreError::Unavailable(format!(
                            "delete {}: {e}",
                            location.as_ref()
                        )))
                    }
                }
            }
            debug!(prefix, removed = locations.len(), "container deleted");
            Ok(())
        })
        .await
    }
}

impl std::fmt::Debug for ObjectStoreStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectStoreStorage")
            .field("backend", &self.inner.to_string())
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T: Duration = Duration::from_secs(5);

    #[tokio::test]
    async fn contract_in_memory_engine() {
        crate::contract::object_storage_contract(&ObjectStoreStorage::memory(T)).await;
    }

    #[tokio::test]
    async fn contract_local_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = ObjectStoreStorage::local(dir.path(), T).unwrap();
        crate::contract::object_storage_contract(&store).await;
    }

    #[tokio::test]
    async fn marker_is_hidden_from_listing() {
        let store = ObjectStoreStorage::memory(T);
        store.ensure_container("registry-main").await.unwrap();
        assert!(store.list("registry-main").await.unwrap().is_empty());
        store
            .put("registry-main", "drive/1.0.0.tar.gz", Bytes::from_static(b"x"))
            .await
            .unwrap();
        assert_eq!(
            store.list("registry-main").await.unwrap(),
            vec!["drive/1.0.0.tar.gz".to_string()]
        );
    }

    #[tokio::test]
    async fn sibling_prefixes_do_not_leak() {
        let store = ObjectStoreStorage::memory(T);
        store
            .put("registry-main", "a", Bytes::from_static(b"1"))
            .await
            .unwrap();
        store
            .put("registry-main-x", "b", Bytes::from_static(b"2"))
            .await
            .unwrap();
        assert_eq!(store.list("registry-main").await.unwrap(), vec!["a".to_string()]);
    }

    #[test]
    fn s3_requires_bucket() {
        let err = ObjectStoreStorage::s3(&S3Settings::default(), T).unwrap_err();
        assert!(matches!(err, StoreError::Config(_)));
    }

    #[test]
    fn relative_key_strips_prefix() {
        let loc = Path::from("registry-main/drive/1.0.0.json");
        assert_eq!(
            relative_key("registry-main", &loc),
            Some("drive/1.0.0.json".to_string())
        );
        assert_eq!(relative_key("registry-other", &loc), None);
        let marker = Path::from("registry-main/.container");
        assert_eq!(relative_key("registry-main", &marker), None);
    }
}
