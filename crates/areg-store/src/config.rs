//! Backend selection from deployment configuration.
//!
//! Evaluated once at startup; the result is a trait object and nothing
//! downstream knows which engine is behind it.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::document::{DocumentStore, InMemoryDocumentStore, ObjectDocumentStore};
use crate::error::{StoreError, StoreResult};
use crate::memory::InMemoryObjectStorage;
use crate::remote::{ObjectStoreStorage, S3Settings};
use crate::traits::ObjectStorage;

fn default_timeout() -> Duration {
    Duration::from_secs(5)
}

/// Which object storage engine to run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    File,
    S3,
}

/// `[storage]` section.
///
/// `root` applies to the `file` backend; the remaining optional keys apply
/// to `s3`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub kind: StorageBackend,
    /// Upper bound for a single remote call.
    #[serde(with = "areg_types::duration")]
    pub timeout: Duration,
    pub root: Option<PathBuf>,
    pub bucket: Option<String>,
    pub region: Option<String>,
    pub endpoint: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub allow_http: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            kind: StorageBackend::default(),
            timeout: default_timeout(),
            root: None,
            bucket: None,
            region: None,
            endpoint: None,
            access_key_id: None,
            secret_access_key: None,
            allow_http: false,
        }
    }
}

/// `[documents]` section: where app and version documents live.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DocumentsConfig {
    /// JSON documents in the configured object storage.
    #[default]
    Storage,
    Memory,
}

pub fn build_storage(config: &StorageConfig) -> StoreResult<Arc<dyn ObjectStorage>> {
    let storage: Arc<dyn ObjectStorage> = match config.kind {
        StorageBackend::Memory => Arc::new(InMemoryObjectStorage::new()),
        StorageBackend::File => {
            let root = config.root.as_ref().ok_or_else(|| {
                StoreError::Config("storage.root is required for the file backend".into())
            })?;
            Arc::new(ObjectStoreStorage::local(root, config.timeout)?)
        }
        StorageBackend::S3 => {
            let settings = S3Settings {
                bucket: config.bucket.clone().unwrap_or_default(),
                region: config.region.clone(),
                endpoint: config.endpoint.clone(),
                access_key_id: config.access_key_id.clone(),
                secret_access_key: config.secret_access_key.clone(),
                allow_http: config.allow_http,
            };
            Arc::new(ObjectStoreStorage::s3(&settings, config.timeout)?)
        }
    };
    info!(backend = ?config.kind, "object storage ready");
    Ok(storage)
}

pub fn build_documents(
    config: DocumentsConfig,
    storage: Arc<dyn ObjectStorage>,
) -> Arc<dyn DocumentStore> {
    match config {
        DocumentsConfig::Storage => Arc::new(ObjectDocumentStore::new(storage)),
        DocumentsConfig::Memory => Arc::new(InMemoryDocumentStore::new()),
    }
}
