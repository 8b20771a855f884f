use async_trait::async_trait;
use bytes::Bytes;

use crate::error::StoreResult;

/// Prefix-scoped blob storage.
///
/// All implementations must satisfy these invariants:
/// - Every operation is scoped to `prefix`; keys under different prefixes
///   never alias.
/// - `ensure_container` is idempotent and may be called any number of times.
/// - `put` replaces any existing value (upsert).
/// - `get` on a missing key fails with `StoreError::NotFound`.
/// - `delete` on a missing key succeeds.
/// - `list` returns keys relative to `prefix`, sorted, and never includes
///   backend bookkeeping objects.
/// - After `put` returns, a `get` from the same process observes the value.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Create the container for `prefix` if it does not exist yet.
    async fn ensure_container(&self, prefix: &str) -> StoreResult<()>;

    /// Store `data` at `key`, replacing any previous value.
    async fn put(&self, prefix: &str, key: &str, data: Bytes) -> StoreResult<()>;

    /// Read the value at `key`.
    async fn get(&self, prefix: &str, key: &str) -> StoreResult<Bytes>;

    /// Delete the value at `key`. Missing keys are not an error.
    async fn delete(&self, prefix: &str, key: &str) -> StoreResult<()>;

    /// List every key stored under `prefix`, sorted.
    async fn list(&self, prefix: &str) -> StoreResult<Vec<String>>;

    /// Check whether `key` exists.
    async fn exists(&self, prefix: &str, key: &str) -> StoreResult<bool> {
        match self.get(prefix, key).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// List the keys under `prefix` that start with `key_prefix`, sorted.
    ///
    /// Default implementation filters [`ObjectStorage::list`]. Backends may
    /// override to push the filter down.
    async fn list_under(&self, prefix: &str, key_prefix: &str) -> StoreResult<Vec<String>> {
        let keys = self.list(prefix).await?;
        Ok(keys
            .into_iter()
            .filter(|k| k.starts_with(key_prefix))
            .collect())
    }

    /// Remove every key under `prefix`, and the container itself.
    async fn delete_container(&self, prefix: &str) -> StoreResult<()>;
}
