use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::CacheResult;

/// A key-value cache whose entries expire.
///
/// - `get` after `set` in the same process returns the new value until the
///   TTL elapses or the key is deleted.
/// - An expired entry reads as a miss.
/// - `delete` of a missing key succeeds.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Store `value` under `key`. `ttl = None` uses the engine's default.
    async fn set(&self, key: &str, value: Bytes, ttl: Option<Duration>) -> CacheResult<()>;

    /// `Ok(None)` on a miss.
    async fn get(&self, key: &str) -> CacheResult<Option<Bytes>>;

    async fn delete(&self, key: &str) -> CacheResult<()>;

    /// TTL applied when `set` is called without one.
    fn default_ttl(&self) -> Duration;
}
