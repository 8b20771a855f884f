//! Shared cache on a Redis server.
//!
//! Keys are namespaced as `{prefix}:{key}` so several registries can share
//! one server. Expiry is delegated to Redis (`PSETEX`).

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::{debug, warn};

use crate::error::{CacheError, CacheResult};
use crate::traits::Cache;

#[derive(Clone)]
pub struct RedisCache {
    manager: ConnectionManager,
    prefix: String,
    default_ttl: Duration,
    timeout: Duration,
}

impl RedisCache {
    /// Connect to `url`. Fails if the server cannot be reached within
    /// `timeout`.
    pub async fn connect(
        url: &str,
        prefix: impl Into<String>,
        default_ttl: Duration,
        timeout: Duration,
    ) -> CacheResult<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| CacheError::Config(format!("invalid redis url: {e}")))?;
        let manager = tokio::time::timeout(timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| CacheError::Timeout {
                operation: "connect",
                after: timeout,
            })?
            .map_err(|e| CacheError::Unavailable(e.to_string()))?;
        debug!("connected to redis");
        Ok(Self {
            manager,
            prefix: prefix.into(),
            default_ttl,
            timeout,
        })
    }

    fn key(&self, key: &str) -> String {
        format!("{}:{key}", self.prefix)
    }

    async fn bounded<T, F>(&self, operation: &'static str, fut: F) -> CacheResult<T>
    where
        F: Future<Output = redis::RedisResult<T>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result.map_err(|e| CacheError::Unavailable(e.to_string())),
            Err(_) => {
                warn!(operation, timeout = ?self.timeout, "redis call timed out");
                Err(CacheError::Timeout {
                    operation,
                    after: self.timeout,
                })
            }
        }
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn set(&self, key: &str, value: Bytes, ttl: Option<Duration>) -> CacheResult<()> {
        let ttl = ttl.unwrap_or(self.default_ttl);
        // PSETEX rejects a zero expiry.
        let millis = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1);
        let mut conn = self.manager.clone();
        let key = self.key(key);
        self.bounded("set", conn.pset_ex::<_, _, ()>(key, value.as_ref(), millis))
            .await
    }

    async fn get(&self, key: &str) -> CacheResult<Option<Bytes>> {
        let mut conn = self.manager.clone();
        let key = self.key(key);
        let value: Option<Vec<u8>> = self.bounded("get", conn.get(key)).await?;
        Ok(value.map(Bytes::from))
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        let mut conn = self.manager.clone();
        let key = self.key(key);
        self.bounded("delete", conn.del::<_, ()>(key)).await
    }

    fn default_ttl(&self) -> Duration {
        self.default_ttl
    }
}

impl std::fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCache")
            .field("prefix", &self.prefix)
            .field("default_ttl", &self.default_ttl)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Runs only when `AREG_TEST_REDIS_URL` points at a server.
    #[tokio::test]
    async fn contract() {
        let Ok(url) = std::env::var("AREG_TEST_REDIS_URL") else {
            return;
        };
        let cache = RedisCache::connect(
            &url,
            format!("areg-test-{}", std::process::id()),
            Duration::from_secs(60),
            Duration::from_secs(2),
        )
        .await
        .unwrap();
        crate::contract::cache_contract(&cache).await;
    }

    #[tokio::test]
    async fn bad_url_is_a_config_error() {
        let err = RedisCache::connect(
            "not a url",
            "areg",
            Duration::from_secs(1),
            Duration::from_secs(1),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, CacheError::Config(_)));
    }
}
