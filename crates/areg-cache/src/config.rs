use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{CacheError, CacheResult};
use crate::memory::{LruCache, DEFAULT_CAPACITY, DEFAULT_TTL};
use crate::traits::Cache;

/// Which cache engine to run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    #[default]
    Lru,
    Redis,
}

/// `[cache]` section.
///
/// `capacity` applies to `lru`; `url`, `prefix` and `timeout` apply to
/// `redis`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub kind: CacheBackend,
    pub capacity: usize,
    #[serde(with = "areg_types::duration")]
    pub ttl: Duration,
    pub url: Option<String>,
    pub prefix: String,
    #[serde(with = "areg_types::duration")]
    pub timeout: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            kind: CacheBackend::Lru,
            capacity: DEFAULT_CAPACITY,
            ttl: DEFAULT_TTL,
            url: None,
            prefix: "areg".to_string(),
            timeout: Duration::from_secs(1),
        }
    }
}

/// Build the configured engine. Called once at startup.
pub async fn build_cache(config: &CacheConfig) -> CacheResult<Arc<dyn Cache>> {
    let cache: Arc<dyn Cache> = match config.kind {
        CacheBackend::Lru => Arc::new(LruCache::new(config.capacity, config.ttl)?),
        CacheBackend::Redis => build_redis(config).await?,
    };
    info!(backend = ?config.kind, ttl = ?config.ttl, "cache ready");
    Ok(cache)
}

#[cfg(feature = "redis")]
async fn build_redis(config: &CacheConfig) -> CacheResult<Arc<dyn Cache>> {
    let url = config
        .url
        .as_deref()
        .ok_or_else(|| CacheError::Config("cache.url is required for the redis backend".into()))?;
    let cache =
        crate::redis::RedisCache::connect(url, config.prefix.clone(), config.ttl, config.timeout)
            .await?;
    Ok(Arc::new(cache))
}

#[cfg(not(feature = "redis"))]
async fn build_redis(_config: &CacheConfig) -> CacheResult<Arc<dyn Cache>> {
    Err(CacheError::Config(
        "redis cache support is not compiled in (enable the `redis` feature)".into(),
    ))
}
