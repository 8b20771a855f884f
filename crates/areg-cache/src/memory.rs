use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::{CacheError, CacheResult};
use crate::traits::Cache;

/// Entries kept when no capacity is configured.
pub const DEFAULT_CAPACITY: usize = 256;
/// TTL applied when none is configured.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);
// Stand-in expiry for TTLs too large to add to the clock.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

struct Entry {
    value: Bytes,
    expires_at: Instant,
}

/// In-process cache with least-recently-used eviction and per-entry expiry.
pub struct LruCache {
    entries: Mutex<lru::LruCache<String, Entry>>,
    default_ttl: Duration,
}

impl LruCache {
    pub fn new(capacity: usize, default_ttl: Duration) -> CacheResult<Self> {
        let capacity = NonZeroUsize::new(capacity)
            .ok_or_else(|| CacheError::Config("cache capacity must be at least 1".into()))?;
        Ok(Self {
            entries: Mutex::new(lru::LruCache::new(capacity)),
            default_ttl,
        })
    }

    /// Number of stored entries, expired ones included until touched.
    pub fn len(&self) -> usize {
        self.entries.lock().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for LruCache {
    fn default() -> Self {
        Self {
            entries: Mutex::new(lru::LruCache::new(
                NonZeroUsize::new(DEFAULT_CAPACITY).unwrap_or(NonZeroUsize::MIN),
            )),
            default_ttl: DEFAULT_TTL,
        }
    }
}

#[async_trait]
impl Cache for LruCache {
    async fn set(&self, key: &str, value: Bytes, ttl: Option<Duration>) -> CacheResult<()> {
        let now = Instant::now();
        let expires_at = now
            .checked_add(ttl.unwrap_or(self.default_ttl))
            .unwrap_or_else(|| now + FAR_FUTURE);
        self.entries
            .lock()
            .expect("lock poisoned")
            .put(key.to_string(), Entry { value, expires_at });
        Ok(())
    }

    async fn get(&self, key: &str) -> CacheResult<Option<Bytes>> {
        let mut entries = self.entries.lock().expect("lock poisoned");
        match entries.get(key) {
            None => return Ok(None),
            Some(entry) if entry.expires_at > Instant::now() => {
                return Ok(Some(entry.value.clone()))
            }
            Some(_) => {}
        }
        entries.pop(key);
        Ok(None)
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        self.entries.lock().expect("lock poisoned").pop(key);
        Ok(())
    }

    fn default_ttl(&self) -> Duration {
        self.default_ttl
    }
}

impl std::fmt::Debug for LruCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let entries = self.entries.lock().expect("lock poisoned");
        f.debug_struct("LruCache")
            .field("len", &entries.len())
            .field("capacity", &entries.cap())
            .field("default_ttl", &self.default_ttl)
            .finish()
    }
}
