//! Key-value cache with TTL.
//!
//! [`Cache`] is the contract; [`LruCache`] is the in-process engine and
//! `RedisCache` (cargo feature `redis`) the shared remote one. Both give
//! read-after-write visibility within a process, which the registry relies
//! on when it invalidates entries after a write.

pub mod config;
pub mod error;
pub mod memory;
#[cfg(feature = "redis")]
pub mod redis;
pub mod traits;

#[cfg(test)]
mod contract;

pub use config::{build_cache, CacheBackend, CacheConfig};
pub use error::{CacheError, CacheResult};
pub use memory::LruCache;
#[cfg(feature = "redis")]
pub use self::redis::RedisCache;
pub use traits::Cache;
