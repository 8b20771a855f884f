//! Versions cache: fronts version listings and latest-version lookups.
//!
//! Keys are `<ns>/<kind>/<space>/<app>/<channel>` where kind is `versions` or
//! `latest`. Writes invalidate every channel of both kinds for each space that
//! can observe the written store.
//!
//! Cache failures never fail a request: a read error is a miss, and a failed
//! invalidation is logged and leaves the entry to expire on its TTL.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use areg_cache::Cache;
use areg_types::{Channel, Version};

use crate::context::RequestContext;

#[derive(Clone, Copy, Debug)]
enum Kind {
    Versions,
    Latest,
}

impl Kind {
    fn as_str(self) -> &'static str {
        match self {
            Kind::Versions => "versions",
            Kind::Latest => "latest",
        }
    }
}

#[derive(Clone)]
pub struct VersionsCache {
    cache: Arc<dyn Cache>,
    namespace: String,
    ttl: Option<Duration>,
}

impl VersionsCache {
    /// `ttl = None` uses the engine's default TTL.
    pub fn new(cache: Arc<dyn Cache>, namespace: impl Into<String>, ttl: Option<Duration>) -> Self {
        Self {
            cache,
            namespace: namespace.into(),
            ttl,
        }
    }

    fn key(&self, kind: Kind, space: &str, app: &str, channel: Channel) -> String {
        format!(
            "{}/{}/{space}/{app}/{}",
            self.namespace,
            kind.as_str(),
            channel.as_str()
        )
    }

    async fn get<T: DeserializeOwned>(&self, ctx: &RequestContext, key: &str) -> Option<T> {
        let read = async { Ok(self.cache.get(key).await?) };
        match ctx.bounded("cache_get", read).await {
            Ok(Some(raw)) => match serde_json::from_slice(&raw) {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!(key, error = %e, "dropping undecodable cache entry");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(key, error = %e, "cache read failed, treating as miss");
                None
            }
        }
    }

    async fn put<T: Serialize + Sync>(&self, ctx: &RequestContext, key: &str, value: &T) {
        let raw = match serde_json::to_vec(value) {
            Ok(raw) => Bytes::from(raw),
            Err(e) => {
                warn!(key, error = %e, "cannot encode cache entry");
                return;
            }
        };
        let write = async { Ok(self.cache.set(key, raw, self.ttl).await?) };
        if let Err(e) = ctx.bounded("cache_set", write).await {
            warn!(key, error = %e, "cache write failed");
        }
    }

    pub async fn get_versions(
        &self,
        ctx: &RequestContext,
        space: &str,
        app: &str,
        channel: Channel,
    ) -> Option<Vec<String>> {
        self.get(ctx, &self.key(Kind::Versions, space, app, channel))
            .await
    }

    pub async fn put_versions(
        &self,
        ctx: &RequestContext,
        space: &str,
        app: &str,
        channel: Channel,
        versions: &[String],
    ) {
        self.put(ctx, &self.key(Kind::Versions, space, app, channel), &versions)
            .await
    }

    pub async fn get_latest(
        &self,
        ctx: &RequestContext,
        space: &str,
        app: &str,
        channel: Channel,
    ) -> Option<Version> {
        self.get(ctx, &self.key(Kind::Latest, space, app, channel))
            .await
    }

    pub async fn put_latest(
        &self,
        ctx: &RequestContext,
        space: &str,
        app: &str,
        channel: Channel,
        version: &Version,
    ) {
        self.put(ctx, &self.key(Kind::Latest, space, app, channel), version)
            .await
    }

    /// Drop every cached listing and latest version of `app` in each of
    /// `spaces`.
    pub async fn invalidate(&self, ctx: &RequestContext, spaces: &[String], app: &str) {
        for space in spaces {
            for kind in [Kind::Versions, Kind::Latest] {
                for channel in Channel::ALL {
                    let key = self.key(kind, space, app, channel);
                    let delete = async { Ok(self.cache.delete(&key).await?) };
                    if let Err(e) = ctx.bounded("cache_delete", delete).await {
                        warn!(key, error = %e, "cache invalidation failed; entry expires on its TTL");
                    }
                }
            }
        }
        debug!(app, ?spaces, "cache invalidated");
    }
}

impl std::fmt::Debug for VersionsCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VersionsCache")
            .field("namespace", &self.namespace)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}
