use std::sync::{Arc, RwLock};

use bytes::Bytes;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use areg_cache::{build_cache, Cache};
use areg_crypto::sha256_hex;
use areg_editor::{build_editor_registry, CredentialManager};
use areg_space::{merge_listings, read_through, NamespaceResolver, StoreHandle};
use areg_store::{build_documents, build_storage, DocumentStore, ObjectStorage};
use areg_types::{validate_app_name, App, AppKind, Channel, Version};

use crate::cache::VersionsCache;
use crate::config::RegistryConfig;
use crate::context::RequestContext;
use crate::error::{RegistryError, RegistryResult};
use crate::retry::RetryPolicy;

/// Proof that a token was verified and its editor is trusted for a domain.
///
/// Only [`Registry::authorize`] creates one; every write takes it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthorizedEditor {
    editor: String,
    domain: String,
}

impl AuthorizedEditor {
    pub fn editor(&self) -> &str {
        &self.editor
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }
}

/// Body of a publish request. The slug and version come from the path.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NewVersion {
    /// Kind of the app, used when the app does not exist yet.
    #[serde(rename = "type", default)]
    pub kind: AppKind,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub manifest: serde_json::Value,
}

/// The backend trait objects a registry runs on.
#[derive(Clone)]
pub struct Backends {
    pub storage: Arc<dyn ObjectStorage>,
    pub documents: Arc<dyn DocumentStore>,
    pub cache: Arc<dyn Cache>,
}

fn tarball_key(slug: &str, version: &str) -> String {
    format!("{slug}/{version}.tar.gz")
}

/// The registry core.
///
/// Holds an immutable resolver snapshot; each operation takes the current
/// snapshot once, so a concurrent `drop_virtual_space` never changes the
/// namespace under a request in flight.
pub struct Registry {
    resolver: RwLock<Arc<NamespaceResolver>>,
    storage: Arc<dyn ObjectStorage>,
    documents: Arc<dyn DocumentStore>,
    cache: VersionsCache,
    credentials: CredentialManager,
    retry: RetryPolicy,
}

impl Registry {
    pub fn new(
        resolver: NamespaceResolver,
        backends: Backends,
        credentials: CredentialManager,
        retry: RetryPolicy,
    ) -> Self {
        let cache = VersionsCache::new(backends.cache, resolver.namespace().as_str(), None);
        Self {
            resolver: RwLock::new(Arc::new(resolver)),
            storage: backends.storage,
            documents: backends.documents,
            cache,
            credentials,
            retry,
        }
    }

    /// Validate `config` and build every backend it selects.
    pub async fn from_config(config: &RegistryConfig) -> RegistryResult<Self> {
        config.validate()?;
        let resolver = NamespaceResolver::new(config.namespace()?, config.spaces.clone())?;
        let storage = build_storage(&config.storage)?;
        let documents = build_documents(config.documents, storage.clone());
        let cache = build_cache(&config.cache).await?;
        let editors = build_editor_registry(&config.editors).await?;
        info!(
            namespace = %config.database_namespace,
            spaces = config.spaces.spaces.len(),
            virtual_spaces = config.spaces.virtual_spaces.len(),
            "registry configured"
        );
        Ok(Self::new(
            resolver,
            Backends {
                storage,
                documents,
                cache,
            },
            CredentialManager::new(editors),
            config.retry.clone(),
        ))
    }

    /// The current namespace snapshot.
    pub fn resolver(&self) -> Arc<NamespaceResolver> {
        self.resolver.read().expect("lock poisoned").clone()
    }

    pub fn credentials(&self) -> &CredentialManager {
        &self.credentials
    }

    /// Create every base and overwrite store the configuration names.
    pub async fn prepare_containers(&self, ctx: &RequestContext) -> RegistryResult<()> {
        let resolver = self.resolver();
        for name in resolver.store_names() {
            let name = name.as_str();
            self.retry
                .run(ctx, "ensure_container", move || async move {
                    Ok(self.storage.ensure_container(name).await?)
                })
                .await?;
            self.retry
                .run(ctx, "ensure_database", move || async move {
                    Ok(self.documents.ensure_database(name).await?)
                })
                .await?;
            debug!(store = name, "store ready");
        }
        Ok(())
    }

    /// Verify `token` and check its editor is trusted for `domain`.
    ///
    /// Both checks are required: a valid signature from an editor the domain
    /// does not trust is rejected with `EditorNotTrusted`.
    pub async fn authorize(
        &self,
        ctx: &RequestContext,
        domain: &str,
        token: &str,
    ) -> RegistryResult<AuthorizedEditor> {
        let editor = ctx
            .bounded("verify_token", async {
                Ok(self.credentials.verify_token(token).await?)
            })
            .await?;
        self.resolver().authorize_write(domain, &editor)?;
        Ok(AuthorizedEditor {
            editor,
            domain: domain.to_string(),
        })
    }

    async fn load_app(
        &self,
        ctx: &RequestContext,
        handle: &StoreHandle,
        slug: &str,
    ) -> RegistryResult<Option<App>> {
        let found = read_through(handle, slug, move |db| async move {
            let db = db.as_str();
            self.retry
                .run(ctx, "get_app", move || async move {
                    Ok(self.documents.get_app(db, slug).await?)
                })
                .await
        })
        .await?;
        Ok(found.map(|(app, _)| app))
    }

    async fn load_version(
        &self,
        ctx: &RequestContext,
        handle: &StoreHandle,
        slug: &str,
        version: &str,
    ) -> RegistryResult<Option<Version>> {
        let found = read_through(handle, slug, move |db| async move {
            let db = db.as_str();
            self.retry
                .run(ctx, "get_version", move || async move {
                    Ok(self.documents.get_version(db, slug, version).await?)
                })
                .await
        })
        .await?;
        Ok(found.map(|(v, _)| v))
    }

    async fn list_from(
        &self,
        ctx: &RequestContext,
        db: &str,
        slug: &str,
    ) -> RegistryResult<Vec<Version>> {
        self.retry
            .run(ctx, "list_versions", move || async move {
                Ok(self.documents.list_versions(db, slug).await?)
            })
            .await
    }

    /// Every version of `slug` visible through `handle`, overrides first.
    async fn all_versions(
        &self,
        ctx: &RequestContext,
        handle: &StoreHandle,
        slug: &str,
    ) -> RegistryResult<Vec<Version>> {
        let overrides = match handle.overwrite() {
            Some(db) => self.list_from(ctx, db, slug).await?,
            None => Vec::new(),
        };
        let base = if handle.base_visible(slug) {
            self.list_from(ctx, handle.base(), slug).await?
        } else {
            Vec::new()
        };
        Ok(merge_listings(
            handle,
            overrides,
            base,
            |v| v.slug.as_str(),
            |v| v.version.clone(),
        ))
    }

    /// Versions of `slug` visible on `channel`, sorted by precedence.
    fn on_channel(versions: Vec<Version>, channel: Channel) -> Vec<(semver::Version, Version)> {
        let mut out: Vec<(semver::Version, Version)> = versions
            .into_iter()
            .filter(|v| channel.includes(v.channel))
            .filter_map(|v| match v.semver() {
                Ok(parsed) => Some((parsed, v)),
                Err(e) => {
                    warn!(slug = %v.slug, version = %v.version, error = %e, "skipping unparsable version");
                    None
                }
            })
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    fn invalidation_targets(resolver: &NamespaceResolver, handle: &StoreHandle) -> Vec<String> {
        resolver.dependents(handle.space())
    }

    pub async fn get_app(
        &self,
        ctx: &RequestContext,
        space: &str,
        slug: &str,
    ) -> RegistryResult<App> {
        validate_app_name(slug)?;
        let handle = self.resolver().resolve_store(space)?;
        self.load_app(ctx, &handle, slug)
            .await?
            .ok_or_else(|| RegistryError::not_found("app", slug))
    }

    /// Apps visible in `space`, sorted by slug.
    pub async fn list_apps(&self, ctx: &RequestContext, space: &str) -> RegistryResult<Vec<App>> {
        let handle = self.resolver().resolve_store(space)?;
        let list = move |db: String| async move {
            let db = db.as_str();
            self.retry
                .run(ctx, "list_apps", move || async move {
                    Ok(self.documents.list_apps(db).await?)
                })
                .await
        };
        let overrides = match handle.overwrite() {
            Some(db) => list(db.to_string()).await?,
            None => Vec::new(),
        };
        let base = list(handle.base().to_string()).await?;
        Ok(merge_listings(
            &handle,
            overrides,
            base,
            |a| a.slug.as_str(),
            |a| a.slug.clone(),
        ))
    }

    pub async fn get_version(
        &self,
        ctx: &RequestContext,
        space: &str,
        slug: &str,
        version: &str,
    ) -> RegistryResult<Version> {
        validate_app_name(slug)?;
        let handle = self.resolver().resolve_store(space)?;
        self.load_version(ctx, &handle, slug, version)
            .await?
            .ok_or_else(|| RegistryError::not_found("version", format!("{slug}@{version}")))
    }

    /// Version strings of `slug` visible on `channel`, ascending. Served from
    /// the cache when possible.
    pub async fn list_versions(
        &self,
        ctx: &RequestContext,
        space: &str,
        slug: &str,
        channel: Channel,
    ) -> RegistryResult<Vec<String>> {
        validate_app_name(slug)?;
        let handle = self.resolver().resolve_store(space)?;
        if let Some(hit) = self.cache.get_versions(ctx, space, slug, channel).await {
            return Ok(hit);
        }
        if self.load_app(ctx, &handle, slug).await?.is_none() {
            return Err(RegistryError::not_found("app", slug));
        }
        let versions: Vec<String> = Self::on_channel(self.all_versions(ctx, &handle, slug).await?, channel)
            .into_iter()
            .map(|(_, v)| v.version)
            .collect();
        self.cache
            .put_versions(ctx, space, slug, channel, &versions)
            .await;
        Ok(versions)
    }

    /// Highest version of `slug` on `channel`. Served from the cache when
    /// possible.
    pub async fn latest_version(
        &self,
        ctx: &RequestContext,
        space: &str,
        slug: &str,
        channel: Channel,
    ) -> RegistryResult<Version> {
        validate_app_name(slug)?;
        let handle = self.resolver().resolve_store(space)?;
        if let Some(hit) = self.cache.get_latest(ctx, space, slug, channel).await {
            return Ok(hit);
        }
        let latest = Self::on_channel(self.all_versions(ctx, &handle, slug).await?, channel)
            .pop()
            .map(|(_, v)| v)
            .ok_or_else(|| {
                RegistryError::not_found("version", format!("{slug} on channel {channel}"))
            })?;
        self.cache
            .put_latest(ctx, space, slug, channel, &latest)
            .await;
        Ok(latest)
    }

    /// Resolve the app for a write by `editor`, creating it in the write
    /// target when it is missing there.
    async fn app_for_write(
        &self,
        ctx: &RequestContext,
        handle: &StoreHandle,
        editor: &str,
        slug: &str,
        kind: AppKind,
    ) -> RegistryResult<App> {
        let target = handle.write_target();
        let app = match self.load_app(ctx, handle, slug).await? {
            Some(app) if app.editor != editor => {
                return Err(RegistryError::NotOwner {
                    editor: editor.to_string(),
                    app: slug.to_string(),
                })
            }
            Some(app) => app,
            None => App::new(slug, kind, editor, Utc::now())?,
        };
        let in_target = self
            .retry
            .run(ctx, "get_app", move || async move {
                Ok(self.documents.get_app(target, slug).await?)
            })
            .await?
            .is_some();
        if !in_target {
            let app = &app;
            self.retry
                .run(ctx, "put_app", move || async move {
                    Ok(self.documents.put_app(target, app).await?)
                })
                .await?;
            debug!(app = slug, store = target, "app created");
        }
        Ok(app)
    }

    /// Stores for a write into `space`, which must be the space bound to
    /// the domain the editor was authorized on.
    fn write_handle(
        resolver: &NamespaceResolver,
        auth: &AuthorizedEditor,
        space: &str,
    ) -> RegistryResult<StoreHandle> {
        resolver.authorize_space_write(auth.domain(), space, auth.editor())?;
        Ok(resolver.resolve_store(space)?)
    }

    async fn write_version(
        &self,
        ctx: &RequestContext,
        target: &str,
        version: &Version,
    ) -> RegistryResult<()> {
        self.retry
            .run(ctx, "put_version", move || async move {
                Ok(self.documents.put_version(target, version).await?)
            })
            .await
    }

    /// Publish `version` of `slug` in `space`.
    ///
    /// Lands in the write target only: a virtual space's overwrite store, or
    /// the base store for a base space. Republishing the same version
    /// replaces it. Cached listings of every space that can observe the
    /// write are invalidated before returning.
    pub async fn publish_version(
        &self,
        ctx: &RequestContext,
        auth: &AuthorizedEditor,
        space: &str,
        slug: &str,
        version: &str,
        body: NewVersion,
    ) -> RegistryResult<Version> {
        let resolver = self.resolver();
        let handle = Self::write_handle(&resolver, auth, space)?;
        let editor = auth.editor();
        let mut doc = Version::new(slug, version, editor, Utc::now())?;
        self.app_for_write(ctx, &handle, editor, slug, body.kind).await?;
        doc.url = body.url;
        doc.manifest = body.manifest;

        let target = handle.write_target();
        self.write_version(ctx, target, &doc).await?;
        self.cache
            .invalidate(ctx, &Self::invalidation_targets(&resolver, &handle), slug)
            .await;
        info!(space, app = slug, version, editor, store = target, "version published");
        Ok(doc)
    }

    /// Delete `version` of `slug` from `space`'s write target.
    ///
    /// For a virtual space this removes the override only; reads fall back
    /// to the base afterwards.
    pub async fn delete_version(
        &self,
        ctx: &RequestContext,
        auth: &AuthorizedEditor,
        space: &str,
        slug: &str,
        version: &str,
    ) -> RegistryResult<()> {
        validate_app_name(slug)?;
        let resolver = self.resolver();
        let handle = Self::write_handle(&resolver, auth, space)?;
        let target = handle.write_target();
        let existing = self
            .retry
            .run(ctx, "get_version", move || async move {
                Ok(self.documents.get_version(target, slug, version).await?)
            })
            .await?
            .ok_or_else(|| RegistryError::not_found("version", format!("{slug}@{version}")))?;
        if existing.editor != auth.editor() {
            return Err(RegistryError::NotOwner {
                editor: auth.editor().to_string(),
                app: slug.to_string(),
            });
        }
        self.retry
            .run(ctx, "delete_version", move || async move {
                Ok(self.documents.delete_version(target, slug, version).await?)
            })
            .await?;
        let key = tarball_key(slug, version);
        let key = key.as_str();
        self.retry
            .run(ctx, "delete_tarball", move || async move {
                Ok(self.storage.delete(target, key).await?)
            })
            .await?;
        self.cache
            .invalidate(ctx, &Self::invalidation_targets(&resolver, &handle), slug)
            .await;
        info!(space, app = slug, version, store = target, "version deleted");
        Ok(())
    }

    /// Store the artifact of an existing version and record its digest and
    /// size on the version document in the write target.
    pub async fn put_tarball(
        &self,
        ctx: &RequestContext,
        auth: &AuthorizedEditor,
        space: &str,
        slug: &str,
        version: &str,
        data: Bytes,
    ) -> RegistryResult<Version> {
        validate_app_name(slug)?;
        let resolver = self.resolver();
        let handle = Self::write_handle(&resolver, auth, space)?;
        let mut doc = self
            .load_version(ctx, &handle, slug, version)
            .await?
            .ok_or_else(|| RegistryError::not_found("version", format!("{slug}@{version}")))?;
        if doc.editor != auth.editor() {
            return Err(RegistryError::NotOwner {
                editor: auth.editor().to_string(),
                app: slug.to_string(),
            });
        }
        let target = handle.write_target();
        self.app_for_write(ctx, &handle, auth.editor(), slug, AppKind::default())
            .await?;

        let key = tarball_key(slug, version);
        doc.sha256 = Some(sha256_hex(&data));
        doc.size = Some(data.len() as u64);
        {
            let key = key.as_str();
            let data = &data;
            self.retry
                .run(ctx, "put_tarball", move || async move {
                    Ok(self.storage.put(target, key, data.clone()).await?)
                })
                .await?;
        }
        self.write_version(ctx, target, &doc).await?;
        self.cache
            .invalidate(ctx, &Self::invalidation_targets(&resolver, &handle), slug)
            .await;
        info!(space, app = slug, version, size = data.len(), store = target, "tarball stored");
        Ok(doc)
    }

    /// Fetch the artifact of `slug@version`, following the overlay order.
    pub async fn get_tarball(
        &self,
        ctx: &RequestContext,
        space: &str,
        slug: &str,
        version: &str,
    ) -> RegistryResult<Bytes> {
        validate_app_name(slug)?;
        let handle = self.resolver().resolve_store(space)?;
        let key = tarball_key(slug, version);
        let key = key.as_str();
        let found = read_through(&handle, slug, move |prefix| async move {
            let prefix = prefix.as_str();
            self.retry
                .run(ctx, "get_tarball", move || async move {
                    match self.storage.get(prefix, key).await {
                        Ok(data) => Ok(Some(data)),
                        Err(e) if e.is_not_found() => Ok(None),
                        Err(e) => Err(e.into()),
                    }
                })
                .await
        })
        .await?;
        found
            .map(|(data, _)| data)
            .ok_or_else(|| RegistryError::not_found("tarball", format!("{slug}@{version}")))
    }

    /// Remove the virtual space `name`: its overwrite store and its domain
    /// bindings. The base space is never touched.
    pub async fn drop_virtual_space(&self, ctx: &RequestContext, name: &str) -> RegistryResult<()> {
        let current = self.resolver();
        let handle = current.resolve_store(name)?;
        let Some(overwrite) = handle.overwrite() else {
            return Err(RegistryError::InvalidInput(format!(
                "{name} is a base space and cannot be dropped"
            )));
        };
        let next = current.without_virtual_space(name)?;
        self.retry
            .run(ctx, "delete_database", move || async move {
                Ok(self.documents.delete_database(overwrite).await?)
            })
            .await?;
        self.retry
            .run(ctx, "delete_container", move || async move {
                Ok(self.storage.delete_container(overwrite).await?)
            })
            .await?;
        *self.resolver.write().expect("lock poisoned") = Arc::new(next);
        info!(space = name, store = overwrite, "virtual space dropped");
        Ok(())
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("namespace", self.resolver().namespace())
            .field("cache", &self.cache)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}
