use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json};
use bytes::Bytes;
use serde::Deserialize;
use serde_json::json;

use areg_registry::{AuthorizedEditor, NewVersion, Registry, RequestContext};
use areg_types::{App, Channel, Version};

use crate::auth::{domain_of, token_of};
use crate::error::{ServerError, ServerResult};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<Registry>,
    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(registry: Arc<Registry>, request_timeout: Duration) -> Self {
        Self {
            registry,
            request_timeout,
        }
    }

    fn context(&self) -> RequestContext {
        RequestContext::new(self.request_timeout)
    }

    /// The space a request addresses: the explicit path segment, or the one
    /// bound to the request's domain.
    fn space(&self, headers: &HeaderMap, explicit: Option<&str>) -> ServerResult<String> {
        Ok(self
            .registry
            .resolver()
            .resolve(&domain_of(headers), explicit)
            .map_err(areg_registry::RegistryError::from)?)
    }

    async fn authorize(
        &self,
        ctx: &RequestContext,
        headers: &HeaderMap,
    ) -> ServerResult<AuthorizedEditor> {
        let token = token_of(headers)?;
        Ok(self
            .registry
            .authorize(ctx, &domain_of(headers), token)
            .await?)
    }
}

/// Path parameters. `space` is absent on the unprefixed routes.
#[derive(Debug, Deserialize)]
pub struct AppPath {
    pub space: Option<String>,
    pub app: String,
}

#[derive(Debug, Deserialize)]
pub struct VersionPath {
    pub space: Option<String>,
    pub app: String,
    pub version: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChannelQuery {
    #[serde(default)]
    pub channel: Channel,
}

pub async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[derive(Debug, Deserialize)]
pub struct SpacePath {
    pub space: Option<String>,
}

pub async fn list_apps_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(path): Path<SpacePath>,
) -> ServerResult<Json<Vec<App>>> {
    let space = state.space(&headers, path.space.as_deref())?;
    let ctx = state.context();
    Ok(Json(state.registry.list_apps(&ctx, &space).await?))
}

/// `list_apps_handler` for the unprefixed route, which has no path
/// parameters to extract.
pub async fn list_default_apps_handler(
    state: State<AppState>,
    headers: HeaderMap,
) -> ServerResult<Json<Vec<App>>> {
    list_apps_handler(state, headers, Path(SpacePath { space: None })).await
}

pub async fn get_app_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(path): Path<AppPath>,
) -> ServerResult<Json<App>> {
    let space = state.space(&headers, path.space.as_deref())?;
    let ctx = state.context();
    Ok(Json(state.registry.get_app(&ctx, &space, &path.app).await?))
}

pub async fn list_versions_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(path): Path<AppPath>,
    Query(query): Query<ChannelQuery>,
) -> ServerResult<Json<Vec<String>>> {
    let space = state.space(&headers, path.space.as_deref())?;
    let ctx = state.context();
    let versions = state
        .registry
        .list_versions(&ctx, &space, &path.app, query.channel)
        .await?;
    Ok(Json(versions))
}

/// `GET .../{app}/{channel}/latest`. The channel shares the version segment.
pub async fn latest_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(path): Path<VersionPath>,
) -> ServerResult<Json<Version>> {
    let channel: Channel = path
        .version
        .parse()
        .map_err(|e: areg_types::TypeError| ServerError::BadRequest(e.to_string()))?;
    let space = state.space(&headers, path.space.as_deref())?;
    let ctx = state.context();
    let latest = state
        .registry
        .latest_version(&ctx, &space, &path.app, channel)
        .await?;
    Ok(Json(latest))
}

pub async fn get_version_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(path): Path<VersionPath>,
) -> ServerResult<Json<Version>> {
    let space = state.space(&headers, path.space.as_deref())?;
    let ctx = state.context();
    let version = state
        .registry
        .get_version(&ctx, &space, &path.app, &path.version)
        .await?;
    Ok(Json(version))
}

pub async fn publish_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(path): Path<VersionPath>,
    Json(body): Json<NewVersion>,
) -> ServerResult<(StatusCode, Json<Version>)> {
    let ctx = state.context();
    let auth = state.authorize(&ctx, &headers).await?;
    let space = state.space(&headers, path.space.as_deref())?;
    let version = state
        .registry
        .publish_version(&ctx, &auth, &space, &path.app, &path.version, body)
        .await?;
    Ok((StatusCode::CREATED, Json(version)))
}

pub async fn delete_version_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(path): Path<VersionPath>,
) -> ServerResult<StatusCode> {
    let ctx = state.context();
    let auth = state.authorize(&ctx, &headers).await?;
    let space = state.space(&headers, path.space.as_deref())?;
    state
        .registry
        .delete_version(&ctx, &auth, &space, &path.app, &path.version)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn put_tarball_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(path): Path<VersionPath>,
    body: Bytes,
) -> ServerResult<Json<Version>> {
    let ctx = state.context();
    let auth = state.authorize(&ctx, &headers).await?;
    let space = state.space(&headers, path.space.as_deref())?;
    let version = state
        .registry
        .put_tarball(&ctx, &auth, &space, &path.app, &path.version, body)
        .await?;
    Ok(Json(version))
}

pub async fn get_tarball_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(path): Path<VersionPath>,
) -> ServerResult<impl IntoResponse> {
    let space = state.space(&headers, path.space.as_deref())?;
    let ctx = state.context();
    let data = state
        .registry
        .get_tarball(&ctx, &space, &path.app, &path.version)
        .await?;
    Ok(([(CONTENT_TYPE, "application/gzip")], data))
}
