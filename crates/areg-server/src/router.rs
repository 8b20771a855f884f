use axum::body::Body;
use axum::extract::DefaultBodyLimit;
use axum::http::Request;
use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::info_span;
use uuid::Uuid;

use crate::handler::{self, AppState};

/// Routes under `registry/`, mounted both bare and below `/{space}`.
fn registry_routes(max_tarball_size: usize) -> Router<AppState> {
    Router::new()
        .route("/:app", get(handler::get_app_handler))
        .route("/:app/versions", get(handler::list_versions_handler))
        .route(
            "/:app/:version",
            get(handler::get_version_handler)
                .put(handler::publish_handler)
                .delete(handler::delete_version_handler),
        )
        .route("/:app/:version/latest", get(handler::latest_handler))
        .route(
            "/:app/:version/tarball",
            get(handler::get_tarball_handler)
                .put(handler::put_tarball_handler)
                .layer(DefaultBodyLimit::max(max_tarball_size)),
        )
}

/// Build the axum router with every registry endpoint.
pub fn build_router(state: AppState, max_tarball_size: usize) -> Router {
    Router::new()
        .route("/health", get(handler::health_handler))
        .route("/registry", get(handler::list_default_apps_handler))
        .route("/:space/registry", get(handler::list_apps_handler))
        .nest("/registry", registry_routes(max_tarball_size))
        .nest("/:space/registry", registry_routes(max_tarball_size))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                info_span!(
                    "request",
                    id = %Uuid::now_v7(),
                    method = %request.method(),
                    uri = %request.uri(),
                )
            }),
        )
        .with_state(state)
}
