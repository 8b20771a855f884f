use std::sync::Arc;

use areg_registry::Registry;
use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::error::ServerResult;
use crate::handler::AppState;
use crate::router::build_router;

/// Registry HTTP server.
pub struct RegistryServer {
    config: ServerConfig,
    registry: Arc<Registry>,
}

impl RegistryServer {
    pub fn new(config: ServerConfig, registry: Arc<Registry>) -> Self {
        Self { config, registry }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(
            AppState::new(self.registry.clone(), self.config.request_timeout),
            self.config.max_tarball_size,
        )
    }

    /// Serve requests until Ctrl-C.
    pub async fn serve(self) -> ServerResult<()> {
        let app = self.router();
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        tracing::info!(addr = %self.config.bind_addr, "registry listening");
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::warn!(error = %e, "cannot listen for shutdown signal");
                    std::future::pending::<()>().await;
                }
                tracing::info!("shutting down");
            })
            .await?;
        Ok(())
    }
}
