//! HTTP server for the apps registry.
//!
//! A thin dispatch layer: it extracts the domain (`Host`), the optional
//! explicit space, the editor token and the payload, calls the registry core
//! and maps error kinds to statuses. Every route is served both bare
//! (`/registry/...`, space from the domain) and below an explicit space
//! (`/{space}/registry/...`).

pub mod auth;
pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;

pub use config::{Config, ServerConfig};
pub use error::{status_of, ServerError, ServerResult};
pub use handler::AppState;
pub use router::build_router;
pub use server::RegistryServer;
