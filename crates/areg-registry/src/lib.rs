//! Core of the apps registry.
//!
//! [`Registry`] ties the pieces together: the namespace resolver decides
//! which stores a request touches, the credential manager establishes who
//! the editor is, the document and object stores hold the data, and the
//! versions cache fronts listing and latest-version queries.
//!
//! Every operation takes a [`RequestContext`] carrying the request deadline;
//! backend calls run under it and transient failures are retried according to
//! the configured [`RetryPolicy`].

pub mod cache;
pub mod config;
pub mod context;
pub mod error;
pub mod registry;
pub mod retry;

pub use cache::VersionsCache;
pub use config::RegistryConfig;
pub use context::RequestContext;
pub use error::{ErrorKind, RegistryError, RegistryResult};
pub use registry::{AuthorizedEditor, Backends, NewVersion, Registry};
pub use retry::RetryPolicy;
