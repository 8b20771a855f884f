//! Storage backends for the apps registry.
//!
//! Two contracts live here, each with two interchangeable engines:
//!
//! - [`ObjectStorage`] — blobs scoped by a prefix (the tenant isolation
//!   unit): [`InMemoryObjectStorage`] for tests and local runs, and
//!   [`ObjectStoreStorage`] backed by the `object_store` crate (S3 or a
//!   local directory) for production.
//! - [`DocumentStore`] — app and version documents grouped in named
//!   databases: [`InMemoryDocumentStore`], and [`ObjectDocumentStore`] which
//!   persists JSON documents through any [`ObjectStorage`].
//!
//! The rest of the registry depends only on the traits. Which engine is
//! active is decided once at startup by [`build_storage`] and
//! [`build_documents`] from configuration.
//!
//! # Design Rules
//!
//! 1. Every operation is scoped to one prefix (or database); nothing crosses
//!    tenants.
//! 2. `ensure_container` / `ensure_database` are idempotent.
//! 3. Writes are upserts keyed by name, so repeating a write converges.
//! 4. Deleting something that does not exist is not an error.
//! 5. Remote calls are bounded by a timeout and surface
//!    [`StoreError::Timeout`] rather than hang.

pub mod config;
pub mod document;
pub mod error;
pub mod keys;
pub mod memory;
pub mod remote;
pub mod timeout;
pub mod traits;

#[cfg(test)]
mod contract;

pub use config::{build_documents, build_storage, DocumentsConfig, StorageBackend, StorageConfig};
pub use document::{DocumentStore, InMemoryDocumentStore, ObjectDocumentStore};
pub use error::{StoreError, StoreResult};
pub use memory::InMemoryObjectStorage;
pub use remote::{ObjectStoreStorage, S3Settings};
pub use timeout::with_timeout;
pub use traits::ObjectStorage;
