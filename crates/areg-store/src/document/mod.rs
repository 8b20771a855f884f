//! App and version documents grouped in named databases.
//!
//! A database corresponds to one space's store (base or overwrite). The
//! registry layer composes two databases for virtual spaces; this module
//! knows nothing about overlays.

mod memory;
mod object;

use async_trait::async_trait;

use areg_types::{App, Version};

use crate::error::StoreResult;

pub use memory::InMemoryDocumentStore;
pub use object::ObjectDocumentStore;

/// Document database contract.
///
/// - `ensure_database` is idempotent.
/// - `put_app` and `put_version` are upserts keyed by slug and
///   `(slug, version)`; writing the same document twice converges.
/// - Lookups of missing documents return `Ok(None)`, not an error.
/// - `delete_version` reports whether a document was removed.
/// - `list_apps` is sorted by slug. `list_versions` returns every version of
///   the app, in no particular order.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn ensure_database(&self, db: &str) -> StoreResult<()>;

    /// Drop the database and every document in it.
    async fn delete_database(&self, db: &str) -> StoreResult<()>;

    async fn get_app(&self, db: &str, slug: &str) -> StoreResult<Option<App>>;

    async fn put_app(&self, db: &str, app: &App) -> StoreResult<()>;

    async fn list_apps(&self, db: &str) -> StoreResult<Vec<App>>;

    async fn get_version(&self, db: &str, slug: &str, version: &str)
        -> StoreResult<Option<Version>>;

    async fn put_version(&self, db: &str, version: &Version) -> StoreResult<()>;

    async fn delete_version(&self, db: &str, slug: &str, version: &str) -> StoreResult<bool>;

    async fn list_versions(&self, db: &str, slug: &str) -> StoreResult<Vec<Version>>;
}
