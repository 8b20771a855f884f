use std::sync::Arc;

use async_trait::async_trait;

use areg_crypto::EditorSecret;

use crate::error::EditorResult;

/// Persistence for editor secrets, keyed by editor name.
///
/// `put_secret` replaces the previous secret atomically: a concurrent
/// `get_secret` returns either the old or the new secret, never a mix and
/// never nothing.
#[async_trait]
pub trait EditorRegistry: Send + Sync {
    async fn get_secret(&self, editor: &str) -> EditorResult<Option<Arc<EditorSecret>>>;

    async fn put_secret(&self, editor: &str, secret: EditorSecret) -> EditorResult<()>;

    /// Remove the editor. Returns whether it existed.
    async fn delete(&self, editor: &str) -> EditorResult<bool>;

    /// Editor names, sorted.
    async fn list(&self) -> EditorResult<Vec<String>>;
}
