use chrono::{DateTime, Utc};

use areg_types::TypeError;

/// Errors from credential operations.
#[derive(Debug, thiserror::Error)]
pub enum EditorError {
    /// No secret is on file for the editor.
    #[error("unknown editor: {0}")]
    UnknownEditor(String),

    /// The token is malformed or its tag does not match the current secret.
    #[error("invalid token signature")]
    InvalidSignature,

    #[error("token for {editor} expired at {expired_at}")]
    TokenExpired {
        editor: String,
        expired_at: DateTime<Utc>,
    },

    #[error(transparent)]
    InvalidName(#[from] TypeError),

    /// The secret store could not be read or written.
    #[error("editor registry unavailable: {0}")]
    Unavailable(String),

    #[error("editor registry configuration error: {0}")]
    Config(String),
}

pub type EditorResult<T> = Result<T, EditorError>;
