use std::fmt;
use std::time::Duration;

use areg_cache::CacheError;
use areg_editor::EditorError;
use areg_space::SpaceError;
use areg_store::StoreError;
use areg_types::TypeError;

/// The closed set of failure kinds callers branch on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    UnknownDomain,
    UnknownEditor,
    EditorNotTrusted,
    InvalidSignature,
    TokenExpired,
    NamespaceConflict,
    NotFound,
    BackendTimeout,
    StorageUnavailable,
    InvalidInput,
}

impl ErrorKind {
    /// Only transient backend failures are worth another attempt.
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::BackendTimeout | ErrorKind::StorageUnavailable)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::UnknownDomain => "unknown_domain",
            ErrorKind::UnknownEditor => "unknown_editor",
            ErrorKind::EditorNotTrusted => "editor_not_trusted",
            ErrorKind::InvalidSignature => "invalid_signature",
            ErrorKind::TokenExpired => "token_expired",
            ErrorKind::NamespaceConflict => "namespace_conflict",
            ErrorKind::NotFound => "not_found",
            ErrorKind::BackendTimeout => "backend_timeout",
            ErrorKind::StorageUnavailable => "storage_unavailable",
            ErrorKind::InvalidInput => "invalid_input",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors from registry operations.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error(transparent)]
    Space(#[from] SpaceError),

    #[error(transparent)]
    Editor(#[from] EditorError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Type(#[from] TypeError),

    #[error("{what} not found: {name}")]
    NotFound { what: &'static str, name: String },

    /// The app belongs to another editor.
    #[error("editor {editor} does not own app {app}")]
    NotOwner { editor: String, app: String },

    /// The request deadline passed before the backend answered.
    #[error("request deadline exceeded after {0:?}")]
    DeadlineExceeded(Duration),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl RegistryError {
    pub fn not_found(what: &'static str, name: impl Into<String>) -> Self {
        Self::NotFound {
            what,
            name: name.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            RegistryError::Space(e) => match e {
                SpaceError::InvalidName(_) => ErrorKind::InvalidInput,
                SpaceError::UnknownDomain(_) => ErrorKind::UnknownDomain,
                SpaceError::UnknownSpace(_) => ErrorKind::NotFound,
                SpaceError::EditorNotTrusted { .. } => ErrorKind::EditorNotTrusted,
                SpaceError::NamespaceConflict(_)
                | SpaceError::UnknownSource { .. }
                | SpaceError::UnknownBinding { .. }
                | SpaceError::Config(_) => ErrorKind::NamespaceConflict,
            },
            RegistryError::Editor(e) => match e {
                EditorError::UnknownEditor(_) => ErrorKind::UnknownEditor,
                EditorError::InvalidSignature => ErrorKind::InvalidSignature,
                EditorError::TokenExpired { .. } => ErrorKind::TokenExpired,
                EditorError::InvalidName(_) => ErrorKind::InvalidInput,
                EditorError::Unavailable(_) | EditorError::Config(_) => {
                    ErrorKind::StorageUnavailable
                }
            },
            RegistryError::Store(e) => match e {
                StoreError::NotFound { .. } => ErrorKind::NotFound,
                StoreError::InvalidName { .. } => ErrorKind::InvalidInput,
                StoreError::Timeout { .. } => ErrorKind::BackendTimeout,
                StoreError::Unavailable(_)
                | StoreError::Serialization(_)
                | StoreError::Config(_) => ErrorKind::StorageUnavailable,
            },
            RegistryError::Cache(e) => match e {
                CacheError::Timeout { .. } => ErrorKind::BackendTimeout,
                CacheError::Unavailable(_) | CacheError::Config(_) => {
                    ErrorKind::StorageUnavailable
                }
            },
            RegistryError::Type(_) | RegistryError::InvalidInput(_) => ErrorKind::InvalidInput,
            RegistryError::NotFound { .. } => ErrorKind::NotFound,
            RegistryError::NotOwner { .. } => ErrorKind::EditorNotTrusted,
            RegistryError::DeadlineExceeded(_) => ErrorKind::BackendTimeout,
            RegistryError::Config(_) => ErrorKind::StorageUnavailable,
        }
    }
}

pub type RegistryResult<T> = Result<T, RegistryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transient_kinds_retry() {
        let retryable: Vec<ErrorKind> = [
            ErrorKind::UnknownDomain,
            ErrorKind::UnknownEditor,
            ErrorKind::EditorNotTrusted,
            ErrorKind::InvalidSignature,
            ErrorKind::TokenExpired,
            ErrorKind::NamespaceConflict,
            ErrorKind::NotFound,
            ErrorKind::BackendTimeout,
            ErrorKind::StorageUnavailable,
            ErrorKind::InvalidInput,
        ]
        .into_iter()
        .filter(|k| k.is_retryable())
        .collect();
        assert_eq!(
            retryable,
            vec![ErrorKind::BackendTimeout, ErrorKind::StorageUnavailable]
        );
    }

    #[test]
    fn kinds_are_preserved_through_wrapping() {
        let e: RegistryError = EditorError::InvalidSignature.into();
        assert_eq!(e.kind(), ErrorKind::InvalidSignature);
        let e: RegistryError = SpaceError::UnknownDomain("x".into()).into();
        assert_eq!(e.kind(), ErrorKind::UnknownDomain);
        let e: RegistryError = SpaceError::NamespaceConflict("x".into()).into();
        assert_eq!(e.kind(), ErrorKind::NamespaceConflict);
        let e: RegistryError = StoreError::Timeout {
            operation: "get",
            after: Duration::from_secs(1),
        }
        .into();
        assert_eq!(e.kind(), ErrorKind::BackendTimeout);
        let e: RegistryError = StoreError::not_found("p", "k").into();
        assert_eq!(e.kind(), ErrorKind::NotFound);
        let e = RegistryError::NotOwner {
            editor: "a".into(),
            app: "drive".into(),
        };
        assert_eq!(e.kind(), ErrorKind::EditorNotTrusted);
    }

    #[test]
    fn kind_names() {
        assert_eq!(ErrorKind::EditorNotTrusted.to_string(), "editor_not_trusted");
    }
}
