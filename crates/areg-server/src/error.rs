use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use areg_registry::{ErrorKind, RegistryError};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("missing or malformed Authorization header")]
    MissingToken,

    #[error("invalid request: {0}")]
    BadRequest(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ServerResult<T> = Result<T, ServerError>;

impl ServerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServerError::Registry(e) => e.kind(),
            ServerError::MissingToken => ErrorKind::InvalidSignature,
            ServerError::BadRequest(_) => ErrorKind::InvalidInput,
            ServerError::Config(_) | ServerError::Io(_) => ErrorKind::StorageUnavailable,
        }
    }
}

/// HTTP status for an error kind.
pub fn status_of(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::InvalidSignature | ErrorKind::TokenExpired | ErrorKind::UnknownEditor => {
            StatusCode::UNAUTHORIZED
        }
        ErrorKind::EditorNotTrusted => StatusCode::FORBIDDEN,
        ErrorKind::UnknownDomain | ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
        ErrorKind::BackendTimeout => StatusCode::GATEWAY_TIMEOUT,
        ErrorKind::StorageUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::NamespaceConflict => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let status = status_of(kind);
        if status.is_server_error() {
            tracing::warn!(error = %self, %kind, "request failed");
        } else {
            tracing::debug!(error = %self, %kind, "request rejected");
        }
        let body = json!({ "error": kind.as_str(), "message": self.to_string() });
        (status, Json(body)).into_response()
    }
}
