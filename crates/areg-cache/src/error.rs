use std::time::Duration;

/// Errors from cache operations.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache {operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    #[error("cache unavailable: {0}")]
    Unavailable(String),

    #[error("cache configuration error: {0}")]
    Config(String),
}

pub type CacheResult<T> = Result<T, CacheError>;
