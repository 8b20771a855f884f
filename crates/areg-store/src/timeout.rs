use std::future::Future;
use std::time::Duration;

use crate::error::{StoreError, StoreResult};

/// Run a backend call under a deadline.
///
/// On expiry the inner future is dropped, which cancels any in-flight I/O it
/// owns, and [`StoreError::Timeout`] is returned.
pub async fn with_timeout<T, F>(operation: &'static str, limit: Duration, fut: F) -> StoreResult<T>
where
    F: Future<Output = StoreResult<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(operation, ?limit, "backend call timed out");
            Err(StoreError::Timeout {
                operation,
                after: limit,
            })
        }
    }
}
