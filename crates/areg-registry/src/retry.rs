use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::context::RequestContext;
use crate::error::RegistryResult;

/// Bounded retry for transient backend failures.
///
/// Only errors whose kind is retryable (`BackendTimeout`,
/// `StorageUnavailable`) are retried; everything else returns at once. Apply
/// it to reads and to writes that are upserts or deletes keyed by name, where
/// repeating the call converges on the same state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total tries, including the first. Zero behaves like one.
    pub attempts: u32,
    /// Pause before the second try; doubles after each failure.
    #[serde(with = "areg_types::duration")]
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff: Duration::from_millis(50),
        }
    }
}

impl RetryPolicy {
    /// Never retry.
    pub fn none() -> Self {
        Self {
            attempts: 1,
            backoff: Duration::ZERO,
        }
    }

    /// Run `call` under `ctx`, retrying transient failures.
    pub async fn run<T, F, Fut>(
        &self,
        ctx: &RequestContext,
        operation: &'static str,
        mut call: F,
    ) -> RegistryResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = RegistryResult<T>>,
    {
        let attempts = self.attempts.max(1);
        let mut backoff = self.backoff;
        let mut attempt = 1;
        loop {
            match ctx.bounded(operation, call()).await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < attempts && e.kind().is_retryable() => {
                    warn!(operation, attempt, error = %e, "transient failure, retrying");
                    ctx.bounded(operation, async {
                        tokio::time::sleep(backoff).await;
                        Ok(())
                    })
                    .await?;
                    backoff = backoff.saturating_mul(2);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
