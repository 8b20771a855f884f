use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tracing::warn;

use crate::error::{RegistryError, RegistryResult};

/// Per-request settings that every backend call honors.
///
/// The deadline is fixed when the context is created, so retries and
/// sequential calls share one budget. Dropping the future of an operation
/// cancels every backend call it has in flight.
#[derive(Clone, Debug)]
pub struct RequestContext {
    timeout: Duration,
    deadline: Instant,
}

// Deadline used when `now + timeout` is not representable.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

impl RequestContext {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    pub fn new(timeout: Duration) -> Self {
        let now = Instant::now();
        Self {
            timeout,
            deadline: now.checked_add(timeout).unwrap_or_else(|| now + FAR_FUTURE),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Time left before the deadline.
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    /// Run `fut` under the request deadline.
    pub async fn bounded<T, F>(&self, operation: &'static str, fut: F) -> RegistryResult<T>
    where
        F: Future<Output = RegistryResult<T>>,
    {
        match tokio::time::timeout_at(self.deadline, fut).await {
            Ok(result) => result,
            Err(_) => {
                warn!(operation, timeout = ?self.timeout, "request deadline exceeded");
                Err(RegistryError::DeadlineExceeded(self.timeout))
            }
        }
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new(Self::DEFAULT_TIMEOUT)
    }
}
