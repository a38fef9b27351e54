//! Bounded retry with a fixed wait between attempts

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::warn;

/// Reattempt budget and wait applied to a single remote operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Reattempts allowed after the first failure
    pub retry_limit: u32,
    /// Fixed wait before each reattempt
    pub retry_wait: Duration,
}

impl RetryPolicy {
    pub fn new(retry_limit: u32, retry_wait: Duration) -> Self {
        Self {
            retry_limit,
            retry_wait,
        }
    }

    /// Run `op` under this policy, see [`execute`]
    pub async fn run<T, E, F, Fut>(&self, label: &str, op: F) -> Result<T, E>
    where
        E: Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        execute(label, op, self.retry_limit, self.retry_wait).await
    }
}

/// Run `op` until it succeeds or `retry_limit` reattempts have failed.
///
/// At most `retry_limit + 1` attempts are made. The wait never grows and the
/// error of the last attempt is returned as-is.
pub async fn execute<T, E, F, Fut>(
    label: &str,
    mut op: F,
    retry_limit: u32,
    retry_wait: Duration,
) -> Result<T, E>
where
    E: Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut remaining = retry_limit;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if remaining > 0 => {
                remaining -= 1;
                warn!(
                    "{}; retrying '{}' ({} retries left)...",
                    e, label, remaining
                );
                tokio::time::sleep(retry_wait).await;
            }
            Err(e) => return Err(e),
        }
    }
}
