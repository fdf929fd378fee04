//! Bounded retry with exponential backoff.
//!
//! Transient failures (5xx, network) wait `base_delay * 2^attempt` before the
//! next attempt: 1s, 2s, 4s, ... with the default policy. Anything the error
//! taxonomy marks as terminal is returned on the spot.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use super::error::TransportResult;

/// How many times to try a request and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Delay after the first failed attempt; doubles on every later failure.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }

    /// Backoff to sleep after the 0-indexed `attempt` failed.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }

    fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// Run `op` until it succeeds, fails terminally, or the policy is exhausted.
///
/// `op` receives the 0-indexed attempt number. The last observed error is
/// returned once attempts run out. The backoff sleep only suspends the
/// calling task.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    mut op: F,
) -> TransportResult<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = TransportResult<T>>,
{
    let max_attempts = policy.attempts();
    let mut attempt = 0;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt + 1 < max_attempts => {
                let backoff = policy.delay_for(attempt);
                warn!(
                    request = label,
                    attempt = attempt + 1,
                    max_attempts,
                    backoff_secs = backoff.as_secs_f64(),
                    error = %err,
                    "Transient provider error, retrying"
                );
                tokio::time::sleep(backoff).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
