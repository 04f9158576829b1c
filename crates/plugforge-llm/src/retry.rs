//! Generic retry-with-exponential-jitter wrapper for network calls.

use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Governs the backoff primitive. Stateless; reused across calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Additional attempts after the first failure.
    pub max_retries: u32,
    /// Base delay before the first retry, doubled each attempt.
    pub base_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 4,
            base_delay_ms: 500,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry `attempt` (1-based): `base * 2^(attempt-1) * jitter`,
    /// jitter drawn uniformly from [0.75, 1.25].
    fn delay_ms(&self, attempt: u32) -> u64 {
        let jitter: f64 = rand::thread_rng().gen_range(0.75..=1.25);
        let base = self.base_delay_ms as f64 * 2f64.powi(attempt as i32 - 1);
        (base * jitter).round() as u64
    }
}

/// Execute `op`; on failure retry up to `policy.max_retries` additional times,
/// sleeping an exponentially growing, jittered delay between attempts.
///
/// `on_retry` is invoked with the error, attempt number, and computed delay
/// before each sleep — for logging, never for control flow. No error kinds are
/// special-cased here; that belongs to the caller. The last failure is
/// re-raised when all attempts are exhausted.
pub async fn with_backoff<T, E, F, Fut, O>(
    policy: &RetryPolicy,
    mut on_retry: O,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    O: FnMut(&E, u32, u64),
{
    let mut attempt = 0u32;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                attempt += 1;
                if attempt > policy.max_retries {
                    return Err(err);
                }
                let delay = policy.delay_ms(attempt);
                on_retry(&err, attempt, delay);
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
        }
    }
}
