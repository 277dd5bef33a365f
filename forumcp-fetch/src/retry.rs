//! Retry policy for direct requests.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::FetchError;

/// Exponential backoff for transient HTTP failures.
///
/// Only 429 and 5xx responses are retried. Transport errors, timeouts and
/// every other status propagate from the first attempt.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Wait before the first retry; doubles for each following retry.
    pub initial_delay: Duration,
}

impl RetryPolicy {
    /// Creates a policy with the given total attempts.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay: Duration::from_millis(250),
        }
    }

    /// Disables retries.
    pub fn no_retry() -> Self {
        Self::new(1)
    }

    /// Sets the initial delay.
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Delay before retry number `retry` (1-based). No cap.
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.initial_delay.saturating_mul(factor)
    }

    /// Determines if an error should be retried.
    pub fn should_retry(&self, error: &FetchError) -> bool {
        error.is_transient()
    }

    /// Runs `op` until it succeeds, fails permanently, or attempts run out.
    ///
    /// `op` receives the 1-based attempt number.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T, FetchError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if self.should_retry(&e) && attempt < self.max_attempts => {
                    let delay = self.delay_for_retry(attempt);
                    debug!(
                        attempt,
                        max_attempts = self.max_attempts,
                        status = ?e.status(),
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "Transient failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    if self.should_retry(&e) {
                        warn!(attempt, error = %e, "Retries exhausted");
                    }
                    return Err(e);
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use tokio::time::Instant;

    use super::*;
    use crate::error::HttpStatusError;

    #[test]
    fn test_exponential_backoff() {
        let policy = RetryPolicy::default();

        assert_eq!(policy.delay_for_retry(1), Duration::from_millis(250));
        assert_eq!(policy.delay_for_retry(2), Duration::from_millis(500));
        assert_eq!(policy.delay_for_retry(3), Duration::from_millis(1000));
        assert_eq!(policy.delay_for_retry(6), Duration::from_millis(8000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_503_twice_then_success() {
        let policy = RetryPolicy::default();
        let calls = AtomicU32::new(0);
        let start = Instant::now();
        let mut seen = Vec::new();

        let result = policy
            .run(|attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                seen.push(start.elapsed());
                async move {
                    if attempt < 3 {
                        Err(FetchError::Http(HttpStatusError::new(503, None)))
                    } else {
                        Ok("ok")
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(seen[1] - seen[0], Duration::from_millis(250));
        assert_eq!(seen[2] - seen[1], Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_404_not_retried() {
        let policy = RetryPolicy::default();
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = policy
            .run(|_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(FetchError::Http(HttpStatusError::new(404, None))) }
            })
            .await;

        assert_eq!(result.unwrap_err().status(), Some(404));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_returns_last_error() {
        let policy = RetryPolicy::new(2);
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = policy
            .run(|attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                let status = if attempt == 1 { 500 } else { 429 };
                async move { Err(FetchError::Http(HttpStatusError::new(status, None))) }
            })
            .await;

        assert_eq!(result.unwrap_err().status(), Some(429));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_not_retried() {
        let policy = RetryPolicy::default();
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = policy
            .run(|_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async {
                    Err(FetchError::Timeout {
                        url: "https://a.example".into(),
                        after: Duration::from_secs(1),
                    })
                }
            })
            .await;

        assert!(matches!(result, Err(FetchError::Timeout { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
