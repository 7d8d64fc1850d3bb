//! Fixed-interval retry policy for transient failures.

use std::time::Duration;

use tokio::time::sleep;

/// Retry an operation at a fixed interval.
///
/// The default retries every five seconds forever, which is what a service
/// waiting for its broker at startup wants. Bounded policies are for
/// operations where giving up is acceptable.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Delay between attempts.
    pub interval: Duration,
    /// Maximum number of attempts, or `None` to retry indefinitely.
    pub max_attempts: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            max_attempts: None,
        }
    }
}

impl RetryPolicy {
    /// An unbounded policy with the given interval.
    pub fn fixed(interval: Duration) -> Self {
        Self {
            interval,
            max_attempts: None,
        }
    }

    /// Caps the number of attempts.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    /// Runs an operation until it succeeds or the attempt cap is hit.
    pub async fn run<F, Fut, T, E>(&self, mut operation: F) -> Result<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let mut attempt = 0;

        loop {
            attempt += 1;

            match operation(attempt).await {
                Ok(result) => {
                    if attempt > 1 {
                        tracing::info!(attempt, "operation succeeded after retry");
                    }
                    return Ok(result);
                }
                Err(error) => {
                    if let Some(max) = self.max_attempts
                        && attempt >= max
                    {
                        tracing::error!(
                            attempt,
                            error = %error,
                            "operation failed after all retries"
                        );
                        return Err(error);
                    }

                    tracing::warn!(
                        attempt,
                        error = %error,
                        delay_ms = self.interval.as_millis() as u64,
                        "operation failed, retrying after delay"
                    );
                    sleep(self.interval).await;
                }
            }
        }
    }
}
