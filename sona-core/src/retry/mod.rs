//! Backoff policy for transient collaborator failures.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::warn;

use crate::error::Result;

/// Exponential backoff configuration.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Attempts after the first failure
    pub max_retries: u32,
    /// Delay before the first retry
    pub base_delay: Duration,
    /// Ceiling for the exponential delay
    pub max_delay: Duration,
    /// Random jitter as a fraction of the delay, in [0, 1]
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
            jitter_factor: 0.25,
        }
    }
}

impl RetryConfig {
    /// Default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the retry ceiling.
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the base delay.
    #[must_use]
    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Disable jitter (useful under paused test clocks).
    #[must_use]
    pub fn without_jitter(mut self) -> Self {
        self.jitter_factor = 0.0;
        self
    }
}

/// Retries recoverable errors with exponential backoff and jitter.
///
/// Only errors whose [`is_recoverable`](crate::Error::is_recoverable) is
/// true are retried; everything else surfaces immediately.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    /// Policy with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: RetryConfig::default(),
        }
    }

    /// Policy with an explicit configuration.
    #[must_use]
    pub fn with_config(config: RetryConfig) -> Self {
        Self { config }
    }

    fn delay_for(&self, attempt: u32) -> Duration {
        let exp_delay = self.config.base_delay * 2u32.pow(attempt.saturating_sub(1));
        let delay = std::cmp::min(exp_delay, self.config.max_delay);

        if self.config.jitter_factor > 0.0 {
            let jitter_range = delay.as_millis() as f64 * self.config.jitter_factor;
            let jitter = (rand::random::<f64>() - 0.5) * 2.0 * jitter_range;
            let adjusted_ms = (delay.as_millis() as f64 + jitter).max(0.0);
            Duration::from_millis(adjusted_ms as u64)
        } else {
            delay
        }
    }

    /// Run `operation`, retrying recoverable failures up to the ceiling.
    pub async fn execute<F, T, Fut>(&self, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(err) => {
                    if !err.is_recoverable() || attempt >= self.config.max_retries {
                        return Err(err);
                    }
                    attempt += 1;
                    let delay = self.delay_for(attempt);
                    warn!(
                        "Retry attempt {}/{} failed: {err}, retrying in {delay:?}",
                        attempt, self.config.max_retries
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_recoverable_error_retried_until_success() {
        let attempts = AtomicU32::new(0);
        let policy = RetryPolicy::with_config(RetryConfig::default().without_jitter());

        let result = policy
            .execute(|| async {
                if attempts.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(Error::Fetch("flaky".to_string()))
                } else {
                    Ok(42)
                }
            })
            .await
            .unwrap();

        assert_eq!(result, 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unrecoverable_error_not_retried() {
        let attempts = AtomicU32::new(0);
        let policy = RetryPolicy::new();

        let result: Result<u32> = policy
            .execute(|| async {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err(Error::InvalidInput("bad".to_string()))
            })
            .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_ceiling_respected() {
        let attempts = AtomicU32::new(0);
        let policy = RetryPolicy::with_config(
            RetryConfig::default()
                .with_max_retries(2)
                .without_jitter(),
        );

        let result: Result<u32> = policy
            .execute(|| async {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err(Error::Fetch("always down".to_string()))
            })
            .await;

        assert!(result.is_err());
        // Initial attempt plus two retries.
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }
}
