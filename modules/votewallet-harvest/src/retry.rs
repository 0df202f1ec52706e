//! Structured retry policy.
//!
//! One policy object applied uniformly around every adapter call instead of
//! source-specific inline sleeps. Throttling signals get a longer effective
//! backoff than ordinary transient failures.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::warn;

use votewallet_common::HarvestError;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub multiplier: u32,
    /// Extra factor applied to the backoff when the source reported
    /// throttling rather than an ordinary failure.
    pub throttle_factor: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            multiplier: 2,
            throttle_factor: 4,
        }
    }
}

impl RetryPolicy {
    /// Backoff before retry number `attempt` (0-based): base * multiplier^attempt,
    /// times the throttle factor when the failure was a throttling signal.
    pub fn delay_for(&self, attempt: u32, throttled: bool) -> Duration {
        let backoff = self.base_delay * self.multiplier.saturating_pow(attempt);
        if throttled {
            backoff * self.throttle_factor
        } else {
            backoff
        }
    }

    /// Run `op` with up to `max_retries` retries on retryable errors.
    /// Non-retryable errors and exhausted retries return the last error.
    pub async fn run<T, F, Fut>(&self, op_name: &str, op: F) -> Result<T, HarvestError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, HarvestError>>,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    let backoff = self.delay_for(attempt, e.is_throttle());
                    let jitter = Duration::from_millis(rand::rng().random_range(0..250));
                    warn!(
                        op = op_name,
                        attempt = attempt + 1,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %e,
                        "Retryable failure, backing off"
                    );
                    tokio::time::sleep(backoff + jitter).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_retries: 2,
            base_delay: Duration::from_millis(1),
            multiplier: 2,
            throttle_factor: 4,
        }
    }

    #[test]
    fn backoff_grows_by_multiplier() {
        let policy = RetryPolicy {
            max_retries: 3,
            base_delay: Duration::from_millis(100),
            multiplier: 3,
            throttle_factor: 4,
        };
        assert_eq!(policy.delay_for(0, false), Duration::from_millis(100));
        assert_eq!(policy.delay_for(1, false), Duration::from_millis(300));
        assert_eq!(policy.delay_for(2, false), Duration::from_millis(900));
    }

    #[test]
    fn throttle_backoff_is_longer() {
        let policy = RetryPolicy::default();
        assert!(policy.delay_for(0, true) > policy.delay_for(0, false));
    }

    #[tokio::test]
    async fn retries_then_succeeds() {
        let calls = AtomicU32::new(0);
        let result = fast_policy()
            .run("test", || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(HarvestError::source("stub", "transient"))
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;
        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = fast_policy()
            .run("test", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(HarvestError::source("stub", "always down")) }
            })
            .await;
        assert!(result.is_err());
        // 1 initial + 2 retries
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn permanent_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = fast_policy()
            .run("test", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(HarvestError::source_permanent("stub", "bad request")) }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn validation_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = fast_policy()
            .run("test", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(HarvestError::Validation("no category".into())) }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
