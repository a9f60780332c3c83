// Retry logic for transient provider failures

use crate::port::ProviderError;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::{info, warn};

/// Bounded exponential backoff with additive jitter.
///
/// The delay before attempt `n + 1` is `min(unit * 2^n, max_delay)` plus a
/// uniform jitter in `[0, max_jitter)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffPolicy {
    pub max_attempts: u32,
    pub unit: Duration,
    pub max_delay: Duration,
    pub max_jitter: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            unit: Duration::from_secs(1),
            max_delay: Duration::from_secs(4),
            max_jitter: Duration::from_millis(500),
        }
    }
}

impl BackoffPolicy {
    /// Delay after the `attempt`-th failure (1-based), jitter excluded.
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.min(16));
        self.unit.saturating_mul(factor).min(self.max_delay)
    }

    pub fn delay(&self, attempt: u32) -> Duration {
        let jitter = if self.max_jitter.is_zero() {
            Duration::ZERO
        } else {
            self.max_jitter
                .mul_f64(rand::thread_rng().gen_range(0.0..1.0))
        };
        self.base_delay(attempt) + jitter
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or
    /// `max_attempts` is used up. The last error is returned.
    pub async fn run<T, F, Fut>(&self, provider: &str, mut op: F) -> Result<T, ProviderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.max_attempts => {
                    let delay = self.delay(attempt);
                    warn!(
                        provider,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Transient provider error, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    if attempt > 1 {
                        info!(provider, attempt, error = %e, "Giving up after retries");
                    }
                    return Err(e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast() -> BackoffPolicy {
        BackoffPolicy {
            max_attempts: 3,
            unit: Duration::from_millis(1),
            max_delay: Duration::from_millis(4),
            max_jitter: Duration::ZERO,
        }
    }

    #[test]
    fn test_base_delay_is_capped() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.base_delay(1), Duration::from_secs(2));
        assert_eq!(policy.base_delay(2), Duration::from_secs(4));
        assert_eq!(policy.base_delay(3), Duration::from_secs(4));
        assert_eq!(policy.base_delay(40), Duration::from_secs(4));
    }

    #[test]
    fn test_jitter_stays_in_range() {
        let policy = BackoffPolicy::default();
        for _ in 0..50 {
            let delay = policy.delay(1);
            assert!(delay >= Duration::from_secs(2));
            assert!(delay < Duration::from_millis(2500));
        }
    }

    #[tokio::test]
    async fn test_retries_transient_then_succeeds() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result = fast()
            .run("test", || async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(ProviderError::Http {
                        status: 503,
                        body: String::new(),
                    })
                } else {
                    Ok("done")
                }
            })
            .await;
        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<(), _> = fast()
            .run("test", || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(ProviderError::Transport("reset".into()))
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_fails_immediately() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<(), _> = fast()
            .run("test", || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(ProviderError::Http {
                    status: 400,
                    body: "bad request".into(),
                })
            })
            .await;
        assert_eq!(
            result.unwrap_err(),
            ProviderError::Http {
                status: 400,
                body: "bad request".into()
            }
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
