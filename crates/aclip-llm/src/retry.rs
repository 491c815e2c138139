//! Retry policy with exponential backoff and jitter.
//!
//! Retries only errors the provider can recover from (network failures,
//! 5xx, 429, timeouts) and honors the provider's retry-after hint on 429.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::{LlmError, LlmResult};

/// Backoff configuration for gateway calls.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts (not counting the initial call).
    pub max_retries: u32,
    /// Base delay for exponential backoff.
    pub base_delay: Duration,
    /// Delay cap.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Backoff delay for the given attempt, with full jitter.
    fn delay_for_attempt(&self, attempt: u32, retry_after_ms: Option<u64>) -> Duration {
        // The provider's own hint wins outright.
        if let Some(after) = retry_after_ms {
            return Duration::from_millis(after).min(self.max_delay);
        }

        let exp = self
            .base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
            .min(self.max_delay);

        // Full jitter from the sub-second clock, keeping the crate free of a
        // rand dependency.
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::SystemTime::UNIX_EPOCH)
            .map(|d| d.subsec_nanos())
            .unwrap_or(0);
        let factor = (nanos % 1000) as f64 / 1000.0;
        let jittered = Duration::from_secs_f64(exp.as_secs_f64() * factor);

        jittered.max(self.base_delay).min(self.max_delay)
    }
}

/// Run an operation under the policy, sleeping between retryable failures.
pub(crate) async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    operation: &str,
    op: F,
) -> LlmResult<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = LlmResult<T>>,
{
    let mut last_error = None;

    for attempt in 0..=policy.max_retries {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < policy.max_retries => {
                let delay = policy.delay_for_attempt(attempt, e.retry_after_ms());
                warn!(
                    operation,
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    "LLM call failed, retrying: {}",
                    e
                );
                tokio::time::sleep(delay).await;
                last_error = Some(e);
            }
            Err(e) => return Err(e),
        }
    }

    Err(last_error.unwrap_or_else(|| LlmError::unavailable("retries exhausted")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_delay_respects_retry_after() {
        let policy = RetryPolicy::default();
        let delay = policy.delay_for_attempt(0, Some(2500));
        assert_eq!(delay, Duration::from_millis(2500));
    }

    #[test]
    fn test_delay_caps_retry_after() {
        let policy = RetryPolicy::default();
        let delay = policy.delay_for_attempt(0, Some(120_000));
        assert_eq!(delay, Duration::from_secs(30));
    }

    #[test]
    fn test_delay_bounds() {
        let policy = RetryPolicy::default();
        for attempt in 0..8 {
            let d = policy.delay_for_attempt(attempt, None);
            assert!(d >= policy.base_delay);
            assert!(d <= policy.max_delay);
        }
    }

    #[tokio::test]
    async fn test_non_retryable_fails_fast() {
        let policy = RetryPolicy::default();
        let calls = AtomicU32::new(0);
        let result: LlmResult<()> = with_retry(&policy, "test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(LlmError::invalid_output("nope")) }
        })
        .await;
        assert!(matches!(result, Err(LlmError::InvalidOutput(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_until_success() {
        let policy = RetryPolicy {
            max_retries: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
        };
        let calls = AtomicU32::new(0);
        let result = with_retry(&policy, "test", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(LlmError::unavailable("503"))
                } else {
                    Ok(42)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retries_exhausted_returns_last_error() {
        let policy = RetryPolicy {
            max_retries: 2,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
        };
        let calls = AtomicU32::new(0);
        let result: LlmResult<()> = with_retry(&policy, "test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(LlmError::unavailable("503")) }
        })
        .await;
        assert!(matches!(result, Err(LlmError::Unavailable(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
