//! Exponential backoff for adapter calls that may hit transient failures.

use std::future::Future;
use std::time::Duration;

use crate::config::RetrySettings;
use crate::error::AdapterError;

/// Delay before retry number `attempt` (1-based): `base * 2^(attempt - 1)`.
pub fn backoff_delay(base_delay_ms: u64, attempt: u32) -> Duration {
    let factor = 1u64 << attempt.saturating_sub(1).min(16);
    Duration::from_millis(base_delay_ms.saturating_mul(factor))
}

/// Runs `op` until it succeeds, fails with a non-retryable error, or
/// `policy.max_attempts` calls have been made.
///
/// `on_retry(next_attempt, max_attempts, delay, error)` is called before each
/// backoff sleep.
pub async fn with_backoff<T, F, Fut, R>(
    policy: &RetrySettings,
    mut op: F,
    mut on_retry: R,
) -> Result<T, AdapterError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, AdapterError>>,
    R: FnMut(u32, u32, Duration, &AdapterError),
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < max_attempts => {
                let delay = backoff_delay(policy.base_delay_ms, attempt);
                on_retry(attempt + 1, max_attempts, delay, &e);
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn policy(max_attempts: u32) -> RetrySettings {
        RetrySettings {
            max_attempts,
            base_delay_ms: 1,
        }
    }

    #[test]
    fn test_backoff_doubles() {
        assert_eq!(backoff_delay(2000, 1), Duration::from_secs(2));
        assert_eq!(backoff_delay(2000, 2), Duration::from_secs(4));
        assert_eq!(backoff_delay(2000, 3), Duration::from_secs(8));
        assert_eq!(backoff_delay(0, 5), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_retries_transient_errors_then_succeeds() {
        let calls = AtomicU32::new(0);
        let mut retries = Vec::new();
        let result = with_backoff(
            &policy(3),
            |_| {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    if n < 3 {
                        Err(AdapterError::Network("connection reset".into()))
                    } else {
                        Ok(n)
                    }
                }
            },
            |next, max, _, _| retries.push((next, max)),
        )
        .await;
        assert_eq!(result.unwrap(), 3);
        assert_eq!(retries, vec![(2, 3), (3, 3)]);
    }

    #[tokio::test]
    async fn test_fatal_error_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_backoff(
            &policy(5),
            |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(AdapterError::Auth("token rejected".into())) }
            },
            |_, _, _, _| {},
        )
        .await;
        assert!(matches!(result, Err(AdapterError::Auth(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_gives_up_after_budget() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_backoff(
            &policy(2),
            |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(AdapterError::Timeout("slow".into())) }
            },
            |_, _, _, _| {},
        )
        .await;
        assert!(matches!(result, Err(AdapterError::Timeout(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
