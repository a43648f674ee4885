//! Bounded retry with exponential backoff for idempotent HTTP calls
//!
//! Only errors that report themselves as transient are retried. WHOIS, DNS
//! and PTR lookups never go through here.

use crate::config::defaults::{RETRY_FACTOR, RETRY_INITIAL_DELAY_MS, RETRY_MAX_DELAY_SECS};
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio_retry::strategy::ExponentialBackoff;
use tokio_retry::RetryIf;

/// Errors that can tell whether repeating the call might succeed
pub trait Transient {
    /// Whether the failure is worth another attempt
    fn is_transient(&self) -> bool;
}

/// Delays between attempts for a call allowed `max_attempts` tries in total
///
/// The first delay is `RETRY_INITIAL_DELAY_MS`, each following one is
/// `RETRY_FACTOR` times longer, capped at `RETRY_MAX_DELAY_SECS`.
pub fn backoff(max_attempts: u32) -> impl Iterator<Item = Duration> {
    ExponentialBackoff::from_millis(RETRY_FACTOR)
        .factor(RETRY_INITIAL_DELAY_MS / RETRY_FACTOR)
        .max_delay(Duration::from_secs(RETRY_MAX_DELAY_SECS))
        .take(max_attempts.saturating_sub(1) as usize)
}

/// Run `action` until it succeeds, fails permanently, or attempts run out
pub async fn with_retry<T, E, F, Fut>(max_attempts: u32, what: &str, action: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Transient + Display,
{
    RetryIf::spawn(backoff(max_attempts), action, |err: &E| {
        let retry = err.is_transient();
        if retry {
            tracing::debug!("{what} failed transiently, retrying: {err}");
        }
        retry
    })
    .await
}

/// Classify a reqwest error as transient
///
/// Timeouts, connection failures and the gateway/throttling status codes are
/// transient. Other HTTP statuses and decode failures are not.
pub fn is_transient(err: &reqwest::Error) -> bool {
    if err.is_timeout() || err.is_connect() {
        return true;
    }
    match err.status() {
        Some(status) => matches!(status.as_u16(), 429 | 502 | 503 | 504),
        None => err.is_request() && !err.is_builder(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[derive(Debug)]
    struct TestError {
        transient: bool,
    }

    impl Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "test error (transient: {})", self.transient)
        }
    }

    impl Transient for TestError {
        fn is_transient(&self) -> bool {
            self.transient
        }
    }

    #[test]
    fn test_backoff_schedule() {
        let delays: Vec<Duration> = backoff(3).collect();
        assert_eq!(delays.len(), 2);
        assert_eq!(delays[0], Duration::from_millis(RETRY_INITIAL_DELAY_MS));
        assert_eq!(
            delays[1],
            Duration::from_millis(RETRY_INITIAL_DELAY_MS * RETRY_FACTOR)
        );
    }

    #[test]
    fn test_backoff_single_attempt_has_no_delays() {
        assert_eq!(backoff(1).count(), 0);
        assert_eq!(backoff(0).count(), 0);
    }

    #[test]
    fn test_backoff_is_capped() {
        let max = Duration::from_secs(RETRY_MAX_DELAY_SECS);
        assert!(backoff(10).all(|d| d <= max));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_errors_are_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let result: Result<u32, TestError> = with_retry(3, "test call", || {
            let counter = Arc::clone(&counter);
            async move {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 {
                    Err(TestError { transient: true })
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_errors_stop_immediately() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let result: Result<(), TestError> = with_retry(3, "test call", || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Err(TestError { transient: false }) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempts_are_bounded() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let result: Result<(), TestError> = with_retry(3, "test call", || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Err(TestError { transient: true }) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
