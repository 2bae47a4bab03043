//! Constant-delay retry loop

use std::future::Future;
use std::time::Duration;
use tracing::{debug, error, warn};

use crate::error::Result;

/// How many times to retry and how long to wait in between
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts allowed after the first one fails
    pub retry_attempts: u32,
    /// Fixed pause between attempts
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn max_attempts(&self) -> u32 {
        self.retry_attempts.saturating_add(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retry_attempts: 3,
            delay: Duration::from_secs(5),
        }
    }
}

/// Final result of a retried operation and the attempts it took
#[derive(Debug)]
pub struct Attempted<T> {
    pub result: Result<T>,
    pub attempts: u32,
}

/// Run `op` until it succeeds, fails with a non-retryable error, or the
/// policy's attempts are used up
///
/// `op` receives the 1-based attempt number.
pub async fn retry<T, F, Fut>(policy: &RetryPolicy, what: &str, mut op: F) -> Attempted<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = policy.max_attempts();
    let mut attempt = 1;

    loop {
        match op(attempt).await {
            Ok(value) => {
                return Attempted {
                    result: Ok(value),
                    attempts: attempt,
                };
            }
            Err(e) if e.is_retryable() && attempt < max_attempts => {
                warn!("{} failed (attempt {}/{}): {}", what, attempt, max_attempts, e);
                debug!("Retrying {} in {:?}", what, policy.delay);
                tokio::time::sleep(policy.delay).await;
                attempt += 1;
            }
            Err(e) => {
                if e.is_retryable() {
                    error!("{} failed after {} attempts: {}", what, attempt, e);
                }
                return Attempted {
                    result: Err(e),
                    attempts: attempt,
                };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Instant;

    fn policy(retry_attempts: u32, millis: u64) -> RetryPolicy {
        RetryPolicy {
            retry_attempts,
            delay: Duration::from_millis(millis),
        }
    }

    #[tokio::test]
    async fn test_gives_up_after_n_plus_one_attempts() {
        let calls = AtomicU32::new(0);
        let started = Instant::now();

        let outcome: Attempted<()> = retry(&policy(2, 40), "op", |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(Error::fetch("http://x", "refused")) }
        })
        .await;

        assert!(outcome.result.is_err());
        assert_eq!(outcome.attempts, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // Two pauses between three attempts
        assert!(started.elapsed() >= Duration::from_millis(80));
    }

    #[tokio::test]
    async fn test_stops_on_first_success() {
        let outcome = retry(&policy(5, 1), "op", |attempt| async move {
            if attempt < 3 {
                Err(Error::fetch("http://x", "reset"))
            } else {
                Ok(attempt)
            }
        })
        .await;

        assert_eq!(outcome.result.unwrap(), 3);
        assert_eq!(outcome.attempts, 3);
    }

    #[tokio::test]
    async fn test_non_retryable_error_returns_immediately() {
        let outcome: Attempted<()> = retry(&policy(5, 1), "op", |_| async {
            Err(Error::parse("http://x", "bad page"))
        })
        .await;

        assert_eq!(outcome.attempts, 1);
        assert!(matches!(outcome.result, Err(Error::Parse { .. })));
    }

    #[tokio::test]
    async fn test_zero_retries_means_single_attempt() {
        let outcome: Attempted<()> = retry(&policy(0, 1), "op", |_| async {
            Err(Error::fetch("http://x", "refused"))
        })
        .await;

        assert_eq!(outcome.attempts, 1);
    }
}
