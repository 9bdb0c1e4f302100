use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::domain::errors::{AttemptError, ClassifierError};

/// Errors that know whether another attempt could succeed.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

impl Retryable for AttemptError {
    fn is_retryable(&self) -> bool {
        AttemptError::is_retryable(self)
    }
}

impl Retryable for ClassifierError {
    fn is_retryable(&self) -> bool {
        self.is_transient()
    }
}

/// Result of running an operation under a [`RetryPolicy`].
#[derive(Debug)]
pub struct Attempted<T, E> {
    pub result: Result<T, E>,
    /// Calls made, including the first.
    pub attempts: u32,
}

impl<T, E> Attempted<T, E> {
    /// Attempts beyond the first.
    pub const fn retries(&self) -> u32 {
        self.attempts.saturating_sub(1)
    }
}

/// Bounded-attempt retry policy with exponential backoff.
///
/// Backoff doubles with each retry: initial → 2×initial → … capped at max.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first call
    max_attempts: u32,
    /// Initial backoff duration in milliseconds
    initial_backoff_ms: u64,
    /// Maximum backoff duration in milliseconds
    max_backoff_ms: u64,
}

impl RetryPolicy {
    /// Create a new retry policy
    ///
    /// A `max_attempts` of zero is treated as one.
    pub fn new(max_attempts: u32, initial_backoff_ms: u64, max_backoff_ms: u64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_backoff_ms,
            max_backoff_ms: max_backoff_ms.max(initial_backoff_ms),
        }
    }

    /// Policy that never sleeps between attempts.
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, 0, 0)
    }

    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Execute an operation, retrying retryable errors until the attempt
    /// budget is spent or `cancel` fires.
    ///
    /// The operation receives the zero-based attempt number.
    pub async fn execute<F, Fut, T, E>(&self, cancel: &CancellationToken, mut operation: F) -> Attempted<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + std::fmt::Display,
    {
        let mut attempt = 0;

        loop {
            let result = operation(attempt).await;
            attempt += 1;

            match result {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(attempts = attempt, "Operation succeeded after retries");
                    }
                    return Attempted {
                        result: Ok(value),
                        attempts: attempt,
                    };
                }
                Err(err) => {
                    if !err.is_retryable() || attempt >= self.max_attempts {
                        if attempt >= self.max_attempts {
                            debug!(attempts = attempt, error = %err, "Retry budget exhausted");
                        }
                        return Attempted {
                            result: Err(err),
                            attempts: attempt,
                        };
                    }

                    let backoff = self.calculate_backoff(attempt - 1);
                    warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %err,
                        "Attempt failed, retrying in {:?}",
                        backoff
                    );

                    tokio::select! {
                        () = cancel.cancelled() => {
                            return Attempted { result: Err(err), attempts: attempt };
                        }
                        () = sleep(backoff) => {}
                    }
                }
            }
        }
    }

    /// Calculate exponential backoff duration for a given retry
    ///
    /// Formula: min(initial_backoff * 2^retry, max_backoff)
    fn calculate_backoff(&self, retry: u32) -> Duration {
        let backoff_ms = self
            .initial_backoff_ms
            .saturating_mul(2_u64.saturating_pow(retry))
            .min(self.max_backoff_ms);

        Duration::from_millis(backoff_ms)
    }
}

impl Default for RetryPolicy {
    /// 3 attempts, 500ms initial backoff, 8s max
    fn default() -> Self {
        Self::new(3, 500, 8_000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::ResponseError;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_backoff_calculation() {
        let policy = RetryPolicy::new(5, 1000, 6000);

        assert_eq!(policy.calculate_backoff(0), Duration::from_millis(1000));
        assert_eq!(policy.calculate_backoff(1), Duration::from_millis(2000));
        assert_eq!(policy.calculate_backoff(2), Duration::from_millis(4000));
        assert_eq!(policy.calculate_backoff(3), Duration::from_millis(6000));
        assert_eq!(policy.calculate_backoff(40), Duration::from_millis(6000));
    }

    #[test]
    fn test_zero_attempts_means_one() {
        assert_eq!(RetryPolicy::immediate(0).max_attempts(), 1);
    }

    #[tokio::test]
    async fn test_execute_succeeds_immediately() {
        let policy = RetryPolicy::immediate(3);
        let calls = Arc::new(AtomicU32::new(0));

        let outcome = policy
            .execute(&CancellationToken::new(), |_| {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, AttemptError>(42)
                }
            })
            .await;

        assert_eq!(*outcome.result.as_ref().unwrap(), 42);
        assert_eq!(outcome.attempts, 1);
        assert_eq!(outcome.retries(), 0);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_execute_retries_parse_failures() {
        let policy = RetryPolicy::new(3, 1, 2);

        let outcome = policy
            .execute(&CancellationToken::new(), |attempt| async move {
                if attempt < 2 {
                    Err(AttemptError::from(ResponseError::Malformed("garbage".into())))
                } else {
                    Ok(attempt)
                }
            })
            .await;

        assert_eq!(outcome.result.unwrap(), 2);
        assert_eq!(outcome.attempts, 3);
    }

    #[tokio::test]
    async fn test_execute_stops_at_budget() {
        let policy = RetryPolicy::immediate(3);
        let calls = Arc::new(AtomicU32::new(0));

        let outcome: Attempted<(), _> = policy
            .execute(&CancellationToken::new(), |_| {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(AttemptError::from(ClassifierError::RateLimited))
                }
            })
            .await;

        assert!(outcome.result.is_err());
        assert_eq!(outcome.attempts, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_execute_does_not_retry_permanent_error() {
        let policy = RetryPolicy::immediate(3);

        let outcome: Attempted<(), _> = policy
            .execute(&CancellationToken::new(), |_| async {
                Err(AttemptError::from(ClassifierError::Authentication("401".into())))
            })
            .await;

        assert_eq!(outcome.attempts, 1);
    }

    #[tokio::test]
    async fn test_cancel_interrupts_backoff() {
        let policy = RetryPolicy::new(5, 60_000, 60_000);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome: Attempted<(), _> = policy
            .execute(&cancel, |_| async { Err(ClassifierError::Timeout) })
            .await;

        assert_eq!(outcome.attempts, 1);
    }
}
