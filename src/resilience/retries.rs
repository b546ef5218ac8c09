//! Retry logic.
//!
//! # Responsibilities
//! - Describe how often and how long an operation may be retried
//! - Execute retries at a fixed spacing
//! - Route every wait through a [`Sleeper`] so tests can count them
//!
//! # Design Decisions
//! - Fixed spacing, no jitter: one bootstrapper per pod, there is no herd
//! - Unbounded policies never surface a failure; the orchestrator's restart
//!   is the recovery path

use std::fmt;
use std::future::Future;
use std::time::Duration;

use crate::config::RetryConfig;

/// Source of delays between attempts.
pub trait Sleeper {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()>;
}

/// Real wall-clock sleeps on the Tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// How many attempts a loop may make.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempts {
    Bounded(u32),
    Unbounded,
}

/// Fixed-interval retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub interval: Duration,
    pub attempts: Attempts,
}

impl RetryPolicy {
    pub fn bounded(interval: Duration, max_attempts: u32) -> Self {
        Self { interval, attempts: Attempts::Bounded(max_attempts.max(1)) }
    }

    pub fn unbounded(interval: Duration) -> Self {
        Self { interval, attempts: Attempts::Unbounded }
    }

    /// Bounded discovery policy used by the slave path.
    pub fn discovery(config: &RetryConfig) -> Self {
        Self::bounded(Duration::from_secs(config.interval_secs), config.max_discovery_attempts)
    }

    /// Split-brain check made by the default master before claiming the role.
    pub fn master_check(config: &RetryConfig) -> Self {
        Self::bounded(Duration::from_secs(config.interval_secs), config.master_check_attempts)
    }

    /// Unbounded policy for liveness probes and sentinel discovery.
    pub fn forever(config: &RetryConfig) -> Self {
        Self::unbounded(Duration::from_secs(config.interval_secs))
    }

    fn is_last(&self, attempt: u32) -> bool {
        match self.attempts {
            Attempts::Bounded(max) => attempt >= max,
            Attempts::Unbounded => false,
        }
    }
}

/// A bounded retry ran out of attempts.
#[derive(Debug)]
pub struct RetryExhausted<E> {
    pub attempts: u32,
    pub last_error: E,
}

impl<E: fmt::Display> fmt::Display for RetryExhausted<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gave up after {} attempts: {}", self.attempts, self.last_error)
    }
}

/// Run `op` until it succeeds or `policy` runs out of attempts.
///
/// `op` receives the 1-based attempt number. Each failure is logged before
/// sleeping; the final failure of a bounded policy is returned without a
/// trailing sleep.
pub async fn retry<S, F, Fut, T, E>(
    operation: &str,
    policy: &RetryPolicy,
    sleeper: &S,
    mut op: F,
) -> Result<T, RetryExhausted<E>>
where
    S: Sleeper,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    let mut attempt = 0u32;
    loop {
        attempt = attempt.saturating_add(1);
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if policy.is_last(attempt) => {
                tracing::warn!(operation, attempt, error = %e, "Attempts exhausted");
                return Err(RetryExhausted { attempts: attempt, last_error: e });
            }
            Err(e) => {
                tracing::warn!(
                    operation,
                    attempt,
                    error = %e,
                    retry_in_secs = policy.interval.as_secs(),
                    "Attempt failed, retrying"
                );
                sleeper.sleep(policy.interval).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct Recorder(RefCell<Vec<Duration>>);

    impl Sleeper for Recorder {
        async fn sleep(&self, duration: Duration) {
            self.0.borrow_mut().push(duration);
        }
    }

    #[tokio::test]
    async fn test_bounded_retry_sleeps_between_attempts_only() {
        let sleeper = Recorder::default();
        let policy = RetryPolicy::bounded(Duration::from_secs(10), 3);

        let result: Result<(), _> =
            retry("test", &policy, &sleeper, |_| async { Err::<(), _>("down") }).await;

        let err = result.unwrap_err();
        assert_eq!(err.attempts, 3);
        assert_eq!(*sleeper.0.borrow(), vec![Duration::from_secs(10); 2]);
    }

    #[tokio::test]
    async fn test_unbounded_retry_until_success() {
        let sleeper = Recorder::default();
        let policy = RetryPolicy::unbounded(Duration::from_secs(10));

        let value = retry("test", &policy, &sleeper, |attempt| async move {
            if attempt < 7 { Err("not yet") } else { Ok(attempt) }
        })
        .await
        .unwrap();

        assert_eq!(value, 7);
        assert_eq!(sleeper.0.borrow().len(), 6);
    }

    #[test]
    fn test_policies_from_config() {
        let config = RetryConfig::default();
        assert_eq!(
            RetryPolicy::discovery(&config),
            RetryPolicy::bounded(Duration::from_secs(10), 3)
        );
        assert_eq!(RetryPolicy::forever(&config).attempts, Attempts::Unbounded);
        assert_eq!(RetryPolicy::bounded(Duration::ZERO, 0).attempts, Attempts::Bounded(1));
    }
}
