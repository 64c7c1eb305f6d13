//! Retry policy for one-shot challenge operations
//!
//! Challenge operations are idempotent, so a transient failure is handled by
//! running the whole operation again: it re-reads fresh provider state.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::constants::{BACKOFF_BASE_SECS, BACKOFF_MAX_EXPONENT, BACKOFF_MAX_SECS};
use crate::error::ChallengeError;

/// Exponential backoff settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    pub base: Duration,
    pub max: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base: Duration::from_secs(BACKOFF_BASE_SECS),
            max: Duration::from_secs(BACKOFF_MAX_SECS),
        }
    }

    /// Delay before the next attempt after `failures` consecutive failures
    ///
    /// The delay formula is: `min(base * 2^(failures - 1), max)`
    ///
    /// ```
    /// use std::time::Duration;
    /// use gcore_dns01::retry::RetryPolicy;
    ///
    /// let policy = RetryPolicy::new(3);
    /// assert_eq!(policy.backoff_delay(1), Duration::from_secs(2));
    /// assert_eq!(policy.backoff_delay(2), Duration::from_secs(4));
    /// ```
    pub fn backoff_delay(&self, failures: u32) -> Duration {
        let exp = u64::from(failures.saturating_sub(1)).min(BACKOFF_MAX_EXPONENT);
        let millis = (self.base.as_millis() as u64)
            .saturating_mul(1u64 << exp)
            .min(self.max.as_millis() as u64);
        Duration::from_millis(millis)
    }

    /// Runs `op` until it succeeds, fails permanently, or attempts run out
    pub async fn run<T, F, Fut>(&self, operation: &str, mut op: F) -> Result<T, ChallengeError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ChallengeError>>,
    {
        let mut failures = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && failures + 1 < self.max_attempts => {
                    failures += 1;
                    let delay = self.backoff_delay(failures);
                    warn!(
                        "{} attempt {}/{} failed: {}; retrying in {:?}",
                        operation, failures, self.max_attempts, e, delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(crate::constants::DEFAULT_MAX_ATTEMPTS)
    }
}

//==============================================================================
// Tests
//==============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, ProviderError, Step};
    use std::cell::Cell;

    fn instant_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base: Duration::ZERO,
            max: Duration::ZERO,
        }
    }

    fn unavailable() -> ChallengeError {
        ChallengeError::provider(
            Step::ReadRecordSet,
            ProviderError::Unavailable("timeout".to_string()),
        )
    }

    #[test]
    fn test_backoff_delay_calculation() {
        let policy = RetryPolicy::new(5);
        assert_eq!(policy.backoff_delay(1), Duration::from_secs(2));
        assert_eq!(policy.backoff_delay(2), Duration::from_secs(4));
        assert_eq!(policy.backoff_delay(3), Duration::from_secs(8));
        assert_eq!(policy.backoff_delay(4), Duration::from_secs(16));
        assert_eq!(policy.backoff_delay(5), Duration::from_secs(30));
        assert_eq!(policy.backoff_delay(100), Duration::from_secs(30));
    }

    #[test]
    fn test_policy_has_at_least_one_attempt() {
        assert_eq!(RetryPolicy::new(0).max_attempts, 1);
    }

    #[tokio::test]
    async fn test_run_retries_transient_errors() {
        let calls = Cell::new(0);
        let result = instant_policy(3)
            .run("present", || {
                calls.set(calls.get() + 1);
                let n = calls.get();
                async move {
                    if n < 3 {
                        Err(unavailable())
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test]
    async fn test_run_gives_up_after_max_attempts() {
        let calls = Cell::new(0);
        let result: Result<(), _> = instant_policy(2)
            .run("cleanup", || {
                calls.set(calls.get() + 1);
                async { Err(unavailable()) }
            })
            .await;

        assert_eq!(result.unwrap_err().kind(), ErrorKind::ProviderUnavailable);
        assert_eq!(calls.get(), 2);
    }

    #[tokio::test]
    async fn test_run_does_not_retry_permanent_errors() {
        let calls = Cell::new(0);
        let result: Result<(), _> = instant_policy(5)
            .run("present", || {
                calls.set(calls.get() + 1);
                async {
                    Err(ChallengeError::ZoneNotFound {
                        fqdn: "_acme-challenge.example.com.".to_string(),
                    })
                }
            })
            .await;

        assert_eq!(result.unwrap_err().kind(), ErrorKind::ZoneNotFound);
        assert_eq!(calls.get(), 1);
    }
}
