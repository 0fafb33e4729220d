//! Bounded exponential backoff with jitter for idempotent registry GETs.
//!
//! Spec 4.C: transport errors and 5xx responses are retried; 4xx responses
//! are surfaced immediately as non-retryable errors.

use crate::error::Error;
use std::time::Duration;

/// Configuration for [`with_backoff`].
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,
    /// Base delay before the first retry.
    pub base_delay: Duration,
    /// Delay ceiling; exponential growth is capped here.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    fn delay_for(&self, attempt: u32) -> Duration {
        let exp = self.base_delay.saturating_mul(1u32.checked_shl(attempt).unwrap_or(u32::MAX));
        let capped = exp.min(self.max_delay);
        let jitter_fraction: f64 = rand::random();
        capped.mul_f64(0.5 + (jitter_fraction * 0.5))
    }
}

/// Whether an error is worth retrying: transport failures and 5xx, but not
/// 4xx client errors (those carry a diagnostic that will never change on
/// retry).
fn is_retryable(err: &Error) -> bool {
    match err {
        Error::RegistryError { source, .. } => {
            !source.to_string().contains("HTTP 4")
        }
        _ => false,
    }
}

/// Run `op`, retrying per `policy` while it returns a retryable error.
///
/// # Errors
///
/// Returns the last error once the retry budget is exhausted, or
/// immediately for a non-retryable error.
pub fn with_backoff<T>(policy: &RetryPolicy, mut op: impl FnMut() -> crate::error::Result<T>) -> crate::error::Result<T> {
    let mut attempt = 0;
    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(err) if attempt + 1 < policy.max_attempts && is_retryable(&err) => {
                std::thread::sleep(policy.delay_for(attempt));
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn succeeds_without_retry_on_first_success() {
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
        };
        let calls = Cell::new(0);
        let result = with_backoff(&policy, || {
            calls.set(calls.get() + 1);
            Ok::<_, Error>(42)
        });
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn retries_transport_errors_until_budget_exhausted() {
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
        };
        let calls = Cell::new(0);
        let result: crate::error::Result<()> = with_backoff(&policy, || {
            calls.set(calls.get() + 1);
            Err(Error::RegistryError {
                operation: "fetch",
                endpoint: "http://example.invalid".to_owned(),
                source: anyhow::anyhow!("connection reset"),
            })
        });
        assert!(result.is_err());
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn does_not_retry_client_errors() {
        let policy = RetryPolicy::default();
        let calls = Cell::new(0);
        let result: crate::error::Result<()> = with_backoff(&policy, || {
            calls.set(calls.get() + 1);
            Err(Error::RegistryError {
                operation: "fetch",
                endpoint: "http://example.invalid".to_owned(),
                source: anyhow::anyhow!("HTTP 404: not found"),
            })
        });
        assert!(result.is_err());
        assert_eq!(calls.get(), 1);
    }
}
