//! Retry logic with exponential backoff for transient errors.

use crate::error::{Error, Result};
use crate::types::RetryConfig;
use std::thread;
use std::time::Duration;

/// Callback trait for retry progress notifications.
pub trait RetryCallback: Send + Sync {
    /// Called when an operation is about to be retried.
    ///
    /// # Arguments
    /// * `attempt` - Attempt number that just failed (1-indexed)
    /// * `max_attempts` - Maximum number of attempts
    /// * `error` - The error that triggered the retry
    /// * `delay` - Time until next attempt
    fn on_retry(&self, attempt: u32, max_attempts: u32, error: &Error, delay: Duration);
}

/// Callback that reports retries through the `log` facade.
pub struct LogCallback;

impl RetryCallback for LogCallback {
    fn on_retry(&self, attempt: u32, max_attempts: u32, error: &Error, delay: Duration) {
        log::warn!("Attempt {attempt}/{max_attempts} failed: {error}. Retrying in {delay:?}...");
    }
}

/// Execute an operation with retry logic.
///
/// Only retryable errors (throttling, unavailability) are retried; every
/// other error is returned on the first occurrence.
pub fn with_retry<T, F>(
    config: &RetryConfig,
    callback: Option<&dyn RetryCallback>,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Result<T>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        match operation() {
            Ok(result) => return Ok(result),
            Err(e) if !e.is_retryable() || attempt + 1 >= max_attempts => return Err(e),
            Err(e) => {
                let delay = config.delay_for_attempt(attempt);
                if let Some(cb) = callback {
                    cb.on_retry(attempt + 1, max_attempts, &e, delay);
                }
                thread::sleep(delay);
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast() -> RetryConfig {
        RetryConfig {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            backoff_factor: 1.0,
            max_delay: Duration::from_millis(10),
        }
    }

    fn throttled() -> Error {
        Error::Http {
            status: 429,
            message: "slow down".to_string(),
        }
    }

    #[test]
    fn test_with_retry_success_first_try() {
        let result = with_retry(&RetryConfig::no_retry(), None, || Ok::<_, Error>(42));
        assert_eq!(result.unwrap(), 42);
    }

    #[test]
    fn test_with_retry_non_retryable_error() {
        let attempts = Cell::new(0);

        let result: Result<()> = with_retry(&fast(), None, || {
            attempts.set(attempts.get() + 1);
            Err(Error::Rejected("bad request".to_string()))
        });

        assert!(result.is_err());
        assert_eq!(attempts.get(), 1);
    }

    #[test]
    fn test_not_found_and_timeout_are_not_retried() {
        let errors: [fn() -> Error; 2] = [|| Error::NotFound, || Error::Timeout("deadline".into())];
        for error in errors {
            let attempts = Cell::new(0);
            let _: Result<()> = with_retry(&fast(), None, || {
                attempts.set(attempts.get() + 1);
                Err(error())
            });
            assert_eq!(attempts.get(), 1);
        }
    }

    #[test]
    fn test_with_retry_eventual_success() {
        let attempts = Cell::new(0);

        let result = with_retry(&fast(), None, || {
            let current = attempts.get();
            attempts.set(current + 1);
            if current < 2 { Err(throttled()) } else { Ok(42) }
        });

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.get(), 3);
    }

    #[test]
    fn test_with_retry_all_attempts_fail() {
        let attempts = Cell::new(0);

        let result: Result<()> = with_retry(&fast(), None, || {
            attempts.set(attempts.get() + 1);
            Err(Error::Transport("connection reset".to_string()))
        });

        assert!(matches!(result, Err(Error::Transport(_))));
        assert_eq!(attempts.get(), 3);
    }

    #[test]
    fn test_callback_invoked() {
        struct CountingCallback(Arc<AtomicU32>);
        impl RetryCallback for CountingCallback {
            fn on_retry(&self, _: u32, _: u32, _: &Error, _: Duration) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let count = Arc::new(AtomicU32::new(0));
        let callback = CountingCallback(count.clone());

        let _: Result<()> = with_retry(&fast(), Some(&callback), || Err(throttled()));

        // Once per retry: not after the final attempt
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }
}
