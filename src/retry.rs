//! Retry logic with exponential backoff
//!
//! The policy (attempt cap, backoff curve, jitter) lives in [`RetryConfig`];
//! which failures are transient is decided by the error type through
//! [`IsRetryable`]. Nothing here knows about HTTP.
//!
//! # Example
//!
//! ```no_run
//! use chaos_collector::retry::{IsRetryable, retry_with_backoff};
//! use chaos_collector::config::RetryConfig;
//!
//! #[derive(Debug)]
//! enum MyError {
//!     Transient,
//!     Permanent,
//! }
//!
//! impl std::fmt::Display for MyError {
//!     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
//!         write!(f, "{:?}", self)
//!     }
//! }
//!
//! impl IsRetryable for MyError {
//!     fn is_retryable(&self) -> bool {
//!         matches!(self, MyError::Transient)
//!     }
//! }
//!
//! # async fn example() -> Result<(), MyError> {
//! let config = RetryConfig::default();
//! retry_with_backoff(&config, || async {
//!     Ok::<_, MyError>(())
//! }).await?;
//! # Ok(())
//! # }
//! ```

use crate::config::RetryConfig;
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Trait for errors that can be classified as retryable or not
///
/// Transient failures (timeouts, connection resets, 429/5xx responses) return `true`.
/// Permanent failures (404, malformed URL, disk full) return `false`.
pub trait IsRetryable {
    /// Returns true if the error is transient and the operation should be retried
    fn is_retryable(&self) -> bool;
}

/// An error paired with a retry decision made by the caller
///
/// Used where transience depends on runtime policy (the configured status
/// list) rather than on the error type alone.
#[derive(Debug)]
pub struct Classified<E> {
    /// The underlying error
    pub error: E,
    /// Whether the operation may be retried
    pub retryable: bool,
}

impl<E> Classified<E> {
    /// A failure worth retrying
    pub fn transient(error: E) -> Self {
        Self {
            error,
            retryable: true,
        }
    }

    /// A failure that retrying cannot fix
    pub fn permanent(error: E) -> Self {
        Self {
            error,
            retryable: false,
        }
    }
}

impl<E> IsRetryable for Classified<E> {
    fn is_retryable(&self) -> bool {
        self.retryable
    }
}

impl<E: std::fmt::Display> std::fmt::Display for Classified<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.error.fmt(f)
    }
}

/// Execute an async operation, retrying transient failures with exponential backoff
///
/// The operation runs at most `config.max_retries + 1` times. The delay before
/// retry `n` is [`RetryConfig::backoff_delay`]`(n)`, optionally jittered.
///
/// Returns the successful result or the last error.
pub async fn retry_with_backoff<F, Fut, T, E>(config: &RetryConfig, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: IsRetryable + std::fmt::Display,
{
    let mut retries = 0;

    loop {
        match operation().await {
            Ok(result) => {
                if retries > 0 {
                    tracing::debug!(attempts = retries + 1, "operation succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) if e.is_retryable() && retries < config.max_retries => {
                retries += 1;
                let delay = config.backoff_delay(retries);

                tracing::debug!(
                    error = %e,
                    retry = retries,
                    max_retries = config.max_retries,
                    delay_ms = delay.as_millis(),
                    "transient failure, retrying"
                );

                let delay = if config.jitter { add_jitter(delay) } else { delay };
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                if e.is_retryable() {
                    tracing::debug!(
                        error = %e,
                        attempts = retries + 1,
                        "retries exhausted"
                    );
                } else {
                    tracing::debug!(error = %e, "non-retryable failure");
                }
                return Err(e);
            }
        }
    }
}

/// Add random jitter to a delay to prevent thundering herd
///
/// The result is uniformly distributed between `delay` and `2 * delay`.
fn add_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_factor: f64 = rng.gen_range(0.0..=1.0);
    Duration::from_secs_f64(delay.as_secs_f64() * (1.0 + jitter_factor))
}
