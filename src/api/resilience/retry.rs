//! Retry policy with exponential backoff
//!
//! Attempts an operation up to `retry_attempts + 1` times. The delay before
//! retry `k` is `backoff_base * 2^k`, uncapped. Only errors classified as
//! retryable (or an expired-and-refreshed token) are retried; everything else
//! is returned on the spot.

use crate::api::error::{ApiError, ApiResult, ErrorClass};
use log::{debug, info, warn};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Configuration for retry behavior
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Retries after the first attempt
    pub retry_attempts: u32,
    /// Unit of the `2^k` schedule; one second against the live API
    pub backoff_base: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::reads()
    }
}

impl RetryConfig {
    /// Budget for read calls
    pub fn reads() -> Self {
        Self {
            retry_attempts: 10,
            backoff_base: Duration::from_secs(1),
        }
    }

    /// Budget for mutating calls
    pub fn writes() -> Self {
        Self {
            retry_attempts: 3,
            backoff_base: Duration::from_secs(1),
        }
    }

    /// No retries at all
    pub fn none() -> Self {
        Self {
            retry_attempts: 0,
            backoff_base: Duration::ZERO,
        }
    }

    /// Delay before retry number `attempt` (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.backoff_base
            .saturating_mul(2u32.saturating_pow(attempt))
    }
}

/// Sleep for `duration` unless `cancel` fires first
pub async fn sleep_or_cancel(duration: Duration, cancel: &CancellationToken) -> ApiResult<()> {
    if duration.is_zero() {
        return if cancel.is_cancelled() {
            Err(ApiError::Cancelled)
        } else {
            Ok(())
        };
    }

    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ApiError::Cancelled),
        _ = tokio::time::sleep(duration) => Ok(()),
    }
}

/// Retry driver owned by a client instance
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
    cancel: CancellationToken,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Abort backoff sleeps when `cancel` fires
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Execute `operation`, calling `on_retry(error, delay, attempt)` before each retry
    ///
    /// One auth-expired failure is retried immediately without touching the
    /// retry budget; a second one is reported as [`ApiError::Unauthorized`].
    pub async fn execute<F, Fut, T, R>(&self, mut operation: F, mut on_retry: R) -> ApiResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ApiResult<T>>,
        R: FnMut(&ApiError, Duration, u32),
    {
        let total_attempts = self.config.retry_attempts + 1;
        let mut attempt = 0;
        let mut failures = 0;
        let mut auth_retried = false;

        loop {
            attempt += 1;
            debug!("Executing operation (attempt {}/{})", attempt, total_attempts);

            let error = match operation().await {
                Ok(result) => {
                    if attempt > 1 {
                        info!("Operation succeeded after {} attempts", attempt);
                    }
                    return Ok(result);
                }
                Err(error) => error,
            };

            match error.classify() {
                ErrorClass::Fatal => {
                    debug!("Operation failed with non-retryable error: {}", error);
                    return Err(error);
                }
                ErrorClass::AuthExpired if auth_retried => {
                    warn!("Access token rejected again after refresh");
                    return Err(ApiError::Unauthorized(
                        "access token rejected after refresh".into(),
                    ));
                }
                ErrorClass::AuthExpired => {
                    auth_retried = true;
                    debug!("Retrying with refreshed token (attempt {})", attempt);
                    on_retry(&error, Duration::ZERO, attempt);
                    sleep_or_cancel(Duration::ZERO, &self.cancel).await?;
                }
                ErrorClass::Retryable => {
                    failures += 1;
                    if failures >= total_attempts {
                        warn!(
                            "Operation failed permanently after {} attempts: {}",
                            attempt, error
                        );
                        return Err(error);
                    }

                    let delay = self.config.delay_for(failures);
                    warn!(
                        "Operation failed on attempt {} (retrying in {:?}): {}",
                        attempt, delay, error
                    );
                    on_retry(&error, delay, failures);
                    sleep_or_cancel(delay, &self.cancel).await?;
                }
            }
        }
    }
}
