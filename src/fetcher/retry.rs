//! Retry policy wrapping every remote call
//!
//! A fixed attempt budget with immediate re-attempts. When every attempt
//! fails the last error is wrapped in [`FetcherError::RetrievalExhausted`]
//! together with the operation that was being performed.

use super::{FetcherError, FetcherResult};
use std::future::Future;
use tracing::{debug, warn};

/// Default number of attempts per remote call
pub const DEFAULT_ATTEMPTS: u32 = 5;

/// Fixed attempt budget for remote calls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_ATTEMPTS)
    }
}

impl RetryPolicy {
    /// Policy making at most `attempts` calls (at least one)
    pub fn new(attempts: u32) -> Self {
        Self {
            attempts: attempts.max(1),
        }
    }

    /// Maximum number of calls made per operation
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Run `call` until it succeeds or the budget is spent
    ///
    /// `operation` describes the request (endpoint and parameters) and is
    /// carried into logs and the final error.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut call: F) -> FetcherResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = FetcherResult<T>>,
    {
        let mut last_error = None;

        for attempt in 1..=self.attempts {
            match call().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(operation, attempt, "Request succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) => {
                    warn!(
                        operation,
                        attempt,
                        max_attempts = self.attempts,
                        error = %e,
                        "Request failed"
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(FetcherError::RetrievalExhausted {
            operation: operation.to_string(),
            attempts: self.attempts,
            source: Box::new(last_error.unwrap_or_else(|| {
                FetcherError::NetworkError("no attempt was made".to_string())
            })),
        })
    }
}
