// crates/resilience/src/timeout.rs
//! Timeout handling utilities
//!
//! Neither the retry executor nor the circuit breaker bounds how long an
//! operation may run. Wrap the operation's future with these helpers when a
//! hung call must count as a failure.

use crate::error::{ResilienceError, ResilienceResult};
use std::future::Future;
use std::time::Duration;

/// Executes a fallible future with a deadline
pub async fn with_timeout<Fut, T, E>(duration: Duration, future: Fut) -> ResilienceResult<T, E>
where
    Fut: Future<Output = Result<T, E>>,
{
    match tokio::time::timeout(duration, future).await {
        Ok(result) => result.map_err(ResilienceError::Operation),
        Err(_) => {
            log::debug!("Operation timed out after {:?}", duration);
            Err(ResilienceError::Timeout(duration))
        }
    }
}

/// Timeout wrapper for operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeout {
    duration: Duration,
}

impl Timeout {
    /// Creates a new timeout
    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }

    /// Gets the timeout duration
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Executes a fallible future with this timeout
    pub async fn execute<Fut, T, E>(&self, future: Fut) -> ResilienceResult<T, E>
    where
        Fut: Future<Output = Result<T, E>>,
    {
        with_timeout(self.duration, future).await
    }
}
