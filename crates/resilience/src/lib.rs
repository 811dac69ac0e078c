// crates/resilience/src/lib.rs
//! Resilience patterns for calls to flaky external services
//!
//! This module provides resilience patterns including:
//! - Retry with exponential backoff, with or without jitter
//! - Circuit breaker
//! - Error signature classification (retryable vs fatal)
//! - Timeout handling
//!
//! # Example
//!
//! ```rust
//! use socialdeck_resilience::{
//!     with_retry, CircuitBreaker, CircuitBreakerConfig, RetryOptions, ServiceError,
//! };
//! use std::time::Duration;
//!
//! # let rt = tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap();
//! # rt.block_on(async {
//! // Retry with exponential backoff
//! let options = RetryOptions::new(3).with_initial_delay(Duration::from_millis(1));
//! let posted = with_retry(&options, || async { Ok::<_, ServiceError>("post-id") }).await;
//! assert_eq!(posted.ok(), Some("post-id"));
//!
//! // Circuit breaker
//! let cb = CircuitBreaker::new(CircuitBreakerConfig::new(5, Duration::from_secs(60), 2));
//! let profile = cb.execute(|| async { Ok::<_, ServiceError>("profile") }).await;
//! assert_eq!(profile.ok(), Some("profile"));
//! # });
//! ```

mod circuit_breaker;
mod classify;
mod error;
mod retry;
mod signature;
mod timeout;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use classify::{is_transient, matches_allow_list, RETRYABLE_STATUSES, TRANSIENT_CODES};
pub use error::{CircuitOpenError, InvalidOptions, ResilienceError, ResilienceResult};
pub use retry::{with_retry, with_retry_and_jitter, with_retry_cancellable, RetryOptions};
pub use signature::{ErrorSignature, ServiceError};
pub use timeout::{with_timeout, Timeout};
pub use tokio_util::sync::CancellationToken;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_exports_accessible() {
        let _: RetryOptions = RetryOptions::default();
        let _: CircuitBreakerConfig = CircuitBreakerConfig::default();
        let _: CircuitBreaker = CircuitBreaker::new(CircuitBreakerConfig::default());
        let _: Timeout = Timeout::new(std::time::Duration::from_secs(5));
        let _: CancellationToken = CancellationToken::new();
    }
}
