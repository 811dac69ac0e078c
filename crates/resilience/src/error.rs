// crates/resilience/src/error.rs
//! Error types for resilience operations

use std::time::Duration;
use thiserror::Error;

/// Result type for resilience operations wrapping an operation error `E`
pub type ResilienceResult<T, E> = Result<T, ResilienceError<E>>;

/// Errors that can occur in resilience operations
///
/// The wrapped operation's own failure is carried untouched in
/// [`ResilienceError::Operation`]; every other variant is synthesized by this
/// crate and means the operation either was never invoked or was abandoned.
#[derive(Debug, Error)]
pub enum ResilienceError<E> {
    /// The operation itself failed (non-retryable, or retries exhausted)
    #[error("{0}")]
    Operation(E),

    /// Circuit breaker is open and rejected the call without invoking it
    #[error(transparent)]
    CircuitOpen(#[from] CircuitOpenError),

    /// Retry or breaker options are unusable
    #[error(transparent)]
    InvalidOptions(#[from] InvalidOptions),

    /// Operation timed out
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// Operation was cancelled
    #[error("Operation was cancelled")]
    Cancelled,
}

impl<E> ResilienceError<E> {
    /// Returns true if the call was short-circuited by an open breaker
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, ResilienceError::CircuitOpen(_))
    }

    /// Returns true if the call was cancelled
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ResilienceError::Cancelled)
    }

    /// Borrows the operation's own error, if that is what failed
    pub fn operation_error(&self) -> Option<&E> {
        match self {
            ResilienceError::Operation(e) => Some(e),
            _ => None,
        }
    }

    /// Takes the operation's own error, if that is what failed
    pub fn into_operation(self) -> Option<E> {
        match self {
            ResilienceError::Operation(e) => Some(e),
            _ => None,
        }
    }

    /// Maps the operation error, leaving synthesized variants intact
    pub fn map_operation<F, O>(self, f: F) -> ResilienceError<O>
    where
        F: FnOnce(E) -> O,
    {
        match self {
            ResilienceError::Operation(e) => ResilienceError::Operation(f(e)),
            ResilienceError::CircuitOpen(e) => ResilienceError::CircuitOpen(e),
            ResilienceError::InvalidOptions(e) => ResilienceError::InvalidOptions(e),
            ResilienceError::Timeout(d) => ResilienceError::Timeout(d),
            ResilienceError::Cancelled => ResilienceError::Cancelled,
        }
    }
}

impl<E> ResilienceError<ResilienceError<E>> {
    /// Collapses a nested error, e.g. from retrying a breaker-protected call
    pub fn flatten(self) -> ResilienceError<E> {
        match self {
            ResilienceError::Operation(inner) => inner,
            ResilienceError::CircuitOpen(e) => ResilienceError::CircuitOpen(e),
            ResilienceError::InvalidOptions(e) => ResilienceError::InvalidOptions(e),
            ResilienceError::Timeout(d) => ResilienceError::Timeout(d),
            ResilienceError::Cancelled => ResilienceError::Cancelled,
        }
    }
}

/// Rejection issued by an open circuit breaker
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Circuit breaker is open (failures: {failures}, retry after {retry_after:?})")]
pub struct CircuitOpenError {
    /// Consecutive failures recorded when the circuit opened
    pub failures: usize,
    /// Time left until the breaker admits a probe
    pub retry_after: Duration,
}

/// A configuration value that cannot drive a retry loop or breaker
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid option '{field}': {message}")]
pub struct InvalidOptions {
    /// Name of the offending option
    pub field: &'static str,
    /// Why the value was rejected
    pub message: String,
}

impl InvalidOptions {
    pub(crate) fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}
