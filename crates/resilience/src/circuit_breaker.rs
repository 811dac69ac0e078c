// crates/resilience/src/circuit_breaker.rs
//! Circuit breaker pattern implementation

use crate::error::{CircuitOpenError, InvalidOptions, ResilienceError, ResilienceResult};
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

/// Circuit breaker states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Circuit is closed, requests flow normally
    Closed,
    /// Circuit is open, requests are rejected
    Open,
    /// Circuit is half-open, testing if service recovered
    HalfOpen,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "CLOSED"),
            CircuitState::Open => write!(f, "OPEN"),
            CircuitState::HalfOpen => write!(f, "HALF_OPEN"),
        }
    }
}

/// Circuit breaker configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before opening the circuit
    pub failure_threshold: usize,
    /// Time the circuit stays open before admitting a probe
    pub reset_timeout: Duration,
    /// Consecutive half-open successes needed to close the circuit
    pub success_threshold: usize,
}

impl CircuitBreakerConfig {
    /// Creates a new configuration
    pub fn new(failure_threshold: usize, reset_timeout: Duration, success_threshold: usize) -> Self {
        Self {
            failure_threshold,
            reset_timeout,
            success_threshold,
        }
    }

    /// Sets the success threshold
    pub fn with_success_threshold(mut self, threshold: usize) -> Self {
        self.success_threshold = threshold;
        self
    }

    /// Checks that both thresholds are usable
    pub fn validate(&self) -> Result<(), InvalidOptions> {
        if self.failure_threshold == 0 {
            return Err(InvalidOptions::new("failure_threshold", "must be at least 1"));
        }
        if self.success_threshold == 0 {
            return Err(InvalidOptions::new("success_threshold", "must be at least 1"));
        }
        Ok(())
    }
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self::new(5, Duration::from_secs(60), 2)
    }
}

#[derive(Debug)]
struct CircuitBreakerState {
    state: CircuitState,
    failure_count: usize,
    success_count: usize,
    opened_at: Option<Instant>,
}

impl CircuitBreakerState {
    fn closed() -> Self {
        Self {
            state: CircuitState::Closed,
            failure_count: 0,
            success_count: 0,
            opened_at: None,
        }
    }

    fn open(&mut self, now: Instant) {
        self.state = CircuitState::Open;
        self.success_count = 0;
        self.opened_at = Some(now);
    }
}

/// Circuit breaker implementation
///
/// Clones share state, so one breaker can guard a downstream resource from
/// any number of tasks.
#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    name: Arc<str>,
    config: CircuitBreakerConfig,
    state: Arc<Mutex<CircuitBreakerState>>,
}

impl CircuitBreaker {
    /// Creates a new circuit breaker
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            name: Arc::from("circuit-breaker"),
            config,
            state: Arc::new(Mutex::new(CircuitBreakerState::closed())),
        }
    }

    /// Sets the name used in log output
    pub fn named(mut self, name: impl AsRef<str>) -> Self {
        self.name = Arc::from(name.as_ref());
        self
    }

    /// Gets the breaker name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Gets the configuration
    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    // Counters are updated in single statements, so a panic elsewhere can't
    // leave them half-written.
    fn lock(&self) -> MutexGuard<'_, CircuitBreakerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Gets the last settled state
    ///
    /// An open circuit whose reset timeout has elapsed still reports `Open`
    /// until the next call moves it to `HalfOpen`.
    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    /// Consecutive failures observed while closed
    pub fn failure_count(&self) -> usize {
        self.lock().failure_count
    }

    /// Consecutive successes observed while half-open
    pub fn success_count(&self) -> usize {
        self.lock().success_count
    }

    /// Checks if a request can proceed
    ///
    /// Moves an open circuit to half-open once the reset timeout has elapsed,
    /// admitting the caller as a probe.
    pub fn can_proceed(&self) -> Result<(), CircuitOpenError> {
        let mut state = self.lock();

        match state.state {
            CircuitState::Closed | CircuitState::HalfOpen => Ok(()),
            CircuitState::Open => {
                let elapsed = state
                    .opened_at
                    .map(|opened_at| opened_at.elapsed())
                    .unwrap_or(self.config.reset_timeout);

                if elapsed >= self.config.reset_timeout {
                    state.state = CircuitState::HalfOpen;
                    state.success_count = 0;
                    log::info!("Circuit '{}' half-open, probing recovery", self.name);
                    Ok(())
                } else {
                    Err(CircuitOpenError {
                        failures: state.failure_count,
                        retry_after: self.config.reset_timeout - elapsed,
                    })
                }
            }
        }
    }

    /// Records a successful operation
    pub fn record_success(&self) {
        let mut state = self.lock();

        match state.state {
            CircuitState::HalfOpen => {
                state.success_count += 1;
                if state.success_count >= self.config.success_threshold {
                    *state = CircuitBreakerState::closed();
                    log::info!("Circuit '{}' closed, service recovered", self.name);
                }
            }
            CircuitState::Closed => {
                state.failure_count = 0;
            }
            // Admitted before another caller opened the circuit
            CircuitState::Open => {}
        }
    }

    /// Records a failed operation
    pub fn record_failure(&self) {
        let mut state = self.lock();

        match state.state {
            CircuitState::Closed => {
                state.failure_count += 1;
                if state.failure_count >= self.config.failure_threshold {
                    state.open(Instant::now());
                    log::warn!(
                        "Circuit '{}' opened after {} consecutive failures",
                        self.name,
                        state.failure_count
                    );
                }
            }
            CircuitState::HalfOpen => {
                state.open(Instant::now());
                log::warn!("Circuit '{}' re-opened, probe failed", self.name);
            }
            CircuitState::Open => {
                log::debug!("Circuit '{}' ignoring failure reported while open", self.name);
            }
        }
    }

    /// Executes an operation through the circuit breaker
    ///
    /// Rejects with [`ResilienceError::CircuitOpen`] without invoking the
    /// operation while the circuit is open.
    pub async fn execute<F, Fut, T, E>(&self, operation: F) -> ResilienceResult<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.can_proceed()?;

        match operation().await {
            Ok(result) => {
                self.record_success();
                Ok(result)
            }
            Err(e) => {
                self.record_failure();
                Err(ResilienceError::Operation(e))
            }
        }
    }

    /// Resets the circuit breaker to closed state
    pub fn reset(&self) {
        *self.lock() = CircuitBreakerState::closed();
        log::info!("Circuit '{}' manually reset", self.name);
    }
}
