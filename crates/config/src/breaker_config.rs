//! Circuit breaker configuration section

use crate::service_config::ServiceOverride;
use crate::validation::{ConfigSection, ValidationError, Validator};
use serde::{Deserialize, Serialize};
use socialdeck_resilience::CircuitBreakerConfig;
use std::time::Duration;

/// Circuit breaker thresholds for each downstream service
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CircuitBreakerSettings {
    /// Consecutive failures that open the circuit
    pub failure_threshold: usize,

    /// How long the circuit stays open before a probe, in milliseconds
    pub reset_timeout_ms: u64,

    /// Consecutive half-open successes that close the circuit
    pub success_threshold: usize,
}

impl Default for CircuitBreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            reset_timeout_ms: 60_000,
            success_threshold: 2,
        }
    }
}

impl CircuitBreakerSettings {
    pub(crate) fn validate_at(&self, table: &str) -> Result<(), Vec<ValidationError>> {
        Validator::new(table)
            .in_range("failure_threshold", self.failure_threshold, 1, 1_000)
            .in_range("reset_timeout_ms", self.reset_timeout_ms, 1, 86_400_000)
            .in_range("success_threshold", self.success_threshold, 1, 100)
            .finish()
    }

    /// Returns these settings with a service's overrides applied
    pub fn with_override(&self, service: &ServiceOverride) -> Self {
        Self {
            failure_threshold: service.failure_threshold.unwrap_or(self.failure_threshold),
            reset_timeout_ms: service.reset_timeout_ms.unwrap_or(self.reset_timeout_ms),
            success_threshold: service.success_threshold.unwrap_or(self.success_threshold),
        }
    }

    /// Converts to a circuit breaker configuration
    pub fn to_circuit_breaker_config(&self) -> CircuitBreakerConfig {
        CircuitBreakerConfig::new(
            self.failure_threshold,
            Duration::from_millis(self.reset_timeout_ms),
            self.success_threshold,
        )
    }
}

impl ConfigSection for CircuitBreakerSettings {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        self.validate_at(self.section_name())
    }

    fn merge(&mut self, other: Self) {
        self.failure_threshold = other.failure_threshold;
        self.reset_timeout_ms = other.reset_timeout_ms;
        self.success_threshold = other.success_threshold;
    }

    fn section_name(&self) -> &'static str {
        "circuit_breaker"
    }
}
