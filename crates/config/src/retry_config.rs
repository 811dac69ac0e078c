//! Retry configuration section

use crate::service_config::ServiceOverride;
use crate::validation::{ConfigSection, ValidationError, Validator};
use serde::{Deserialize, Serialize};
use socialdeck_resilience::RetryOptions;
use std::time::Duration;

/// Retry behavior for outbound API calls
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetrySettings {
    /// Total attempts including the first (1-20)
    pub max_attempts: u32,

    /// Delay before the first retry in milliseconds
    pub initial_delay_ms: u64,

    /// Upper bound on any retry delay in milliseconds
    pub max_delay_ms: u64,

    /// Delay multiplier per failed attempt (1.0 - 10.0)
    pub backoff_factor: f64,

    /// Randomize delays to spread out concurrent retries
    pub jitter: bool,

    /// When set, only matching errors are retried
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retryable_errors: Option<Vec<String>>,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 1_000,
            max_delay_ms: 30_000,
            backoff_factor: 2.0,
            jitter: true,
            retryable_errors: None,
        }
    }
}

impl RetrySettings {
    /// Validates with field paths rooted at `table`
    pub(crate) fn validate_at(&self, table: &str) -> Result<(), Vec<ValidationError>> {
        let entries = self.retryable_errors.iter().flatten().map(String::as_str);

        Validator::new(table)
            .in_range("max_attempts", self.max_attempts, 1, 20)
            .in_range("initial_delay_ms", self.initial_delay_ms, 0, 600_000)
            .in_range("max_delay_ms", self.max_delay_ms, 0, 3_600_000)
            .at_least("max_delay_ms", self.max_delay_ms, self.initial_delay_ms)
            .in_range("backoff_factor", self.backoff_factor, 1.0, 10.0)
            .not_empty("retryable_errors", entries)
            .finish()
    }

    /// Returns these settings with a service's overrides applied
    pub fn with_override(&self, service: &ServiceOverride) -> Self {
        Self {
            max_attempts: service.max_attempts.unwrap_or(self.max_attempts),
            initial_delay_ms: service.initial_delay_ms.unwrap_or(self.initial_delay_ms),
            max_delay_ms: service.max_delay_ms.unwrap_or(self.max_delay_ms),
            backoff_factor: service.backoff_factor.unwrap_or(self.backoff_factor),
            jitter: service.jitter.unwrap_or(self.jitter),
            retryable_errors: service
                .retryable_errors
                .clone()
                .or_else(|| self.retryable_errors.clone()),
        }
    }

    /// Converts to options for the retry executor
    pub fn to_retry_options(&self) -> RetryOptions {
        RetryOptions {
            max_attempts: self.max_attempts,
            initial_delay: Duration::from_millis(self.initial_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            backoff_factor: self.backoff_factor,
            retryable_errors: self.retryable_errors.clone(),
            jitter: self.jitter,
        }
    }
}

impl ConfigSection for RetrySettings {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        self.validate_at(self.section_name())
    }

    fn merge(&mut self, other: Self) {
        self.max_attempts = other.max_attempts;
        self.initial_delay_ms = other.initial_delay_ms;
        self.max_delay_ms = other.max_delay_ms;
        self.backoff_factor = other.backoff_factor;
        self.jitter = other.jitter;
        self.retryable_errors = other.retryable_errors;
    }

    fn section_name(&self) -> &'static str {
        "retry"
    }
}
