//! Per-service overrides
//!
//! Each external service (a social platform, an AI provider) may tune the
//! global retry and circuit breaker settings. Unset fields inherit.

use serde::{Deserialize, Serialize};

/// Overrides for one downstream service
///
/// ```toml
/// [services.twitter]
/// max_attempts = 5
/// failure_threshold = 3
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServiceOverride {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_delay_ms: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_delay_ms: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub backoff_factor: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub jitter: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub retryable_errors: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_threshold: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset_timeout_ms: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub success_threshold: Option<usize>,
}

impl ServiceOverride {
    /// Returns true if no field is overridden
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
