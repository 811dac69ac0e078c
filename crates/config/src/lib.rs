//! SocialDeck resilience configuration
//!
//! Retry and circuit breaker settings for outbound calls to social platforms
//! and AI providers, stored as TOML. Global sections apply to every service;
//! `[services.<name>]` tables override individual fields.
//!
//! # Example
//!
//! ```rust
//! use socialdeck_config::Config;
//!
//! let config = Config::from_toml_str(
//!     r#"
//!     [retry]
//!     max_attempts = 4
//!
//!     [services.openai]
//!     max_attempts = 6
//!     failure_threshold = 3
//!     "#,
//! )
//! .expect("valid config");
//!
//! assert_eq!(config.retry_options_for("linkedin").max_attempts, 4);
//! assert_eq!(config.retry_options_for("openai").max_attempts, 6);
//! assert_eq!(config.circuit_breaker_config_for("openai").failure_threshold, 3);
//! ```

mod error;
mod persistence;
mod validation;

// Config sections
mod breaker_config;
mod retry_config;
mod service_config;

pub use error::{ConfigError, ConfigResult, ValidationError};
pub use persistence::ConfigStore;
pub use validation::{ConfigSection, Validator};

pub use breaker_config::CircuitBreakerSettings;
pub use retry_config::RetrySettings;
pub use service_config::ServiceOverride;

use serde::{Deserialize, Serialize};
use socialdeck_resilience::{CircuitBreakerConfig, RetryOptions};
use std::collections::BTreeMap;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Retry settings applied to every service
    pub retry: RetrySettings,

    /// Circuit breaker settings applied to every service
    pub circuit_breaker: CircuitBreakerSettings,

    /// Per-service overrides keyed by service name
    pub services: BTreeMap<String, ServiceOverride>,
}

impl Config {
    /// Creates a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses and validates a TOML document
    pub fn from_toml_str(text: &str) -> ConfigResult<Self> {
        let config: Config = toml::from_str(text)?;
        config
            .validate()
            .map_err(|errors| ConfigError::ValidationError(error::join_errors(&errors)))?;
        Ok(config)
    }

    /// Validates the entire configuration
    ///
    /// Returns all validation errors found across all sections, including
    /// the effective settings of every service override.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(mut e) = self.retry.validate() {
            errors.append(&mut e);
        }

        if let Err(mut e) = self.circuit_breaker.validate() {
            errors.append(&mut e);
        }

        for (name, service) in &self.services {
            let prefix = format!("services.{name}");

            if let Err(mut e) = self.retry.with_override(service).validate_at(&prefix) {
                errors.append(&mut e);
            }

            if let Err(mut e) = self
                .circuit_breaker
                .with_override(service)
                .validate_at(&prefix)
            {
                errors.append(&mut e);
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Merges this config with another, preferring values from `other`
    ///
    /// Service overrides are combined; a service present in both takes
    /// `other`'s override.
    pub fn merge(&mut self, other: Config) {
        self.retry.merge(other.retry);
        self.circuit_breaker.merge(other.circuit_breaker);
        self.services.extend(other.services);
    }

    /// Effective retry settings for a service
    pub fn retry_settings_for(&self, service: &str) -> RetrySettings {
        match self.services.get(service) {
            Some(overrides) => self.retry.with_override(overrides),
            None => self.retry.clone(),
        }
    }

    /// Effective circuit breaker settings for a service
    pub fn circuit_breaker_settings_for(&self, service: &str) -> CircuitBreakerSettings {
        match self.services.get(service) {
            Some(overrides) => self.circuit_breaker.with_override(overrides),
            None => self.circuit_breaker.clone(),
        }
    }

    /// Retry executor options for a service
    pub fn retry_options_for(&self, service: &str) -> RetryOptions {
        self.retry_settings_for(service).to_retry_options()
    }

    /// Circuit breaker configuration for a service
    pub fn circuit_breaker_config_for(&self, service: &str) -> CircuitBreakerConfig {
        self.circuit_breaker_settings_for(service)
            .to_circuit_breaker_config()
    }
}
