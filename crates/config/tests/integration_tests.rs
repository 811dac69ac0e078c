//! Integration tests for the configuration system

use socialdeck_config::{Config, ConfigError, ConfigStore, RetrySettings, ServiceOverride};
use socialdeck_resilience::{CircuitBreaker, CircuitState};
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

const SAMPLE: &str = r#"
[retry]
max_attempts = 4
initial_delay_ms = 500
max_delay_ms = 20000
backoff_factor = 3.0
jitter = true

[circuit_breaker]
failure_threshold = 5
reset_timeout_ms = 30000
success_threshold = 2

[services.twitter]
max_attempts = 6
retryable_errors = ["RATE_LIMITED"]

[services.openai]
failure_threshold = 2
reset_timeout_ms = 10000
"#;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn test_load_file_with_service_overrides() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("resilience.toml");
    fs::write(&path, SAMPLE)?;

    let config = ConfigStore::new(&path).load()?;
    assert!(config.validate().is_ok());

    let twitter = config.retry_options_for("twitter");
    assert_eq!(twitter.max_attempts, 6);
    assert_eq!(twitter.initial_delay, Duration::from_millis(500));
    assert_eq!(twitter.backoff_factor, 3.0);
    assert_eq!(twitter.retryable_errors, Some(vec!["RATE_LIMITED".to_string()]));

    let openai = config.circuit_breaker_config_for("openai");
    assert_eq!(openai.failure_threshold, 2);
    assert_eq!(openai.reset_timeout, Duration::from_secs(10));
    assert_eq!(openai.success_threshold, 2);

    assert_eq!(config.retry_options_for("openai").max_attempts, 4);
    Ok(())
}

#[test]
fn test_configured_breaker_opens_at_threshold() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_toml_str(SAMPLE)?;
    let breaker = CircuitBreaker::new(config.circuit_breaker_config_for("openai")).named("openai");

    breaker.record_failure();
    assert_eq!(breaker.state(), CircuitState::Closed);
    breaker.record_failure();
    assert_eq!(breaker.state(), CircuitState::Open);
    assert!(breaker.can_proceed().is_err());
    Ok(())
}

#[test]
fn test_save_load_preserves_overrides() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();
    let temp_dir = TempDir::new()?;
    let store = ConfigStore::new(temp_dir.path().join("nested").join("resilience.toml"));

    let mut config = Config::default();
    config.services.insert(
        "linkedin".to_string(),
        ServiceOverride {
            max_delay_ms: Some(60_000),
            success_threshold: Some(3),
            ..Default::default()
        },
    );

    store.save(&config)?;
    let loaded = store.load()?;
    assert_eq!(loaded, config);

    store.save(&loaded)?;
    assert_eq!(store.load()?, loaded);
    Ok(())
}

#[test]
fn test_invalid_values_load_with_warnings_but_do_not_save() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("resilience.toml");
    fs::write(&path, "[retry]\nbackoff_factor = 0.25\n")?;

    let store = ConfigStore::new(&path);
    let config = store.load()?;
    assert_eq!(config.retry.backoff_factor, 0.25);
    assert!(config.validate().is_err());

    let result = store.save(&config);
    assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    Ok(())
}

#[test]
fn test_partial_file_fills_defaults() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_toml_str("[circuit_breaker]\nfailure_threshold = 8\n")?;
    assert_eq!(config.circuit_breaker.failure_threshold, 8);
    assert_eq!(config.circuit_breaker.reset_timeout_ms, 60_000);
    assert_eq!(config.retry, RetrySettings::default());
    assert!(config.services.is_empty());
    Ok(())
}
