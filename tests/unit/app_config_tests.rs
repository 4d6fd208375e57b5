/*!
 * Tests for app configuration functionality
 */

use std::time::Duration;
use anyhow::Result;
use subclean::app_config::{Config, LogLevel, ProviderKind};
use crate::common;

/// Test that the default config validates and lists the OpenAI-compatible providers in order
#[test]
fn test_default_config_shouldBeValid() {
    let config = Config::default();

    assert!(config.validate().is_ok());
    let names: Vec<&str> = config.providers.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["siliconflow", "alibaba"]);
    assert!(config.providers.iter().all(|p| p.kind() == Some(ProviderKind::OpenAI)));
    assert_eq!(config.rate_limit.max_retries, 3);
    assert_eq!(config.processing.max_chunk_size, 12000);
    assert_eq!(config.log_level, LogLevel::Info);
}

/// Test that a config written as YAML loads back with the same values
#[test]
fn test_save_and_load_withYamlPath_shouldPreserveValues() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("config.yaml");
    let mut config = Config::default();
    config.rate_limit.requests_per_minute = 20;
    config.processing.include_filename_as_title = false;

    config.save(&path)?;
    let loaded = Config::load(&path)?;

    assert_eq!(loaded.rate_limit.requests_per_minute, 20);
    assert!(!loaded.processing.include_filename_as_title);
    assert_eq!(loaded.providers.len(), 2);
    Ok(())
}

/// Test that a .json path is read as JSON
#[test]
fn test_load_withJsonPath_shouldParseJson() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let json = r#"{
        "providers": [{"name": "siliconflow", "model": "Qwen/Qwen2.5-7B-Instruct"}],
        "rate_limit": {"requests_per_minute": 6, "max_retries": 2}
    }"#;
    let path = common::create_test_file(temp_dir.path(), "config.json", json)?;

    let config = Config::load(&path)?;

    assert_eq!(config.rate_limit.max_retries, 2);
    assert_eq!(config.rate_limit.rate_window().delay(), Duration::from_secs(10));
    assert_eq!(config.rate_limit.retry_policy().retry_delay(), Duration::from_secs(2));
    assert!(config.validate().is_ok());
    Ok(())
}

/// Test that extra_params survive parsing as arbitrary JSON values
#[test]
fn test_parse_withExtraParams_shouldKeepThem() -> Result<()> {
    let yaml = r#"
providers:
  - name: alibaba
    model: qwen-plus
    extra_params:
      enable_search: false
      top_p: 0.8
"#;
    let config = Config::parse(yaml, false)?;

    let extra = &config.providers[0].extra_params;
    assert_eq!(extra.get("enable_search"), Some(&serde_json::json!(false)));
    assert_eq!(extra.get("top_p"), Some(&serde_json::json!(0.8)));
    Ok(())
}

/// Test that a prompt with an unknown placeholder is rejected
#[test]
fn test_validate_withUnknownPlaceholder_shouldFail() {
    let mut config = Config::default();
    config.processing.prompt = "Clean {text} and {content}".to_string();
    assert!(config.validate().is_err());
}

#[test]
fn test_validate_withNoProviders_shouldFail() {
    let mut config = Config::default();
    config.providers.clear();
    assert!(config.validate().is_err());
}

#[test]
fn test_validate_withTemperatureOutOfRange_shouldFail() {
    let mut config = Config::default();
    config.processing.temperature = 2.5;
    assert!(config.validate().is_err());
}

/// Test that a retry delay too large for a Duration is rejected instead of panicking later
#[test]
fn test_validate_withHugeRetryDelay_shouldFail() {
    let mut config = Config::default();
    config.rate_limit.retry_delay_seconds = 1e30;
    assert!(config.validate().is_err());

    config.rate_limit.retry_delay_seconds = f64::INFINITY;
    assert!(config.validate().is_err());

    config.rate_limit.retry_delay_seconds = -1.0;
    assert!(config.validate().is_err());
}

#[test]
fn test_retryPolicy_withUnvalidatedDelay_shouldNotPanic() {
    let mut config = Config::default();
    config.rate_limit.retry_delay_seconds = 1e30;
    assert_eq!(config.rate_limit.retry_policy().retry_delay(), Duration::MAX);

    config.rate_limit.retry_delay_seconds = f64::NAN;
    assert_eq!(config.rate_limit.retry_policy().retry_delay(), Duration::ZERO);
}

#[test]
fn test_enabled_providers_shouldSkipDisabledAndKeepOrder() {
    let mut config = Config::default();
    config.providers[0].enabled = false;

    let names: Vec<&str> = config.enabled_providers().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["alibaba"]);
}
