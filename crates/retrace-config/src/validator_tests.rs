use super::*;

#[test]
fn test_validate_default_config() {
    let config = Config::default();
    let result = ConfigValidator::validate(&config);
    assert!(result.is_valid());
    assert!(result.warnings.is_empty());
}

#[test]
fn test_validate_zero_retry_budget() {
    let mut config = Config::default();
    config.playback.event_retry_budget = 0;

    let result = ConfigValidator::validate(&config);
    assert!(!result.is_valid());
    assert!(result.errors.iter().any(|e| e.path == "playback.event_retry_budget"));
}

#[test]
fn test_validate_high_retry_budget_warning() {
    let mut config = Config::default();
    config.playback.event_retry_budget = 500;

    let result = ConfigValidator::validate(&config);
    assert!(result.is_valid());
    assert!(!result.warnings.is_empty());
}

#[test]
fn test_validate_speed_out_of_range() {
    let mut config = Config::default();
    config.playback.default_speed = 0.0;
    let result = ConfigValidator::validate(&config);
    assert!(result.errors.iter().any(|e| e.path == "playback.default_speed"));

    config.playback.default_speed = 10.0;
    assert!(ConfigValidator::validate(&config).is_valid());
}

#[test]
fn test_validate_unknown_backend() {
    let mut config = Config::default();
    config.storage.backend = "redis".to_string();

    let result = ConfigValidator::validate(&config);
    assert!(!result.is_valid());
    assert!(result.errors[0].message.contains("redis"));
}

#[test]
fn test_validate_endpoint_scheme() {
    let mut config = Config::default();
    config.browser.endpoint = "localhost:9222".to_string();
    let result = ConfigValidator::validate(&config);
    assert!(result.errors.iter().any(|e| e.path == "browser.endpoint"));
}

#[test]
fn test_generation_url_without_key_warns() {
    let mut config = Config::default();
    config.providers.generation_url = Some("https://gen.example.com".to_string());
    let result = ConfigValidator::validate(&config);
    assert!(result.is_valid());
    assert!(result.warnings.iter().any(|w| w.path == "providers.api_key"));
}

#[test]
fn test_into_result() {
    let mut config = Config::default();
    config.browser.endpoint = String::new();
    let err = ConfigValidator::validate(&config).into_result().unwrap_err();
    assert!(err.to_string().contains("browser.endpoint"));

    let warnings = ConfigValidator::validate(&Config::default()).into_result().unwrap();
    assert!(warnings.is_empty());
}
