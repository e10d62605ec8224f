//! Configuration validation.

use crate::error::ConfigError;
use crate::schema::Config;

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }

    /// First error as a [`ConfigError`], if any.
    pub fn into_result(self) -> Result<Vec<ValidationWarning>, ConfigError> {
        match self.errors.into_iter().next() {
            Some(err) => Err(ConfigError::InvalidValue {
                field: err.path,
                message: err.message,
            }),
            None => Ok(self.warnings),
        }
    }
}

/// A validation error.
#[derive(Debug)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A validation warning.
#[derive(Debug)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration.
    pub fn validate(config: &Config) -> ValidationResult {
        let mut result = ValidationResult::default();

        Self::validate_playback(config, &mut result);
        Self::validate_recorder(config, &mut result);
        Self::validate_storage(config, &mut result);
        Self::validate_browser(config, &mut result);
        Self::validate_providers(config, &mut result);

        result
    }

    fn validate_playback(config: &Config, result: &mut ValidationResult) {
        let playback = &config.playback;

        if playback.event_retry_budget == 0 {
            result.add_error(ValidationError::new(
                "playback.event_retry_budget",
                "event_retry_budget must be greater than 0",
            ));
        }

        if playback.event_retry_budget > 50 {
            result.add_warning(ValidationWarning::new(
                "playback.event_retry_budget",
                "event_retry_budget is very high (>50), a missing element will stall playback",
            ));
        }

        if playback.total_failure_budget > 100 {
            result.add_warning(ValidationWarning::new(
                "playback.total_failure_budget",
                "total_failure_budget is very high (>100), broken recordings will rarely fail",
            ));
        }

        if !(0.1..=10.0).contains(&playback.default_speed) {
            result.add_error(ValidationError::new(
                "playback.default_speed",
                "default_speed must be within 0.1..=10",
            ));
        }

        if playback.handshake_timeout_ms == 0 {
            result.add_error(ValidationError::new(
                "playback.handshake_timeout_ms",
                "handshake_timeout_ms must be greater than 0",
            ));
        }

        if playback.max_recovery_backoff_ms < playback.recovery_backoff_ms {
            result.add_warning(ValidationWarning::new(
                "playback.max_recovery_backoff_ms",
                "max_recovery_backoff_ms is below recovery_backoff_ms, backoff will not grow",
            ));
        }
    }

    fn validate_recorder(config: &Config, result: &mut ValidationResult) {
        if config.recorder.control_prefix.is_empty() {
            result.add_error(ValidationError::new(
                "recorder.control_prefix",
                "control_prefix cannot be empty",
            ));
        }
    }

    fn validate_storage(config: &Config, result: &mut ValidationResult) {
        let valid_backends = ["sqlite", "memory"];
        if !valid_backends.contains(&config.storage.backend.as_str()) {
            result.add_error(ValidationError::new(
                "storage.backend",
                format!(
                    "Unknown storage backend '{}', valid values: {:?}",
                    config.storage.backend, valid_backends
                ),
            ));
        }

        if config.storage.backend == "memory" {
            result.add_warning(ValidationWarning::new(
                "storage.backend",
                "memory backend discards recordings on exit",
            ));
        }
    }

    fn validate_browser(config: &Config, result: &mut ValidationResult) {
        let endpoint = &config.browser.endpoint;
        if endpoint.is_empty() {
            result.add_error(ValidationError::new(
                "browser.endpoint",
                "endpoint cannot be empty",
            ));
        } else if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            result.add_error(ValidationError::new(
                "browser.endpoint",
                "endpoint must start with http:// or https://",
            ));
        }
    }

    fn validate_providers(config: &Config, result: &mut ValidationResult) {
        if let Some(ref url) = config.providers.generation_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                result.add_error(ValidationError::new(
                    "providers.generation_url",
                    "generation_url must start with http:// or https://",
                ));
            }
            if config.providers.api_key.is_none() {
                result.add_warning(ValidationWarning::new(
                    "providers.api_key",
                    "API key is not set, generation requests will be unauthenticated",
                ));
            }
        }

        if config.providers.timeout_seconds == 0 {
            result.add_error(ValidationError::new(
                "providers.timeout_seconds",
                "timeout_seconds must be greater than 0",
            ));
        }
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
