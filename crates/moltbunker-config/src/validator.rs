//! Configuration validation.

use url::Url;

use crate::error::ConfigError;
use crate::schema::ClientConfig;

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

    /// Convert the first error into a [`ConfigError`].
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
    pub fn validate(config: &ClientConfig) -> ValidationResult {
        let mut result = ValidationResult::default();

        Self::validate_api(config, &mut result);
        Self::validate_auth(config, &mut result);
        Self::validate_events(config, &mut result);
        Self::validate_exec(config, &mut result);

        result
    }

    fn validate_api(config: &ClientConfig, result: &mut ValidationResult) {
        match Url::parse(config.api.base_url()) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {
                if url.scheme() == "http" {
                    result.add_warning(ValidationWarning::new(
                        "api.base_url",
                        "plain http; WebSocket traffic will be unencrypted",
                    ));
                }
            }
            Ok(url) => result.add_error(ValidationError::new(
                "api.base_url",
                format!("scheme must be http or https, got {}", url.scheme()),
            )),
            Err(e) => result.add_error(ValidationError::new(
                "api.base_url",
                format!("invalid URL: {}", e),
            )),
        }
    }

    fn validate_auth(config: &ClientConfig, result: &mut ValidationResult) {
        if !config.auth.has_credentials() {
            result.add_warning(ValidationWarning::new(
                "auth",
                "no api_key or private_key configured",
            ));
        }
        if config.auth.api_key.is_some() && config.auth.private_key.is_some() {
            result.add_warning(ValidationWarning::new(
                "auth",
                "both api_key and private_key set; api_key takes precedence",
            ));
        }
    }

    fn validate_events(config: &ClientConfig, result: &mut ValidationResult) {
        let events = &config.events;

        Self::validate_path("events.path", &events.path, result);

        if events.initial_backoff_ms == 0 {
            result.add_error(ValidationError::new(
                "events.initial_backoff_ms",
                "initial backoff must be greater than 0",
            ));
        }
        if events.initial_backoff_ms > events.max_backoff_ms {
            result.add_error(ValidationError::new(
                "events.max_backoff_ms",
                "max backoff must be >= initial_backoff_ms",
            ));
        }
        if events.ping_interval_secs == 0 {
            result.add_error(ValidationError::new(
                "events.ping_interval_secs",
                "ping interval must be greater than 0",
            ));
        }
    }

    fn validate_exec(config: &ClientConfig, result: &mut ValidationResult) {
        let exec = &config.exec;

        Self::validate_path("exec.path", &exec.path, result);

        if exec.cols == 0 || exec.rows == 0 {
            result.add_error(ValidationError::new(
                "exec",
                "cols and rows must be greater than 0",
            ));
        }
        if exec.ping_interval_secs == 0 {
            result.add_error(ValidationError::new(
                "exec.ping_interval_secs",
                "ping interval must be greater than 0",
            ));
        }
        if exec.challenge_timeout_secs == 0 {
            result.add_error(ValidationError::new(
                "exec.challenge_timeout_secs",
                "challenge timeout must be greater than 0",
            ));
        }
    }

    fn validate_path(field: &str, path: &str, result: &mut ValidationResult) {
        if !path.starts_with('/') {
            result.add_error(ValidationError::new(field, "path must start with '/'"));
        }
    }
}
