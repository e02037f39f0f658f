use std::net::SocketAddr;

use tracing_subscriber::EnvFilter;

use crate::config::models::IngressConfig;

/// Validation result type alias
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validation error types
#[derive(Debug, thiserror::Error, Clone)]
pub enum ValidationError {
    #[error("Invalid field '{field}': {message}")]
    InvalidField { field: String, message: String },

    #[error("Invalid listen address '{address}': {reason}")]
    InvalidListenAddress { address: String, reason: String },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },
}

/// Semantic checks on a deserialized configuration
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the entire configuration, reporting every problem at once
    pub fn validate(config: &IngressConfig) -> ValidationResult<()> {
        let mut errors = Vec::new();

        if let Err(e) = Self::validate_listen_address(&config.listen_addr) {
            errors.push(e);
        }

        if let Err(e) = Self::validate_path("notify_path", &config.notify_path) {
            errors.push(e);
        }

        if config.metrics.enabled {
            if let Err(e) = Self::validate_path("metrics.path", &config.metrics.path) {
                errors.push(e);
            } else if config.metrics.path == config.notify_path {
                errors.push(ValidationError::InvalidField {
                    field: "metrics.path".to_string(),
                    message: "Must differ from notify_path".to_string(),
                });
            }
        }

        if config.admission.max_outstanding < 0 {
            errors.push(ValidationError::InvalidField {
                field: "admission.max_outstanding".to_string(),
                message: "Must be >= 0 (use 0 to disable load shedding)".to_string(),
            });
        }

        if config.payload.max_body_bytes == 0 {
            errors.push(ValidationError::InvalidField {
                field: "payload.max_body_bytes".to_string(),
                message: "Must be greater than 0".to_string(),
            });
        }

        if config.dispatch.queue_capacity == 0 {
            errors.push(ValidationError::InvalidField {
                field: "dispatch.queue_capacity".to_string(),
                message: "Must be greater than 0".to_string(),
            });
        }

        if let Err(e) = EnvFilter::try_new(&config.logging.level) {
            errors.push(ValidationError::InvalidField {
                field: "logging.level".to_string(),
                message: e.to_string(),
            });
        }

        if let Err(e) = config.shutdown.drain_timeout() {
            errors.push(ValidationError::InvalidField {
                field: "shutdown.drain_timeout".to_string(),
                message: format!("'{}': {e}", config.shutdown.drain_timeout),
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::ValidationFailed {
                message: Self::format_multiple_errors(errors),
            })
        }
    }

    fn validate_listen_address(address: &str) -> ValidationResult<()> {
        if address.parse::<SocketAddr>().is_err() {
            return Err(ValidationError::InvalidListenAddress {
                address: address.to_string(),
                reason: "Must be in format 'IP:PORT' (e.g., '127.0.0.1:6000' or '0.0.0.0:6000')"
                    .to_string(),
            });
        }
        Ok(())
    }

    fn validate_path(field: &str, path: &str) -> ValidationResult<()> {
        if !path.starts_with('/') {
            return Err(ValidationError::InvalidField {
                field: field.to_string(),
                message: format!("Path '{path}' must start with '/'"),
            });
        }
        if path == "/health" {
            return Err(ValidationError::InvalidField {
                field: field.to_string(),
                message: "'/health' is reserved".to_string(),
            });
        }
        Ok(())
    }

    fn format_multiple_errors(errors: Vec<ValidationError>) -> String {
        if errors.len() == 1 {
            return errors[0].to_string();
        }
        let mut message = format!("{} configuration errors:", errors.len());
        for (i, error) in errors.iter().enumerate() {
            message.push_str(&format!("\n  {}. {error}", i + 1));
        }
        message
    }
}
