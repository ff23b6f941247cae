//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses and URLs parse
//! - Validate value ranges (ratios, timeouts, wait bounds)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServiceConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;
use std::net::SocketAddr;

use url::Url;

use crate::config::schema::ServiceConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Validate a parsed configuration.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }
    if config.listener.max_body_bytes == 0 {
        errors.push(ValidationError::new("listener.max_body_bytes", "must be > 0"));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be > 0"));
    }
    if config.timeouts.shutdown_grace_secs == 0 {
        errors.push(ValidationError::new("timeouts.shutdown_grace_secs", "must be > 0"));
    }

    let downstream = &config.downstream;
    match Url::parse(&downstream.base_url) {
        // The probe path replaces any path on the base, so only an origin is accepted.
        Ok(url) if url.path() != "/" || url.query().is_some() || url.fragment().is_some() => {
            errors.push(ValidationError::new(
                "downstream.base_url",
                format!("'{}' must be an origin without path or query", downstream.base_url),
            ))
        }
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        Ok(url) => errors.push(ValidationError::new(
            "downstream.base_url",
            format!("unsupported scheme '{}'", url.scheme()),
        )),
        Err(e) => errors.push(ValidationError::new(
            "downstream.base_url",
            format!("'{}' is not a URL: {}", downstream.base_url, e),
        )),
    }
    if !downstream.probe_path.starts_with('/') {
        errors.push(ValidationError::new("downstream.probe_path", "must start with '/'"));
    }
    if downstream.connect_timeout_secs == 0 {
        errors.push(ValidationError::new("downstream.connect_timeout_secs", "must be > 0"));
    }
    if downstream.request_timeout_secs == 0 {
        errors.push(ValidationError::new("downstream.request_timeout_secs", "must be > 0"));
    }

    if config.retries.min_wait_ms > config.retries.max_wait_ms {
        errors.push(ValidationError::new(
            "retries.min_wait_ms",
            format!(
                "{} exceeds retries.max_wait_ms ({})",
                config.retries.min_wait_ms, config.retries.max_wait_ms
            ),
        ));
    }

    let breaker = &config.circuit_breaker;
    if breaker.name.trim().is_empty() {
        errors.push(ValidationError::new("circuit_breaker.name", "must not be empty"));
    }
    if breaker.min_requests == 0 {
        errors.push(ValidationError::new("circuit_breaker.min_requests", "must be >= 1"));
    }
    if !(breaker.failure_ratio > 0.0 && breaker.failure_ratio <= 1.0) {
        errors.push(ValidationError::new(
            "circuit_breaker.failure_ratio",
            format!("{} is outside (0, 1]", breaker.failure_ratio),
        ));
    }
    if breaker.interval_secs == 0 {
        errors.push(ValidationError::new("circuit_breaker.interval_secs", "must be > 0"));
    }
    if breaker.open_timeout_secs == 0 {
        errors.push(ValidationError::new("circuit_breaker.open_timeout_secs", "must be > 0"));
    }
    if breaker.max_half_open_requests == 0 {
        errors.push(ValidationError::new(
            "circuit_breaker.max_half_open_requests",
            "must be >= 1",
        ));
    }

    if let Some(endpoint) = &config.observability.otel_endpoint {
        match Url::parse(endpoint) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            _ => errors.push(ValidationError::new(
                "observability.otel_endpoint",
                format!("'{endpoint}' is not an http(s) URL"),
            )),
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(validate_config(&ServiceConfig::default()), Ok(()));
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = ServiceConfig::default();
        config.listener.bind_address = "not-an-address".into();
        config.downstream.base_url = "ftp://example.com".into();
        config.circuit_breaker.failure_ratio = 1.5;
        config.retries.min_wait_ms = 20_000;

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec![
                "listener.bind_address",
                "downstream.base_url",
                "retries.min_wait_ms",
                "circuit_breaker.failure_ratio",
            ]
        );
    }

    #[test]
    fn test_rejects_zero_breaker_limits() {
        let mut config = ServiceConfig::default();
        config.circuit_breaker.min_requests = 0;
        config.circuit_breaker.max_half_open_requests = 0;
        config.downstream.probe_path = "random-error".into();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors[0].to_string().starts_with("downstream.probe_path"));
    }

    #[test]
    fn test_base_url_must_be_origin_only() {
        let mut config = ServiceConfig::default();
        config.downstream.base_url = "http://localhost:8081/api".into();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "downstream.base_url");

        config.downstream.base_url = "http://localhost:8081/".into();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_otel_endpoint_must_be_http() {
        let mut config = ServiceConfig::default();
        config.observability.otel_endpoint = Some("localhost:4318".into());

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "observability.otel_endpoint");

        config.observability.otel_endpoint = Some("http://collector:4318".into());
        assert!(validate_config(&config).is_ok());
    }
}
