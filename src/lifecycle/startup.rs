//! Startup orchestration.
//!
//! # Responsibilities
//! - Load and validate configuration (explicit path or discovery)
//! - Apply command-line overrides
//! - Log the effective configuration before anything binds
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Overrides are validated like file values

use std::path::PathBuf;

use crate::config::validation::validate_config;
use crate::config::{discover_config, load_config, ConfigError, ServiceConfig};

/// Command-line overrides.
#[derive(Debug, Clone, Default)]
pub struct StartupOptions {
    pub config_path: Option<PathBuf>,
    pub bind_address: Option<String>,
}

/// Resolve the effective configuration.
pub fn resolve_config(options: &StartupOptions) -> Result<ServiceConfig, ConfigError> {
    let mut config = match &options.config_path {
        Some(path) => load_config(path)?,
        None => discover_config()?,
    };

    if let Some(bind) = &options.bind_address {
        config.listener.bind_address = bind.clone();
        validate_config(&config).map_err(ConfigError::Validation)?;
    }

    Ok(config)
}

/// Log the configuration the service runs with.
pub fn log_config(config: &ServiceConfig) {
    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_body_bytes = config.listener.max_body_bytes,
        request_timeout_secs = config.timeouts.request_secs,
        shutdown_grace_secs = config.timeouts.shutdown_grace_secs,
        "Listener configuration"
    );
    tracing::info!(
        base_url = %config.downstream.base_url,
        probe_path = %config.downstream.probe_path,
        max_retries = config.retries.max_retries,
        min_wait_ms = config.retries.min_wait_ms,
        max_wait_ms = config.retries.max_wait_ms,
        "Downstream configuration"
    );
    tracing::info!(
        name = %config.circuit_breaker.name,
        min_requests = config.circuit_breaker.min_requests,
        failure_ratio = config.circuit_breaker.failure_ratio,
        interval_secs = config.circuit_breaker.interval_secs,
        open_timeout_secs = config.circuit_breaker.open_timeout_secs,
        max_half_open_requests = config.circuit_breaker.max_half_open_requests,
        "Circuit breaker configuration"
    );
    tracing::info!(
        log_format = ?config.observability.log_format,
        metrics_enabled = config.observability.metrics_enabled,
        otel_endpoint = config.observability.otel_endpoint.as_deref().unwrap_or("disabled"),
        "Observability configuration"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_override_is_applied() {
        let path = std::env::temp_dir().join(format!("startup-{}.toml", std::process::id()));
        std::fs::write(&path, "[listener]\nbind_address = \"127.0.0.1:9000\"\n").unwrap();

        let config = resolve_config(&StartupOptions {
            config_path: Some(path.clone()),
            bind_address: Some("127.0.0.1:9100".into()),
        })
        .unwrap();
        assert_eq!(config.listener.bind_address, "127.0.0.1:9100");

        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_invalid_bind_override_is_rejected() {
        let path = std::env::temp_dir().join(format!("startup-bad-{}.toml", std::process::id()));
        std::fs::write(&path, "").unwrap();

        let err = resolve_config(&StartupOptions {
            config_path: Some(path.clone()),
            bind_address: Some("not-an-address".into()),
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));

        let _ = std::fs::remove_file(path);
    }
}
