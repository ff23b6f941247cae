//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::resilience::{BackoffStrategy, BreakerSettings};

/// Root configuration for the product service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// Listener configuration (bind address, body limit).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Downstream dependency called by the Get handler.
    pub downstream: DownstreamConfig,

    /// Retry configuration for the downstream call.
    pub retries: RetryConfig,

    /// Circuit breaker guarding the downstream call.
    pub circuit_breaker: CircuitBreakerConfig,

    /// Storage backend selection.
    pub storage: StorageConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum accepted request body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_body_bytes: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Timeout configuration for inbound requests and shutdown.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,

    /// Grace period for in-flight requests after a shutdown signal, in seconds.
    pub shutdown_grace_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 10,
            shutdown_grace_secs: 5,
        }
    }
}

impl TimeoutConfig {
    pub fn request(&self) -> Duration {
        Duration::from_secs(self.request_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

/// Downstream HTTP dependency.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DownstreamConfig {
    /// Origin of the dependency (e.g., "http://localhost:8081").
    ///
    /// Must not carry a path: `probe_path` is absolute and replaces it.
    pub base_url: String,

    /// Path probed before every product lookup.
    pub probe_path: String,

    /// Connection establishment timeout in seconds.
    pub connect_timeout_secs: u64,

    /// Total per-attempt timeout in seconds.
    pub request_timeout_secs: u64,

    /// TCP keepalive interval in seconds.
    pub keepalive_secs: u64,

    /// Idle pooled connections are closed after this many seconds.
    pub pool_idle_timeout_secs: u64,
}

impl Default for DownstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8081".to_string(),
            probe_path: "/random-error".to_string(),
            connect_timeout_secs: 30,
            request_timeout_secs: 10,
            keepalive_secs: 30,
            pool_idle_timeout_secs: 90,
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after the first attempt. Zero disables retrying.
    pub max_retries: u32,

    /// Lower bound of the wait between attempts in milliseconds.
    pub min_wait_ms: u64,

    /// Upper bound of the wait between attempts in milliseconds.
    pub max_wait_ms: u64,

    /// Backoff schedule.
    pub strategy: BackoffStrategy,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 0,
            min_wait_ms: 100,
            max_wait_ms: 10_000,
            strategy: BackoffStrategy::LinearJitter,
        }
    }
}

/// Circuit breaker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Name used in logs and metrics.
    pub name: String,

    /// Requests in the window before the failure ratio is evaluated.
    pub min_requests: u32,

    /// Failure ratio (0, 1] at which the breaker opens.
    pub failure_ratio: f64,

    /// Rolling window for counters while closed, in seconds.
    pub interval_secs: u64,

    /// Time the breaker stays open before probing, in seconds.
    pub open_timeout_secs: u64,

    /// Probes allowed while half-open (also the successes needed to close).
    pub max_half_open_requests: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            name: "http-client".to_string(),
            min_requests: 3,
            failure_ratio: 0.6,
            interval_secs: 5,
            open_timeout_secs: 10,
            max_half_open_requests: 3,
        }
    }
}

impl From<&CircuitBreakerConfig> for BreakerSettings {
    fn from(config: &CircuitBreakerConfig) -> Self {
        Self {
            name: config.name.clone(),
            min_requests: config.min_requests,
            failure_ratio: config.failure_ratio,
            interval: Duration::from_secs(config.interval_secs),
            open_timeout: Duration::from_secs(config.open_timeout_secs),
            max_half_open_requests: config.max_half_open_requests,
        }
    }
}

/// Storage backend kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    /// Process-local map; contents are lost on restart.
    #[default]
    Memory,
}

/// Storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Expose the `/metrics` endpoint.
    pub metrics_enabled: bool,

    /// OTLP/HTTP collector endpoint for spans (e.g., "http://localhost:4318").
    /// Trace context is propagated either way; spans are exported only when set.
    pub otel_endpoint: Option<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: true,
            otel_endpoint: None,
        }
    }
}
