//! Metrics collection and exposition.
//!
//! # Metrics
//! - `http_requests_total` (counter): requests by route, method, status
//! - `http_request_duration_seconds` (histogram): latency distribution
//! - `circuit_breaker_state` (gauge): 0=closed, 1=open, 2=half-open
//! - `circuit_breaker_transitions_total` (counter): by name, from, to
//! - `circuit_breaker_rejections_total` (counter): fast-failed calls
//! - `downstream_requests_total` (counter): single attempts by outcome
//! - `downstream_retries_total` (counter): scheduled retries
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade and never fails the caller
//! - One Prometheus recorder per process, installed on first use
//! - Histogram buckets tuned for typical web latencies

use std::sync::OnceLock;
use std::time::Instant;

use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};

use crate::resilience::CircuitState;

/// Latency buckets in seconds.
pub const LATENCY_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

static PROMETHEUS: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the process-wide Prometheus recorder and return its handle.
///
/// Safe to call repeatedly; later calls return the first handle.
pub fn init_metrics() -> PrometheusHandle {
    PROMETHEUS
        .get_or_init(|| {
            let builder = PrometheusBuilder::new();
            let builder = match builder.set_buckets_for_metric(
                Matcher::Full("http_request_duration_seconds".to_string()),
                LATENCY_BUCKETS,
            ) {
                Ok(builder) => builder,
                Err(e) => {
                    tracing::warn!(error = %e, "Falling back to default histogram buckets");
                    PrometheusBuilder::new()
                }
            };

            let recorder = builder.build_recorder();
            let handle = recorder.handle();
            if let Err(e) = ::metrics::set_global_recorder(recorder) {
                tracing::warn!(error = %e, "Metrics recorder already installed");
            }
            handle
        })
        .clone()
}

/// Record a completed inbound request.
pub fn record_request(route: &str, method: &str, status: u16, start: Instant) {
    let labels = [
        ("route", route.to_string()),
        ("method", method.to_string()),
        ("status", status.to_string()),
    ];
    ::metrics::counter!("http_requests_total", &labels).increment(1);
    ::metrics::histogram!("http_request_duration_seconds", &labels)
        .record(start.elapsed().as_secs_f64());
}

/// Record a circuit breaker state change.
pub fn record_breaker_transition(name: &str, from: CircuitState, to: CircuitState) {
    ::metrics::counter!(
        "circuit_breaker_transitions_total",
        "name" => name.to_string(),
        "from" => from.as_str(),
        "to" => to.as_str()
    )
    .increment(1);
    ::metrics::gauge!("circuit_breaker_state", "name" => name.to_string()).set(state_value(to));
}

/// Record a call rejected by an open breaker.
pub fn record_breaker_rejection(name: &str) {
    ::metrics::counter!("circuit_breaker_rejections_total", "name" => name.to_string())
        .increment(1);
}

/// Record a single downstream attempt.
pub fn record_downstream_attempt(outcome: &'static str) {
    ::metrics::counter!("downstream_requests_total", "outcome" => outcome).increment(1);
}

/// Record a scheduled retry.
pub fn record_retry() {
    ::metrics::counter!("downstream_retries_total").increment(1);
}

fn state_value(state: CircuitState) -> f64 {
    match state {
        CircuitState::Closed => 0.0,
        CircuitState::Open => 1.0,
        CircuitState::HalfOpen => 2.0,
    }
}
