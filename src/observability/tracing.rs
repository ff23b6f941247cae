//! Distributed trace propagation and span export.
//!
//! # Responsibilities
//! - Extract W3C `traceparent`/`tracestate` and `baggage` from inbound headers
//! - Inject the request's trace context into outbound downstream calls
//! - Optionally export spans to an OTLP/HTTP collector
//!
//! # Design Decisions
//! - Propagation works without an exporter: an inbound trace context is
//!   forwarded downstream unchanged when no OpenTelemetry layer is installed
//! - Headers that fail to parse are ignored, never rejected

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use opentelemetry::propagation::{
    Extractor, Injector, TextMapCompositePropagator, TextMapPropagator,
};
use opentelemetry::trace::{TraceContextExt, TraceError};
use opentelemetry::{Context, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::propagation::{BaggagePropagator, TraceContextPropagator};
use opentelemetry_sdk::trace::{self as sdktrace, Sampler, Tracer};
use opentelemetry_sdk::Resource;
use tracing_opentelemetry::OpenTelemetrySpanExt;

use crate::config::ObservabilityConfig;

const SERVICE_NAME: &str = "product-service";

struct HeaderExtractor<'a>(&'a HeaderMap);

impl Extractor for HeaderExtractor<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|value| value.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(HeaderName::as_str).collect()
    }
}

struct HeaderInjector<'a>(&'a mut HeaderMap);

impl Injector for HeaderInjector<'_> {
    fn set(&mut self, key: &str, value: String) {
        let name = HeaderName::from_bytes(key.as_bytes());
        let value = HeaderValue::from_str(&value);
        if let (Ok(name), Ok(value)) = (name, value) {
            self.0.insert(name, value);
        }
    }
}

fn propagator() -> TextMapCompositePropagator {
    TextMapCompositePropagator::new(vec![
        Box::new(TraceContextPropagator::new()),
        Box::new(BaggagePropagator::new()),
    ])
}

/// Trace context carried by inbound headers, if they hold a valid one.
pub fn extract_trace_context(headers: &HeaderMap) -> Option<Context> {
    let cx = propagator().extract(&HeaderExtractor(headers));
    if cx.span().span_context().is_valid() {
        Some(cx)
    } else {
        None
    }
}

/// Write `cx` into outbound headers. An empty context writes nothing.
pub fn inject_trace_context(cx: &Context, headers: &mut HeaderMap) {
    propagator().inject_context(cx, &mut HeaderInjector(headers));
}

/// Parent `span` on the inbound context and return the context to
/// propagate downstream.
///
/// Falls back to the inbound context when no OpenTelemetry layer records
/// the span.
pub fn link_span(span: &::tracing::Span, parent: Option<Context>) -> Context {
    if let Some(parent) = &parent {
        span.set_parent(parent.clone());
    }
    let cx = span.context();
    if cx.span().span_context().is_valid() {
        cx
    } else {
        parent.unwrap_or_else(Context::new)
    }
}

/// Install the OTLP batch exporter when `otel_endpoint` is configured.
///
/// Must run inside the Tokio runtime.
pub fn init_tracer(config: &ObservabilityConfig) -> Result<Option<Tracer>, TraceError> {
    let Some(endpoint) = &config.otel_endpoint else {
        return Ok(None);
    };

    let exporter = opentelemetry_otlp::new_exporter()
        .http()
        .with_endpoint(endpoint.clone());
    let trace_config = sdktrace::config()
        .with_sampler(Sampler::ParentBased(Box::new(Sampler::AlwaysOn)))
        .with_resource(Resource::new(vec![KeyValue::new("service.name", SERVICE_NAME)]));

    let tracer = opentelemetry_otlp::new_pipeline()
        .tracing()
        .with_exporter(exporter)
        .with_trace_config(trace_config)
        .install_batch(opentelemetry_sdk::runtime::Tokio)?;
    Ok(Some(tracer))
}

/// Flush pending spans and shut the exporter down.
pub fn shutdown_tracer() {
    opentelemetry::global::shutdown_tracer_provider();
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRACEPARENT: &str = "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01";

    fn inbound() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("traceparent", HeaderValue::from_static(TRACEPARENT));
        headers.insert("baggage", HeaderValue::from_static("tenant=acme"));
        headers
    }

    #[test]
    fn test_extracts_w3c_trace_context() {
        let cx = extract_trace_context(&inbound()).unwrap();
        let span_context = cx.span().span_context().clone();

        assert!(span_context.is_remote());
        assert_eq!(
            span_context.trace_id().to_string(),
            "4bf92f3577b34da6a3ce929d0e0e4736"
        );
        assert!(span_context.is_sampled());
    }

    #[test]
    fn test_missing_or_garbled_headers_yield_none() {
        assert!(extract_trace_context(&HeaderMap::new()).is_none());

        let mut headers = HeaderMap::new();
        headers.insert("traceparent", HeaderValue::from_static("00-not-a-trace-01"));
        assert!(extract_trace_context(&headers).is_none());
    }

    #[test]
    fn test_injects_what_was_extracted() {
        let cx = extract_trace_context(&inbound()).unwrap();
        let mut outbound = HeaderMap::new();
        inject_trace_context(&cx, &mut outbound);

        assert_eq!(outbound.get("traceparent").unwrap(), TRACEPARENT);
        assert_eq!(outbound.get("baggage").unwrap(), "tenant=acme");
    }

    #[test]
    fn test_empty_context_injects_nothing() {
        let mut outbound = HeaderMap::new();
        inject_trace_context(&Context::new(), &mut outbound);
        assert!(outbound.get("traceparent").is_none());
    }

    #[test]
    fn test_unrecorded_span_keeps_inbound_context() {
        let parent = extract_trace_context(&inbound());
        let cx = link_span(&::tracing::Span::none(), parent);
        assert_eq!(
            cx.span().span_context().trace_id().to_string(),
            "4bf92f3577b34da6a3ce929d0e0e4736"
        );
    }

    #[test]
    fn test_no_endpoint_installs_no_tracer() {
        let tracer = init_tracer(&ObservabilityConfig::default()).unwrap();
        assert!(tracer.is_none());
    }
}
