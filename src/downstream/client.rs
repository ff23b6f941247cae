//! HTTP transport backed by a pooled `reqwest` client.
//!
//! # Responsibilities
//! - Issue exactly one request per call
//! - Apply connect/request timeouts and TCP keepalive
//! - Abort promptly when the request context is done
//! - Forward the request's trace context as `traceparent`/`baggage`

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::HeaderMap;

use crate::config::DownstreamConfig;
use crate::context::RequestContext;
use crate::downstream::transport::{
    DownstreamError, OutboundRequest, OutboundResponse, Transport,
};
use crate::observability::metrics;
use crate::observability::tracing::inject_trace_context;

/// Single-attempt HTTP transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Build a transport from configuration.
    pub fn new(config: &DownstreamConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .tcp_keepalive(Duration::from_secs(config.keepalive_secs))
            .pool_idle_timeout(Duration::from_secs(config.pool_idle_timeout_secs))
            .build()?;
        Ok(Self { client })
    }

    async fn attempt(
        &self,
        ctx: &RequestContext,
        request: &OutboundRequest,
    ) -> Result<OutboundResponse, DownstreamError> {
        let mut headers = HeaderMap::new();
        inject_trace_context(ctx.trace(), &mut headers);

        let response = self
            .client
            .request(request.method.clone(), request.url.clone())
            .headers(headers)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let body = response.bytes().await.map_err(transport_error)?;

        Ok(OutboundResponse {
            status,
            body: body.to_vec(),
        })
    }
}

fn transport_error(err: reqwest::Error) -> DownstreamError {
    if err.is_timeout() {
        DownstreamError::Transport(format!("timed out: {err}"))
    } else if err.is_connect() {
        DownstreamError::Transport(format!("connect failed: {err}"))
    } else {
        DownstreamError::Transport(err.to_string())
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(
        &self,
        ctx: &RequestContext,
        request: &OutboundRequest,
    ) -> Result<OutboundResponse, DownstreamError> {
        let result = ctx.run(self.attempt(ctx, request)).await?;

        match &result {
            Ok(response) => {
                tracing::debug!(
                    request_id = %ctx.request_id(),
                    url = %request.url,
                    status = %response.status,
                    "Downstream responded"
                );
                metrics::record_downstream_attempt(if response.is_retryable() {
                    "server_error"
                } else {
                    "response"
                });
            }
            Err(e) => {
                tracing::warn!(
                    request_id = %ctx.request_id(),
                    url = %request.url,
                    error = %e,
                    "Downstream request failed"
                );
                metrics::record_downstream_attempt("transport_error");
            }
        }

        result
    }
}
