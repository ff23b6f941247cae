//! Transport abstraction shared by the HTTP client and its decorators.

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use thiserror::Error;
use url::Url;

use crate::context::{ContextError, RequestContext};

/// Errors surfaced by a downstream call.
#[derive(Debug, Error)]
pub enum DownstreamError {
    /// Connection, TLS, timeout or body read failure.
    #[error("downstream transport error: {0}")]
    Transport(String),

    /// The dependency kept answering with a server error.
    #[error("downstream responded with status {status}")]
    Status { status: StatusCode },

    /// The circuit breaker rejected the call.
    #[error("circuit breaker '{name}' is open")]
    CircuitOpen { name: String },

    /// The request context finished first.
    #[error(transparent)]
    Context(#[from] ContextError),
}

impl DownstreamError {
    /// Whether another attempt may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DownstreamError::Transport(_))
    }

    /// Whether this error says something about the dependency's health.
    pub fn counts_against_dependency(&self) -> bool {
        !matches!(self, DownstreamError::Context(_) | DownstreamError::CircuitOpen { .. })
    }
}

/// A single outbound request.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub method: Method,
    pub url: Url,
}

impl OutboundRequest {
    pub fn get(url: Url) -> Self {
        Self {
            method: Method::GET,
            url,
        }
    }
}

/// A fully read downstream response.
#[derive(Debug, Clone)]
pub struct OutboundResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

impl OutboundResponse {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            body: Vec::new(),
        }
    }

    /// 5xx responses are worth retrying; 4xx never are.
    pub fn is_retryable(&self) -> bool {
        self.status.is_server_error()
    }
}

/// Anything that can carry an outbound request.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(
        &self,
        ctx: &RequestContext,
        request: &OutboundRequest,
    ) -> Result<OutboundResponse, DownstreamError>;
}
