//! Service-level error and its HTTP mapping.
//!
//! Binding failures are the only client errors (400). Every other kind is
//! a 500 carrying the error message, with a `kind` label so callers can
//! tell a missing product from an open breaker.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::context::ContextError;
use crate::downstream::DownstreamError;
use crate::http::binding::BindingError;
use crate::products::RepositoryError;

/// Any failure a dispatched request can end with.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Binding(#[from] BindingError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Downstream(#[from] DownstreamError),

    /// The request deadline passed or the request was cancelled.
    #[error(transparent)]
    Context(#[from] ContextError),
}

impl ServiceError {
    /// Stable label for the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::Binding(_) => "binding",
            ServiceError::Repository(e) => match e {
                RepositoryError::NotFound { .. } => "not_found",
                RepositoryError::AlreadyExists { .. } => "already_exists",
                RepositoryError::Backend(_) => "repository",
                RepositoryError::Context(c) => context_kind(*c),
            },
            ServiceError::Downstream(e) => match e {
                DownstreamError::Transport(_) => "downstream_transport",
                DownstreamError::Status { .. } => "downstream_status",
                DownstreamError::CircuitOpen { .. } => "circuit_open",
                DownstreamError::Context(c) => context_kind(*c),
            },
            ServiceError::Context(c) => context_kind(*c),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Binding(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

fn context_kind(err: ContextError) -> &'static str {
    match err {
        ContextError::Cancelled => "cancelled",
        ContextError::DeadlineExceeded => "deadline_exceeded",
    }
}

/// JSON error body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub kind: &'static str,
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.to_string(),
            kind: self.kind(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binding_is_the_only_client_error() {
        let binding = ServiceError::from(BindingError::NotAnObject);
        assert_eq!(binding.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(binding.kind(), "binding");

        let not_found = ServiceError::from(RepositoryError::NotFound { id: "x".into() });
        assert_eq!(not_found.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(not_found.kind(), "not_found");
        assert_eq!(not_found.to_string(), "product not found");

        let open = ServiceError::from(DownstreamError::CircuitOpen { name: "http-client".into() });
        assert_eq!(open.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(open.kind(), "circuit_open");
    }

    #[test]
    fn test_context_errors_keep_their_kind() {
        let err = ServiceError::from(DownstreamError::Context(ContextError::DeadlineExceeded));
        assert_eq!(err.kind(), "deadline_exceeded");
        let err = ServiceError::from(RepositoryError::Context(ContextError::Cancelled));
        assert_eq!(err.kind(), "cancelled");
        let err = ServiceError::from(ContextError::DeadlineExceeded);
        assert_eq!(err.kind(), "deadline_exceeded");
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
