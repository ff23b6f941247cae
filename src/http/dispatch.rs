//! Generic request dispatch.
//!
//! # Responsibilities
//! - Bind an inbound request into a handler's typed input
//! - Derive the per-request context (request ID, cancellation, deadline,
//!   inbound trace context)
//! - Invoke the handler once and serialize its result or error
//!
//! # Design Decisions
//! - Handlers never see a request that failed to bind
//! - The request context is cancelled when the request future is dropped
//! - No state is shared between requests besides the handlers themselves

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::rejection::RawPathParamsRejection;
use axum::extract::{RawPathParams, Request};
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{on, MethodFilter};
use axum::{Json, Router};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::context::RequestContext;
use crate::error::ServiceError;
use crate::http::binding::{Binding, BindingError};
use crate::http::request::request_id;
use crate::observability::tracing::{extract_trace_context, link_span};

type PathParams = Result<RawPathParams, RawPathParamsRejection>;

/// A typed endpoint.
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    /// Bound from body, path, query and headers.
    type Input: DeserializeOwned + Send + 'static;
    /// Serialized as the 200 response body.
    type Output: Serialize + Send + 'static;

    async fn handle(
        &self,
        ctx: &RequestContext,
        input: Self::Input,
    ) -> Result<Self::Output, ServiceError>;
}

/// Settings shared by every dispatched request.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    abort: CancellationToken,
    request_timeout: Duration,
    max_body_bytes: usize,
}

impl Dispatcher {
    /// `abort` is the parent of every request context.
    pub fn new(
        abort: CancellationToken,
        request_timeout: Duration,
        max_body_bytes: usize,
    ) -> Self {
        Self {
            abort,
            request_timeout,
            max_body_bytes,
        }
    }

    /// Bind, run and serialize a single request.
    ///
    /// The request deadline covers reading the body as well as the handler.
    pub async fn dispatch<H: Handler>(
        &self,
        handler: &H,
        params: PathParams,
        request: Request,
    ) -> Response {
        let token = self.abort.child_token();
        let _cancel_on_drop = token.clone().drop_guard();

        let id = request_id(request.headers());
        let span = tracing::info_span!("dispatch", request_id = %id);
        let trace = link_span(&span, extract_trace_context(request.headers()));
        let ctx = RequestContext::new(id, token)
            .with_timeout(self.request_timeout)
            .with_trace(trace);

        self.serve(handler, &ctx, params, request).instrument(span).await
    }

    async fn serve<H: Handler>(
        &self,
        handler: &H,
        ctx: &RequestContext,
        params: PathParams,
        request: Request,
    ) -> Response {
        let input = match ctx.run(self.bind::<H::Input>(params, request)).await {
            Ok(Ok(input)) => input,
            Ok(Err(e)) => {
                tracing::warn!(
                    request_id = %ctx.request_id(),
                    error = %e,
                    "Failed to bind request"
                );
                return ServiceError::from(e).into_response();
            }
            Err(e) => return failure(ctx, e.into()),
        };

        match ctx.run(handler.handle(ctx, input)).await {
            Ok(Ok(output)) => (StatusCode::OK, Json(output)).into_response(),
            Ok(Err(e)) => failure(ctx, e),
            Err(e) => failure(ctx, e.into()),
        }
    }

    async fn bind<T: DeserializeOwned>(
        &self,
        params: PathParams,
        request: Request,
    ) -> Result<T, BindingError> {
        let (parts, body) = request.into_parts();
        let bytes = axum::body::to_bytes(body, self.max_body_bytes)
            .await
            .map_err(|e| BindingError::Body(e.to_string()))?;
        let params = params.map_err(|e| BindingError::Path(e.body_text()))?;

        let content_type = parts.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok());

        let mut binding = Binding::new();
        binding.bind_body(content_type, &bytes)?;
        binding.bind_pairs(params.iter());
        if let Some(query) = parts.uri.query() {
            binding.bind_pairs(url::form_urlencoded::parse(query.as_bytes()));
        }
        binding.bind_headers(&parts.headers)?;
        binding.finish()
    }
}

fn failure(ctx: &RequestContext, err: ServiceError) -> Response {
    tracing::error!(
        request_id = %ctx.request_id(),
        kind = err.kind(),
        error = %err,
        "Request failed"
    );
    err.into_response()
}

/// Route table keyed by method and path.
pub struct RouteTable {
    router: Router,
    dispatcher: Dispatcher,
}

impl RouteTable {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            router: Router::new(),
            dispatcher,
        }
    }

    /// Register `handler` for `method` on `path` (axum path syntax).
    pub fn register<H: Handler>(
        mut self,
        method: MethodFilter,
        path: &str,
        handler: Arc<H>,
    ) -> Self {
        let dispatcher = self.dispatcher.clone();
        let endpoint = move |params: PathParams, request: Request| {
            let dispatcher = dispatcher.clone();
            let handler = handler.clone();
            async move { dispatcher.dispatch(handler.as_ref(), params, request).await }
        };
        self.router = self.router.route(path, on(method, endpoint));
        self
    }

    pub fn into_router(self) -> Router {
        self.router
    }
}
