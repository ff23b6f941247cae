//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Build the downstream chain (breaker → retry → HTTP transport)
//! - Register every endpoint in the dispatcher's route table
//! - Wire up middleware (tracing, request ID, body limit, metrics)
//! - Serve until shutdown, draining in-flight requests for a grace period
//!
//! Request timeouts are the dispatcher's per-request deadline, so an
//! overrunning request still answers with the JSON error body.

use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    middleware,
    routing::{get, MethodFilter},
    Router,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::ServiceConfig;
use crate::downstream::{resilient, HttpTransport, Transport};
use crate::health::HealthCheckHandler;
use crate::http::dispatch::{Dispatcher, RouteTable};
use crate::http::middleware::track_requests;
use crate::http::request::request_id_header;
use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::products::{probe_url, CreateProductHandler, GetProductHandler, ProductRepository};
use crate::resilience::{BreakerSettings, CircuitBreaker, RetryPolicy};
use crate::storage::build_repository;

/// Errors while assembling the server.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("invalid downstream URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("failed to build downstream HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// HTTP server for the product service.
pub struct HttpServer {
    router: Router,
    config: ServiceConfig,
    shutdown: Shutdown,
    breaker: Arc<CircuitBreaker>,
}

impl HttpServer {
    /// Create a server with the configured storage backend and HTTP transport.
    pub fn new(config: ServiceConfig, shutdown: Shutdown) -> Result<Self, BuildError> {
        let repository = build_repository(&config.storage);
        let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(&config.downstream)?);
        Self::with_components(config, shutdown, repository, transport)
    }

    /// Create a server around an explicit repository and single-attempt transport.
    pub fn with_components(
        config: ServiceConfig,
        shutdown: Shutdown,
        repository: Arc<dyn ProductRepository>,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, BuildError> {
        let probe = probe_url(&config.downstream)?;

        // One breaker per downstream dependency.
        let breaker = Arc::new(CircuitBreaker::new(BreakerSettings::from(&config.circuit_breaker)));
        let policy = RetryPolicy::from_config(&config.retries);
        let downstream = resilient(transport, policy, breaker.clone());

        let router = Self::build_router(&config, &shutdown, repository, downstream, probe);
        Ok(Self {
            router,
            config,
            shutdown,
            breaker,
        })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(
        config: &ServiceConfig,
        shutdown: &Shutdown,
        repository: Arc<dyn ProductRepository>,
        downstream: Arc<dyn Transport>,
        probe: url::Url,
    ) -> Router {
        let dispatcher = Dispatcher::new(
            shutdown.abort_token(),
            config.timeouts.request(),
            config.listener.max_body_bytes,
        );

        let mut router = RouteTable::new(dispatcher)
            .register(
                MethodFilter::POST,
                "/products",
                Arc::new(CreateProductHandler::new(repository.clone())),
            )
            .register(
                MethodFilter::GET,
                "/products/{id}",
                Arc::new(GetProductHandler::new(repository, downstream, probe)),
            )
            .register(MethodFilter::GET, "/healthcheck", Arc::new(HealthCheckHandler))
            .into_router();

        if config.observability.metrics_enabled {
            let handle = metrics::init_metrics();
            router = router.route(
                "/metrics",
                get(move || {
                    let handle = handle.clone();
                    async move { handle.render() }
                }),
            );
        }

        let x_request_id = request_id_header();
        router.route_layer(middleware::from_fn(track_requests)).layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::new(x_request_id))
                .layer(RequestBodyLimitLayer::new(config.listener.max_body_bytes)),
        )
    }

    /// Run the server, accepting connections on the given listener.
    ///
    /// Returns once shutdown was triggered and in-flight requests finished,
    /// or were cancelled after the grace period.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let grace = self.config.timeouts.shutdown_grace();
        let shutdown = self.shutdown.clone();
        let drain = self.shutdown.clone();

        let serve = axum::serve(listener, self.router)
            .with_graceful_shutdown(async move { drain.triggered().await })
            .into_future();
        tokio::pin!(serve);

        tokio::select! {
            result = &mut serve => result?,
            _ = shutdown.triggered() => {
                tracing::info!(grace_secs = grace.as_secs(), "Draining in-flight requests");
                match tokio::time::timeout(grace, &mut serve).await {
                    Ok(result) => result?,
                    Err(_) => {
                        tracing::warn!("Grace period elapsed, cancelling in-flight requests");
                        shutdown.force();
                        if tokio::time::timeout(Duration::from_secs(1), &mut serve).await.is_err() {
                            tracing::warn!("Connections still open after forced shutdown");
                        }
                    }
                }
            }
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// The fully layered router.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// The breaker guarding the downstream dependency.
    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }
}
