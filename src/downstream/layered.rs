//! Resilience decorators over [`Transport`].
//!
//! ```text
//! BreakerTransport → RetryingTransport → HttpTransport
//! ```
//!
//! Each layer holds the next capability and is itself a `Transport`.

use std::sync::Arc;

use async_trait::async_trait;

use crate::context::RequestContext;
use crate::downstream::transport::{DownstreamError, OutboundRequest, OutboundResponse, Transport};
use crate::resilience::{BreakerError, CircuitBreaker, RetryPolicy};

/// Retries transport errors and 5xx responses.
pub struct RetryingTransport {
    inner: Arc<dyn Transport>,
    policy: RetryPolicy,
}

impl RetryingTransport {
    pub fn new(inner: Arc<dyn Transport>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

fn should_retry(outcome: &Result<OutboundResponse, DownstreamError>) -> bool {
    match outcome {
        Ok(response) => response.is_retryable(),
        Err(e) => e.is_retryable(),
    }
}

#[async_trait]
impl Transport for RetryingTransport {
    async fn send(
        &self,
        ctx: &RequestContext,
        request: &OutboundRequest,
    ) -> Result<OutboundResponse, DownstreamError> {
        let response = self
            .policy
            .execute(ctx, |_| self.inner.send(ctx, request), should_retry)
            .await?;

        // A server error that survived every retry is a failed call.
        if response.is_retryable() {
            return Err(DownstreamError::Status {
                status: response.status,
            });
        }
        Ok(response)
    }
}

/// Fails fast while the dependency's breaker is open.
pub struct BreakerTransport {
    inner: Arc<dyn Transport>,
    breaker: Arc<CircuitBreaker>,
}

impl BreakerTransport {
    pub fn new(inner: Arc<dyn Transport>, breaker: Arc<CircuitBreaker>) -> Self {
        Self { inner, breaker }
    }
}

#[async_trait]
impl Transport for BreakerTransport {
    async fn send(
        &self,
        ctx: &RequestContext,
        request: &OutboundRequest,
    ) -> Result<OutboundResponse, DownstreamError> {
        self.breaker
            .execute_with(
                || self.inner.send(ctx, request),
                DownstreamError::counts_against_dependency,
            )
            .await
            .map_err(|e| match e {
                BreakerError::Open { name } => DownstreamError::CircuitOpen { name },
                BreakerError::Inner(inner) => inner,
            })
    }
}

/// Compose the standard chain around a single-attempt transport.
pub fn resilient(
    transport: Arc<dyn Transport>,
    policy: RetryPolicy,
    breaker: Arc<CircuitBreaker>,
) -> Arc<dyn Transport> {
    let retrying: Arc<dyn Transport> = Arc::new(RetryingTransport::new(transport, policy));
    Arc::new(BreakerTransport::new(retrying, breaker))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use reqwest::StatusCode;
    use url::Url;

    use crate::resilience::{BreakerSettings, CircuitState};

    /// Replays scripted outcomes, then repeats the last one.
    struct ScriptedTransport {
        script: Mutex<VecDeque<Result<u16, &'static str>>>,
        last: Mutex<Result<u16, &'static str>>,
        calls: AtomicU32,
    }

    impl ScriptedTransport {
        fn new(script: Vec<Result<u16, &'static str>>) -> Arc<Self> {
            let last = *script.last().unwrap();
            Arc::new(Self {
                script: Mutex::new(script.into()),
                last: Mutex::new(last),
                calls: AtomicU32::new(0),
            })
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn send(
            &self,
            _ctx: &RequestContext,
            _request: &OutboundRequest,
        ) -> Result<OutboundResponse, DownstreamError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self
                .script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(*self.last.lock().unwrap());
            match next {
                Ok(status) => Ok(OutboundResponse::new(StatusCode::from_u16(status).unwrap())),
                Err(msg) => Err(DownstreamError::Transport(msg.to_string())),
            }
        }
    }

    fn request() -> OutboundRequest {
        OutboundRequest::get(Url::parse("http://downstream.test/random-error").unwrap())
    }

    fn policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy::new(max_retries, Duration::from_millis(1), Duration::from_millis(2))
    }

    #[tokio::test]
    async fn test_retries_server_errors_until_success() {
        let scripted = ScriptedTransport::new(vec![Ok(503), Err("reset"), Ok(200)]);
        let transport = RetryingTransport::new(scripted.clone(), policy(2));

        let response = transport
            .send(&RequestContext::background(), &request())
            .await
            .unwrap();

        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(scripted.calls(), 3);
    }

    #[tokio::test]
    async fn test_client_errors_are_returned_without_retry() {
        let scripted = ScriptedTransport::new(vec![Ok(404)]);
        let transport = RetryingTransport::new(scripted.clone(), policy(3));

        let response = transport
            .send(&RequestContext::background(), &request())
            .await
            .unwrap();

        assert_eq!(response.status, StatusCode::NOT_FOUND);
        assert_eq!(scripted.calls(), 1);
    }

    #[tokio::test]
    async fn test_exhausted_server_error_becomes_status_error() {
        let scripted = ScriptedTransport::new(vec![Ok(500)]);
        let transport = RetryingTransport::new(scripted.clone(), policy(1));

        let err = transport
            .send(&RequestContext::background(), &request())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DownstreamError::Status { status } if status == StatusCode::INTERNAL_SERVER_ERROR
        ));
        assert_eq!(scripted.calls(), 2);
    }

    #[tokio::test]
    async fn test_breaker_opens_and_short_circuits_chain() {
        let scripted = ScriptedTransport::new(vec![Ok(500)]);
        let breaker = Arc::new(CircuitBreaker::new(BreakerSettings::default()));
        let transport = resilient(scripted.clone(), policy(0), breaker.clone());
        let ctx = RequestContext::background();

        for _ in 0..3 {
            let err = transport.send(&ctx, &request()).await.unwrap_err();
            assert!(matches!(err, DownstreamError::Status { .. }));
        }
        assert_eq!(breaker.state(), CircuitState::Open);

        let err = transport.send(&ctx, &request()).await.unwrap_err();
        assert!(matches!(err, DownstreamError::CircuitOpen { ref name } if name == "http-client"));
        assert_eq!(scripted.calls(), 3);
    }

    #[tokio::test]
    async fn test_cancellation_does_not_count_against_dependency() {
        let scripted = ScriptedTransport::new(vec![Ok(200)]);
        let breaker = Arc::new(CircuitBreaker::new(BreakerSettings::default()));
        let transport = resilient(scripted.clone(), policy(0), breaker.clone());

        let ctx = RequestContext::new("req", tokio_util::sync::CancellationToken::new());
        ctx.cancel();
        for _ in 0..5 {
            let err = transport.send(&ctx, &request()).await.unwrap_err();
            assert!(matches!(err, DownstreamError::Context(_)));
        }

        assert_eq!(scripted.calls(), 0);
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert_eq!(breaker.counts().total_failures, 0);
    }
}
