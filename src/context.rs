//! Request-scoped context.
//!
//! # Responsibilities
//! - Carry the request ID through handler, breaker, retry and transport
//! - Signal cancellation (caller disconnect, forced shutdown)
//! - Enforce a per-request deadline
//! - Hold the distributed trace context forwarded to downstream calls
//!
//! # Design Decisions
//! - Cancellation is a child of the process abort token, so a forced
//!   shutdown reaches every in-flight request
//! - Deadlines use Tokio's clock so paused-time tests can drive them

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Why a request context is done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ContextError {
    /// The caller went away or the process is shutting down.
    #[error("request cancelled")]
    Cancelled,

    /// The request deadline passed.
    #[error("request deadline exceeded")]
    DeadlineExceeded,
}

/// Per-request cancellation and deadline handle.
#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: String,
    token: CancellationToken,
    deadline: Option<Instant>,
    trace: opentelemetry::Context,
}

impl RequestContext {
    /// Create a context bound to the given cancellation token.
    pub fn new(request_id: impl Into<String>, token: CancellationToken) -> Self {
        Self {
            request_id: request_id.into(),
            token,
            deadline: None,
            trace: opentelemetry::Context::new(),
        }
    }

    /// A context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        Self::new("background", CancellationToken::new())
    }

    /// Set a deadline `timeout` from now.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Instant::now() + timeout);
        self
    }

    /// Attach the trace context propagated to downstream calls.
    pub fn with_trace(mut self, trace: opentelemetry::Context) -> Self {
        self.trace = trace;
        self
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn trace(&self) -> &opentelemetry::Context {
        &self.trace
    }

    /// Cancel this context and every child derived from its token.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Returns the reason this context is done, if it is.
    pub fn err(&self) -> Option<ContextError> {
        if self.token.is_cancelled() {
            return Some(ContextError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(ContextError::DeadlineExceeded),
            _ => None,
        }
    }

    /// Resolves once the context is cancelled or its deadline passes.
    pub async fn done(&self) -> ContextError {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = self.token.cancelled() => ContextError::Cancelled,
                    _ = tokio::time::sleep_until(deadline) => ContextError::DeadlineExceeded,
                }
            }
            None => {
                self.token.cancelled().await;
                ContextError::Cancelled
            }
        }
    }

    /// Run `future` unless the context finishes first.
    pub async fn run<F: Future>(&self, future: F) -> Result<F::Output, ContextError> {
        if let Some(err) = self.err() {
            return Err(err);
        }
        tokio::select! {
            biased;
            err = self.done() => Err(err),
            output = future => Ok(output),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_background_context_is_never_done() {
        let ctx = RequestContext::background();
        assert_eq!(ctx.err(), None);
        assert_eq!(ctx.run(async { 7 }).await, Ok(7));
    }

    #[tokio::test]
    async fn test_cancelled_context_short_circuits() {
        let ctx = RequestContext::new("req-1", CancellationToken::new());
        ctx.cancel();
        assert_eq!(ctx.err(), Some(ContextError::Cancelled));
        assert_eq!(ctx.run(async { 7 }).await, Err(ContextError::Cancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_aborts_pending_future() {
        let ctx = RequestContext::background().with_timeout(Duration::from_secs(1));
        let result = ctx.run(tokio::time::sleep(Duration::from_secs(5))).await;
        assert_eq!(result, Err(ContextError::DeadlineExceeded));
        assert_eq!(ctx.err(), Some(ContextError::DeadlineExceeded));
    }

    #[tokio::test]
    async fn test_parent_cancellation_reaches_child() {
        let parent = CancellationToken::new();
        let ctx = RequestContext::new("req-2", parent.child_token());
        parent.cancel();
        assert_eq!(ctx.done().await, ContextError::Cancelled);
    }
}
