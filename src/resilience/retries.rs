//! Retry logic.
//!
//! # Responsibilities
//! - Re-run a failed attempt up to `max_retries` times
//! - Wait between attempts according to the configured backoff
//! - Stop as soon as the request context is done
//!
//! # Design Decisions
//! - The caller classifies outcomes; the policy only counts and waits
//! - `max_retries = 0` runs exactly one attempt and never computes a backoff
//! - A context that is already done before the first attempt runs nothing

use std::future::Future;
use std::time::Duration;

use crate::config::RetryConfig;
use crate::context::{ContextError, RequestContext};
use crate::observability::metrics;
use crate::resilience::backoff::BackoffStrategy;

/// Bounded retry policy.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    min_wait: Duration,
    max_wait: Duration,
    strategy: BackoffStrategy,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, min_wait: Duration, max_wait: Duration) -> Self {
        Self {
            max_retries,
            min_wait,
            max_wait,
            strategy: BackoffStrategy::LinearJitter,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            min_wait: Duration::from_millis(config.min_wait_ms),
            max_wait: Duration::from_millis(config.max_wait_ms),
            strategy: config.strategy,
        }
    }

    /// Wait before the attempt following `attempt`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.strategy.delay(attempt, self.min_wait, self.max_wait)
    }

    /// Run `operation` until it produces an outcome `should_retry` rejects,
    /// retries are exhausted, or the context is done.
    ///
    /// `operation` receives the 0-based attempt number.
    pub async fn execute<T, E, F, Fut, P>(
        &self,
        ctx: &RequestContext,
        mut operation: F,
        should_retry: P,
    ) -> Result<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&Result<T, E>) -> bool,
        E: From<ContextError>,
    {
        if let Some(err) = ctx.err() {
            return Err(err.into());
        }

        let mut attempt = 0;
        loop {
            let outcome = operation(attempt).await;
            if !should_retry(&outcome) {
                return outcome;
            }
            if let Some(err) = ctx.err() {
                return Err(err.into());
            }
            if attempt >= self.max_retries {
                return outcome;
            }

            let wait = self.backoff(attempt);
            tracing::debug!(
                request_id = %ctx.request_id(),
                attempt,
                delay = ?wait,
                "Retrying downstream call"
            );
            metrics::record_retry();

            ctx.run(tokio::time::sleep(wait)).await?;
            attempt += 1;
        }
    }
}
