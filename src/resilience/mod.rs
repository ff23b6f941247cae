//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Outbound call:
//!     → circuit_breaker.rs (fail fast while the dependency is down)
//!     → retries.rs (re-run transient failures with backoff.rs delays)
//!     → single attempt on the transport
//! ```
//!
//! # Design Decisions
//! - Breaker and retry are generic over the wrapped operation; the
//!   downstream module adapts them into transport decorators
//! - The breaker never retries; retries never trip anything themselves
//! - Both honor the request context at every suspension point

pub mod backoff;
pub mod circuit_breaker;
pub mod retries;

pub use backoff::BackoffStrategy;
pub use circuit_breaker::{
    BreakerError, BreakerObserver, BreakerSettings, CircuitBreaker, CircuitState, Counts,
};
pub use retries::RetryPolicy;
