//! Downstream dependency subsystem.
//!
//! # Data Flow
//! ```text
//! Handler
//!     → layered.rs BreakerTransport (circuit breaker gate)
//!     → layered.rs RetryingTransport (bounded retries + backoff)
//!     → client.rs HttpTransport (one reqwest call)
//! ```
//!
//! # Design Decisions
//! - Every layer implements the same `Transport` trait
//! - The HTTP client has no resilience logic of its own
//! - 4xx responses are successful calls; 5xx responses are failures once
//!   retries are exhausted

pub mod client;
pub mod layered;
pub mod transport;

pub use client::HttpTransport;
pub use layered::{resilient, BreakerTransport, RetryingTransport};
pub use transport::{DownstreamError, OutboundRequest, OutboundResponse, Transport};
