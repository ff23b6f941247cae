//! Product service library.
//!
//! Typed handlers behind a generic dispatcher, with a resilient downstream
//! client (bounded retries plus a circuit breaker) and pluggable storage.

// Core subsystems
pub mod config;
pub mod context;
pub mod error;
pub mod http;

// Domain
pub mod health;
pub mod products;
pub mod storage;

// Downstream dependency
pub mod downstream;
pub mod resilience;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::schema::ServiceConfig;
pub use context::{ContextError, RequestContext};
pub use error::ServiceError;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
