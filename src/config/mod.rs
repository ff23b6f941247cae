//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML), explicit path or discovered
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ServiceConfig (validated, immutable)
//!     → handed to HttpServer at startup
//! ```
//!
//! # Design Decisions
//! - Config is read once at startup and never reloaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{discover_config, load_config, ConfigError};
pub use schema::{
    CircuitBreakerConfig, DownstreamConfig, ListenerConfig, LogFormat, ObservabilityConfig,
    RetryConfig, ServiceConfig, StorageBackend, StorageConfig, TimeoutConfig,
};
