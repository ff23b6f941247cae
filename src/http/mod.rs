//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, tower-http layers)
//!     → request.rs (request ID)
//!     → middleware/ (duration metrics by matched route)
//!     → dispatch.rs (bind → Handler::handle → JSON)
//!     → binding.rs (body, path, query, headers → typed input)
//! ```

pub mod binding;
pub mod dispatch;
pub mod middleware;
pub mod request;
pub mod server;

pub use binding::BindingError;
pub use dispatch::{Dispatcher, Handler, RouteTable};
pub use request::X_REQUEST_ID;
pub use server::{BuildError, HttpServer};
