//! Request identification.
//!
//! # Responsibilities
//! - Name the correlation header shared by the tower-http request-id layers
//! - Read the request ID back out of inbound headers
//!
//! # Design Decisions
//! - IDs are UUID v4, generated by `SetRequestIdLayer` as early as possible
//! - The same ID is echoed on the response and carried by `RequestContext`

use axum::http::{HeaderMap, HeaderName};

/// Correlation header name.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Header name for the tower-http request-id layers.
pub fn request_id_header() -> HeaderName {
    HeaderName::from_static(X_REQUEST_ID)
}

/// The request ID from `headers`, or `"unknown"` when absent or opaque.
pub fn request_id(headers: &HeaderMap) -> String {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string()
}
