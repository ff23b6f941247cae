//! Request duration middleware.
//! Labels every request by its matched route pattern, method and status.

use std::time::Instant;

use axum::{
    body::Body,
    extract::MatchedPath,
    http::Request,
    middleware::Next,
    response::Response,
};

use crate::observability::metrics;

pub async fn track_requests(req: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    // Pattern, not the raw path, to keep label cardinality bounded.
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());
    let method = req.method().to_string();

    let response = next.run(req).await;

    metrics::record_request(&route, &method, response.status().as_u16(), start);
    response
}
