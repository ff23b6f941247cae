//! Liveness endpoint.
//!
//! `GET /healthcheck` goes through the same dispatcher as every other
//! endpoint but touches no dependency: if the process can dispatch a
//! request, it is alive.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::context::RequestContext;
use crate::error::ServiceError;
use crate::http::dispatch::Handler;

#[derive(Debug, Default, Deserialize)]
pub struct HealthCheckRequest {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
}

impl HealthStatus {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }
}

pub struct HealthCheckHandler;

#[async_trait]
impl Handler for HealthCheckHandler {
    type Input = HealthCheckRequest;
    type Output = HealthStatus;

    async fn handle(
        &self,
        _ctx: &RequestContext,
        _input: HealthCheckRequest,
    ) -> Result<HealthStatus, ServiceError> {
        Ok(HealthStatus::ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reports_ok() {
        let status = HealthCheckHandler
            .handle(&RequestContext::background(), HealthCheckRequest {})
            .await
            .unwrap();
        assert_eq!(serde_json::to_value(status).unwrap(), serde_json::json!({"status": "ok"}));
    }
}
