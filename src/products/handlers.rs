//! Product endpoints.
//!
//! # Responsibilities
//! - `POST /products`: assign an ID and store a new product
//! - `GET /products/{id}`: probe the downstream dependency, then read storage
//!
//! # Design Decisions
//! - The downstream probe is a resilience check, not a data dependency; its
//!   body is discarded
//! - A failed probe (including an open breaker) fails the request before
//!   storage is touched

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::DownstreamConfig;
use crate::context::RequestContext;
use crate::downstream::{OutboundRequest, Transport};
use crate::error::ServiceError;
use crate::http::dispatch::Handler;
use crate::products::model::Product;
use crate::products::repository::ProductRepository;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreateProductRequest {
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateProductResponse {
    pub id: String,
}

pub struct CreateProductHandler {
    repository: Arc<dyn ProductRepository>,
}

impl CreateProductHandler {
    pub fn new(repository: Arc<dyn ProductRepository>) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl Handler for CreateProductHandler {
    type Input = CreateProductRequest;
    type Output = CreateProductResponse;

    async fn handle(
        &self,
        ctx: &RequestContext,
        input: CreateProductRequest,
    ) -> Result<CreateProductResponse, ServiceError> {
        let product = Product::new(input.name);
        let id = product.id.clone();
        self.repository.create(ctx, product).await?;

        tracing::debug!(request_id = %ctx.request_id(), id = %id, "Product created");
        Ok(CreateProductResponse { id })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct GetProductRequest {
    pub id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GetProductResponse {
    pub product: Product,
}

pub struct GetProductHandler {
    repository: Arc<dyn ProductRepository>,
    transport: Arc<dyn Transport>,
    probe_url: Url,
}

impl GetProductHandler {
    /// `transport` should already carry the retry and breaker layers.
    pub fn new(
        repository: Arc<dyn ProductRepository>,
        transport: Arc<dyn Transport>,
        probe_url: Url,
    ) -> Self {
        Self {
            repository,
            transport,
            probe_url,
        }
    }
}

#[async_trait]
impl Handler for GetProductHandler {
    type Input = GetProductRequest;
    type Output = GetProductResponse;

    async fn handle(
        &self,
        ctx: &RequestContext,
        input: GetProductRequest,
    ) -> Result<GetProductResponse, ServiceError> {
        let response = self
            .transport
            .send(ctx, &OutboundRequest::get(self.probe_url.clone()))
            .await?;
        tracing::debug!(
            request_id = %ctx.request_id(),
            status = %response.status,
            "Downstream probe passed"
        );

        let product = self.repository.get(ctx, &input.id).await?;
        Ok(GetProductResponse { product })
    }
}

/// Absolute URL of the downstream probe endpoint.
pub fn probe_url(config: &DownstreamConfig) -> Result<Url, url::ParseError> {
    Url::parse(&config.base_url)?.join(&config.probe_path)
}
