//! Storage port consumed by the product handlers.

use async_trait::async_trait;
use thiserror::Error;

use crate::context::{ContextError, RequestContext};
use crate::products::model::Product;

/// Errors reported by a repository implementation.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("product not found")]
    NotFound { id: String },

    #[error("product {id} already exists")]
    AlreadyExists { id: String },

    #[error("storage backend error: {0}")]
    Backend(String),

    #[error(transparent)]
    Context(#[from] ContextError),
}

/// Product storage.
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Insert a new product. Fails if the id is already taken.
    async fn create(&self, ctx: &RequestContext, product: Product) -> Result<(), RepositoryError>;

    /// Fetch a product by id.
    async fn get(&self, ctx: &RequestContext, id: &str) -> Result<Product, RepositoryError>;
}
