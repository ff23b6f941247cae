//! In-memory product repository.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::context::RequestContext;
use crate::products::model::Product;
use crate::products::repository::{ProductRepository, RepositoryError};

/// A thread-safe map of product id -> product.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRepository {
    inner: Arc<DashMap<String, Product>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored products.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[async_trait]
impl ProductRepository for InMemoryRepository {
    async fn create(&self, ctx: &RequestContext, product: Product) -> Result<(), RepositoryError> {
        if let Some(err) = ctx.err() {
            return Err(err.into());
        }

        match self.inner.entry(product.id.clone()) {
            Entry::Occupied(_) => {
                tracing::error!(id = %product.id, "Failed to create product: id already exists");
                Err(RepositoryError::AlreadyExists { id: product.id })
            }
            Entry::Vacant(slot) => {
                slot.insert(product);
                Ok(())
            }
        }
    }

    async fn get(&self, ctx: &RequestContext, id: &str) -> Result<Product, RepositoryError> {
        if let Some(err) = ctx.err() {
            return Err(err.into());
        }

        self.inner
            .get(id)
            .map(|r| r.value().clone())
            .ok_or_else(|| RepositoryError::NotFound { id: id.to_string() })
    }
}
