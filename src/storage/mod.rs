//! Storage backends implementing [`ProductRepository`](crate::products::ProductRepository).

pub mod memory;

use std::sync::Arc;

use crate::config::{StorageBackend, StorageConfig};
use crate::products::ProductRepository;

pub use memory::InMemoryRepository;

/// Build the repository selected in configuration.
pub fn build_repository(config: &StorageConfig) -> Arc<dyn ProductRepository> {
    match config.backend {
        StorageBackend::Memory => {
            tracing::info!(backend = "memory", "Storage backend initialized");
            Arc::new(InMemoryRepository::new())
        }
    }
}
