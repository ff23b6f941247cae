//! Product domain: entity, storage port and endpoint handlers.

pub mod handlers;
pub mod model;
pub mod repository;

pub use handlers::{
    probe_url, CreateProductHandler, CreateProductRequest, CreateProductResponse, GetProductHandler,
    GetProductRequest, GetProductResponse,
};
pub use model::Product;
pub use repository::{ProductRepository, RepositoryError};
