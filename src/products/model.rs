//! Product entity.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A stored product.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Product {
    /// UUID v4, assigned once at creation.
    pub id: String,
    pub name: String,
}

impl Product {
    /// Create a product with a freshly generated identifier.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
        }
    }
}
