//! Product records.

use serde::{Deserialize, Serialize};

use searchgate_core::ProductId;

/// A stored product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
}

/// Body for creating or renaming a product.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductInput {
    pub name: String,
}

impl ProductInput {
    /// The trimmed name, or `None` if nothing is left.
    #[must_use]
    pub fn normalized_name(&self) -> Option<&str> {
        let name = self.name.trim();
        (!name.is_empty()).then_some(name)
    }
}
