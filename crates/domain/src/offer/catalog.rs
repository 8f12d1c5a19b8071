//! Product catalog contract and in-memory implementation.
//!
//! The catalog is owned by another part of the system; the offer engine
//! only reads price and reference from it.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::ProductId;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::DomainError;

use super::Money;

/// Snapshot of a catalog product at the time an offer was made.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,

    /// Human-readable title, used in notifications.
    pub title: String,

    /// List price.
    pub price: Money,

    /// Merchant reference printed on coupons, if the product has one.
    pub reference: Option<String>,
}

impl Product {
    /// Creates a new product snapshot.
    pub fn new(
        id: impl Into<ProductId>,
        title: impl Into<String>,
        price: Money,
        reference: Option<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            price,
            reference,
        }
    }
}

/// Read access to the product catalog.
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    /// Looks up a product, returning None if it doesn't exist.
    async fn get_product(&self, product_id: &ProductId) -> Result<Option<Product>, DomainError>;
}

/// In-memory catalog for tests and local runs.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProductCatalog {
    products: Arc<RwLock<HashMap<ProductId, Product>>>,
}

impl InMemoryProductCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a product.
    pub async fn insert(&self, product: Product) {
        self.products
            .write()
            .await
            .insert(product.id.clone(), product);
    }
}

#[async_trait]
impl ProductCatalog for InMemoryProductCatalog {
    async fn get_product(&self, product_id: &ProductId) -> Result<Option<Product>, DomainError> {
        Ok(self.products.read().await.get(product_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn insert_and_get() {
        let catalog = InMemoryProductCatalog::new();
        catalog
            .insert(Product::new(
                "64f1a2b3c4d5",
                "Roadster 2019",
                Money::from_cents(10000),
                Some("RD19".to_string()),
            ))
            .await;

        let product = catalog
            .get_product(&ProductId::new("64f1a2b3c4d5"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(product.price.cents(), 10000);
        assert_eq!(product.reference.as_deref(), Some("RD19"));
    }

    #[tokio::test]
    async fn unknown_product_is_none() {
        let catalog = InMemoryProductCatalog::new();
        assert!(catalog
            .get_product(&ProductId::new("missing"))
            .await
            .unwrap()
            .is_none());
    }
}
