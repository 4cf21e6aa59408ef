use thiserror::Error;

use crate::{
    db_types::{NewProduct, Product, ProductUpdate},
    validation::ValidationErrors,
};

#[derive(Debug, Clone, Error)]
pub enum CatalogError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Invalid product data. {0}")]
    ValidationError(ValidationErrors),
    #[error("Product not found: {0}")]
    ProductNotFound(i64),
    #[error("Cannot delete product with existing orders. Deactivate instead.")]
    ProductHasOrders(i64),
}

impl From<sqlx::Error> for CatalogError {
    fn from(e: sqlx::Error) -> Self {
        CatalogError::DatabaseError(e.to_string())
    }
}

impl From<ValidationErrors> for CatalogError {
    fn from(e: ValidationErrors) -> Self {
        CatalogError::ValidationError(e)
    }
}

/// Storage for the product catalog.
///
/// Products are never checked for validity here; that is the job of [`CatalogApi`](crate::CatalogApi).
#[allow(async_fn_in_trait)]
pub trait CatalogManagement {
    /// Fetches a product regardless of whether it is active.
    async fn fetch_product(&self, id: i64) -> Result<Option<Product>, CatalogError>;

    /// Fetches a product only if it is currently active (purchasable).
    async fn fetch_active_product(&self, id: i64) -> Result<Option<Product>, CatalogError>;

    /// All active products, ordered by category and then name.
    async fn fetch_active_products(&self) -> Result<Vec<Product>, CatalogError>;

    /// All products, newest first.
    async fn fetch_all_products(&self) -> Result<Vec<Product>, CatalogError>;

    async fn insert_product(&self, product: NewProduct) -> Result<Product, CatalogError>;

    /// Applies the update and returns the modified product, or `None` if no product with the given id exists.
    async fn update_product(&self, id: i64, update: ProductUpdate) -> Result<Option<Product>, CatalogError>;

    /// Deletes the product.
    ///
    /// Backends must refuse with [`CatalogError::ProductHasOrders`] if any order references the product, and return
    /// [`CatalogError::ProductNotFound`] if it does not exist.
    async fn delete_product(&self, id: i64) -> Result<(), CatalogError>;
}
