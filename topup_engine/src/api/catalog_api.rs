use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{NewProduct, Product, ProductUpdate},
    traits::{CatalogError, CatalogManagement},
    validation::{is_blank, ValidationErrors},
};

/// Read and write access to the product catalog.
pub struct CatalogApi<B> {
    db: B,
}

impl<B: Debug> Debug for CatalogApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CatalogApi ({:?})", self.db)
    }
}

impl<B> CatalogApi<B>
where B: CatalogManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub async fn active_products(&self) -> Result<Vec<Product>, CatalogError> {
        self.db.fetch_active_products().await
    }

    /// Inactive products are invisible here, exactly as if they did not exist.
    pub async fn active_product(&self, id: i64) -> Result<Product, CatalogError> {
        self.db.fetch_active_product(id).await?.ok_or(CatalogError::ProductNotFound(id))
    }

    pub async fn all_products(&self) -> Result<Vec<Product>, CatalogError> {
        self.db.fetch_all_products().await
    }

    pub async fn create_product(&self, product: NewProduct) -> Result<Product, CatalogError> {
        let mut errors = ValidationErrors::new();
        errors.check(!is_blank(&product.name), "name", "Product name is required");
        errors.check(!is_blank(&product.category), "category", "Category is required");
        match product.price {
            None => errors.add("price", "Price is required"),
            Some(p) => errors.check(!p.is_negative(), "price", "Price must be a positive number"),
        }
        errors.into_result()?;
        let product = NewProduct {
            name: product.name.trim().to_string(),
            category: product.category.trim().to_string(),
            description: product.description.map(|d| d.trim().to_string()).filter(|d| !d.is_empty()),
            price: product.price,
        };
        let product = self.db.insert_product(product).await?;
        info!("🛒️ Product #{} '{}' created at {}", product.id, product.name, product.price);
        Ok(product)
    }

    pub async fn update_product(&self, id: i64, update: ProductUpdate) -> Result<Product, CatalogError> {
        if update.is_empty() {
            return Err(ValidationErrors::general("No valid fields to update").into());
        }
        let mut errors = ValidationErrors::new();
        if let Some(name) = &update.name {
            errors.check(!is_blank(name), "name", "Product name cannot be empty");
        }
        if let Some(category) = &update.category {
            errors.check(!is_blank(category), "category", "Category cannot be empty");
        }
        if let Some(price) = update.price {
            errors.check(!price.is_negative(), "price", "Price must be a positive number");
        }
        errors.into_result()?;
        let update = ProductUpdate {
            name: update.name.map(|n| n.trim().to_string()),
            category: update.category.map(|c| c.trim().to_string()),
            ..update
        };
        let product = self.db.update_product(id, update).await?.ok_or(CatalogError::ProductNotFound(id))?;
        info!("🛒️ Product #{id} updated. Price {}, active: {}", product.price, product.is_active);
        Ok(product)
    }

    pub async fn delete_product(&self, id: i64) -> Result<(), CatalogError> {
        self.db.delete_product(id).await?;
        info!("🛒️ Product #{id} deleted");
        Ok(())
    }
}
