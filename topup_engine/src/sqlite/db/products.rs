use log::*;
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    db_types::{NewProduct, Product, ProductUpdate},
    traits::CatalogError,
    validation::ValidationErrors,
};

pub async fn fetch_product(id: i64, conn: &mut SqliteConnection) -> Result<Option<Product>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM products WHERE id = $1").bind(id).fetch_optional(conn).await
}

pub async fn fetch_active_product(id: i64, conn: &mut SqliteConnection) -> Result<Option<Product>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM products WHERE id = $1 AND is_active = TRUE").bind(id).fetch_optional(conn).await
}

pub async fn fetch_active_products(conn: &mut SqliteConnection) -> Result<Vec<Product>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM products WHERE is_active = TRUE ORDER BY category, name").fetch_all(conn).await
}

pub async fn fetch_all_products(conn: &mut SqliteConnection) -> Result<Vec<Product>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM products ORDER BY created_at DESC, id DESC").fetch_all(conn).await
}

pub async fn insert_product(product: NewProduct, conn: &mut SqliteConnection) -> Result<Product, CatalogError> {
    let price = product.price.ok_or_else(|| ValidationErrors::new().with("price", "Price is required"))?;
    let product = sqlx::query_as(
        r#"
            INSERT INTO products (name, description, price, category)
            VALUES ($1, $2, $3, $4)
            RETURNING *;
        "#,
    )
    .bind(product.name)
    .bind(product.description)
    .bind(price)
    .bind(product.category)
    .fetch_one(conn)
    .await?;
    Ok(product)
}

/// Returns `None` if the product does not exist. `update` must not be empty.
pub async fn update_product(
    id: i64,
    update: ProductUpdate,
    conn: &mut SqliteConnection,
) -> Result<Option<Product>, sqlx::Error> {
    let mut builder = QueryBuilder::new("UPDATE products SET updated_at = CURRENT_TIMESTAMP, ");
    let mut set_clause = builder.separated(", ");
    if let Some(name) = update.name {
        set_clause.push("name = ");
        set_clause.push_bind_unseparated(name);
    }
    if let Some(description) = update.description {
        set_clause.push("description = ");
        set_clause.push_bind_unseparated(description);
    }
    if let Some(price) = update.price {
        set_clause.push("price = ");
        set_clause.push_bind_unseparated(price);
    }
    if let Some(category) = update.category {
        set_clause.push("category = ");
        set_clause.push_bind_unseparated(category);
    }
    if let Some(active) = update.is_active {
        set_clause.push("is_active = ");
        set_clause.push_bind_unseparated(active);
    }
    builder.push(" WHERE id = ");
    builder.push_bind(id);
    builder.push(" RETURNING *");
    trace!("🗃️ Executing query: {}", builder.sql());
    builder.build_query_as::<Product>().fetch_optional(conn).await
}

pub async fn count_orders_for_product(id: i64, conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE product_id = $1").bind(id).fetch_one(conn).await
}

/// Hard-deletes the product. Not atomic with respect to the order check; call inside a transaction.
pub async fn delete_product(id: i64, conn: &mut SqliteConnection) -> Result<(), CatalogError> {
    if count_orders_for_product(id, &mut *conn).await? > 0 {
        debug!("🗃️ Product #{id} has orders and cannot be deleted");
        return Err(CatalogError::ProductHasOrders(id));
    }
    let result = sqlx::query("DELETE FROM products WHERE id = $1").bind(id).execute(conn).await?;
    if result.rows_affected() == 0 {
        return Err(CatalogError::ProductNotFound(id));
    }
    Ok(())
}
