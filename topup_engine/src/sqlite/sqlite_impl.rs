//! `SqliteDatabase` is the SQLite implementation of every backend trait in [`crate::traits`].
use std::{collections::BTreeMap, fmt::Debug};

use log::*;
use sqlx::{migrate::MigrateError, SqlitePool};

use super::db::{db_url, new_pool, orders, products, settings, users};
use crate::{
    api::order_objects::{OrderQueryFilter, OrderStats, Paged, Pagination, PaymentStats, PlacedOrder},
    db_types::{
        CustomerSummary,
        NewOrder,
        NewProduct,
        NewUser,
        Order,
        OrderDetails,
        Product,
        ProductUpdate,
        ProfileUpdate,
        SiteSetting,
        StatusUpdate,
        User,
    },
    traits::{
        AuthApiError,
        CatalogError,
        CatalogManagement,
        OrderFlowError,
        OrderManagement,
        SettingsError,
        SettingsManagement,
        UserManagement,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SqliteDatabase ({})", self.url)
    }
}

impl CatalogManagement for SqliteDatabase {
    async fn fetch_product(&self, id: i64) -> Result<Option<Product>, CatalogError> {
        let mut conn = self.pool.acquire().await?;
        Ok(products::fetch_product(id, &mut conn).await?)
    }

    async fn fetch_active_product(&self, id: i64) -> Result<Option<Product>, CatalogError> {
        let mut conn = self.pool.acquire().await?;
        Ok(products::fetch_active_product(id, &mut conn).await?)
    }

    async fn fetch_active_products(&self) -> Result<Vec<Product>, CatalogError> {
        let mut conn = self.pool.acquire().await?;
        Ok(products::fetch_active_products(&mut conn).await?)
    }

    async fn fetch_all_products(&self) -> Result<Vec<Product>, CatalogError> {
        let mut conn = self.pool.acquire().await?;
        Ok(products::fetch_all_products(&mut conn).await?)
    }

    async fn insert_product(&self, product: NewProduct) -> Result<Product, CatalogError> {
        let mut tx = self.pool.begin().await?;
        let product = products::insert_product(product, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Product #{} saved", product.id);
        Ok(product)
    }

    async fn update_product(&self, id: i64, update: ProductUpdate) -> Result<Option<Product>, CatalogError> {
        let mut tx = self.pool.begin().await?;
        let product = products::update_product(id, update, &mut tx).await?;
        tx.commit().await?;
        Ok(product)
    }

    async fn delete_product(&self, id: i64) -> Result<(), CatalogError> {
        let mut tx = self.pool.begin().await?;
        products::delete_product(id, &mut tx).await?;
        tx.commit().await?;
        Ok(())
    }
}

impl UserManagement for SqliteDatabase {
    async fn fetch_user(&self, id: i64) -> Result<Option<User>, AuthApiError> {
        let mut conn = self.pool.acquire().await?;
        Ok(users::fetch_user(id, &mut conn).await?)
    }

    async fn fetch_user_by_username(&self, username: &str) -> Result<Option<User>, AuthApiError> {
        let mut conn = self.pool.acquire().await?;
        Ok(users::fetch_user_by_username(username, &mut conn).await?)
    }

    async fn username_or_email_exists(&self, username: &str, email: &str) -> Result<bool, AuthApiError> {
        let mut conn = self.pool.acquire().await?;
        Ok(users::username_or_email_exists(username, email, &mut conn).await?)
    }

    async fn insert_user(&self, user: NewUser) -> Result<User, AuthApiError> {
        let mut tx = self.pool.begin().await?;
        let user = users::insert_user(user, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ User #{} '{}' saved with role {}", user.id, user.username, user.role);
        Ok(user)
    }

    async fn update_profile(&self, id: i64, update: ProfileUpdate) -> Result<Option<User>, AuthApiError> {
        let mut tx = self.pool.begin().await?;
        let user = users::update_profile(id, update, &mut tx).await?;
        tx.commit().await?;
        Ok(user)
    }

    async fn fetch_customers(
        &self,
        search: Option<String>,
        page: Pagination,
    ) -> Result<Paged<CustomerSummary>, AuthApiError> {
        let mut conn = self.pool.acquire().await?;
        Ok(users::fetch_customers(search, page, &mut conn).await?)
    }

    async fn count_customers(&self) -> Result<i64, AuthApiError> {
        let mut conn = self.pool.acquire().await?;
        Ok(users::count_customers(&mut conn).await?)
    }
}

impl OrderManagement for SqliteDatabase {
    /// The product lookup and the insert happen in one transaction, so the amount is exactly the price that was
    /// current when the order was written.
    async fn insert_order_for_active_product(&self, order: NewOrder) -> Result<Option<PlacedOrder>, OrderFlowError> {
        let mut tx = self.pool.begin().await?;
        let Some(product) = products::fetch_active_product(order.product_id, &mut tx).await? else {
            debug!("🗃️ Product #{} is missing or inactive. No order written.", order.product_id);
            return Ok(None);
        };
        let order = NewOrder { amount: product.price, ..order };
        let order = orders::insert_order(order, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Order #{} saved for product #{} at {}", order.id, product.id, order.amount);
        Ok(Some(PlacedOrder { order, product_name: product.name }))
    }

    async fn insert_order(&self, order: NewOrder) -> Result<Order, OrderFlowError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::insert_order(order, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Order #{} saved", order.id);
        Ok(order)
    }

    async fn fetch_order(&self, id: i64) -> Result<Option<Order>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_order(id, &mut conn).await?)
    }

    async fn fetch_order_details(&self, id: i64) -> Result<Option<OrderDetails>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_order_details(id, &mut conn).await?)
    }

    async fn search_orders(
        &self,
        query: OrderQueryFilter,
        page: Pagination,
    ) -> Result<Paged<OrderDetails>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::search_orders(query, page, &mut conn).await?)
    }

    async fn update_order_status(&self, id: i64, update: StatusUpdate) -> Result<Option<Order>, OrderFlowError> {
        let expected = update.expected_version;
        let mut tx = self.pool.begin().await?;
        let order = orders::update_order_status(id, update, &mut tx).await?;
        tx.commit().await.map_err(|e| orders::conflict_if_busy(e, id, expected))?;
        Ok(order)
    }

    async fn attach_payment_reference(
        &self,
        id: i64,
        user_id: i64,
        transaction_id: String,
        payment_method: Option<String>,
    ) -> Result<Option<Order>, OrderFlowError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::attach_payment_reference(id, user_id, transaction_id, payment_method, &mut tx).await?;
        tx.commit().await?;
        Ok(order)
    }

    async fn complete_order(&self, id: i64, payment_reference: String) -> Result<Option<Order>, OrderFlowError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::complete_order(id, payment_reference, &mut tx).await?;
        tx.commit().await.map_err(|e| orders::conflict_if_busy(e, id, None))?;
        Ok(order)
    }

    async fn delete_order(&self, id: i64) -> Result<bool, OrderFlowError> {
        let mut tx = self.pool.begin().await?;
        let deleted = orders::delete_order(id, &mut tx).await?;
        tx.commit().await?;
        Ok(deleted)
    }

    async fn order_stats(&self) -> Result<OrderStats, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        let stats = orders::order_stats(&mut conn).await?;
        let total_customers = users::count_customers(&mut conn).await?;
        Ok(OrderStats { total_customers, ..stats })
    }

    async fn payment_stats(&self, days: u32) -> Result<PaymentStats, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        let payment_methods = orders::payment_method_stats(&mut conn).await?;
        let daily_revenue = orders::daily_revenue(days, &mut conn).await?;
        Ok(PaymentStats { payment_methods, daily_revenue })
    }
}

impl SettingsManagement for SqliteDatabase {
    async fn fetch_settings(&self) -> Result<Vec<SiteSetting>, SettingsError> {
        let mut conn = self.pool.acquire().await?;
        Ok(settings::fetch_settings(&mut conn).await?)
    }

    async fn upsert_settings(&self, values: BTreeMap<String, String>) -> Result<(), SettingsError> {
        let mut tx = self.pool.begin().await?;
        for (key, value) in &values {
            settings::upsert_setting(key, value, &mut tx).await?;
        }
        tx.commit().await?;
        trace!("🗃️ {} settings saved", values.len());
        Ok(())
    }

    async fn delete_setting(&self, key: &str) -> Result<bool, SettingsError> {
        let mut tx = self.pool.begin().await?;
        let deleted = settings::delete_setting(key, &mut tx).await?;
        tx.commit().await?;
        Ok(deleted)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object, using the URL in `TOPUP_DATABASE_URL` or the default.
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("🗃️ Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Brings the schema up to date using the migrations embedded in the binary.
    pub async fn run_migrations(&self) -> Result<(), MigrateError> {
        sqlx::migrate!("./src/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Database migrations are up to date");
        Ok(())
    }
}
