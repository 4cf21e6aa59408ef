use thiserror::Error;

use crate::{
    api::order_objects::{OrderQueryFilter, OrderStats, PaymentStats, Paged, Pagination, PlacedOrder},
    db_types::{NewOrder, Order, OrderDetails, StatusUpdate},
    traits::{AuthApiError, CatalogError, CatalogManagement, UserManagement},
    validation::ValidationErrors,
};

#[derive(Debug, Clone, Error)]
pub enum OrderFlowError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Invalid order request. {0}")]
    ValidationError(ValidationErrors),
    #[error("Product not found or inactive: {0}")]
    ProductNotFound(i64),
    #[error("User not found: {0}")]
    UserNotFound(i64),
    #[error("Order not found: {0}")]
    OrderNotFound(i64),
    #[error("Access denied")]
    AccessDenied,
    #[error("Order {id} has been modified by someone else. Expected version {expected}, but it is at version {actual}.")]
    VersionConflict { id: i64, expected: i64, actual: i64 },
}

impl From<sqlx::Error> for OrderFlowError {
    fn from(e: sqlx::Error) -> Self {
        OrderFlowError::DatabaseError(e.to_string())
    }
}

impl From<ValidationErrors> for OrderFlowError {
    fn from(e: ValidationErrors) -> Self {
        OrderFlowError::ValidationError(e)
    }
}

impl From<CatalogError> for OrderFlowError {
    fn from(e: CatalogError) -> Self {
        match e {
            CatalogError::ProductNotFound(id) => OrderFlowError::ProductNotFound(id),
            other => OrderFlowError::DatabaseError(other.to_string()),
        }
    }
}

impl From<AuthApiError> for OrderFlowError {
    fn from(e: AuthApiError) -> Self {
        match e {
            AuthApiError::UserNotFound(id) => OrderFlowError::UserNotFound(id),
            other => OrderFlowError::DatabaseError(other.to_string()),
        }
    }
}

/// The `OrderManagement` trait defines the storage behaviour behind the order lifecycle.
///
/// Orders snapshot product prices and reference their owners, so order backends must also be able to read the catalog
/// and users.
///
/// Every method that mutates an order must refresh `updated_at` and increment `version`.
#[allow(async_fn_in_trait)]
pub trait OrderManagement: CatalogManagement + UserManagement {
    /// Atomically reads the product, and if it exists *and is active*, inserts a new `pending` order whose amount is
    /// the product's current price. `order.amount` is ignored.
    ///
    /// Returns `None` (and writes nothing) if the product is missing or inactive.
    async fn insert_order_for_active_product(&self, order: NewOrder) -> Result<Option<PlacedOrder>, OrderFlowError>;

    /// Inserts a new `pending` order with the amount given in `order`. No product or user checks are made.
    async fn insert_order(&self, order: NewOrder) -> Result<Order, OrderFlowError>;

    async fn fetch_order(&self, id: i64) -> Result<Option<Order>, OrderFlowError>;

    /// Fetches the order along with its owner and product details.
    async fn fetch_order_details(&self, id: i64) -> Result<Option<OrderDetails>, OrderFlowError>;

    /// Fetches a page of orders matching the filter, newest first (ties broken by id, descending).
    async fn search_orders(
        &self,
        query: OrderQueryFilter,
        page: Pagination,
    ) -> Result<Paged<OrderDetails>, OrderFlowError>;

    /// Applies the status update. Returns `None` if the order does not exist.
    ///
    /// If `update.expected_version` is set and does not match, or the order is locked by another writer for too long,
    /// [`OrderFlowError::VersionConflict`] is returned and the order is left untouched.
    async fn update_order_status(&self, id: i64, update: StatusUpdate) -> Result<Option<Order>, OrderFlowError>;

    /// Sets the transaction id (and payment method, if given) on an order, but only if it belongs to `user_id`.
    /// Returns `None` if there is no such order for the user. The status is not changed.
    async fn attach_payment_reference(
        &self,
        id: i64,
        user_id: i64,
        transaction_id: String,
        payment_method: Option<String>,
    ) -> Result<Option<Order>, OrderFlowError>;

    /// Marks the order as completed with the given payment reference, in one atomic write. Returns `None` if the order
    /// does not exist. If the backend cannot get hold of the order in time, [`OrderFlowError::VersionConflict`] is
    /// returned and the caller may try again.
    async fn complete_order(&self, id: i64, payment_reference: String) -> Result<Option<Order>, OrderFlowError>;

    /// Deletes the order. Returns false if it did not exist.
    async fn delete_order(&self, id: i64) -> Result<bool, OrderFlowError>;

    /// Order counts and total revenue, for the admin dashboard.
    async fn order_stats(&self) -> Result<OrderStats, OrderFlowError>;

    /// Completed-order totals per payment method, and daily revenue over the last `days` days.
    async fn payment_stats(&self, days: u32) -> Result<PaymentStats, OrderFlowError>;
}
