use std::fmt::Display;

use serde::{Deserialize, Serialize};
use topup_common::Money;

use crate::db_types::{Order, OrderDetails, OrderStatusType, Role};

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

//--------------------------------------       Pagination      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    page: i64,
    page_size: i64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self { page: 1, page_size: DEFAULT_PAGE_SIZE }
    }
}

impl Pagination {
    /// Pages are 1-based. Missing or nonsensical values fall back to the first page and the default page size, and
    /// the page size is capped at [`MAX_PAGE_SIZE`].
    pub fn new(page: Option<i64>, page_size: Option<i64>) -> Self {
        let page = page.filter(|p| *p >= 1).unwrap_or(1);
        let page_size = page_size.filter(|s| *s >= 1).unwrap_or(DEFAULT_PAGE_SIZE).min(MAX_PAGE_SIZE);
        Self { page, page_size }
    }

    pub fn page(&self) -> i64 {
        self.page
    }

    pub fn page_size(&self) -> i64 {
        self.page_size
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.page_size)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationInfo {
    pub current_page: i64,
    pub total_pages: i64,
    pub total_items: i64,
    pub items_per_page: i64,
}

impl PaginationInfo {
    pub fn new(page: &Pagination, total_items: i64) -> Self {
        let size = page.page_size();
        let total_pages = (total_items + size - 1) / size;
        Self { current_page: page.page(), total_pages, total_items, items_per_page: size }
    }
}

/// One page of results, along with the metadata a client needs to fetch the others.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paged<T> {
    pub items: Vec<T>,
    pub pagination: PaginationInfo,
}

impl<T> Paged<T> {
    pub fn new(items: Vec<T>, page: &Pagination, total_items: i64) -> Self {
        Self { items, pagination: PaginationInfo::new(page, total_items) }
    }
}

//--------------------------------------    OrderQueryFilter   ---------------------------------------------------------
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderQueryFilter {
    pub user_id: Option<i64>,
    pub status: Option<OrderStatusType>,
    /// Case-insensitive substring matched against the owner's username, the player id and the product name.
    pub search: Option<String>,
}

impl OrderQueryFilter {
    pub fn with_user_id(mut self, user_id: i64) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_status(mut self, status: OrderStatusType) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_search<S: Into<String>>(mut self, search: S) -> Self {
        let search = search.into();
        if !search.trim().is_empty() {
            self.search = Some(search.trim().to_string());
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.user_id.is_none() && self.status.is_none() && self.search.is_none()
    }
}

impl Display for OrderQueryFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return write!(f, "All orders");
        }
        let mut parts = vec![];
        if let Some(id) = self.user_id {
            parts.push(format!("user_id: {id}"));
        }
        if let Some(status) = self.status {
            parts.push(format!("status: {status}"));
        }
        if let Some(search) = &self.search {
            parts.push(format!("search: '{search}'"));
        }
        write!(f, "{}", parts.join(", "))
    }
}

//--------------------------------------        Caller         ---------------------------------------------------------
/// The authenticated identity on whose behalf an operation is carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub user_id: i64,
    pub role: Role,
}

impl Caller {
    pub fn new(user_id: i64, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

//--------------------------------------   Order requests      ---------------------------------------------------------
/// A customer's request to buy a product. The amount is never supplied by the customer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceOrderRequest {
    pub product_id: Option<i64>,
    #[serde(default)]
    pub player_id: String,
    #[serde(default)]
    pub payment_method: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualOrderRequest {
    pub user_id: Option<i64>,
    pub product_id: Option<i64>,
    pub player_id: Option<String>,
    pub amount: Option<Money>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusUpdateRequest {
    #[serde(default)]
    pub status: String,
    pub transaction_id: Option<String>,
    pub notes: Option<String>,
    /// The version of the order the admin last saw. Optional, for backwards compatibility.
    pub version: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentReferenceRequest {
    #[serde(default)]
    pub transaction_id: String,
    pub payment_method: Option<String>,
}

/// The result of a successful customer order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedOrder {
    pub order: Order,
    pub product_name: String,
}

//--------------------------------------      Statistics       ---------------------------------------------------------
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStats {
    pub total_customers: i64,
    pub total_orders: i64,
    pub pending_orders: i64,
    pub completed_orders: i64,
    pub total_revenue: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub stats: OrderStats,
    pub recent_orders: Vec<OrderDetails>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PaymentMethodStat {
    pub payment_method: Option<String>,
    pub count: i64,
    pub total_amount: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct DailyRevenue {
    pub date: String,
    pub orders_count: i64,
    pub revenue: Money,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStats {
    pub payment_methods: Vec<PaymentMethodStat>,
    pub daily_revenue: Vec<DailyRevenue>,
}
