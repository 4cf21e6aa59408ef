use std::{collections::BTreeMap, fmt::Display};

use serde::{Deserialize, Serialize};
use topup_common::Money;
use topup_engine::{
    db_types::{CustomerSummary, Order, OrderDetails, OrderStatusType, Product, Role, User},
    order_objects::{Paged, Pagination, PaginationInfo, PlacedOrder},
    payment_objects::GatewayPaymentCompleted,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub message: String,
}

impl JsonResponse {
    pub fn new<S: Display>(message: S) -> Self {
        Self { message: message.to_string() }
    }
}

//--------------------------------------     Query params      ---------------------------------------------------------
/// Query string parameters shared by the paginated listing endpoints. Anything that does not parse is treated as
/// absent rather than rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListParams {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub status: Option<String>,
    pub search: Option<String>,
}

impl ListParams {
    pub fn pagination(&self) -> Pagination {
        let parse = |v: &Option<String>| v.as_deref().and_then(|s| s.trim().parse::<i64>().ok());
        Pagination::new(parse(&self.page), parse(&self.limit))
    }

    pub fn search(&self) -> Option<String> {
        self.search.as_ref().map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
    }
}

//--------------------------------------       Accounts        ---------------------------------------------------------
/// The user fields returned to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub player_id: String,
    pub phone: Option<String>,
    pub role: Role,
}

impl From<User> for UserInfo {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            player_id: user.player_id,
            phone: user.phone,
            role: user.role,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub message: String,
    pub token: String,
    pub user: UserInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub user: UserInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerList {
    pub customers: Vec<CustomerSummary>,
    pub pagination: PaginationInfo,
}

impl From<Paged<CustomerSummary>> for CustomerList {
    fn from(page: Paged<CustomerSummary>) -> Self {
        Self { customers: page.items, pagination: page.pagination }
    }
}

//--------------------------------------        Orders         ---------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderList {
    pub orders: Vec<OrderDetails>,
    pub pagination: PaginationInfo,
}

impl From<Paged<OrderDetails>> for OrderList {
    fn from(page: Paged<OrderDetails>) -> Self {
        Self { orders: page.items, pagination: page.pagination }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderResponse<T> {
    pub order: T,
}

/// Returned when a customer places an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacedOrderResponse {
    pub message: String,
    pub order: PlacedOrderInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacedOrderInfo {
    pub id: i64,
    pub product_name: String,
    pub amount: Money,
    pub status: OrderStatusType,
    pub player_id: String,
    pub payment_method: Option<String>,
    pub version: i64,
}

impl From<PlacedOrder> for PlacedOrderInfo {
    fn from(placed: PlacedOrder) -> Self {
        let PlacedOrder { order, product_name } = placed;
        Self {
            id: order.id,
            product_name,
            amount: order.amount,
            status: order.status,
            player_id: order.player_id,
            payment_method: order.payment_method,
            version: order.version,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualOrderResponse {
    pub message: String,
    pub order_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdateResponse {
    pub message: String,
    pub order: Order,
}

//--------------------------------------       Products        ---------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductsResponse {
    pub products: Vec<Product>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub product: Product,
}

//--------------------------------------       Settings        ---------------------------------------------------------
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsBody<T> {
    pub settings: T,
}

/// The body of a bulk settings update. A missing `settings` object is reported as a validation error by the API.
pub type SettingsUpdate = SettingsBody<Option<BTreeMap<String, String>>>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingValue {
    pub value: Option<String>,
}

//--------------------------------------       Payments        ---------------------------------------------------------
/// The notification the bKash gateway posts to the webhook. Every field is optional, so that a payload we do not fully
/// understand can still be acknowledged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BkashWebhookPayload {
    #[serde(rename = "paymentID")]
    pub payment_id: Option<String>,
    pub status: Option<String>,
    pub amount: Option<serde_json::Value>,
    pub currency: Option<String>,
    /// Our order id. Gateways send it either as a string or as a number.
    pub merchant_invoice_number: Option<serde_json::Value>,
    pub transaction_status: Option<String>,
}

const COMPLETED: &str = "Completed";

impl BkashWebhookPayload {
    pub fn is_completed(&self) -> bool {
        self.status.as_deref() == Some(COMPLETED) && self.transaction_status.as_deref() == Some(COMPLETED)
    }

    /// Converts the payload into a verified payment, if it reports a completed payment for one of our orders.
    pub fn completed_payment(&self) -> Option<GatewayPaymentCompleted> {
        if !self.is_completed() {
            return None;
        }
        let order_id = match self.merchant_invoice_number.as_ref()? {
            serde_json::Value::String(s) => s.trim().parse::<i64>().ok()?,
            serde_json::Value::Number(n) => n.as_i64()?,
            _ => return None,
        };
        let reference = self.payment_id.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
        Some(GatewayPaymentCompleted::new(order_id, reference))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMethodsResponse<T> {
    pub payment_methods: Vec<T>,
}
