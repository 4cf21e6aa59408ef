use serde::{Deserialize, Serialize};

/// A payment that the gateway has reported as complete, after its origin has been verified.
///
/// This is the only form in which gateway notifications reach the order flow. Raw gateway payloads are parsed and
/// checked by the server before being converted into this type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayPaymentCompleted {
    pub order_id: i64,
    /// The gateway's own reference for the payment. It is stored as the order's transaction id.
    pub payment_reference: String,
}

impl GatewayPaymentCompleted {
    pub fn new<S: Into<String>>(order_id: i64, payment_reference: S) -> Self {
        Self { order_id, payment_reference: payment_reference.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMethodInfo {
    pub id: String,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub enabled: bool,
}

impl PaymentMethodInfo {
    fn new(id: &str, name: &str, description: &str, icon: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            icon: icon.to_string(),
            enabled: true,
        }
    }
}

/// The payment methods customers can choose from when placing an order.
pub fn supported_payment_methods() -> Vec<PaymentMethodInfo> {
    vec![
        PaymentMethodInfo::new("bkash", "bKash", "Mobile financial service", "📱"),
        PaymentMethodInfo::new("nagad", "Nagad", "Mobile financial service", "📱"),
        PaymentMethodInfo::new("rocket", "Rocket", "Mobile financial service", "📱"),
        PaymentMethodInfo::new("bank_transfer", "Bank Transfer", "Direct bank transfer", "🏦"),
    ]
}
