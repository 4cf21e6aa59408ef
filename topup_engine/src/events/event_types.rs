use serde::{Deserialize, Serialize};

use crate::db_types::Order;

/// Published whenever an order moves into the `completed` state, whether by an admin or the payment gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCompletedEvent {
    pub order: Order,
}

impl OrderCompletedEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventType {
    OrderCompleted(OrderCompletedEvent),
}
