use std::fmt::Debug;

use log::*;

use crate::{
    api::{
        order_objects::{
            Caller,
            Dashboard,
            ManualOrderRequest,
            OrderQueryFilter,
            Paged,
            Pagination,
            PaymentReferenceRequest,
            PaymentStats,
            PlaceOrderRequest,
            PlacedOrder,
            StatusUpdateRequest,
        },
        payment_objects::GatewayPaymentCompleted,
    },
    db_types::{NewOrder, Order, OrderDetails, OrderStatusType, StatusUpdate},
    events::{EventProducers, OrderCompletedEvent},
    traits::{OrderFlowError, OrderManagement},
    validation::{is_blank, ValidationErrors},
};

const RECENT_ORDERS_COUNT: i64 = 10;
const PAYMENT_STATS_DAYS: u32 = 30;

/// `OrderFlowApi` is the primary API for the order lifecycle. It handles order creation by customers and admins,
/// status transitions, payment references and the payment gateway callback.
///
/// Access rules are enforced here, using the [`Caller`] supplied by the transport layer: customers only ever see or
/// touch their own orders.
pub struct OrderFlowApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn db_mut(&mut self) -> &mut B {
        &mut self.db
    }
}

impl<B> OrderFlowApi<B>
where B: OrderManagement
{
    /// A customer places an order for an active product.
    ///
    /// The order amount is the product's price at this moment; whatever happens to the product price afterwards, the
    /// order amount never changes. If the product does not exist, or is not active, nothing is written and
    /// [`OrderFlowError::ProductNotFound`] is returned.
    pub async fn place_order(&self, user_id: i64, request: PlaceOrderRequest) -> Result<PlacedOrder, OrderFlowError> {
        let mut errors = ValidationErrors::new();
        let product_id = request.product_id.filter(|id| *id > 0);
        errors.check(product_id.is_some(), "product_id", "Product ID must be a valid integer");
        errors.check(!is_blank(&request.player_id), "player_id", "Player ID is required");
        errors.check(!is_blank(&request.payment_method), "payment_method", "Payment method is required");
        errors.into_result()?;
        let product_id = product_id.ok_or(OrderFlowError::ProductNotFound(0))?;
        let order = NewOrder::new(user_id, product_id, request.player_id.trim().to_string(), Default::default())
            .with_payment_method(request.payment_method.trim().to_string())
            .with_notes(non_blank(request.notes));
        let placed = self
            .db
            .insert_order_for_active_product(order)
            .await?
            .ok_or(OrderFlowError::ProductNotFound(product_id))?;
        info!(
            "🔄️📦️ Order #{} placed by user #{user_id} for '{}' ({})",
            placed.order.id, placed.product_name, placed.order.amount
        );
        Ok(placed)
    }

    /// An admin creates an order on behalf of a user. The product's active flag is not checked, and the amount is
    /// taken from the request rather than the product price.
    pub async fn create_manual_order(&self, request: ManualOrderRequest) -> Result<Order, OrderFlowError> {
        let player_id = request.player_id.filter(|p| !is_blank(p));
        let (user_id, product_id, player_id, amount) =
            match (request.user_id, request.product_id, player_id, request.amount) {
                (Some(u), Some(p), Some(pid), Some(a)) => (u, p, pid, a),
                _ => return Err(ValidationErrors::general("Missing required fields").into()),
            };
        if !amount.is_positive() {
            return Err(ValidationErrors::new().with("amount", "Amount must be a positive number").into());
        }
        self.db.fetch_user(user_id).await?.ok_or(OrderFlowError::UserNotFound(user_id))?;
        self.db.fetch_product(product_id).await?.ok_or(OrderFlowError::ProductNotFound(product_id))?;
        let order = NewOrder::new(user_id, product_id, player_id.trim().to_string(), amount)
            .with_notes(non_blank(request.notes));
        let order = self.db.insert_order(order).await?;
        info!("🔄️📦️ Manual order #{} created for user #{user_id} ({})", order.id, order.amount);
        Ok(order)
    }

    /// The caller's own orders, optionally filtered by status.
    pub async fn my_orders(
        &self,
        user_id: i64,
        status: Option<&str>,
        page: Pagination,
    ) -> Result<Paged<OrderDetails>, OrderFlowError> {
        let mut query = OrderQueryFilter::default().with_user_id(user_id);
        if let Some(status) = parse_status_filter(status)? {
            query = query.with_status(status);
        }
        self.search_orders(query, page).await
    }

    /// All orders, optionally filtered by status and a free-text search over username, player id and product name.
    pub async fn all_orders(
        &self,
        status: Option<&str>,
        search: Option<String>,
        page: Pagination,
    ) -> Result<Paged<OrderDetails>, OrderFlowError> {
        let mut query = OrderQueryFilter::default();
        if let Some(status) = parse_status_filter(status)? {
            query = query.with_status(status);
        }
        if let Some(search) = search {
            query = query.with_search(search);
        }
        self.search_orders(query, page).await
    }

    pub async fn search_orders(
        &self,
        query: OrderQueryFilter,
        page: Pagination,
    ) -> Result<Paged<OrderDetails>, OrderFlowError> {
        trace!("🔄️📦️ Searching orders. {query}. Page {} ({} per page)", page.page(), page.page_size());
        self.db.search_orders(query, page).await
    }

    /// Fetch a single order. Admins can fetch any order; customers only their own.
    ///
    /// A customer asking for someone else's order gets [`OrderFlowError::AccessDenied`], which is distinct from
    /// [`OrderFlowError::OrderNotFound`].
    pub async fn order_for_caller(&self, caller: Caller, id: i64) -> Result<OrderDetails, OrderFlowError> {
        let order = self.db.fetch_order_details(id).await?.ok_or(OrderFlowError::OrderNotFound(id))?;
        if caller.is_admin() || order.order.user_id == caller.user_id {
            Ok(order)
        } else {
            warn!("🔄️📦️ User #{} tried to access order #{id}, which belongs to someone else", caller.user_id);
            Err(OrderFlowError::AccessDenied)
        }
    }

    /// Admin status change. Any of the three statuses may be set, whatever the current status is.
    pub async fn update_order_status(&self, id: i64, request: StatusUpdateRequest) -> Result<Order, OrderFlowError> {
        let status = request.status.trim().parse::<OrderStatusType>().map_err(|_| {
            OrderFlowError::ValidationError(ValidationErrors::new().with("status", "Invalid status"))
        })?;
        let mut update = StatusUpdate::new(status);
        if let Some(txid) = non_blank(request.transaction_id) {
            update = update.with_transaction_id(txid);
        }
        if let Some(notes) = non_blank(request.notes) {
            update = update.with_notes(notes);
        }
        if let Some(version) = request.version {
            update = update.with_expected_version(version);
        }
        let order = self.db.update_order_status(id, update).await?.ok_or(OrderFlowError::OrderNotFound(id))?;
        info!("🔄️📦️ Order #{id} status set to {status} (version {})", order.version);
        if status == OrderStatusType::Completed {
            self.call_order_completed_hook(&order).await;
        }
        Ok(order)
    }

    /// A customer attaches the reference of the payment they made. The status is left as it is, since the payment
    /// still needs to be confirmed by an admin or the gateway.
    pub async fn attach_payment_reference(
        &self,
        user_id: i64,
        id: i64,
        request: PaymentReferenceRequest,
    ) -> Result<Order, OrderFlowError> {
        if is_blank(&request.transaction_id) {
            return Err(ValidationErrors::new().with("transaction_id", "Transaction ID is required").into());
        }
        let order = self
            .db
            .attach_payment_reference(
                id,
                user_id,
                request.transaction_id.trim().to_string(),
                non_blank(request.payment_method),
            )
            .await?
            .ok_or(OrderFlowError::OrderNotFound(id))?;
        debug!("🔄️💰️ Payment reference attached to order #{id} by user #{user_id}");
        Ok(order)
    }

    /// Apply a verified payment notification from the payment gateway.
    ///
    /// Returns `None` if there is no order with the given id; this is not an error, since the gateway may well report
    /// payments that are unrelated to this store. A concurrent modification of the order is retried once.
    pub async fn process_gateway_payment(
        &self,
        payment: GatewayPaymentCompleted,
    ) -> Result<Option<Order>, OrderFlowError> {
        let GatewayPaymentCompleted { order_id, payment_reference } = payment;
        let result = match self.db.complete_order(order_id, payment_reference.clone()).await {
            Err(OrderFlowError::VersionConflict { .. }) => {
                debug!("🔄️💰️ Order #{order_id} changed while applying gateway payment. Retrying.");
                self.db.complete_order(order_id, payment_reference).await?
            },
            other => other?,
        };
        match &result {
            Some(order) => {
                info!("🔄️💰️ Order #{order_id} completed by payment gateway. Reference {:?}", order.transaction_id);
                self.call_order_completed_hook(order).await;
            },
            None => info!("🔄️💰️ Payment gateway reported a payment for unknown order #{order_id}. Ignoring."),
        }
        Ok(result)
    }

    pub async fn delete_order(&self, id: i64) -> Result<(), OrderFlowError> {
        if self.db.delete_order(id).await? {
            info!("🔄️📦️ Order #{id} deleted");
            Ok(())
        } else {
            Err(OrderFlowError::OrderNotFound(id))
        }
    }

    pub async fn dashboard(&self) -> Result<Dashboard, OrderFlowError> {
        let stats = self.db.order_stats().await?;
        let recent = self.db.search_orders(OrderQueryFilter::default(), Pagination::new(None, Some(RECENT_ORDERS_COUNT)));
        let recent_orders = recent.await?.items;
        Ok(Dashboard { stats, recent_orders })
    }

    pub async fn payment_stats(&self) -> Result<PaymentStats, OrderFlowError> {
        self.db.payment_stats(PAYMENT_STATS_DAYS).await
    }

    async fn call_order_completed_hook(&self, order: &Order) {
        for emitter in &self.producers.order_completed_producer {
            debug!("🔄️📦️ Notifying order completed hook subscribers");
            let event = OrderCompletedEvent::new(order.clone());
            emitter.publish_event(event).await;
        }
    }
}

/// `None` and `"all"` mean no status filter. Anything else must be a valid status.
pub fn parse_status_filter(status: Option<&str>) -> Result<Option<OrderStatusType>, OrderFlowError> {
    match status.map(str::trim) {
        None | Some("") | Some("all") => Ok(None),
        Some(s) => s
            .parse::<OrderStatusType>()
            .map(Some)
            .map_err(|_| ValidationErrors::new().with("status", format!("Invalid status filter: {s}")).into()),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
