use cucumber::{then, when};
use topup_common::Money;
use topup_engine::{
    db_types::{Order, OrderStatusType, ProductUpdate},
    order_objects::{
        Caller,
        ManualOrderRequest,
        Pagination,
        PaymentReferenceRequest,
        PlaceOrderRequest,
        StatusUpdateRequest,
    },
    payment_objects::GatewayPaymentCompleted,
    CatalogManagement,
    OrderFlowError,
    OrderManagement,
};

use crate::cucumber::TopupWorld;

#[when(expr = "{string} orders {string} for player {string} paying with {string}")]
async fn place_order(world: &mut TopupWorld, user: String, product: String, player: String, method: String) {
    customer_order(world, &user, &product, player, method).await;
}

async fn customer_order(world: &mut TopupWorld, user: &str, product: &str, player: String, method: String) {
    let user_id = world.user(user).id;
    let request = PlaceOrderRequest {
        product_id: Some(world.product(product).id),
        player_id: player,
        payment_method: method,
        notes: None,
    };
    let result = world.api().place_order(user_id, request).await.map(|p| p.order);
    world.record(result);
}

#[when(expr = "{string} has placed {int} orders for {string}")]
async fn place_many_orders(world: &mut TopupWorld, user: String, count: i64, product: String) {
    for i in 0..count {
        customer_order(world, &user, &product, format!("P-{i}"), "bkash".into()).await;
        assert!(world.last_error.is_none(), "Order {i} failed");
    }
}

#[when(expr = "an admin creates a manual order for {string} of {string} for {word}")]
async fn manual_order(world: &mut TopupWorld, user: String, product: String, amount: String) {
    let request = ManualOrderRequest {
        user_id: Some(world.user(&user).id),
        product_id: Some(world.product(&product).id),
        player_id: Some(format!("{user}-player")),
        amount: Some(amount.parse::<Money>().expect("Not a valid amount")),
        notes: Some("Created by support".into()),
    };
    let result = world.api().create_manual_order(request).await;
    world.record(result);
}

#[when(expr = "the price of {string} changes to {word}")]
async fn change_price(world: &mut TopupWorld, product: String, price: String) {
    let id = world.product(&product).id;
    let update = ProductUpdate { price: Some(price.parse().expect("Not a valid price")), ..Default::default() };
    world.db().update_product(id, update).await.expect("Error updating product");
}

#[when(expr = "the admin sets the order status to {string}")]
async fn set_status(world: &mut TopupWorld, status: String) {
    let id = world.last_order().id;
    let request = StatusUpdateRequest { status, ..Default::default() };
    let result = world.api().update_order_status(id, request).await;
    world.record(result);
}

#[when(expr = "the admin sets the order status to {string} expecting version {int}")]
async fn set_status_with_version(world: &mut TopupWorld, status: String, version: i64) {
    let id = world.last_order().id;
    let request = StatusUpdateRequest { status, version: Some(version), ..Default::default() };
    let result = world.api().update_order_status(id, request).await;
    world.record(result);
}

#[when(expr = "{string} attaches transaction {string} to the order")]
async fn attach_reference(world: &mut TopupWorld, user: String, txid: String) {
    let user_id = world.user(&user).id;
    let id = world.last_order().id;
    let request = PaymentReferenceRequest { transaction_id: txid, payment_method: None };
    let result = world.api().attach_payment_reference(user_id, id, request).await;
    world.record(result);
}

#[when(expr = "the payment gateway reports payment {string} for the order")]
async fn gateway_payment(world: &mut TopupWorld, reference: String) {
    let id = world.last_order().id;
    let result = world.api().process_gateway_payment(GatewayPaymentCompleted::new(id, reference)).await;
    match result.expect("Gateway payment failed") {
        Some(order) => world.last_order = Some(order),
        None => panic!("Order {id} was not found"),
    }
}

#[when(expr = "the payment gateway reports payment {string} for order {int}")]
async fn gateway_payment_unknown(world: &mut TopupWorld, reference: String, id: i64) {
    let result = world.api().process_gateway_payment(GatewayPaymentCompleted::new(id, reference)).await;
    assert!(result.expect("Gateway payment failed").is_none());
}

#[then(expr = "the order is {word} with amount {word}")]
async fn check_order(world: &mut TopupWorld, status: String, amount: String) {
    let id = world.last_order().id;
    let order = world.db_order(id).await;
    assert_eq!(order.status, status.parse::<OrderStatusType>().expect("Not a valid status"));
    assert_eq!(order.amount, amount.parse::<Money>().expect("Not a valid amount"));
}

#[then(expr = "the order has transaction id {string}")]
async fn check_transaction_id(world: &mut TopupWorld, txid: String) {
    let order = world.db_order(world.last_order().id).await;
    assert_eq!(order.transaction_id.as_deref(), Some(txid.as_str()));
}

#[then(expr = "the order is at version {int}")]
async fn check_version(world: &mut TopupWorld, version: i64) {
    let order = world.db_order(world.last_order().id).await;
    assert_eq!(order.version, version);
}

#[then(expr = "the request fails with {word}")]
async fn check_error(world: &mut TopupWorld, kind: String) {
    let err = world.last_error.as_ref().expect("Expected the last request to fail");
    let matched = match kind.as_str() {
        "ProductNotFound" => matches!(err, OrderFlowError::ProductNotFound(_)),
        "OrderNotFound" => matches!(err, OrderFlowError::OrderNotFound(_)),
        "ValidationError" => matches!(err, OrderFlowError::ValidationError(_)),
        "VersionConflict" => matches!(err, OrderFlowError::VersionConflict { .. }),
        "AccessDenied" => matches!(err, OrderFlowError::AccessDenied),
        other => panic!("Unknown error kind {other}"),
    };
    assert!(matched, "Expected {kind}, got {err:?}");
}

#[then(expr = "{string} can see the order")]
async fn can_see(world: &mut TopupWorld, user: String) {
    let u = world.user(&user);
    let caller = Caller::new(u.id, u.role);
    let id = world.last_order().id;
    let order = world.api().order_for_caller(caller, id).await.expect("Order should be visible");
    assert_eq!(order.order.id, id);
}

#[then(expr = "{string} is denied access to the order")]
async fn denied(world: &mut TopupWorld, user: String) {
    let u = world.user(&user);
    let caller = Caller::new(u.id, u.role);
    let id = world.last_order().id;
    let err = world.api().order_for_caller(caller, id).await.expect_err("Order should not be visible");
    assert!(matches!(err, OrderFlowError::AccessDenied), "Expected AccessDenied, got {err:?}");
}

#[then(expr = "page {int} of all orders has {int} orders out of {int} pages")]
async fn check_page(world: &mut TopupWorld, page: i64, count: usize, pages: i64) {
    let result = world.api().all_orders(None, None, Pagination::new(Some(page), None)).await.expect("Query failed");
    assert_eq!(result.items.len(), count);
    assert_eq!(result.pagination.total_pages, pages);
    assert_eq!(result.pagination.current_page, page);
}

#[then(expr = "{string} has {int} {word} orders")]
async fn count_orders(world: &mut TopupWorld, user: String, count: i64, status: String) {
    let user_id = world.user(&user).id;
    let result = world.api().my_orders(user_id, Some(&status), Pagination::default()).await.expect("Query failed");
    assert_eq!(result.pagination.total_items, count);
}

impl TopupWorld {
    async fn db_order(&self, id: i64) -> Order {
        self.db().fetch_order(id).await.expect("Error fetching order").expect("Order not found")
    }
}
