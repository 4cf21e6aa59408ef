use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use topup_common::Money;
use topup_engine::{
    db_types::{OrderStatusType, Role},
    events::EventProducers,
    order_objects::{OrderStats, Paged, PlacedOrder},
    OrderFlowApi,
    OrderFlowError,
};

use super::{
    helpers::{admin_token, bearer, customer_token, make_request, order, order_details, product, user},
    mocks::MockBackend,
};
use crate::{
    data_objects::PlacedOrderResponse,
    routes::{
        AllOrdersRoute,
        DashboardRoute,
        DeleteOrderRoute,
        ManualOrderRoute,
        MyOrdersRoute,
        OrderByIdRoute,
        PlaceOrderRoute,
        UpdateOrderStatusRoute,
        UpdatePaymentRoute,
    },
};

fn configure_with(backend: MockBackend) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        cfg.app_data(web::Data::new(OrderFlowApi::new(backend, EventProducers::default())))
            .service(PlaceOrderRoute::<MockBackend>::new())
            .service(MyOrdersRoute::<MockBackend>::new())
            .service(OrderByIdRoute::<MockBackend>::new())
            .service(UpdatePaymentRoute::<MockBackend>::new())
            .service(DashboardRoute::<MockBackend>::new())
            .service(ManualOrderRoute::<MockBackend>::new())
            .service(AllOrdersRoute::<MockBackend>::new())
            .service(UpdateOrderStatusRoute::<MockBackend>::new())
            .service(DeleteOrderRoute::<MockBackend>::new());
    }
}

#[actix_web::test]
async fn place_order() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend
        .expect_insert_order_for_active_product()
        .withf(|o| o.user_id == 8 && o.product_id == 3 && o.payment_method.as_deref() == Some("bkash"))
        .returning(|o| {
            let mut placed = order(31, o.user_id, OrderStatusType::Pending);
            placed.player_id = o.player_id;
            Ok(Some(PlacedOrder { order: placed, product_name: "100 Diamonds".into() }))
        });
    let req = TestRequest::post()
        .uri("/orders")
        .insert_header(bearer(&customer_token(8)))
        .set_json(serde_json::json!({"product_id": 3, "player_id": "PLAYER-8", "payment_method": "bkash"}));
    let (status, body) = make_request(req, configure_with(backend)).await;
    assert_eq!(status, StatusCode::CREATED);
    let response: PlacedOrderResponse = serde_json::from_str(&body).unwrap();
    assert_eq!(response.message, "Order created successfully");
    assert_eq!(response.order.id, 31);
    assert_eq!(response.order.amount, Money::from(999));
    assert_eq!(response.order.player_id, "PLAYER-8");
    assert_eq!(response.order.status, OrderStatusType::Pending);
    assert!(body.contains(r#""amount":"9.99""#));
}

#[actix_web::test]
async fn admins_cannot_place_orders() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend.expect_insert_order_for_active_product().never();
    let req = TestRequest::post()
        .uri("/orders")
        .insert_header(bearer(&admin_token()))
        .set_json(serde_json::json!({"product_id": 3, "player_id": "P", "payment_method": "bkash"}));
    let (status, body) = make_request(req, configure_with(backend)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, r#"{"message":"Customer access required"}"#);
}

#[actix_web::test]
async fn order_for_an_inactive_product() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend.expect_insert_order_for_active_product().returning(|_| Ok(None));
    let req = TestRequest::post()
        .uri("/orders")
        .insert_header(bearer(&customer_token(8)))
        .set_json(serde_json::json!({"product_id": 4, "player_id": "P", "payment_method": "nagad"}));
    let (status, body) = make_request(req, configure_with(backend)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, r#"{"message":"Product not found or inactive"}"#);
}

#[actix_web::test]
async fn invalid_order_request() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend.expect_insert_order_for_active_product().never();
    let req = TestRequest::post()
        .uri("/orders")
        .insert_header(bearer(&customer_token(8)))
        .set_json(serde_json::json!({"product_id": 0, "player_id": " "}));
    let (status, body) = make_request(req, configure_with(backend)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        r#"{"errors":[{"field":"product_id","message":"Product ID must be a valid integer"},{"field":"player_id","message":"Player ID is required"},{"field":"payment_method","message":"Payment method is required"}]}"#
    );
}

#[actix_web::test]
async fn my_orders_are_paginated() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend
        .expect_search_orders()
        .withf(|q, p| {
            q.user_id == Some(8) && q.status == Some(OrderStatusType::Pending) && p.page() == 2 && p.page_size() == 20
        })
        .returning(|_, page| Ok(Paged::new(vec![order_details(50, 8)], &page, 45)));
    let req = TestRequest::get().uri("/orders/my-orders?page=2&status=pending").insert_header(bearer(&customer_token(8)));
    let (status, body) = make_request(req, configure_with(backend)).await;
    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["orders"][0]["id"], 50);
    assert_eq!(json["orders"][0]["product_name"], "100 Diamonds");
    assert_eq!(
        json["pagination"],
        serde_json::json!({"currentPage": 2, "totalPages": 3, "totalItems": 45, "itemsPerPage": 20})
    );
}

#[actix_web::test]
async fn my_orders_with_an_unknown_status() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend.expect_search_orders().never();
    let req = TestRequest::get().uri("/orders/my-orders?status=shipped").insert_header(bearer(&customer_token(8)));
    let (status, _) = make_request(req, configure_with(backend)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn customers_cannot_see_other_customers_orders() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend.expect_fetch_order_details().returning(|id| Ok(Some(order_details(id, 9))));
    let req = TestRequest::get().uri("/orders/77").insert_header(bearer(&customer_token(8)));
    let (status, body) = make_request(req, configure_with(backend)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, r#"{"message":"Access denied"}"#);
}

#[actix_web::test]
async fn admins_can_see_any_order() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend.expect_fetch_order_details().returning(|id| Ok(Some(order_details(id, 9))));
    let req = TestRequest::get().uri("/orders/77").insert_header(bearer(&admin_token()));
    let (status, body) = make_request(req, configure_with(backend)).await;
    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["order"]["id"], 77);
    assert_eq!(json["order"]["user_id"], 9);
    assert_eq!(json["order"]["username"], "player9");
}

#[actix_web::test]
async fn order_ids_must_be_numbers() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend.expect_fetch_order_details().never();
    let req = TestRequest::get().uri("/orders/abc").insert_header(bearer(&customer_token(8)));
    let (status, body) = make_request(req, configure_with(backend)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.starts_with(r#"{"message":"Could not read request path"#), "{body}");
}

#[actix_web::test]
async fn attach_payment_reference_to_someone_elses_order() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend
        .expect_attach_payment_reference()
        .withf(|id, user_id, txid, method| *id == 77 && *user_id == 8 && txid == "TX-1" && method.is_none())
        .returning(|_, _, _, _| Ok(None));
    let req = TestRequest::put()
        .uri("/orders/77/payment")
        .insert_header(bearer(&customer_token(8)))
        .set_json(serde_json::json!({"transaction_id": " TX-1 "}));
    let (status, body) = make_request(req, configure_with(backend)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, r#"{"message":"Order not found"}"#);
}

#[actix_web::test]
async fn attach_payment_reference() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend.expect_attach_payment_reference().returning(|id, user_id, txid, method| {
        let mut o = order(id, user_id, OrderStatusType::Pending);
        o.transaction_id = Some(txid);
        o.payment_method = method;
        Ok(Some(o))
    });
    let req = TestRequest::put()
        .uri("/orders/77/payment")
        .insert_header(bearer(&customer_token(8)))
        .set_json(serde_json::json!({"transaction_id": "TX-1", "payment_method": "rocket"}));
    let (status, body) = make_request(req, configure_with(backend)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"message":"Payment information updated successfully"}"#);
}

#[actix_web::test]
async fn customers_cannot_use_admin_routes() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend.expect_order_stats().never();
    let req = TestRequest::get().uri("/admin/dashboard").insert_header(bearer(&customer_token(8)));
    let (status, body) = make_request(req, configure_with(backend)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, r#"{"message":"Admin access required"}"#);
}

#[actix_web::test]
async fn dashboard() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend.expect_order_stats().returning(|| {
        Ok(OrderStats {
            total_customers: 4,
            total_orders: 10,
            pending_orders: 3,
            completed_orders: 6,
            total_revenue: Money::from(12_345),
        })
    });
    backend
        .expect_search_orders()
        .withf(|q, p| q.is_empty() && p.page_size() == 10)
        .returning(|_, page| Ok(Paged::new(vec![order_details(2, 4)], &page, 10)));
    let req = TestRequest::get().uri("/admin/dashboard").insert_header(bearer(&admin_token()));
    let (status, body) = make_request(req, configure_with(backend)).await;
    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["stats"]["totalRevenue"], "123.45");
    assert_eq!(json["stats"]["pendingOrders"], 3);
    assert_eq!(json["recentOrders"].as_array().map(Vec::len), Some(1));
}

#[actix_web::test]
async fn manual_order() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend.expect_fetch_user().returning(|id| Ok(Some(user(id, "carol", Role::Customer))));
    backend.expect_fetch_product().returning(|id| Ok(Some(product(id, "Weekly pass", 250, false))));
    backend
        .expect_insert_order()
        .withf(|o| o.user_id == 4 && o.product_id == 6 && o.amount == Money::from(500) && o.payment_method.is_none())
        .returning(|o| Ok(order(88, o.user_id, OrderStatusType::Pending)));
    let req = TestRequest::post()
        .uri("/admin/orders/manual")
        .insert_header(bearer(&admin_token()))
        .set_json(serde_json::json!({"user_id": 4, "product_id": 6, "player_id": "P-4", "amount": "5.00"}));
    let (status, body) = make_request(req, configure_with(backend)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body, r#"{"message":"Order created successfully","orderId":88}"#);
}

#[actix_web::test]
async fn manual_order_with_missing_fields() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend.expect_insert_order().never();
    let req = TestRequest::post()
        .uri("/admin/orders/manual")
        .insert_header(bearer(&admin_token()))
        .set_json(serde_json::json!({"user_id": 4, "amount": "5.00"}));
    let (status, body) = make_request(req, configure_with(backend)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, r#"{"message":"Missing required fields"}"#);
}

#[actix_web::test]
async fn invalid_status_update() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend.expect_update_order_status().never();
    let req = TestRequest::put()
        .uri("/admin/orders/5/status")
        .insert_header(bearer(&admin_token()))
        .set_json(serde_json::json!({"status": "refunded"}));
    let (status, body) = make_request(req, configure_with(backend)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, r#"{"errors":[{"field":"status","message":"Invalid status"}]}"#);
}

#[actix_web::test]
async fn stale_status_update() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend
        .expect_update_order_status()
        .withf(|id, u| *id == 5 && u.expected_version == Some(1))
        .returning(|id, _| Err(OrderFlowError::VersionConflict { id, expected: 1, actual: 2 }));
    let req = TestRequest::put()
        .uri("/admin/orders/5/status")
        .insert_header(bearer(&admin_token()))
        .set_json(serde_json::json!({"status": "completed", "version": 1}));
    let (status, _) = make_request(req, configure_with(backend)).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[actix_web::test]
async fn complete_an_order() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend
        .expect_update_order_status()
        .withf(|id, u| {
            *id == 5 &&
                u.status == OrderStatusType::Completed &&
                u.transaction_id.as_deref() == Some("TX-5") &&
                u.expected_version.is_none()
        })
        .returning(|id, u| {
            let mut o = order(id, 4, u.status);
            o.transaction_id = u.transaction_id;
            o.version = 2;
            Ok(Some(o))
        });
    let req = TestRequest::put()
        .uri("/admin/orders/5/status")
        .insert_header(bearer(&admin_token()))
        .set_json(serde_json::json!({"status": "completed", "transaction_id": "TX-5"}));
    let (status, body) = make_request(req, configure_with(backend)).await;
    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["message"], "Order status updated successfully");
    assert_eq!(json["order"]["status"], "completed");
    assert_eq!(json["order"]["version"], 2);
}

#[actix_web::test]
async fn delete_a_missing_order() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend.expect_delete_order().returning(|_| Ok(false));
    let req = TestRequest::delete().uri("/admin/orders/404").insert_header(bearer(&admin_token()));
    let (status, body) = make_request(req, configure_with(backend)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, r#"{"message":"Order not found"}"#);
}

#[actix_web::test]
async fn delete_an_order() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend.expect_delete_order().withf(|id| *id == 12).returning(|_| Ok(true));
    let req = TestRequest::delete().uri("/admin/orders/12").insert_header(bearer(&admin_token()));
    let (status, body) = make_request(req, configure_with(backend)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"message":"Order deleted successfully"}"#);
}

#[actix_web::test]
async fn admins_search_all_orders() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend
        .expect_search_orders()
        .withf(|q, p| {
            q.user_id.is_none() && q.status.is_none() && q.search.as_deref() == Some("diamonds") && p.page_size() == 100
        })
        .returning(|_, page| Ok(Paged::new(vec![order_details(3, 2), order_details(2, 4)], &page, 2)));
    let req = TestRequest::get()
        .uri("/admin/orders?status=all&search=%20diamonds%20&limit=500")
        .insert_header(bearer(&admin_token()));
    let (status, body) = make_request(req, configure_with(backend)).await;
    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["orders"].as_array().map(Vec::len), Some(2));
    assert_eq!(json["pagination"]["totalPages"], 1);
}
