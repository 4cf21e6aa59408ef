use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use topup_common::Money;
use topup_engine::{
    db_types::OrderStatusType,
    events::EventProducers,
    order_objects::{DailyRevenue, PaymentMethodStat, PaymentStats},
    OrderFlowApi,
};

use super::{
    helpers::{admin_token, bearer, customer_token, make_request, order},
    mocks::MockBackend,
};
use crate::routes::{health, payment_methods, PaymentStatsRoute, VerifyPaymentRoute};

fn configure_with(backend: MockBackend) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        cfg.app_data(web::Data::new(OrderFlowApi::new(backend, EventProducers::default())))
            .service(health)
            .service(payment_methods)
            .service(VerifyPaymentRoute::<MockBackend>::new())
            .service(PaymentStatsRoute::<MockBackend>::new());
    }
}

#[actix_web::test]
async fn health_check() {
    let (status, body) = make_request(TestRequest::get().uri("/health"), configure_with(MockBackend::new())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "👍️\n");
}

#[actix_web::test]
async fn payment_methods_are_public() {
    let _ = env_logger::try_init().ok();
    let (status, body) =
        make_request(TestRequest::get().uri("/payments/methods"), configure_with(MockBackend::new())).await;
    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    let ids = json["paymentMethods"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["id"].as_str().unwrap().to_string())
        .collect::<Vec<_>>();
    assert_eq!(ids, ["bkash", "nagad", "rocket", "bank_transfer"]);
}

#[actix_web::test]
async fn verify_a_payment() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend
        .expect_attach_payment_reference()
        .withf(|id, user_id, txid, method| *id == 15 && *user_id == 6 && txid == "8N7A" && method.as_deref() == Some("nagad"))
        .returning(|id, user_id, _, _| Ok(Some(order(id, user_id, OrderStatusType::Pending))));
    let req = TestRequest::post()
        .uri("/payments/verify/15")
        .insert_header(bearer(&customer_token(6)))
        .set_json(serde_json::json!({"transaction_id": "8N7A", "payment_method": "nagad"}));
    let (status, body) = make_request(req, configure_with(backend)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"message":"Payment information updated successfully"}"#);
}

#[actix_web::test]
async fn verify_a_payment_without_a_transaction_id() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend.expect_attach_payment_reference().never();
    let req = TestRequest::post()
        .uri("/payments/verify/15")
        .insert_header(bearer(&customer_token(6)))
        .set_json(serde_json::json!({"transaction_id": "  "}));
    let (status, body) = make_request(req, configure_with(backend)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, r#"{"errors":[{"field":"transaction_id","message":"Transaction ID is required"}]}"#);
}

#[actix_web::test]
async fn payment_stats() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend.expect_payment_stats().withf(|days| *days == 30).returning(|_| {
        Ok(PaymentStats {
            payment_methods: vec![PaymentMethodStat {
                payment_method: Some("bkash".into()),
                count: 2,
                total_amount: Money::from(1998),
            }],
            daily_revenue: vec![DailyRevenue { date: "2024-06-01".into(), orders_count: 2, revenue: Money::from(1998) }],
        })
    });
    let req = TestRequest::get().uri("/payments/admin/stats").insert_header(bearer(&admin_token()));
    let (status, body) = make_request(req, configure_with(backend)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        r#"{"paymentMethods":[{"payment_method":"bkash","count":2,"total_amount":"19.98"}],"dailyRevenue":[{"date":"2024-06-01","orders_count":2,"revenue":"19.98"}]}"#
    );
}
