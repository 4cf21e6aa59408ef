use std::{net::SocketAddr, sync::Arc};

use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use topup_common::Secret;
use topup_engine::{db_types::OrderStatusType, events::EventProducers, OrderFlowApi, OrderFlowError};

use super::{
    helpers::{make_request, order},
    mocks::MockBackend,
};
use crate::{
    config::ServerOptions,
    helpers::calculate_hmac,
    middleware::{HmacSha256Verifier, NoVerification, WebhookGuardFactory, WebhookVerifier},
    routes::BkashWebhookRoute,
};

const SECRET: &str = "bkash-webhook-secret";
const COMPLETED: &str = r#"{"paymentID":"TRX1","status":"Completed","amount":"9.99","currency":"BDT","merchantInvoiceNumber":"42","transactionStatus":"Completed"}"#;
const ACK: &str = r#"{"message":"Webhook processed successfully"}"#;

fn hmac_verifier() -> Arc<dyn WebhookVerifier> {
    Arc::new(HmacSha256Verifier::new("X-Signature", Secret::new(SECRET.to_string())))
}

fn configure_with(
    backend: MockBackend,
    verifier: Arc<dyn WebhookVerifier>,
    whitelist: Option<Vec<std::net::IpAddr>>,
) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        let guard = WebhookGuardFactory::new(verifier, whitelist, ServerOptions::default());
        cfg.app_data(web::Data::new(OrderFlowApi::new(backend, EventProducers::default()))).service(
            web::scope("/payments/webhook").wrap(guard).service(BkashWebhookRoute::<MockBackend>::new()),
        );
    }
}

fn webhook_request(body: &str, signature: Option<String>) -> TestRequest {
    let mut req = TestRequest::post()
        .uri("/payments/webhook/bkash")
        .insert_header(("Content-Type", "application/json"))
        .peer_addr(SocketAddr::from(([203, 0, 113, 5], 443)))
        .set_payload(body.to_string());
    if let Some(sig) = signature {
        req = req.insert_header(("X-Signature", sig));
    }
    req
}

fn signed(body: &str) -> TestRequest {
    webhook_request(body, Some(calculate_hmac(SECRET, body.as_bytes())))
}

#[actix_web::test]
async fn completed_payment_completes_the_order() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend
        .expect_complete_order()
        .withf(|id, reference| *id == 42 && reference == "TRX1")
        .times(1)
        .returning(|id, reference| {
            let mut o = order(id, 3, OrderStatusType::Completed);
            o.transaction_id = Some(reference);
            Ok(Some(o))
        });
    let (status, body) = make_request(signed(COMPLETED), configure_with(backend, hmac_verifier(), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, ACK);
}

#[actix_web::test]
async fn bad_signatures_are_rejected() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend.expect_complete_order().never();
    let req = webhook_request(COMPLETED, Some(calculate_hmac("not-the-secret", COMPLETED.as_bytes())));
    let (status, _) = make_request(req, configure_with(backend, hmac_verifier(), None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn missing_signatures_are_rejected() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend.expect_complete_order().never();
    let (status, _) = make_request(webhook_request(COMPLETED, None), configure_with(backend, hmac_verifier(), None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn signatures_cover_the_whole_body() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend.expect_complete_order().never();
    let tampered = COMPLETED.replace("\"42\"", "\"43\"");
    let req = webhook_request(&tampered, Some(calculate_hmac(SECRET, COMPLETED.as_bytes())));
    let (status, _) = make_request(req, configure_with(backend, hmac_verifier(), None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn incomplete_payments_are_acknowledged_without_changes() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend.expect_complete_order().never();
    let body = r#"{"paymentID":"TRX1","status":"Completed","merchantInvoiceNumber":"42","transactionStatus":"Failed"}"#;
    let (status, response) = make_request(signed(body), configure_with(backend, hmac_verifier(), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response, ACK);
}

#[actix_web::test]
async fn unknown_orders_are_acknowledged() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend.expect_complete_order().times(1).returning(|_, _| Ok(None));
    let (status, body) = make_request(signed(COMPLETED), configure_with(backend, hmac_verifier(), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, ACK);
}

#[actix_web::test]
async fn unparsable_payloads_are_acknowledged() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend.expect_complete_order().never();
    let (status, body) = make_request(signed("this is not json"), configure_with(backend, hmac_verifier(), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, ACK);
}

#[actix_web::test]
async fn backend_failures_are_acknowledged() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend.expect_complete_order().returning(|_, _| Err(OrderFlowError::DatabaseError("disk full".into())));
    let (status, body) = make_request(signed(COMPLETED), configure_with(backend, hmac_verifier(), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, ACK);
}

#[actix_web::test]
async fn a_version_conflict_is_retried_once() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    let mut seq = mockall::Sequence::new();
    backend
        .expect_complete_order()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|id, _| Err(OrderFlowError::VersionConflict { id, expected: 1, actual: 2 }));
    backend
        .expect_complete_order()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|id, _| Ok(Some(order(id, 3, OrderStatusType::Completed))));
    let (status, _) = make_request(signed(COMPLETED), configure_with(backend, hmac_verifier(), None)).await;
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn callers_outside_the_whitelist_are_rejected() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend.expect_complete_order().never();
    let whitelist = Some(vec!["198.51.100.7".parse().unwrap()]);
    let (status, body) = make_request(signed(COMPLETED), configure_with(backend, hmac_verifier(), whitelist)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, r#"{"message":"Requests from this address are not allowed"}"#);
}

#[actix_web::test]
async fn whitelisted_callers_are_accepted() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend.expect_complete_order().times(1).returning(|id, _| Ok(Some(order(id, 3, OrderStatusType::Completed))));
    let whitelist = Some(vec!["203.0.113.5".parse().unwrap()]);
    let (status, _) = make_request(signed(COMPLETED), configure_with(backend, hmac_verifier(), whitelist)).await;
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn unverified_webhooks_when_checks_are_disabled() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend.expect_complete_order().times(1).returning(|id, _| Ok(Some(order(id, 3, OrderStatusType::Completed))));
    let verifier: Arc<dyn WebhookVerifier> = Arc::new(NoVerification);
    let (status, body) = make_request(webhook_request(COMPLETED, None), configure_with(backend, verifier, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, ACK);
}
