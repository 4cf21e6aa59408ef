use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use topup_common::Money;
use topup_engine::{db_types::Product, CatalogApi, CatalogError};

use super::{
    helpers::{admin_token, bearer, customer_token, make_request, product, timestamp},
    mocks::MockBackend,
};
use crate::routes::{
    ActiveProductsRoute,
    AllProductsRoute,
    CreateProductRoute,
    DeleteProductRoute,
    ProductByIdRoute,
    UpdateProductRoute,
};

fn configure_with(backend: MockBackend) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        cfg.app_data(web::Data::new(CatalogApi::new(backend)))
            .service(AllProductsRoute::<MockBackend>::new())
            .service(ActiveProductsRoute::<MockBackend>::new())
            .service(ProductByIdRoute::<MockBackend>::new())
            .service(CreateProductRoute::<MockBackend>::new())
            .service(UpdateProductRoute::<MockBackend>::new())
            .service(DeleteProductRoute::<MockBackend>::new());
    }
}

#[actix_web::test]
async fn anyone_can_list_active_products() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend
        .expect_fetch_active_products()
        .returning(|| Ok(vec![product(1, "100 Diamonds", 999, true), product(2, "500 Diamonds", 4500, true)]));
    let (status, body) = make_request(TestRequest::get().uri("/products"), configure_with(backend)).await;
    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["products"][1]["name"], "500 Diamonds");
    assert_eq!(json["products"][1]["price"], "45.00");
}

#[actix_web::test]
async fn only_admins_see_inactive_products() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend.expect_fetch_all_products().never();
    let req = TestRequest::get().uri("/products/admin/all").insert_header(bearer(&customer_token(3)));
    let (status, _) = make_request(req, configure_with(backend)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let mut backend = MockBackend::new();
    backend.expect_fetch_all_products().returning(|| Ok(vec![product(7, "Retired pack", 100, false)]));
    let req = TestRequest::get().uri("/products/admin/all").insert_header(bearer(&admin_token()));
    let (status, body) = make_request(req, configure_with(backend)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#""is_active":false"#));
}

#[actix_web::test]
async fn inactive_products_are_not_found() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend.expect_fetch_active_product().withf(|id| *id == 7).returning(|_| Ok(None));
    let (status, body) = make_request(TestRequest::get().uri("/products/7"), configure_with(backend)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, r#"{"message":"Product not found"}"#);
}

#[actix_web::test]
async fn fetch_a_product() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend.expect_fetch_active_product().returning(|id| Ok(Some(product(id, "100 Diamonds", 999, true))));
    let (status, body) = make_request(TestRequest::get().uri("/products/1"), configure_with(backend)).await;
    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["product"]["id"], 1);
    assert!(json.get("message").is_none());
}

#[actix_web::test]
async fn create_a_product() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend
        .expect_insert_product()
        .withf(|p| p.name == "1000 Diamonds" && p.price == Some(Money::from(8000)) && p.description.is_none())
        .returning(|p| {
            Ok(Product {
                id: 9,
                name: p.name,
                description: p.description,
                price: p.price.unwrap_or_default(),
                category: p.category,
                is_active: true,
                created_at: timestamp(),
                updated_at: timestamp(),
            })
        });
    let req = TestRequest::post()
        .uri("/products")
        .insert_header(bearer(&admin_token()))
        .set_json(serde_json::json!({"name": " 1000 Diamonds ", "price": 80, "category": "diamonds", "description": ""}));
    let (status, body) = make_request(req, configure_with(backend)).await;
    assert_eq!(status, StatusCode::CREATED);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["message"], "Product created successfully");
    assert_eq!(json["product"]["price"], "80.00");
}

#[actix_web::test]
async fn invalid_products_are_rejected() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend.expect_insert_product().never();
    let req = TestRequest::post()
        .uri("/products")
        .insert_header(bearer(&admin_token()))
        .set_json(serde_json::json!({"name": "Freebie", "price": "-1.00"}));
    let (status, body) = make_request(req, configure_with(backend)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        r#"{"errors":[{"field":"category","message":"Category is required"},{"field":"price","message":"Price must be a positive number"}]}"#
    );
}

#[actix_web::test]
async fn update_a_missing_product() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend.expect_update_product().returning(|_, _| Ok(None));
    let req = TestRequest::put()
        .uri("/products/55")
        .insert_header(bearer(&admin_token()))
        .set_json(serde_json::json!({"is_active": false}));
    let (status, _) = make_request(req, configure_with(backend)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn empty_product_update() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend.expect_update_product().never();
    let req = TestRequest::put().uri("/products/5").insert_header(bearer(&admin_token())).set_json(serde_json::json!({}));
    let (status, body) = make_request(req, configure_with(backend)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, r#"{"message":"No valid fields to update"}"#);
}

#[actix_web::test]
async fn products_with_orders_cannot_be_deleted() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend.expect_delete_product().returning(|id| Err(CatalogError::ProductHasOrders(id)));
    let req = TestRequest::delete().uri("/products/3").insert_header(bearer(&admin_token()));
    let (status, body) = make_request(req, configure_with(backend)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body, r#"{"message":"Cannot delete product with existing orders. Deactivate instead."}"#);
}

#[actix_web::test]
async fn delete_a_product() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend.expect_delete_product().withf(|id| *id == 3).returning(|_| Ok(()));
    let req = TestRequest::delete().uri("/products/3").insert_header(bearer(&admin_token()));
    let (status, body) = make_request(req, configure_with(backend)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"message":"Product deleted successfully"}"#);
}
