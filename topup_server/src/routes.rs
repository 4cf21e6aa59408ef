//! Request handler definitions
//!
//! Define each route and it handler here.
//! Handlers that are more than a line or two should lean on the engine APIs for their logic. Keep this module neat and
//! tidy 🙏
//!
//! All routes except `/health` are mounted under `/api` by the server. Routes that need a logged-in user are wrapped in
//! the [ACL middleware](crate::middleware::AclMiddlewareFactory), and receive the caller's [`JwtClaims`] as an
//! argument.
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests. Any I/O (and that includes every database call) must be awaited
//! rather than blocked on.
use std::collections::BTreeMap;

use actix_web::{get, web, HttpResponse, Responder};
use log::*;
use topup_engine::{
    api::account_objects::{LoginRequest, NewUserRequest},
    db_types::{NewProduct, ProductUpdate, ProfileUpdate, Role, User},
    order_objects::{ManualOrderRequest, PaymentReferenceRequest, PlaceOrderRequest, StatusUpdateRequest},
    payment_objects::supported_payment_methods,
    traits::{CatalogManagement, OrderManagement, SettingsManagement, UserManagement},
    AuthApi,
    CatalogApi,
    OrderFlowApi,
    SettingsApi,
};

use crate::{
    auth::{JwtClaims, TokenIssuer},
    data_objects::{
        AuthResponse,
        BkashWebhookPayload,
        CustomerList,
        JsonResponse,
        ListParams,
        ManualOrderResponse,
        OrderList,
        OrderResponse,
        PaymentMethodsResponse,
        PlacedOrderResponse,
        ProductResponse,
        ProductsResponse,
        SettingValue,
        SettingsBody,
        SettingsUpdate,
        StatusUpdateResponse,
        UserResponse,
    },
    errors::ServerError,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };

    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+ where requires [$($roles:expr),*])  => {
        paste::paste! { pub struct [<$name:camel Route>]<A>(core::marker::PhantomData<fn() -> A>);}
        paste::paste! { impl<A> [<$name:camel Route>]<A> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData::<fn() -> A>)
            }
        }}
        paste::paste! { impl<A> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<A>
        where
            A: $($bounds)++ 'static,
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<A>)
                    .wrap($crate::middleware::AclMiddlewareFactory::new(&[$($roles),+]));
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Auth  ----------------------------------------------------
fn auth_response(
    message: &str,
    user: User,
    signer: &TokenIssuer,
) -> Result<AuthResponse, ServerError> {
    let claims = JwtClaims::new(user.id, user.username.clone(), user.role);
    let token = signer.issue_token(claims, None)?;
    Ok(AuthResponse { message: message.to_string(), token, user: user.into() })
}

route!(register => Post "/auth/register" impl UserManagement);
/// Customers sign up here. The response carries an access token, so there is no need to log in afterwards.
pub async fn register<B: UserManagement>(
    body: web::Json<NewUserRequest>,
    api: web::Data<AuthApi<B>>,
    signer: web::Data<TokenIssuer>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ Received registration request for '{}'", body.username);
    let user = api.register(body.into_inner()).await?;
    let response = auth_response("User registered successfully", user, &signer)?;
    Ok(HttpResponse::Created().json(response))
}

route!(login => Post "/auth/login" impl UserManagement);
pub async fn login<B: UserManagement>(
    body: web::Json<LoginRequest>,
    api: web::Data<AuthApi<B>>,
    signer: web::Data<TokenIssuer>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ Received login request for '{}'", body.username);
    let user = api.login(body.into_inner()).await?;
    let response = auth_response("Login successful", user, &signer)?;
    Ok(HttpResponse::Ok().json(response))
}

route!(my_profile => Get "/auth/profile" impl UserManagement where requires [Role::Customer, Role::Admin]);
pub async fn my_profile<B: UserManagement>(
    claims: JwtClaims,
    api: web::Data<AuthApi<B>>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ GET profile for user #{}", claims.user_id);
    let user = api.profile(claims.user_id).await?;
    Ok(HttpResponse::Ok().json(UserResponse { user: user.into() }))
}

route!(update_profile => Put "/auth/profile" impl UserManagement where requires [Role::Customer, Role::Admin]);
pub async fn update_profile<B: UserManagement>(
    claims: JwtClaims,
    body: web::Json<ProfileUpdate>,
    api: web::Data<AuthApi<B>>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ PUT profile for user #{}", claims.user_id);
    api.update_profile(claims.user_id, body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::new("Profile updated successfully")))
}

//----------------------------------------------   Orders  ----------------------------------------------------
route!(place_order => Post "/orders" impl OrderManagement where requires [Role::Customer]);
pub async fn place_order<B: OrderManagement>(
    claims: JwtClaims,
    body: web::Json<PlaceOrderRequest>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ New order request from user #{}", claims.user_id);
    let placed = api.place_order(claims.user_id, body.into_inner()).await?;
    let response = PlacedOrderResponse { message: "Order created successfully".into(), order: placed.into() };
    Ok(HttpResponse::Created().json(response))
}

route!(my_orders => Get "/orders/my-orders" impl OrderManagement where requires [Role::Customer]);
pub async fn my_orders<B: OrderManagement>(
    claims: JwtClaims,
    params: web::Query<ListParams>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ GET my orders for user #{}", claims.user_id);
    let page = api.my_orders(claims.user_id, params.status.as_deref(), params.pagination()).await?;
    Ok(HttpResponse::Ok().json(OrderList::from(page)))
}

route!(order_by_id => Get "/orders/{id}" impl OrderManagement where requires [Role::Customer, Role::Admin]);
/// Customers can fetch their own orders. Admins can fetch any order.
pub async fn order_by_id<B: OrderManagement>(
    claims: JwtClaims,
    path: web::Path<i64>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    trace!("💻️ GET order #{id} for user #{}", claims.user_id);
    let order = api.order_for_caller(claims.caller(), id).await?;
    Ok(HttpResponse::Ok().json(OrderResponse { order }))
}

route!(update_payment => Put "/orders/{id}/payment" impl OrderManagement where requires [Role::Customer]);
pub async fn update_payment<B: OrderManagement>(
    claims: JwtClaims,
    path: web::Path<i64>,
    body: web::Json<PaymentReferenceRequest>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    trace!("💻️ Payment reference for order #{id} from user #{}", claims.user_id);
    api.attach_payment_reference(claims.user_id, id, body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::new("Payment information updated successfully")))
}

//----------------------------------------------   Admin  ----------------------------------------------------
route!(dashboard => Get "/admin/dashboard" impl OrderManagement where requires [Role::Admin]);
pub async fn dashboard<B: OrderManagement>(
    claims: JwtClaims,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ GET dashboard for admin #{}", claims.user_id);
    let dashboard = api.dashboard().await?;
    Ok(HttpResponse::Ok().json(dashboard))
}

route!(all_orders => Get "/admin/orders" impl OrderManagement where requires [Role::Admin]);
pub async fn all_orders<B: OrderManagement>(
    params: web::Query<ListParams>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ GET all orders. {params:?}");
    let page = api.all_orders(params.status.as_deref(), params.search(), params.pagination()).await?;
    Ok(HttpResponse::Ok().json(OrderList::from(page)))
}

route!(manual_order => Post "/admin/orders/manual" impl OrderManagement where requires [Role::Admin]);
pub async fn manual_order<B: OrderManagement>(
    claims: JwtClaims,
    body: web::Json<ManualOrderRequest>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ Manual order request from admin #{}", claims.user_id);
    let order = api.create_manual_order(body.into_inner()).await?;
    let response = ManualOrderResponse { message: "Order created successfully".into(), order_id: order.id };
    Ok(HttpResponse::Created().json(response))
}

route!(update_order_status => Put "/admin/orders/{id}/status" impl OrderManagement where requires [Role::Admin]);
pub async fn update_order_status<B: OrderManagement>(
    claims: JwtClaims,
    path: web::Path<i64>,
    body: web::Json<StatusUpdateRequest>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    info!("💻️ Admin #{} is setting the status of order #{id} to '{}'", claims.user_id, body.status);
    let order = api.update_order_status(id, body.into_inner()).await?;
    let response = StatusUpdateResponse { message: "Order status updated successfully".into(), order };
    Ok(HttpResponse::Ok().json(response))
}

route!(delete_order => Delete "/admin/orders/{id}" impl OrderManagement where requires [Role::Admin]);
pub async fn delete_order<B: OrderManagement>(
    claims: JwtClaims,
    path: web::Path<i64>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    info!("💻️ Admin #{} is deleting order #{id}", claims.user_id);
    api.delete_order(id).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::new("Order deleted successfully")))
}

route!(customers => Get "/admin/customers" impl UserManagement where requires [Role::Admin]);
pub async fn customers<B: UserManagement>(
    params: web::Query<ListParams>,
    api: web::Data<AuthApi<B>>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ GET customers. {params:?}");
    let page = api.customers(params.search(), params.pagination()).await?;
    Ok(HttpResponse::Ok().json(CustomerList::from(page)))
}

//----------------------------------------------   Products  ----------------------------------------------------
route!(active_products => Get "/products" impl CatalogManagement);
pub async fn active_products<B: CatalogManagement>(
    api: web::Data<CatalogApi<B>>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ GET products");
    let products = api.active_products().await?;
    Ok(HttpResponse::Ok().json(ProductsResponse { products }))
}

route!(all_products => Get "/products/admin/all" impl CatalogManagement where requires [Role::Admin]);
pub async fn all_products<B: CatalogManagement>(
    api: web::Data<CatalogApi<B>>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ GET all products");
    let products = api.all_products().await?;
    Ok(HttpResponse::Ok().json(ProductsResponse { products }))
}

route!(product_by_id => Get "/products/{id}" impl CatalogManagement);
pub async fn product_by_id<B: CatalogManagement>(
    path: web::Path<i64>,
    api: web::Data<CatalogApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    trace!("💻️ GET product #{id}");
    let product = api.active_product(id).await?;
    Ok(HttpResponse::Ok().json(ProductResponse { message: None, product }))
}

route!(create_product => Post "/products" impl CatalogManagement where requires [Role::Admin]);
pub async fn create_product<B: CatalogManagement>(
    body: web::Json<NewProduct>,
    api: web::Data<CatalogApi<B>>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ New product request: '{}'", body.name);
    let product = api.create_product(body.into_inner()).await?;
    let response = ProductResponse { message: Some("Product created successfully".into()), product };
    Ok(HttpResponse::Created().json(response))
}

route!(update_product => Put "/products/{id}" impl CatalogManagement where requires [Role::Admin]);
pub async fn update_product<B: CatalogManagement>(
    path: web::Path<i64>,
    body: web::Json<ProductUpdate>,
    api: web::Data<CatalogApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    trace!("💻️ Update request for product #{id}");
    let product = api.update_product(id, body.into_inner()).await?;
    let response = ProductResponse { message: Some("Product updated successfully".into()), product };
    Ok(HttpResponse::Ok().json(response))
}

route!(delete_product => Delete "/products/{id}" impl CatalogManagement where requires [Role::Admin]);
pub async fn delete_product<B: CatalogManagement>(
    path: web::Path<i64>,
    api: web::Data<CatalogApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    trace!("💻️ Delete request for product #{id}");
    api.delete_product(id).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::new("Product deleted successfully")))
}

//----------------------------------------------   Settings  ----------------------------------------------------
route!(public_settings => Get "/settings" impl SettingsManagement);
pub async fn public_settings<B: SettingsManagement>(
    api: web::Data<SettingsApi<B>>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ GET settings");
    let settings = api.public_settings().await?;
    Ok(HttpResponse::Ok().json(SettingsBody { settings }))
}

route!(all_settings => Get "/settings/admin/all" impl SettingsManagement where requires [Role::Admin]);
pub async fn all_settings<B: SettingsManagement>(
    api: web::Data<SettingsApi<B>>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ GET all settings");
    let settings = api.all_settings().await?;
    Ok(HttpResponse::Ok().json(SettingsBody { settings }))
}

route!(update_settings => Put "/settings" impl SettingsManagement where requires [Role::Admin]);
pub async fn update_settings<B: SettingsManagement>(
    body: web::Json<SettingsUpdate>,
    api: web::Data<SettingsApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let settings: BTreeMap<String, String> = body.into_inner().settings.unwrap_or_default();
    trace!("💻️ Update request for {} settings", settings.len());
    api.upsert_settings(settings).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::new("Settings updated successfully")))
}

route!(update_setting => Put "/settings/{key}" impl SettingsManagement where requires [Role::Admin]);
pub async fn update_setting<B: SettingsManagement>(
    path: web::Path<String>,
    body: web::Json<SettingValue>,
    api: web::Data<SettingsApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let key = path.into_inner();
    trace!("💻️ Update request for setting '{key}'");
    api.upsert_setting(&key, body.into_inner().value.unwrap_or_default()).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::new("Setting updated successfully")))
}

route!(delete_setting => Delete "/settings/{key}" impl SettingsManagement where requires [Role::Admin]);
pub async fn delete_setting<B: SettingsManagement>(
    path: web::Path<String>,
    api: web::Data<SettingsApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let key = path.into_inner();
    trace!("💻️ Delete request for setting '{key}'");
    api.delete_setting(&key).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::new("Setting deleted successfully")))
}

//----------------------------------------------   Payments  ----------------------------------------------------
#[get("/payments/methods")]
pub async fn payment_methods() -> impl Responder {
    trace!("💻️ GET payment methods");
    HttpResponse::Ok().json(PaymentMethodsResponse { payment_methods: supported_payment_methods() })
}

route!(verify_payment => Post "/payments/verify/{order_id}" impl OrderManagement where requires [Role::Customer, Role::Admin]);
/// Attach a payment reference to one of the caller's own orders. This is open to admins too, but only for orders
/// they own.
pub async fn verify_payment<B: OrderManagement>(
    claims: JwtClaims,
    path: web::Path<i64>,
    body: web::Json<PaymentReferenceRequest>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    trace!("💻️ Payment verification for order #{id} from user #{}", claims.user_id);
    api.attach_payment_reference(claims.user_id, id, body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::new("Payment information updated successfully")))
}

route!(payment_stats => Get "/payments/admin/stats" impl OrderManagement where requires [Role::Admin]);
pub async fn payment_stats<B: OrderManagement>(api: web::Data<OrderFlowApi<B>>) -> Result<HttpResponse, ServerError> {
    trace!("💻️ GET payment stats");
    let stats = api.payment_stats().await?;
    Ok(HttpResponse::Ok().json(stats))
}

route!(bkash_webhook => Post "/bkash" impl OrderManagement);
/// The bKash payment notification.
///
/// This route must be mounted behind the [webhook guard](crate::middleware::WebhookGuardFactory), which has already
/// checked where the request came from by the time the handler runs. The gateway only needs to know that the message
/// arrived, so the response is always a 200, whatever happens to the order. Problems are logged instead.
pub async fn bkash_webhook<B: OrderManagement>(body: web::Bytes, api: web::Data<OrderFlowApi<B>>) -> HttpResponse {
    let ack = HttpResponse::Ok().json(JsonResponse::new("Webhook processed successfully"));
    let payload = match serde_json::from_slice::<BkashWebhookPayload>(&body) {
        Ok(p) => p,
        Err(e) => {
            warn!("💻️ Could not parse bKash webhook payload. {e}. Ignoring it.");
            return ack;
        },
    };
    debug!("💻️ bKash webhook received: {payload:?}");
    let payment = match payload.completed_payment() {
        Some(p) => p,
        None => {
            info!(
                "💻️ bKash webhook for invoice {:?} does not report a completed payment (status {:?}/{:?}). No action \
                 taken.",
                payload.merchant_invoice_number, payload.status, payload.transaction_status
            );
            return ack;
        },
    };
    let order_id = payment.order_id;
    match api.process_gateway_payment(payment).await {
        Ok(Some(order)) => info!("💻️ Order #{} marked as paid by bKash", order.id),
        Ok(None) => warn!("💻️ bKash reported a payment for order #{order_id}, which does not exist"),
        Err(e) => error!("💻️ Could not apply bKash payment to order #{order_id}. {e}"),
    }
    ack
}
