use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use log::*;
use topup_engine::{
    events::{EventHandlers, EventHooks, EventProducers},
    AuthApi,
    CatalogApi,
    OrderFlowApi,
    SettingsApi,
    SqliteDatabase,
};

use crate::{
    auth::{TokenIssuer, TokenValidator},
    config::{AdminBootstrap, ServerConfig, ServerOptions},
    errors::ServerError,
    middleware::WebhookGuardFactory,
    routes::{
        health,
        payment_methods,
        ActiveProductsRoute,
        AllOrdersRoute,
        AllProductsRoute,
        AllSettingsRoute,
        BkashWebhookRoute,
        CreateProductRoute,
        CustomersRoute,
        DashboardRoute,
        DeleteOrderRoute,
        DeleteProductRoute,
        DeleteSettingRoute,
        LoginRoute,
        ManualOrderRoute,
        MyOrdersRoute,
        MyProfileRoute,
        OrderByIdRoute,
        PaymentStatsRoute,
        PlaceOrderRoute,
        ProductByIdRoute,
        PublicSettingsRoute,
        RegisterRoute,
        UpdateOrderStatusRoute,
        UpdatePaymentRoute,
        UpdateProductRoute,
        UpdateProfileRoute,
        UpdateSettingRoute,
        UpdateSettingsRoute,
        VerifyPaymentRoute,
    },
};

const MAX_DB_CONNECTIONS: u32 = 25;
const EVENT_BUFFER_SIZE: usize = 25;

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, MAX_DB_CONNECTIONS)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    if config.auto_migrate {
        db.run_migrations().await.map_err(|e| ServerError::InitializeError(format!("Migrations failed. {e}")))?;
    }
    if let Some(admin) = &config.admin {
        bootstrap_admin(&db, admin).await?;
    }
    let handlers = EventHandlers::new(EVENT_BUFFER_SIZE, order_notification_hooks());
    let producers = handlers.producers();
    handlers.start_handlers();
    let srv = create_server_instance(config, db, producers)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

async fn bootstrap_admin(db: &SqliteDatabase, admin: &AdminBootstrap) -> Result<(), ServerError> {
    let api = AuthApi::new(db.clone());
    let created = api
        .ensure_admin(&admin.username, &admin.email, admin.password.reveal())
        .await
        .map_err(|e| ServerError::InitializeError(format!("Could not create the admin account. {e}")))?;
    match created {
        Some(user) => info!("🚀️ Admin account '{}' created (#{})", user.username, user.id),
        None => debug!("🚀️ Admin account '{}' already exists", admin.username),
    }
    Ok(())
}

/// Customers are notified when their order is completed. The notification itself is a log line for now.
pub fn order_notification_hooks() -> EventHooks {
    let mut hooks = EventHooks::default();
    hooks.on_order_completed(|event| {
        Box::pin(async move {
            let order = event.order;
            info!(
                "📬️ Order #{} for player {} is complete ({}). Notifying user #{}.",
                order.id, order.player_id, order.amount, order.user_id
            );
        })
    });
    hooks
}

/// Makes extractor failures (bad JSON, a non-numeric id in the path, etc.) use the same JSON error envelope as every
/// other error.
pub fn configure_extractors(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| ServerError::InvalidRequestBody(err.to_string()).into()),
    )
    .app_data(
        web::PathConfig::default().error_handler(|err, _req| ServerError::InvalidRequestPath(err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default().error_handler(|err, _req| ServerError::InvalidRequestPath(err.to_string()).into()),
    );
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    let host = config.host.clone();
    let port = config.port;
    let srv = HttpServer::new(move || {
        let orders_api = OrderFlowApi::new(db.clone(), producers.clone());
        let auth_api = AuthApi::new(db.clone());
        let catalog_api = CatalogApi::new(db.clone());
        let settings_api = SettingsApi::new(db.clone());
        let jwt_signer = TokenIssuer::new(&config.auth);
        let jwt_validator = TokenValidator::new(&config.auth);
        let options = ServerOptions::from_config(&config);
        let webhook_scope = web::scope("/payments/webhook")
            .wrap(WebhookGuardFactory::from_config(&config.gateway, options))
            .service(BkashWebhookRoute::<SqliteDatabase>::new());
        // Specific paths go before the parameterised ones they would otherwise be mistaken for
        let api_scope = web::scope("/api")
            .service(RegisterRoute::<SqliteDatabase>::new())
            .service(LoginRoute::<SqliteDatabase>::new())
            .service(MyProfileRoute::<SqliteDatabase>::new())
            .service(UpdateProfileRoute::<SqliteDatabase>::new())
            .service(PlaceOrderRoute::<SqliteDatabase>::new())
            .service(MyOrdersRoute::<SqliteDatabase>::new())
            .service(OrderByIdRoute::<SqliteDatabase>::new())
            .service(UpdatePaymentRoute::<SqliteDatabase>::new())
            .service(DashboardRoute::<SqliteDatabase>::new())
            .service(ManualOrderRoute::<SqliteDatabase>::new())
            .service(AllOrdersRoute::<SqliteDatabase>::new())
            .service(UpdateOrderStatusRoute::<SqliteDatabase>::new())
            .service(DeleteOrderRoute::<SqliteDatabase>::new())
            .service(CustomersRoute::<SqliteDatabase>::new())
            .service(AllProductsRoute::<SqliteDatabase>::new())
            .service(ActiveProductsRoute::<SqliteDatabase>::new())
            .service(ProductByIdRoute::<SqliteDatabase>::new())
            .service(CreateProductRoute::<SqliteDatabase>::new())
            .service(UpdateProductRoute::<SqliteDatabase>::new())
            .service(DeleteProductRoute::<SqliteDatabase>::new())
            .service(AllSettingsRoute::<SqliteDatabase>::new())
            .service(PublicSettingsRoute::<SqliteDatabase>::new())
            .service(UpdateSettingsRoute::<SqliteDatabase>::new())
            .service(UpdateSettingRoute::<SqliteDatabase>::new())
            .service(DeleteSettingRoute::<SqliteDatabase>::new())
            .service(payment_methods)
            .service(VerifyPaymentRoute::<SqliteDatabase>::new())
            .service(PaymentStatsRoute::<SqliteDatabase>::new())
            .service(webhook_scope);
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("topup::access_log"))
            .configure(configure_extractors)
            .app_data(web::Data::new(orders_api))
            .app_data(web::Data::new(auth_api))
            .app_data(web::Data::new(catalog_api))
            .app_data(web::Data::new(settings_api))
            .app_data(web::Data::new(jwt_signer))
            .app_data(web::Data::new(jwt_validator))
            .service(health)
            .service(api_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((host.as_str(), port))?
    .run();
    Ok(srv)
}
