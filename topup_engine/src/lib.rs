//! Top-up Engine
//!
//! The engine holds the business rules of the top-up store: customers buy in-game currency packages from a product
//! catalog, pay through a mobile payment provider, and admins (or the payment gateway) confirm payment. It knows
//! nothing about HTTP.
//!
//! The library is divided into these sections:
//! 1. Backend traits ([`mod@traits`]) describe the storage each API needs. [`SqliteDatabase`] implements all of them.
//!    The row types shared by every backend live in [`mod@db_types`].
//! 2. The public API ([`mod@api`]). [`OrderFlowApi`] runs the order lifecycle; [`AuthApi`], [`CatalogApi`] and
//!    [`SettingsApi`] cover users, products and site settings.
//!
//! When an order is completed, an [`events::OrderCompletedEvent`] is published to any hooks registered in
//! [`events::EventHooks`].
pub mod api;
pub mod db_types;
pub mod events;
pub mod helpers;
#[cfg(feature = "sqlite")]
pub mod sqlite;
pub mod traits;
pub mod validation;

#[cfg(feature = "test_utils")]
pub mod test_utils;

pub use api::{
    auth_api::AuthApi,
    catalog_api::CatalogApi,
    order_flow_api::OrderFlowApi,
    order_objects,
    payment_objects,
    settings_api::SettingsApi,
};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use traits::{
    AuthApiError,
    CatalogError,
    CatalogManagement,
    OrderFlowError,
    OrderManagement,
    SettingsError,
    SettingsManagement,
    UserManagement,
};
