//! # Top-up engine public API
//!
//! The API is split by concern so that callers only need a backend that implements the traits a given API uses.
//!
//! * [`order_flow_api`] handles the order lifecycle: placement, manual orders, queries, status changes, payment
//!   references, gateway payments and the admin dashboard.
//! * [`auth_api`] manages registration, credentials and profiles.
//! * [`catalog_api`] manages the product catalog.
//! * [`settings_api`] manages site-wide settings.
//!
//! The remaining submodules hold the request and result types used by the APIs.
//!
//! # API usage
//!
//! ```rust,ignore
//! use topup_engine::{CatalogApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url("sqlite://data/topup_store.db", 5).await?;
//! let api = CatalogApi::new(db);
//! let products = api.active_products().await?;
//! ```

pub mod account_objects;
pub mod auth_api;
pub mod catalog_api;
pub mod order_flow_api;
pub mod order_objects;
pub mod payment_objects;
pub mod settings_api;
