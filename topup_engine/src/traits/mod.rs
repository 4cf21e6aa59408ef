//! # Backend contracts
//!
//! This module defines the behaviour that a database backend needs to expose in order to act as the store for the
//! top-up engine. [`SqliteDatabase`](crate::SqliteDatabase) implements all of them.
//!
//! * [`OrderManagement`] owns the order lifecycle: creation, status transitions, payment references and the
//!   role-scoped queries over orders. It builds on the other two read-side contracts, since orders snapshot product
//!   prices and reference users.
//! * [`CatalogManagement`] stores products.
//! * [`UserManagement`] stores user identities and credentials.
//! * [`SettingsManagement`] stores the site-wide key/value settings.
//!
//! Each trait comes with its own error type. The public APIs in [`crate::api`] return these errors unchanged, so
//! callers can match on the domain variants (e.g. `ProductNotFound`) directly.
mod catalog_management;
mod order_management;
mod settings_management;
mod user_management;

pub use catalog_management::{CatalogError, CatalogManagement};
pub use order_management::{OrderFlowError, OrderManagement};
pub use settings_management::{SettingsError, SettingsManagement};
pub use user_management::{AuthApiError, UserManagement};
