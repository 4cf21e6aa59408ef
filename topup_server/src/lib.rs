//! # Top-up server
//! This crate hosts the HTTP server for the top-up store. It is responsible for:
//! Authenticating customers and admins, and issuing their access tokens.
//! Exposing the catalog, order, settings and payment operations of the [`topup_engine`] as a JSON API.
//! Receiving payment notifications from the payment gateway, and checking that they really come from the gateway
//! before any order is touched.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/api/...`: The JSON API. See [routes](routes/index.html) for the full list.
//! * `/api/payments/webhook/bkash`: The webhook route for receiving payment notifications from bKash.

pub mod auth;
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod helpers;
pub mod middleware;
pub mod routes;
pub mod server;
