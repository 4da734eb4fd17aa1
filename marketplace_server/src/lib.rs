//! # Marketplace server
//! This crate hosts the HTTP server for the marketplace. It is responsible for:
//! * Serving the catalog to buyers, and letting sellers manage their listings.
//! * Turning carts into purchases and handing buyers off to the payment provider's hosted checkout.
//! * Listening for the payment provider's webhook notifications, and settling purchases exactly once.
//! * Reporting seller earnings and platform statistics.
//!
//! All of the business logic lives in `marketplace_engine`. The handlers here only translate between HTTP and the
//! engine's APIs.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/api/...`: Catalog, seller, checkout, buyer and admin routes. See [routes](routes/index.html).
//! * `/stripe/webhook`: Stripe's event notifications.
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod helpers;
pub mod integrations;
pub mod routes;
pub mod server;
pub mod stripe_routes;

#[cfg(test)]
mod endpoint_tests;
