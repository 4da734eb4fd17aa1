//! A small client for the parts of the Stripe REST API the marketplace uses:
//!
//! * Hosted checkout sessions ([`StripeApi::create_checkout_session`]).
//! * Express connected accounts and their onboarding links, used to register sellers for payouts.
//!
//! Webhook signature verification lives in the marketplace engine, since it has no need for an HTTP client.
mod api;
mod config;
mod error;

mod data_objects;

pub use api::StripeApi;
pub use config::StripeConfig;
pub use data_objects::{AccountLink, CheckoutSession, ConnectedAccount, NewCheckoutSession, SessionLineItem};
pub use error::StripeApiError;
