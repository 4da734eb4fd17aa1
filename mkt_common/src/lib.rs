//! Shared primitives for the marketplace crates.
//!
//! * [`Cents`] is the money type used everywhere an amount is stored or computed. Amounts are held in the minor unit
//!   of their currency, so no floating point arithmetic is ever involved in pricing or settlement.
//! * [`Secret`] wraps configuration values that must never end up in logs.
mod cents;

pub mod helpers;
pub mod op;
mod secret;

pub use cents::{Cents, CentsParseError, DEFAULT_CURRENCY_CODE};
pub use secret::Secret;
