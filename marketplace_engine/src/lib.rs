//! Marketplace Engine
//!
//! The marketplace engine holds the core logic of a digital goods marketplace: the product catalog, the purchase
//! ledger, checkout and settlement, and seller payout accrual. It is transport-agnostic; the HTTP surface lives in
//! `marketplace_server`.
//!
//! The library is divided into three main sections:
//! 1. Backend contracts ([`mod@traits`]) and the SQLite implementation of them ([`SqliteDatabase`]). You should
//!    never need to access the database directly. Use the public API instead. The data types stored in the database
//!    are defined in [`mod@db_types`] and are public.
//! 2. The public API ([`mod@mkt_api`]). [`CheckoutFlowApi`] is the only component that changes a purchase's payment
//!    status, and it does so through a small set of guarded transitions, so a purchase's side effects (sales counters
//!    and payout accrual) are applied exactly once however often the provider notifies us.
//! 3. Events ([`mod@events`]). Subscribers are told when a purchase is paid or annulled, after the change has been
//!    committed.
pub mod db_types;
pub mod events;
pub mod helpers;
pub mod mkt_api;
#[cfg(feature = "sqlite")]
pub mod sqlite;
pub mod traits;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use mkt_api::{
    catalog_api::CatalogApi,
    checkout_flow_api::{CheckoutFlowApi, SettlementConfig},
    checkout_objects,
    errors::{CheckoutError, ReportingError},
    payout_api::PayoutApi,
    payout_objects,
    purchase_objects,
    purchases_api::PurchasesApi,
};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
