//! # Backend contracts
//!
//! This module defines the behaviour a storage backend must expose to drive the marketplace engine.
//!
//! ## Catalog
//! Products, their lifecycle and aggregate stats, and the seller payout-account registry. Checkout reads the catalog
//! through [`CatalogManagement::resolve_products`], which only ever returns *active* products.
//!
//! ## Purchases
//! The purchase ledger. Purchases are inserted as `pending` and afterwards only change through
//! [`MarketplaceDatabase::apply_transition`], which takes a [`StatusTransition`](crate::db_types::StatusTransition)
//! rather than an arbitrary status.
//!
//! ## Traits
//! * [`MarketplaceDatabase`] is the top-level backend trait. It owns the cross-table settlement transaction.
//! * [`CatalogManagement`] manages products and sellers.
//! * [`PurchaseManagement`] stores and queries purchases.
//! * [`PaymentProvider`] is the seam to an external hosted-checkout provider. It is not a storage trait, but lives here
//!   because the checkout flow is generic over it in the same way it is generic over the database.
mod catalog_management;
mod data_objects;
mod marketplace_database;
mod payment_provider;
mod purchase_management;

pub use catalog_management::{CatalogError, CatalogManagement};
pub use data_objects::{CatalogCounts, ProductQueryFilter, PurchaseQueryFilter, SellerProductStats, TransitionResult};
pub use marketplace_database::MarketplaceDatabase;
pub use payment_provider::{PaymentProvider, ProviderError, ProviderSession};
pub use purchase_management::{PurchaseError, PurchaseManagement};
