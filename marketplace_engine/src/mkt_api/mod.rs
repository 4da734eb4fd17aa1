//! # Marketplace engine public API
//!
//! The `mkt_api` module exposes the programmatic API for the marketplace. Each API is a thin struct generic over the
//! backend traits it needs, so a caller only has to provide what it actually uses.
//!
//! * [`checkout_flow_api`] turns carts into purchases and settles them, either through an external payment provider
//!   or directly. It is the only API that changes a purchase's status.
//! * [`catalog_api`] lets sellers manage products and buyers browse them.
//! * [`purchases_api`] reads the purchase ledger: purchase histories and download libraries.
//! * [`payout_api`] derives seller earnings, analytics and platform totals from paid purchases.
//!
//! ```rust,ignore
//! use marketplace_engine::{CatalogApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url("sqlite://data/marketplace.db", 5).await?;
//! let api = CatalogApi::new(db);
//! let product = api.view_product(&product_id).await?;
//! ```

pub mod catalog_api;
pub mod checkout_flow_api;
pub mod checkout_objects;
pub mod errors;
pub mod payout_api;
pub mod payout_objects;
pub mod purchase_objects;
pub mod purchases_api;
