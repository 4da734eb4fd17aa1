use std::collections::HashMap;

use thiserror::Error;

use crate::{
    db_types::{CatalogEntry, NewProduct, Product, ProductId, ProductUpdate, SellerAccount},
    traits::{CatalogCounts, ProductQueryFilter, SellerProductStats},
};

#[derive(Debug, Clone, Error)]
pub enum CatalogError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Product {0} does not exist")]
    ProductNotFound(ProductId),
    #[error("Product prices cannot be negative")]
    NegativePrice,
    #[error("Invalid product. {0}")]
    InvalidProduct(String),
    #[error("Stats can only be incremented by a positive amount, not {0}")]
    InvalidIncrement(i64),
    #[error("The product update request contained no changes")]
    UpdateNoOp,
}

impl From<sqlx::Error> for CatalogError {
    fn from(e: sqlx::Error) -> Self {
        CatalogError::DatabaseError(e.to_string())
    }
}

#[allow(async_fn_in_trait)]
pub trait CatalogManagement {
    /// Stores a new product with zeroed stats and returns the full record.
    async fn insert_product(&self, product: NewProduct) -> Result<Product, CatalogError>;

    /// Applies a seller edit. Stats are never touched by this call. Returns `None` if the product does not exist.
    async fn update_product(&self, id: &ProductId, update: ProductUpdate) -> Result<Option<Product>, CatalogError>;

    async fn fetch_product(&self, id: &ProductId) -> Result<Option<Product>, CatalogError>;

    async fn search_products(&self, filter: ProductQueryFilter) -> Result<Vec<Product>, CatalogError>;

    /// A single point-in-time read of the *active* products among `ids`. Ids that do not exist, or whose product is
    /// not active, are absent from the result.
    async fn resolve_products(&self, ids: &[ProductId]) -> Result<HashMap<ProductId, CatalogEntry>, CatalogError>;

    /// Atomically adds one to the view counter. Returns `false` if the product does not exist.
    async fn increment_views(&self, id: &ProductId) -> Result<bool, CatalogError>;

    /// Atomically adds `delta` to the sales counter. `delta` must be positive. Returns `false` if the product does not
    /// exist.
    async fn increment_sales(&self, id: &ProductId, delta: i64) -> Result<bool, CatalogError>;

    /// Product count and summed stats over all of a seller's products, suspended ones included.
    async fn seller_product_stats(&self, seller_id: &str) -> Result<SellerProductStats, CatalogError>;

    async fn catalog_counts(&self) -> Result<CatalogCounts, CatalogError>;

    /// Records (or replaces) the external payout account for a seller.
    async fn upsert_seller_account(
        &self,
        seller_id: &str,
        payout_account_id: &str,
    ) -> Result<SellerAccount, CatalogError>;

    async fn fetch_seller_account(&self, seller_id: &str) -> Result<Option<SellerAccount>, CatalogError>;
}
