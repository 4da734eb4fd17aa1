use std::collections::HashMap;

use marketplace_engine::{
    db_types::{CatalogEntry, NewProduct, Product, ProductId, ProductUpdate, SellerAccount},
    traits::{CatalogCounts, CatalogError, CatalogManagement, ProductQueryFilter, SellerProductStats},
};
use mockall::mock;

mock! {
    pub CatalogManager {}
    impl CatalogManagement for CatalogManager {
        async fn insert_product(&self, product: NewProduct) -> Result<Product, CatalogError>;
        async fn update_product(&self, id: &ProductId, update: ProductUpdate) -> Result<Option<Product>, CatalogError>;
        async fn fetch_product(&self, id: &ProductId) -> Result<Option<Product>, CatalogError>;
        async fn search_products(&self, filter: ProductQueryFilter) -> Result<Vec<Product>, CatalogError>;
        async fn resolve_products(&self, ids: &[ProductId]) -> Result<HashMap<ProductId, CatalogEntry>, CatalogError>;
        async fn increment_views(&self, id: &ProductId) -> Result<bool, CatalogError>;
        async fn increment_sales(&self, id: &ProductId, delta: i64) -> Result<bool, CatalogError>;
        async fn seller_product_stats(&self, seller_id: &str) -> Result<SellerProductStats, CatalogError>;
        async fn catalog_counts(&self) -> Result<CatalogCounts, CatalogError>;
        async fn upsert_seller_account(&self, seller_id: &str, payout_account_id: &str) -> Result<SellerAccount, CatalogError>;
        async fn fetch_seller_account(&self, seller_id: &str) -> Result<Option<SellerAccount>, CatalogError>;
    }
}
