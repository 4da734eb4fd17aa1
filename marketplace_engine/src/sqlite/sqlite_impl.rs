//! `SqliteDatabase` is a concrete implementation of a marketplace engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the traits defined in the [`traits`] module.
use std::{collections::HashMap, fmt::Debug};

use log::*;
use sqlx::{migrate::MigrateError, SqlitePool};

use super::db::{db_url, new_pool, products, purchases, sellers};
use crate::{
    db_types::{
        CatalogEntry,
        NewProduct,
        NewPurchase,
        Product,
        ProductId,
        ProductUpdate,
        Purchase,
        PurchaseId,
        SellerAccount,
        StatusTransition,
    },
    traits::{
        CatalogCounts,
        CatalogError,
        CatalogManagement,
        MarketplaceDatabase,
        ProductQueryFilter,
        PurchaseError,
        PurchaseManagement,
        PurchaseQueryFilter,
        SellerProductStats,
        TransitionResult,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object using the `MKT_DATABASE_URL` environment variable, or the default.
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(&url, max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("🗃️ Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    /// Brings the schema up to date using the embedded migrations.
    pub async fn migrate(&self) -> Result<(), MigrateError> {
        sqlx::migrate!("./src/sqlite/migrations").run(&self.pool).await?;
        debug!("🗃️ Database migrations are up to date");
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl MarketplaceDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn apply_transition(
        &self,
        id: &PurchaseId,
        transition: StatusTransition,
        transaction_id: Option<&str>,
    ) -> Result<TransitionResult, PurchaseError> {
        let mut tx = self.pool.begin().await?;
        let result = match purchases::transition_status(id, transition, transaction_id, &mut tx).await? {
            Some(purchase) => {
                if transition == StatusTransition::Settle {
                    for item in &purchase.items {
                        let found = products::increment_sales(&item.product_id, item.quantity, &mut tx).await?;
                        if !found {
                            warn!(
                                "🗃️ Purchase {id} contains product {}, which no longer exists. No sales were recorded \
                                 for it.",
                                item.product_id
                            );
                        }
                    }
                }
                debug!(
                    "🗃️ Purchase {id} moved from {} to {}",
                    transition.from_status(),
                    transition.to_status()
                );
                TransitionResult::Applied(purchase)
            },
            None => {
                let current = purchases::fetch_purchase(id, &mut tx)
                    .await?
                    .ok_or_else(|| PurchaseError::PurchaseNotFound(id.clone()))?;
                trace!("🗃️ Purchase {id} is {}. {transition:?} was not applied.", current.payment_status);
                TransitionResult::Unchanged(current)
            },
        };
        tx.commit().await?;
        Ok(result)
    }
}

impl CatalogManagement for SqliteDatabase {
    async fn insert_product(&self, product: NewProduct) -> Result<Product, CatalogError> {
        if product.price.is_negative() {
            return Err(CatalogError::NegativePrice);
        }
        let mut conn = self.pool.acquire().await?;
        let product = products::insert_product(product, &mut conn).await?;
        Ok(product)
    }

    async fn update_product(&self, id: &ProductId, update: ProductUpdate) -> Result<Option<Product>, CatalogError> {
        if update.is_empty() {
            return Err(CatalogError::UpdateNoOp);
        }
        if update.price.map(|p| p.is_negative()).unwrap_or(false) {
            return Err(CatalogError::NegativePrice);
        }
        let mut conn = self.pool.acquire().await?;
        let product = products::update_product(id, update, &mut conn).await?;
        Ok(product)
    }

    async fn fetch_product(&self, id: &ProductId) -> Result<Option<Product>, CatalogError> {
        let mut conn = self.pool.acquire().await?;
        let product = products::fetch_product(id, &mut conn).await?;
        Ok(product)
    }

    async fn search_products(&self, filter: ProductQueryFilter) -> Result<Vec<Product>, CatalogError> {
        let mut conn = self.pool.acquire().await?;
        let products = products::search_products(filter, &mut conn).await?;
        Ok(products)
    }

    async fn resolve_products(&self, ids: &[ProductId]) -> Result<HashMap<ProductId, CatalogEntry>, CatalogError> {
        let mut conn = self.pool.acquire().await?;
        let entries = products::resolve_active(ids, &mut conn).await?;
        trace!("🗃️ Resolved {} of {} requested products", entries.len(), ids.len());
        Ok(entries)
    }

    async fn increment_views(&self, id: &ProductId) -> Result<bool, CatalogError> {
        let mut conn = self.pool.acquire().await?;
        let found = products::increment_views(id, &mut conn).await?;
        Ok(found)
    }

    async fn increment_sales(&self, id: &ProductId, delta: i64) -> Result<bool, CatalogError> {
        if delta <= 0 {
            return Err(CatalogError::InvalidIncrement(delta));
        }
        let mut conn = self.pool.acquire().await?;
        let found = products::increment_sales(id, delta, &mut conn).await?;
        Ok(found)
    }

    async fn seller_product_stats(&self, seller_id: &str) -> Result<SellerProductStats, CatalogError> {
        let mut conn = self.pool.acquire().await?;
        let stats = products::seller_product_stats(seller_id, &mut conn).await?;
        Ok(stats)
    }

    async fn catalog_counts(&self) -> Result<CatalogCounts, CatalogError> {
        let mut conn = self.pool.acquire().await?;
        let counts = products::catalog_counts(&mut conn).await?;
        Ok(counts)
    }

    async fn upsert_seller_account(
        &self,
        seller_id: &str,
        payout_account_id: &str,
    ) -> Result<SellerAccount, CatalogError> {
        let mut conn = self.pool.acquire().await?;
        let account = sellers::upsert_seller_account(seller_id, payout_account_id, &mut conn).await?;
        debug!("🗃️ Seller {seller_id} is linked to payout account {payout_account_id}");
        Ok(account)
    }

    async fn fetch_seller_account(&self, seller_id: &str) -> Result<Option<SellerAccount>, CatalogError> {
        let mut conn = self.pool.acquire().await?;
        let account = sellers::fetch_seller_account(seller_id, &mut conn).await?;
        Ok(account)
    }
}

impl PurchaseManagement for SqliteDatabase {
    async fn insert_purchase(&self, purchase: NewPurchase) -> Result<Purchase, PurchaseError> {
        let mut conn = self.pool.acquire().await?;
        purchases::insert_purchase(purchase, &mut conn).await
    }

    async fn fetch_purchase(&self, id: &PurchaseId) -> Result<Option<Purchase>, PurchaseError> {
        let mut conn = self.pool.acquire().await?;
        let purchase = purchases::fetch_purchase(id, &mut conn).await?;
        Ok(purchase)
    }

    async fn fetch_purchase_by_transaction_id(&self, transaction_id: &str) -> Result<Option<Purchase>, PurchaseError> {
        let mut conn = self.pool.acquire().await?;
        let purchase = purchases::fetch_purchase_by_transaction_id(transaction_id, &mut conn).await?;
        Ok(purchase)
    }

    async fn assign_transaction_id(&self, id: &PurchaseId, transaction_id: &str) -> Result<Purchase, PurchaseError> {
        let mut conn = self.pool.acquire().await?;
        purchases::assign_transaction_id(id, transaction_id, &mut conn).await
    }

    async fn search_purchases(&self, filter: PurchaseQueryFilter) -> Result<Vec<Purchase>, PurchaseError> {
        let mut conn = self.pool.acquire().await?;
        let purchases = purchases::search_purchases(filter, &mut conn).await?;
        Ok(purchases)
    }
}
