//! Seller-facing catalog management and buyer-facing browsing.

use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{NewProduct, Product, ProductId, ProductStatus, ProductUpdate, SellerAccount},
    traits::{CatalogError, CatalogManagement, ProductQueryFilter},
};

pub struct CatalogApi<B> {
    db: B,
}

impl<B: Debug> Debug for CatalogApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CatalogApi ({:?})", self.db)
    }
}

impl<B> CatalogApi<B>
where B: CatalogManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub async fn create_product(&self, product: NewProduct) -> Result<Product, CatalogError> {
        if product.price.is_negative() {
            return Err(CatalogError::NegativePrice);
        }
        if product.title.trim().is_empty() {
            return Err(CatalogError::InvalidProduct("A product must have a title".into()));
        }
        if product.seller_id.trim().is_empty() {
            return Err(CatalogError::InvalidProduct("A product must have a seller".into()));
        }
        let product = self.db.insert_product(product).await?;
        info!("📦️ Product {} ({}) created for seller {}", product.id, product.title, product.seller_id);
        Ok(product)
    }

    /// Applies a seller's edit to a product. Stats cannot be edited.
    pub async fn update_product(&self, id: &ProductId, update: ProductUpdate) -> Result<Product, CatalogError> {
        if update.is_empty() {
            return Err(CatalogError::UpdateNoOp);
        }
        if update.price.map(|p| p.is_negative()).unwrap_or(false) {
            return Err(CatalogError::NegativePrice);
        }
        if update.title.as_deref().map(|t| t.trim().is_empty()).unwrap_or(false) {
            return Err(CatalogError::InvalidProduct("A product must have a title".into()));
        }
        let product =
            self.db.update_product(id, update).await?.ok_or_else(|| CatalogError::ProductNotFound(id.clone()))?;
        debug!("📦️ Product {id} updated");
        Ok(product)
    }

    /// Takes a product off sale. It stays in the catalog, and in every purchase that already contains it.
    pub async fn suspend_product(&self, id: &ProductId) -> Result<Product, CatalogError> {
        let update = ProductUpdate::default().with_status(ProductStatus::Suspended);
        let product = self.update_product(id, update).await?;
        info!("📦️ Product {id} suspended");
        Ok(product)
    }

    /// Fetches a product regardless of its status. Does not count as a view.
    pub async fn product_by_id(&self, id: &ProductId) -> Result<Option<Product>, CatalogError> {
        self.db.fetch_product(id).await
    }

    /// The public product page. Only active products are visible, and each visit increments the view counter.
    pub async fn view_product(&self, id: &ProductId) -> Result<Option<Product>, CatalogError> {
        match self.db.fetch_product(id).await? {
            Some(p) if p.status == ProductStatus::Active => {},
            _ => return Ok(None),
        }
        if !self.db.increment_views(id).await? {
            return Ok(None);
        }
        self.db.fetch_product(id).await
    }

    /// Public catalog search. Only active products are returned, whatever statuses the filter asks for.
    pub async fn browse_products(&self, filter: ProductQueryFilter) -> Result<Vec<Product>, CatalogError> {
        let filter = ProductQueryFilter { statuses: Some(vec![ProductStatus::Active]), ..filter };
        self.db.search_products(filter).await
    }

    pub async fn search_products(&self, filter: ProductQueryFilter) -> Result<Vec<Product>, CatalogError> {
        self.db.search_products(filter).await
    }

    /// Every product a seller owns, in any status.
    pub async fn seller_products(&self, seller_id: &str) -> Result<Vec<Product>, CatalogError> {
        let filter = ProductQueryFilter::default()
            .with_seller_id(seller_id)
            .with_status(ProductStatus::Draft)
            .with_status(ProductStatus::Active)
            .with_status(ProductStatus::Suspended);
        self.db.search_products(filter).await
    }

    pub async fn link_payout_account(
        &self,
        seller_id: &str,
        payout_account_id: &str,
    ) -> Result<SellerAccount, CatalogError> {
        let account = self.db.upsert_seller_account(seller_id, payout_account_id).await?;
        info!("📦️ Seller {seller_id} is linked to payout account {payout_account_id}");
        Ok(account)
    }

    pub async fn payout_account(&self, seller_id: &str) -> Result<Option<SellerAccount>, CatalogError> {
        self.db.fetch_seller_account(seller_id).await
    }
}
