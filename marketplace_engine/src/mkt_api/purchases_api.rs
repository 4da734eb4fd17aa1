use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{PaymentStatus, Purchase, PurchaseId},
    mkt_api::{
        errors::ReportingError,
        purchase_objects::{DownloadEntry, PurchaseHistory},
    },
    traits::{PurchaseManagement, PurchaseQueryFilter},
};

/// Read access to the purchase ledger.
pub struct PurchasesApi<B> {
    db: B,
}

impl<B: Debug> Debug for PurchasesApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PurchasesApi ({:?})", self.db)
    }
}

impl<B> PurchasesApi<B>
where B: PurchaseManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub async fn purchase_by_id(&self, id: &PurchaseId) -> Result<Option<Purchase>, ReportingError> {
        Ok(self.db.fetch_purchase(id).await?)
    }

    pub async fn purchases_for_buyer(&self, buyer_email: &str) -> Result<PurchaseHistory, ReportingError> {
        let filter = PurchaseQueryFilter::default().with_buyer_email(buyer_email);
        let purchases = self.db.search_purchases(filter).await?;
        trace!("{} purchases found for {buyer_email}", purchases.len());
        Ok(PurchaseHistory { buyer_email: buyer_email.to_string(), purchases })
    }

    /// The buyer's library: one entry per line item of every paid purchase, newest first.
    pub async fn downloads_for_buyer(&self, buyer_email: &str) -> Result<Vec<DownloadEntry>, ReportingError> {
        let filter = PurchaseQueryFilter::default().with_buyer_email(buyer_email).with_status(PaymentStatus::Paid);
        let purchases = self.db.search_purchases(filter).await?;
        Ok(purchases.iter().flat_map(DownloadEntry::entries_for).collect())
    }

    pub async fn search_purchases(&self, filter: PurchaseQueryFilter) -> Result<Vec<Purchase>, ReportingError> {
        if let (Some(since), Some(until)) = (filter.since, filter.until) {
            if since > until {
                return Err(ReportingError::QueryError(format!("{since} is after {until}")));
            }
        }
        Ok(self.db.search_purchases(filter).await?)
    }
}
