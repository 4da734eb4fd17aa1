use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db_types::{ProductId, Purchase, PurchaseId};

/// One downloadable file in a buyer's library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadEntry {
    pub purchase_id: PurchaseId,
    pub product_id: ProductId,
    pub title: String,
    pub quantity: i64,
    pub download_url: String,
    pub download_limit: i64,
    pub purchased_at: DateTime<Utc>,
}

impl DownloadEntry {
    /// One entry per line item of a paid purchase.
    pub fn entries_for(purchase: &Purchase) -> Vec<Self> {
        purchase
            .items
            .iter()
            .map(|item| Self {
                purchase_id: purchase.id.clone(),
                product_id: item.product_id.clone(),
                title: item.title.clone(),
                quantity: item.quantity,
                download_url: download_url(&item.product_id, &purchase.id),
                download_limit: purchase.download_limit,
                purchased_at: purchase.created_at,
            })
            .collect()
    }
}

pub fn download_url(product_id: &ProductId, purchase_id: &PurchaseId) -> String {
    format!("/api/downloads/{product_id}?purchase={purchase_id}")
}

/// A buyer's purchase history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseHistory {
    pub buyer_email: String,
    pub purchases: Vec<Purchase>,
}
