//! Seller earnings and platform reporting.
//!
//! Everything here is derived from the purchase ledger at query time. Only `paid` purchases count towards revenue and
//! payouts, so a refunded purchase drops out of every figure without any bookkeeping. Amounts are never summed across
//! currencies.

use std::{
    collections::{BTreeMap, HashSet},
    fmt::Debug,
};

use log::*;
use mkt_common::Cents;

use crate::{
    db_types::{PaymentStatus, Purchase},
    mkt_api::{
        errors::ReportingError,
        payout_objects::{conversion_rate, CommissionRate, PayoutAccrual, PlatformStats, SellerAnalytics, SellerPayouts},
    },
    traits::{CatalogManagement, PurchaseManagement, PurchaseQueryFilter},
};

pub struct PayoutApi<B> {
    db: B,
    commission: CommissionRate,
}

impl<B: Debug> Debug for PayoutApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PayoutApi ({:?}, {})", self.db, self.commission)
    }
}

#[derive(Default)]
struct Tally {
    gross: Cents,
    purchases: HashSet<String>,
    units: i64,
}

/// seller -> currency -> tally
type Ledger = BTreeMap<String, BTreeMap<String, Tally>>;

fn tally(purchases: &[Purchase], seller_id: Option<&str>) -> Ledger {
    let mut ledger = Ledger::new();
    for purchase in purchases.iter().filter(|p| p.payment_status == PaymentStatus::Paid) {
        for item in &purchase.items {
            if seller_id.map(|s| s != item.seller_id).unwrap_or(false) {
                continue;
            }
            let entry = ledger
                .entry(item.seller_id.clone())
                .or_default()
                .entry(item.currency.to_lowercase())
                .or_default();
            entry.gross += item.line_total();
            entry.units += item.quantity;
            entry.purchases.insert(purchase.id.to_string());
        }
    }
    ledger
}

impl<B> PayoutApi<B>
where B: CatalogManagement + PurchaseManagement
{
    pub fn new(db: B, commission: CommissionRate) -> Self {
        Self { db, commission }
    }

    pub fn commission(&self) -> CommissionRate {
        self.commission
    }

    async fn paid_purchases(&self) -> Result<Vec<Purchase>, ReportingError> {
        let filter = PurchaseQueryFilter::default().with_status(PaymentStatus::Paid);
        Ok(self.db.search_purchases(filter).await?)
    }

    fn accruals(&self, by_currency: BTreeMap<String, Tally>) -> Vec<PayoutAccrual> {
        by_currency
            .into_iter()
            .map(|(currency, t)| {
                let commission = self.commission.commission_on(t.gross);
                PayoutAccrual {
                    currency,
                    gross: t.gross,
                    commission,
                    net: t.gross - commission,
                    purchase_count: t.purchases.len() as i64,
                    units_sold: t.units,
                }
            })
            .collect()
    }

    /// The seller's accrued earnings per currency, after commission.
    pub async fn payouts_for_seller(&self, seller_id: &str) -> Result<SellerPayouts, ReportingError> {
        let purchases = self.paid_purchases().await?;
        let by_currency = tally(&purchases, Some(seller_id)).remove(seller_id).unwrap_or_default();
        let accruals = self.accruals(by_currency);
        let payout_account_id = self.db.fetch_seller_account(seller_id).await?.map(|a| a.payout_account_id);
        debug!("💸️ {} payout currencies accrued for seller {seller_id}", accruals.len());
        Ok(SellerPayouts { seller_id: seller_id.to_string(), commission: self.commission, payout_account_id, accruals })
    }

    /// Accrued earnings for every seller with at least one paid sale, ordered by seller id.
    pub async fn payout_summary(&self) -> Result<Vec<SellerPayouts>, ReportingError> {
        let purchases = self.paid_purchases().await?;
        let mut result = Vec::new();
        for (seller_id, by_currency) in tally(&purchases, None) {
            let payout_account_id = self.db.fetch_seller_account(&seller_id).await?.map(|a| a.payout_account_id);
            let accruals = self.accruals(by_currency);
            result.push(SellerPayouts { seller_id, commission: self.commission, payout_account_id, accruals });
        }
        Ok(result)
    }

    pub async fn seller_analytics(&self, seller_id: &str) -> Result<SellerAnalytics, ReportingError> {
        let stats = self.db.seller_product_stats(seller_id).await?;
        let purchases = self.paid_purchases().await?;
        let revenue = tally(&purchases, Some(seller_id))
            .remove(seller_id)
            .unwrap_or_default()
            .into_iter()
            .map(|(currency, t)| (currency, t.gross))
            .collect();
        Ok(SellerAnalytics {
            seller_id: seller_id.to_string(),
            products: stats.products,
            views: stats.views,
            sales: stats.sales,
            revenue,
            conversion_rate: conversion_rate(stats.sales, stats.views),
        })
    }

    pub async fn platform_stats(&self) -> Result<PlatformStats, ReportingError> {
        let counts = self.db.catalog_counts().await?;
        let purchases = self.paid_purchases().await?;
        let mut revenue = BTreeMap::<String, Cents>::new();
        for p in &purchases {
            *revenue.entry(p.currency.to_lowercase()).or_default() += p.total_amount;
        }
        let commission = revenue.iter().map(|(c, v)| (c.clone(), self.commission.commission_on(*v))).collect();
        Ok(PlatformStats {
            sellers: counts.sellers,
            products: counts.products,
            paid_purchases: purchases.len() as i64,
            revenue,
            commission,
        })
    }
}
