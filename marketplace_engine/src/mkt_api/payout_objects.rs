use std::{collections::BTreeMap, fmt::Display, str::FromStr};

use mkt_common::Cents;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_COMMISSION_BPS: i64 = 1_000;

/// The platform's cut of each sale, in basis points (1/100th of a percent).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommissionRate(i64);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid commission rate: {0}")]
pub struct CommissionRateError(String);

impl CommissionRate {
    pub fn from_bps(bps: i64) -> Result<Self, CommissionRateError> {
        if (0..=10_000).contains(&bps) {
            Ok(Self(bps))
        } else {
            Err(CommissionRateError(format!("{bps} basis points is outside 0-10000")))
        }
    }

    pub fn bps(&self) -> i64 {
        self.0
    }

    pub fn commission_on(&self, gross: Cents) -> Cents {
        gross.basis_points(self.0)
    }
}

impl Default for CommissionRate {
    fn default() -> Self {
        Self(DEFAULT_COMMISSION_BPS)
    }
}

/// Parses a percentage with at most two decimal places, e.g. `"10"` or `"12.5"`.
impl FromStr for CommissionRate {
    type Err = CommissionRateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // A percentage to two places is a whole number of basis points, which is exactly what Cents parses
        let bps = Cents::from_str(s.trim().trim_end_matches('%')).map_err(|e| CommissionRateError(e.to_string()))?;
        Self::from_bps(bps.value())
    }
}

impl Display for CommissionRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}%", Cents::from(self.0))
    }
}

/// What a seller has earned in one currency, over all paid purchases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutAccrual {
    pub currency: String,
    pub gross: Cents,
    pub commission: Cents,
    pub net: Cents,
    /// Number of paid purchases containing at least one of the seller's items
    pub purchase_count: i64,
    pub units_sold: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SellerPayouts {
    pub seller_id: String,
    pub commission: CommissionRate,
    pub payout_account_id: Option<String>,
    pub accruals: Vec<PayoutAccrual>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SellerAnalytics {
    pub seller_id: String,
    pub products: i64,
    pub views: i64,
    pub sales: i64,
    /// Gross revenue from paid purchases, by currency
    pub revenue: BTreeMap<String, Cents>,
    /// Sales per hundred views, to two decimal places. Zero when there are no views.
    pub conversion_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformStats {
    pub sellers: i64,
    pub products: i64,
    pub paid_purchases: i64,
    pub revenue: BTreeMap<String, Cents>,
    pub commission: BTreeMap<String, Cents>,
}

pub fn conversion_rate(sales: i64, views: i64) -> f64 {
    if views <= 0 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let rate = sales as f64 / views as f64 * 100.0;
    (rate * 100.0).round() / 100.0
}
