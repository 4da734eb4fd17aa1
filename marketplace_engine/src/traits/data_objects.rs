use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::db_types::{PaymentProviderKind, PaymentStatus, ProductStatus, Purchase};

pub const DEFAULT_SEARCH_LIMIT: i64 = 50;

#[derive(Debug, Clone)]
pub enum TransitionResult {
    /// This call performed the transition (and its side effects)
    Applied(Purchase),
    /// The purchase was not in the transition's source state, so nothing changed
    Unchanged(Purchase),
}

impl TransitionResult {
    pub fn purchase(&self) -> &Purchase {
        match self {
            Self::Applied(p) | Self::Unchanged(p) => p,
        }
    }

    pub fn into_purchase(self) -> Purchase {
        match self {
            Self::Applied(p) | Self::Unchanged(p) => p,
        }
    }

    pub fn was_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }
}

/// Criteria for a catalog search. With no statuses given, suspended products are excluded.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductQueryFilter {
    /// Case-insensitive title substring
    pub search: Option<String>,
    pub category: Option<String>,
    pub seller_id: Option<String>,
    pub statuses: Option<Vec<ProductStatus>>,
    pub limit: Option<i64>,
}

impl ProductQueryFilter {
    pub fn with_search<S: Into<String>>(mut self, search: S) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn with_category<S: Into<String>>(mut self, category: S) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_seller_id<S: Into<String>>(mut self, seller_id: S) -> Self {
        self.seller_id = Some(seller_id.into());
        self
    }

    pub fn with_status(mut self, status: ProductStatus) -> Self {
        self.statuses.get_or_insert_with(Vec::new).push(status);
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn statuses_or_default(&self) -> Vec<ProductStatus> {
        match &self.statuses {
            Some(s) if !s.is_empty() => s.clone(),
            _ => vec![ProductStatus::Draft, ProductStatus::Active],
        }
    }

    pub fn limit_or_default(&self) -> i64 {
        self.limit.filter(|l| *l > 0).unwrap_or(DEFAULT_SEARCH_LIMIT)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PurchaseQueryFilter {
    pub buyer_email: Option<String>,
    pub statuses: Option<Vec<PaymentStatus>>,
    pub provider: Option<PaymentProviderKind>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl PurchaseQueryFilter {
    pub fn with_buyer_email<S: Into<String>>(mut self, email: S) -> Self {
        self.buyer_email = Some(email.into());
        self
    }

    pub fn with_status(mut self, status: PaymentStatus) -> Self {
        self.statuses.get_or_insert_with(Vec::new).push(status);
        self
    }

    pub fn with_provider(mut self, provider: PaymentProviderKind) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn with_since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn with_until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.buyer_email.is_none() &&
            self.statuses.as_ref().map(|s| s.is_empty()).unwrap_or(true) &&
            self.provider.is_none() &&
            self.since.is_none() &&
            self.until.is_none()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct SellerProductStats {
    pub products: i64,
    pub views: i64,
    pub sales: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct CatalogCounts {
    pub products: i64,
    pub sellers: i64,
}
