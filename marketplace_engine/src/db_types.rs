//! Data types shared between the engine APIs and the database backends.
//!
//! Amounts are [`Cents`]. Identifiers are opaque strings generated by the engine, so they can be handed out to clients
//! without leaking row counts.
use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
pub use mkt_common::Cents;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

fn random_suffix() -> String {
    format!("{:016x}{:016x}", rand::random::<u64>(), rand::random::<u64>())
}

#[derive(Debug, Clone, Error)]
#[error("Invalid value for {kind}: {value}")]
pub struct ConversionError {
    pub kind: &'static str,
    pub value: String,
}

//--------------------------------------       ProductId       --------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct ProductId(String);

impl ProductId {
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self(id.into())
    }

    pub fn random() -> Self {
        Self(format!("prod_{}", random_suffix()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ProductId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ProductId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for ProductId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

//--------------------------------------       PurchaseId      --------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct PurchaseId(String);

impl PurchaseId {
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self(id.into())
    }

    pub fn random() -> Self {
        Self(format!("pur_{}", random_suffix()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PurchaseId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for PurchaseId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for PurchaseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

//--------------------------------------     ProductStatus     --------------------------------------------------------
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    /// Visible to the seller only
    Draft,
    /// Listed and purchasable
    #[default]
    Active,
    /// Delisted. Products are never hard-deleted, so this doubles as the "deleted" state.
    Suspended,
}

impl Display for ProductStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Draft => write!(f, "draft"),
            Self::Active => write!(f, "active"),
            Self::Suspended => write!(f, "suspended"),
        }
    }
}

impl FromStr for ProductStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "draft" => Ok(Self::Draft),
            "active" => Ok(Self::Active),
            "suspended" => Ok(Self::Suspended),
            _ => Err(ConversionError { kind: "product status", value: s.to_string() }),
        }
    }
}

//--------------------------------------     PaymentStatus     --------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// Created at checkout. Awaiting settlement.
    Pending,
    /// Settled. The settlement side effects have been applied exactly once.
    Paid,
    /// The provider reported that payment will not happen.
    Failed,
    /// A paid purchase that was reversed by an administrator.
    Refunded,
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Paid => write!(f, "paid"),
            Self::Failed => write!(f, "failed"),
            Self::Refunded => write!(f, "refunded"),
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "failed" => Ok(Self::Failed),
            "refunded" => Ok(Self::Refunded),
            _ => Err(ConversionError { kind: "payment status", value: s.to_string() }),
        }
    }
}

//--------------------------------------    StatusTransition   --------------------------------------------------------
/// The complete set of payment status changes a purchase can go through.
///
/// Storage backends only accept a `StatusTransition`, never a bare target status, so an invalid change cannot be
/// expressed to the database layer. Requests that arrive as a `(from, to)` pair are validated by
/// [`StatusTransition::between`].
///
/// | From    | To       | Transition |
/// |---------|----------|------------|
/// | pending | paid     | `Settle`   |
/// | pending | failed   | `Fail`     |
/// | paid    | refunded | `Refund`   |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusTransition {
    Settle,
    Fail,
    Refund,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("A purchase cannot move from {from} to {to}")]
pub struct InvalidTransition {
    pub from: PaymentStatus,
    pub to: PaymentStatus,
}

impl StatusTransition {
    pub fn between(from: PaymentStatus, to: PaymentStatus) -> Result<Self, InvalidTransition> {
        use PaymentStatus::*;
        match (from, to) {
            (Pending, Paid) => Ok(Self::Settle),
            (Pending, Failed) => Ok(Self::Fail),
            (Paid, Refunded) => Ok(Self::Refund),
            _ => Err(InvalidTransition { from, to }),
        }
    }

    pub fn from_status(&self) -> PaymentStatus {
        match self {
            Self::Settle | Self::Fail => PaymentStatus::Pending,
            Self::Refund => PaymentStatus::Paid,
        }
    }

    pub fn to_status(&self) -> PaymentStatus {
        match self {
            Self::Settle => PaymentStatus::Paid,
            Self::Fail => PaymentStatus::Failed,
            Self::Refund => PaymentStatus::Refunded,
        }
    }
}

//--------------------------------------  PaymentProviderKind  --------------------------------------------------------
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentProviderKind {
    #[default]
    Stripe,
    Paypal,
}

impl Display for PaymentProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stripe => write!(f, "stripe"),
            Self::Paypal => write!(f, "paypal"),
        }
    }
}

impl FromStr for PaymentProviderKind {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stripe" => Ok(Self::Stripe),
            "paypal" => Ok(Self::Paypal),
            _ => Err(ConversionError { kind: "payment provider", value: s.to_string() }),
        }
    }
}

//--------------------------------------        Product        --------------------------------------------------------
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct ProductStats {
    pub views: i64,
    pub sales: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub seller_id: String,
    pub title: String,
    pub description: String,
    pub price: Cents,
    pub currency: String,
    pub category: Option<String>,
    #[sqlx(json)]
    pub tags: Vec<String>,
    pub preview_media_url: Option<String>,
    pub file_storage_key: Option<String>,
    pub status: ProductStatus,
    #[sqlx(flatten)]
    pub stats: ProductStats,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub seller_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub price: Cents,
    pub currency: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub preview_media_url: Option<String>,
    #[serde(default)]
    pub file_storage_key: Option<String>,
    #[serde(default)]
    pub status: ProductStatus,
}

impl NewProduct {
    pub fn new<S: Into<String>>(seller_id: S, title: S, price: Cents) -> Self {
        Self {
            seller_id: seller_id.into(),
            title: title.into(),
            description: String::default(),
            price,
            currency: mkt_common::DEFAULT_CURRENCY_CODE.to_string(),
            category: None,
            tags: Vec::new(),
            preview_media_url: None,
            file_storage_key: None,
            status: ProductStatus::Active,
        }
    }

    pub fn with_currency<S: Into<String>>(mut self, currency: S) -> Self {
        self.currency = currency.into();
        self
    }

    pub fn with_category<S: Into<String>>(mut self, category: S) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_status(mut self, status: ProductStatus) -> Self {
        self.status = status;
        self
    }
}

/// A seller edit. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<Cents>,
    pub currency: Option<String>,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
    pub preview_media_url: Option<String>,
    pub file_storage_key: Option<String>,
    pub status: Option<ProductStatus>,
}

impl ProductUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() &&
            self.description.is_none() &&
            self.price.is_none() &&
            self.currency.is_none() &&
            self.category.is_none() &&
            self.tags.is_none() &&
            self.preview_media_url.is_none() &&
            self.file_storage_key.is_none() &&
            self.status.is_none()
    }

    pub fn with_price(mut self, price: Cents) -> Self {
        self.price = Some(price);
        self
    }

    pub fn with_title<S: Into<String>>(mut self, title: S) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_status(mut self, status: ProductStatus) -> Self {
        self.status = Some(status);
        self
    }
}

/// The point-in-time view of an active product that checkout snapshots into a purchase.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: ProductId,
    pub title: String,
    pub price: Cents,
    pub currency: String,
    pub seller_id: String,
}

//--------------------------------------       Purchase        --------------------------------------------------------
/// A line item as it was at checkout time. Later edits to the product never change it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseItem {
    pub product_id: ProductId,
    pub title: String,
    pub unit_price: Cents,
    pub currency: String,
    pub seller_id: String,
    pub quantity: i64,
}

impl PurchaseItem {
    pub fn from_entry(entry: CatalogEntry, quantity: i64) -> Self {
        Self {
            product_id: entry.id,
            title: entry.title,
            unit_price: entry.price,
            currency: entry.currency,
            seller_id: entry.seller_id,
            quantity,
        }
    }

    /// `unit price × quantity`. Items of a stored purchase always fit, because their total was checked at checkout.
    pub fn line_total(&self) -> Cents {
        self.checked_line_total().unwrap_or_default()
    }

    pub fn checked_line_total(&self) -> Option<Cents> {
        self.unit_price.checked_mul(self.quantity)
    }
}

pub const DEFAULT_DOWNLOAD_LIMIT: i64 = 10;

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Purchase {
    pub id: PurchaseId,
    pub buyer_email: String,
    #[sqlx(json)]
    pub items: Vec<PurchaseItem>,
    pub total_amount: Cents,
    pub currency: String,
    pub provider: PaymentProviderKind,
    pub payment_status: PaymentStatus,
    /// The provider's session or transaction reference. Unique when present.
    pub transaction_id: Option<String>,
    pub download_limit: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Purchase {
    /// The line items sold by `seller_id`
    pub fn items_for_seller<'a>(&'a self, seller_id: &'a str) -> impl Iterator<Item = &'a PurchaseItem> + 'a {
        self.items.iter().filter(move |i| i.seller_id == seller_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPurchase {
    pub id: PurchaseId,
    pub buyer_email: String,
    pub items: Vec<PurchaseItem>,
    pub total_amount: Cents,
    pub currency: String,
    pub provider: PaymentProviderKind,
    pub created_at: DateTime<Utc>,
}

impl NewPurchase {
    /// Builds a pending purchase from a snapshot. The total is computed here, once, and never again.
    ///
    /// All items are expected to share a currency; the currency of the first item is used. Returns `None` if the
    /// total does not fit in [`Cents`].
    pub fn new(buyer_email: String, provider: PaymentProviderKind, items: Vec<PurchaseItem>) -> Option<Self> {
        let total_amount = items
            .iter()
            .try_fold(Cents::default(), |total, item| item.checked_line_total().and_then(|t| total.checked_add(t)))?;
        let currency = items
            .first()
            .map(|i| i.currency.clone())
            .unwrap_or_else(|| mkt_common::DEFAULT_CURRENCY_CODE.to_string());
        let created_at = Utc::now();
        Some(Self { id: PurchaseId::random(), buyer_email, items, total_amount, currency, provider, created_at })
    }
}

//--------------------------------------     SellerAccount     --------------------------------------------------------
/// Links a seller to their payout account at the payment provider.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct SellerAccount {
    pub seller_id: String,
    pub payout_account_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn only_three_transitions_exist() {
        use PaymentStatus::*;
        let all = [Pending, Paid, Failed, Refunded];
        let mut valid = vec![];
        for from in all {
            for to in all {
                if let Ok(t) = StatusTransition::between(from, to) {
                    assert_eq!(t.from_status(), from);
                    assert_eq!(t.to_status(), to);
                    valid.push((from, to));
                }
            }
        }
        assert_eq!(valid, vec![(Pending, Paid), (Pending, Failed), (Paid, Refunded)]);
        let err = StatusTransition::between(Refunded, Paid).unwrap_err();
        assert_eq!(err.to_string(), "A purchase cannot move from refunded to paid");
    }

    #[test]
    fn new_purchase_total_is_sum_of_line_totals() {
        let item = |id: &str, price: i64, quantity: i64| PurchaseItem {
            product_id: ProductId::from(id),
            title: format!("Product {id}"),
            unit_price: Cents::from(price),
            currency: "usd".into(),
            seller_id: "seller_1".into(),
            quantity,
        };
        let purchase = NewPurchase::new(
            "buyer@example.com".into(),
            PaymentProviderKind::Stripe,
            vec![item("p1", 1000, 2), item("p2", 250, 3)],
        )
        .unwrap();
        assert_eq!(purchase.total_amount, Cents::from(2750));
        assert_eq!(purchase.currency, "usd");
        assert!(purchase.id.as_str().starts_with("pur_"));

        let too_many = vec![item("p1", 1000, i64::MAX / 10)];
        assert!(NewPurchase::new("buyer@example.com".into(), PaymentProviderKind::Stripe, too_many).is_none());
        let too_much = vec![item("p1", i64::MAX / 2, 1), item("p2", i64::MAX / 2, 1), item("p3", 2, 1)];
        assert!(NewPurchase::new("buyer@example.com".into(), PaymentProviderKind::Stripe, too_much).is_none());
    }

    #[test]
    fn status_strings() {
        assert_eq!("Paid".parse::<PaymentStatus>().unwrap(), PaymentStatus::Paid);
        assert_eq!(PaymentStatus::Refunded.to_string(), "refunded");
        assert!("settled".parse::<PaymentStatus>().is_err());
        assert_eq!(" PayPal ".parse::<PaymentProviderKind>().unwrap(), PaymentProviderKind::Paypal);
        assert_eq!(ProductStatus::default(), ProductStatus::Active);
        assert_eq!(serde_json::to_string(&ProductStatus::Suspended).unwrap(), "\"suspended\"");
    }

    #[test]
    fn product_update_emptiness() {
        assert!(ProductUpdate::default().is_empty());
        assert!(!ProductUpdate::default().with_price(Cents::from(1)).is_empty());
    }
}
