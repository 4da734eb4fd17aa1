use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{
    db_types::{PaymentProviderKind, ProductId, Purchase, PurchaseId},
    mkt_api::errors::CheckoutError,
    traits::ProviderSession,
};

static EMAIL_REGEX: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").ok());

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_REGEX.as_ref().map(|re| re.is_match(email)).unwrap_or(false)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: ProductId,
    #[serde(default = "default_quantity")]
    pub quantity: i64,
}

fn default_quantity() -> i64 {
    1
}

impl CartItem {
    pub fn new<P: Into<ProductId>>(product_id: P, quantity: i64) -> Self {
        Self { product_id: product_id.into(), quantity }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub buyer_email: String,
    pub items: Vec<CartItem>,
    #[serde(default)]
    pub provider: PaymentProviderKind,
}

impl CheckoutRequest {
    pub fn new<S: Into<String>>(buyer_email: S, provider: PaymentProviderKind) -> Self {
        Self { buyer_email: buyer_email.into(), items: vec![], provider }
    }

    pub fn with_item<P: Into<ProductId>>(mut self, product_id: P, quantity: i64) -> Self {
        self.items.push(CartItem::new(product_id, quantity));
        self
    }

    /// Checks the request and returns the cart with duplicate product ids merged (quantities summed, first
    /// occurrence keeps its position).
    pub fn validated_cart(&self) -> Result<Vec<CartItem>, CheckoutError> {
        if !is_valid_email(&self.buyer_email) {
            return Err(CheckoutError::InvalidRequest(format!("'{}' is not a valid email address", self.buyer_email)));
        }
        if self.items.is_empty() {
            return Err(CheckoutError::InvalidRequest("The cart is empty".into()));
        }
        let mut merged: Vec<CartItem> = Vec::with_capacity(self.items.len());
        for item in &self.items {
            if item.quantity < 1 {
                return Err(CheckoutError::InvalidRequest(format!(
                    "Quantity for {} must be at least 1, not {}",
                    item.product_id, item.quantity
                )));
            }
            match merged.iter_mut().find(|m| m.product_id == item.product_id) {
                Some(existing) => {
                    existing.quantity = existing.quantity.checked_add(item.quantity).ok_or_else(|| {
                        CheckoutError::InvalidRequest(format!("Quantity for {} is too large", item.product_id))
                    })?;
                },
                None => merged.push(item.clone()),
            }
        }
        Ok(merged)
    }
}

/// How a checkout was completed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CheckoutResult {
    /// The buyer must complete payment at the provider. The purchase is pending.
    Redirect { purchase: Purchase, session: ProviderSession },
    /// No provider client handles the requested provider, so the purchase settled immediately.
    Settled { purchase: Purchase },
}

impl CheckoutResult {
    pub fn purchase(&self) -> &Purchase {
        match self {
            Self::Redirect { purchase, .. } | Self::Settled { purchase } => purchase,
        }
    }
}

/// What reconciling a provider notification did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The purchase moved from pending to paid, and its side effects were applied
    Settled(Purchase),
    /// The purchase was already paid. Nothing changed.
    AlreadySettled(Purchase),
    /// The purchase moved from pending to failed
    Failed(Purchase),
    /// The event does not apply to the purchase in its current status
    NoChange(Purchase),
    /// No purchase carries this reference
    UnknownReference(String),
    /// The event type is not one we act on
    Ignored(String),
}

//--------------------------------------     Provider events   --------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderEventType {
    /// The buyer completed the hosted checkout and the payment succeeded
    CheckoutCompleted,
    /// The session expired, or an asynchronous payment method failed
    PaymentFailed,
    Other(String),
}

impl From<&str> for ProviderEventType {
    fn from(value: &str) -> Self {
        match value {
            "checkout.session.completed" | "checkout.session.async_payment_succeeded" => Self::CheckoutCompleted,
            "checkout.session.expired" | "checkout.session.async_payment_failed" => Self::PaymentFailed,
            other => Self::Other(other.to_string()),
        }
    }
}

/// The subset of a provider notification that settlement needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: ProviderEventData,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderEventData {
    pub object: ProviderEventObject,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderEventObject {
    /// For checkout events, the session id. This is the purchase's external reference.
    pub id: Option<String>,
    #[serde(default)]
    pub client_reference_id: Option<String>,
}

impl ProviderEvent {
    pub fn kind(&self) -> ProviderEventType {
        ProviderEventType::from(self.event_type.as_str())
    }

    pub fn external_ref(&self) -> Option<&str> {
        self.data.object.id.as_deref()
    }

    /// The purchase id we attached to the session when it was created.
    pub fn purchase_id(&self) -> Option<PurchaseId> {
        self.data.object.client_reference_id.as_deref().filter(|s| !s.is_empty()).map(PurchaseId::from)
    }
}
