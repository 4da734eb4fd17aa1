use std::fmt::Display;

use chrono::{DateTime, Utc};
use marketplace_engine::{
    checkout_objects::{CartItem, CheckoutRequest, CheckoutResult},
    db_types::{Cents, NewProduct, PaymentProviderKind, PaymentStatus, ProductStatus, ProductUpdate, PurchaseId},
    traits::{ProductQueryFilter, PurchaseQueryFilter},
};
use mkt_common::DEFAULT_CURRENCY_CODE;
use serde::{Deserialize, Serialize};

use crate::errors::ServerError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

/// The providers buyers may choose at checkout. Registered as app data.
#[derive(Debug, Clone)]
pub struct EnabledProviders(pub Vec<PaymentProviderKind>);

impl EnabledProviders {
    pub fn parse(&self, name: &str) -> Result<PaymentProviderKind, ServerError> {
        let provider =
            name.parse::<PaymentProviderKind>().map_err(|e| ServerError::ValidationError(e.to_string()))?;
        if self.0.contains(&provider) {
            Ok(provider)
        } else {
            Err(ServerError::ValidationError(format!("Payments through {provider} are not accepted")))
        }
    }
}

impl Default for EnabledProviders {
    fn default() -> Self {
        Self(vec![PaymentProviderKind::Stripe, PaymentProviderKind::Paypal])
    }
}

fn parse_price(price: &str) -> Result<Cents, ServerError> {
    let price = price.parse::<Cents>().map_err(|e| ServerError::ValidationError(e.to_string()))?;
    if price.is_negative() {
        return Err(ServerError::ValidationError("Product prices cannot be negative".into()));
    }
    Ok(price)
}

//--------------------------------------      Catalog        ---------------------------------------------------------
/// A seller's new listing. Prices are decimal strings in the major unit, e.g. `"10.00"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProductRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub price: String,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub preview_media_url: Option<String>,
    #[serde(default)]
    pub file_storage_key: Option<String>,
    #[serde(default)]
    pub status: Option<ProductStatus>,
}

impl NewProductRequest {
    pub fn into_new_product(self, seller_id: &str) -> Result<NewProduct, ServerError> {
        let price = parse_price(&self.price)?;
        Ok(NewProduct {
            seller_id: seller_id.to_string(),
            title: self.title,
            description: self.description,
            price,
            currency: self.currency.unwrap_or_else(|| DEFAULT_CURRENCY_CODE.to_string()).to_ascii_lowercase(),
            category: self.category,
            tags: self.tags,
            preview_media_url: self.preview_media_url,
            file_storage_key: self.file_storage_key,
            status: self.status.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductUpdateRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<String>,
    pub currency: Option<String>,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
    pub preview_media_url: Option<String>,
    pub file_storage_key: Option<String>,
    pub status: Option<ProductStatus>,
}

impl TryFrom<ProductUpdateRequest> for ProductUpdate {
    type Error = ServerError;

    fn try_from(req: ProductUpdateRequest) -> Result<Self, Self::Error> {
        let price = req.price.as_deref().map(parse_price).transpose()?;
        Ok(ProductUpdate {
            title: req.title,
            description: req.description,
            price,
            currency: req.currency.map(|c| c.to_ascii_lowercase()),
            category: req.category,
            tags: req.tags,
            preview_media_url: req.preview_media_url,
            file_storage_key: req.file_storage_key,
            status: req.status,
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductSearchParams {
    pub search: Option<String>,
    pub category: Option<String>,
    pub seller: Option<String>,
    pub limit: Option<i64>,
}

impl From<ProductSearchParams> for ProductQueryFilter {
    fn from(params: ProductSearchParams) -> Self {
        ProductQueryFilter {
            search: params.search,
            category: params.category,
            seller_id: params.seller,
            statuses: None,
            limit: params.limit,
        }
    }
}

//--------------------------------------      Checkout       ---------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSessionRequest {
    pub buyer_email: String,
    pub items: Vec<CartItem>,
    #[serde(default = "default_provider")]
    pub provider: String,
}

fn default_provider() -> String {
    PaymentProviderKind::Stripe.to_string()
}

impl CheckoutSessionRequest {
    pub fn into_checkout_request(self, enabled: &EnabledProviders) -> Result<CheckoutRequest, ServerError> {
        let provider = enabled.parse(&self.provider)?;
        Ok(CheckoutRequest { buyer_email: self.buyer_email, items: self.items, provider })
    }
}

/// What the buyer's client needs after checkout: either where to pay, or confirmation that the purchase is paid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSessionResponse {
    pub purchase_id: PurchaseId,
    pub payment_status: PaymentStatus,
    pub total_amount: Cents,
    pub currency: String,
    pub redirect_url: Option<String>,
    pub session_id: Option<String>,
}

impl From<CheckoutResult> for CheckoutSessionResponse {
    fn from(result: CheckoutResult) -> Self {
        let (purchase, session) = match result {
            CheckoutResult::Redirect { purchase, session } => (purchase, Some(session)),
            CheckoutResult::Settled { purchase } => (purchase, None),
        };
        let (redirect_url, session_id) = match session {
            Some(s) => (Some(s.redirect_url), Some(s.external_ref)),
            None => (None, None),
        };
        Self {
            purchase_id: purchase.id,
            payment_status: purchase.payment_status,
            total_amount: purchase.total_amount,
            currency: purchase.currency,
            redirect_url,
            session_id,
        }
    }
}

/// Query string parameters for the admin purchase search. A single status may be given.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PurchaseSearchParams {
    pub buyer_email: Option<String>,
    pub status: Option<PaymentStatus>,
    pub provider: Option<PaymentProviderKind>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl From<PurchaseSearchParams> for PurchaseQueryFilter {
    fn from(params: PurchaseSearchParams) -> Self {
        PurchaseQueryFilter {
            buyer_email: params.buyer_email,
            statuses: params.status.map(|s| vec![s]),
            provider: params.provider,
            since: params.since,
            until: params.until,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: PaymentStatus,
}

//--------------------------------------      Onboarding     ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnboardingResponse {
    /// Where to send the seller to finish registering for payouts
    pub url: String,
    pub account_id: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}
