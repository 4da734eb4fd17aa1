//! Glue between the marketplace engine and Stripe.
//!
//! * [`StripeCheckoutProvider`] is the engine's [`PaymentProvider`] for Stripe-hosted checkout.
//! * [`SellerOnboarding`] registers sellers as Express connected accounts so they can receive payouts.
//! * [`create_settlement_handlers`] subscribes to settlement events and records what each seller has accrued.
use std::collections::BTreeMap;

use futures::future::BoxFuture;
use log::*;
use marketplace_engine::{
    db_types::{Cents, PaymentProviderKind, PaymentStatus, Purchase},
    events::{EventHandlers, EventHooks, PurchaseAnnulledEvent},
    payout_objects::CommissionRate,
    traits::{CatalogManagement, PaymentProvider, ProviderError, ProviderSession},
    CatalogApi,
};
use stripe_tools::{NewCheckoutSession, SessionLineItem, StripeApi};

use crate::{data_objects::OnboardingResponse, errors::ServerError};

pub const SETTLEMENT_EVENT_BUFFER_SIZE: usize = 25;
pub const PURCHASE_ID_PLACEHOLDER: &str = "{purchase_id}";
pub const DEFAULT_REGISTRATION_URL: &str = "https://dashboard.stripe.com/register";

#[derive(Debug, Clone)]
pub struct StripeCheckoutProvider {
    api: StripeApi,
    success_url: String,
    cancel_url: String,
}

impl StripeCheckoutProvider {
    pub fn new(api: StripeApi, success_url: String, cancel_url: String) -> Self {
        Self { api, success_url, cancel_url }
    }

    pub fn session_for(&self, purchase: &Purchase) -> NewCheckoutSession {
        let line_items = purchase
            .items
            .iter()
            .map(|item| SessionLineItem {
                name: item.title.clone(),
                currency: item.currency.clone(),
                unit_amount: item.unit_price.value(),
                quantity: item.quantity,
            })
            .collect();
        let id = purchase.id.as_str();
        NewCheckoutSession {
            customer_email: purchase.buyer_email.clone(),
            client_reference_id: id.to_string(),
            line_items,
            success_url: self.success_url.replace(PURCHASE_ID_PLACEHOLDER, id),
            cancel_url: self.cancel_url.replace(PURCHASE_ID_PLACEHOLDER, id),
        }
    }
}

impl PaymentProvider for StripeCheckoutProvider {
    fn kind(&self) -> PaymentProviderKind {
        PaymentProviderKind::Stripe
    }

    async fn create_checkout_session(&self, purchase: &Purchase) -> Result<ProviderSession, ProviderError> {
        let session = self.api.create_checkout_session(&self.session_for(purchase)).await.map_err(|e| {
            warn!("💳️ Could not create a checkout session for purchase {}. {e}", purchase.id);
            ProviderError(e.to_string())
        })?;
        let redirect_url = session
            .url
            .ok_or_else(|| ProviderError(format!("Checkout session {} has no payment page", session.id)))?;
        Ok(ProviderSession { external_ref: session.id, redirect_url })
    }
}

/// Registers sellers for payouts. Without Stripe credentials, sellers are sent to Stripe's public sign-up page.
#[derive(Debug, Clone)]
pub struct SellerOnboarding {
    stripe: Option<StripeApi>,
    registration_url: String,
}

impl Default for SellerOnboarding {
    fn default() -> Self {
        Self { stripe: None, registration_url: DEFAULT_REGISTRATION_URL.to_string() }
    }
}

impl SellerOnboarding {
    pub fn new(stripe: Option<StripeApi>) -> Self {
        Self { stripe, ..Default::default() }
    }

    /// Returns an onboarding link for the seller, creating their connected account on first use.
    pub async fn onboard<B: CatalogManagement>(
        &self,
        catalog: &CatalogApi<B>,
        seller_id: &str,
        email: Option<&str>,
    ) -> Result<OnboardingResponse, ServerError> {
        let Some(stripe) = &self.stripe else {
            info!("💳️ Stripe is not configured. Sending seller {seller_id} to the public registration page");
            return Ok(OnboardingResponse { url: self.registration_url.clone(), account_id: None, expires_at: None });
        };
        let account_id = match catalog.payout_account(seller_id).await? {
            Some(account) => account.payout_account_id,
            None => {
                let account = stripe.create_express_account(email).await?;
                catalog.link_payout_account(seller_id, &account.id).await?;
                info!("💳️ Seller {seller_id} linked to connected account {}", account.id);
                account.id
            },
        };
        let link = stripe.create_account_link(&account_id).await?;
        Ok(OnboardingResponse { url: link.url, account_id: Some(account_id), expires_at: Some(link.expires_at) })
    }
}

/// Gross sales per seller in a purchase, with the platform's commission taken off.
pub fn seller_accruals(purchase: &Purchase, commission: CommissionRate) -> BTreeMap<String, (Cents, Cents)> {
    let mut gross = BTreeMap::<String, Cents>::new();
    for item in &purchase.items {
        *gross.entry(item.seller_id.clone()).or_default() += item.line_total();
    }
    gross
        .into_iter()
        .map(|(seller, gross)| {
            let fee = commission.commission_on(gross);
            (seller, (gross, gross - fee))
        })
        .collect()
}

/// Hooks that keep a running account of seller earnings as purchases settle or are reversed.
pub fn create_settlement_handlers(commission: CommissionRate) -> EventHandlers {
    let mut hooks = EventHooks::default();
    hooks.on_purchase_paid(move |ev| {
        let purchase = ev.purchase;
        for (seller, (gross, net)) in seller_accruals(&purchase, commission) {
            info!(
                "💸️ Purchase {} accrued {net} {} (gross {gross}, commission {commission}) to seller {seller}",
                purchase.id, purchase.currency
            );
        }
        no_op()
    });
    hooks.on_purchase_annulled(move |ev| {
        let PurchaseAnnulledEvent { purchase, status } = ev;
        if status == PaymentStatus::Refunded {
            for (seller, (_, net)) in seller_accruals(&purchase, commission) {
                info!(
                    "💸️ Purchase {} was refunded. {net} {} reversed for seller {seller}",
                    purchase.id, purchase.currency
                );
            }
        } else {
            debug!("💸️ Purchase {} is {status}. Nothing accrued", purchase.id);
        }
        no_op()
    });
    EventHandlers::new(SETTLEMENT_EVENT_BUFFER_SIZE, hooks)
}

fn no_op() -> BoxFuture<'static, ()> {
    Box::pin(async {})
}
