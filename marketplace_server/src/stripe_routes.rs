//----------------------------------------------   Stripe  ----------------------------------------------------
use actix_web::{web, HttpRequest, HttpResponse};
use bytes::Bytes;
use log::*;
use marketplace_engine::{
    checkout_objects::ReconcileOutcome,
    traits::{CatalogManagement, MarketplaceDatabase, PaymentProvider},
    CatalogApi,
    CheckoutError,
    CheckoutFlowApi,
};
use serde::{Deserialize, Serialize};

use crate::{
    data_objects::JsonResponse,
    errors::ServerError,
    helpers::SellerIdentity,
    integrations::stripe::SellerOnboarding,
    route,
};

pub const STRIPE_SIGNATURE_HEADER: &str = "Stripe-Signature";

route!(stripe_webhook => Post "/webhook" impl MarketplaceDatabase, PaymentProvider);
/// Receives Stripe event notifications.
///
/// The body is taken as raw bytes, since the signature covers the exact payload. Once an event is authenticated the
/// response is always a 200, whether or not the event changed anything, so that Stripe stops redelivering it. Only a
/// failure on our side returns a 5xx, which asks Stripe to try again later.
pub async fn stripe_webhook<B, P>(
    req: HttpRequest,
    body: Bytes,
    api: web::Data<CheckoutFlowApi<B, P>>,
) -> HttpResponse
where
    B: MarketplaceDatabase,
    P: PaymentProvider,
{
    trace!("💳️ Received webhook request: {}", req.uri());
    let signature = req.headers().get(STRIPE_SIGNATURE_HEADER).and_then(|v| v.to_str().ok());
    match api.process_provider_notification(&body, signature).await {
        Ok(outcome) => HttpResponse::Ok().json(JsonResponse::success(describe_outcome(&outcome))),
        Err(CheckoutError::UnauthenticatedEvent(e)) => {
            warn!("💳️ Rejected a webhook call from {:?}. {e}", req.connection_info().peer_addr());
            HttpResponse::BadRequest().json(JsonResponse::failure("Invalid signature"))
        },
        Err(e) => {
            error!("💳️ Could not process webhook event. {e}");
            HttpResponse::InternalServerError().json(JsonResponse::failure("The event could not be processed"))
        },
    }
}

fn describe_outcome(outcome: &ReconcileOutcome) -> String {
    match outcome {
        ReconcileOutcome::Settled(p) => {
            info!("💳️ Purchase {} has been paid", p.id);
            format!("Purchase {} settled", p.id)
        },
        ReconcileOutcome::AlreadySettled(p) => format!("Purchase {} was already settled", p.id),
        ReconcileOutcome::Failed(p) => {
            info!("💳️ Payment for purchase {} failed", p.id);
            format!("Purchase {} marked as failed", p.id)
        },
        ReconcileOutcome::NoChange(p) => format!("Purchase {} is {}. No change", p.id, p.payment_status),
        ReconcileOutcome::UnknownReference(r) => format!("No purchase for {r}"),
        ReconcileOutcome::Ignored(t) => format!("Event {t} ignored"),
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OnboardingRequest {
    pub email: Option<String>,
}

route!(stripe_onboard => Post "/seller/stripe/onboard" impl CatalogManagement);
/// Returns a link where the seller can register their payout account with Stripe.
pub async fn stripe_onboard<B: CatalogManagement>(
    seller: SellerIdentity,
    api: web::Data<CatalogApi<B>>,
    onboarding: web::Data<SellerOnboarding>,
    body: Option<web::Json<OnboardingRequest>>,
) -> Result<HttpResponse, ServerError> {
    let email = body.and_then(|b| b.into_inner().email);
    let response = onboarding.onboard(api.get_ref(), &seller.0, email.as_deref()).await?;
    Ok(HttpResponse::Ok().json(response))
}
