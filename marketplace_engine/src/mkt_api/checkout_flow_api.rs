use std::{fmt::Debug, time::Duration as StdDuration};

use chrono::{Duration, Utc};
use log::*;
use mkt_common::Secret;

use crate::{
    db_types::{
        InvalidTransition,
        NewPurchase,
        PaymentProviderKind,
        PaymentStatus,
        Purchase,
        PurchaseId,
        PurchaseItem,
        StatusTransition,
    },
    events::{EventProducers, PurchaseAnnulledEvent, PurchasePaidEvent},
    helpers::verify_signature,
    mkt_api::{
        checkout_objects::{CheckoutRequest, CheckoutResult, ProviderEvent, ProviderEventType, ReconcileOutcome},
        errors::CheckoutError,
    },
    traits::{MarketplaceDatabase, PaymentProvider, ProviderSession, TransitionResult},
};

pub const DEFAULT_PROVIDER_TIMEOUT: StdDuration = StdDuration::from_secs(10);
pub const DEFAULT_SIGNATURE_TOLERANCE_SECS: i64 = 300;

#[derive(Debug, Clone)]
pub struct SettlementConfig {
    /// The shared secret used to authenticate provider notifications. When empty, every notification is rejected.
    pub webhook_secret: Secret<String>,
    /// How far a signed notification's timestamp may be from the current time
    pub signature_tolerance: Duration,
    /// The upper bound on a single call to the payment provider
    pub provider_timeout: StdDuration,
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            webhook_secret: Secret::default(),
            signature_tolerance: Duration::seconds(DEFAULT_SIGNATURE_TOLERANCE_SECS),
            provider_timeout: DEFAULT_PROVIDER_TIMEOUT,
        }
    }
}

/// `CheckoutFlowApi` turns carts into purchases and drives each purchase through its payment status machine.
///
/// A purchase is settled in exactly one of two ways:
/// * through the external provider: [`Self::begin_provider_checkout`] hands the buyer off to a hosted checkout, and
///   the provider's notification later arrives at [`Self::process_provider_notification`];
/// * directly, with [`Self::settle_direct`], when no provider client handles the purchase's provider.
///
/// Both paths end in [`MarketplaceDatabase::apply_transition`], so a purchase's side effects are applied at most once
/// no matter how many times, or how concurrently, it is settled.
pub struct CheckoutFlowApi<B, P> {
    db: B,
    provider: Option<P>,
    config: SettlementConfig,
    producers: EventProducers,
}

impl<B, P> Debug for CheckoutFlowApi<B, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CheckoutFlowApi")
    }
}

impl<B, P> CheckoutFlowApi<B, P> {
    pub fn new(db: B, provider: Option<P>, config: SettlementConfig, producers: EventProducers) -> Self {
        Self { db, provider, config, producers }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn config(&self) -> &SettlementConfig {
        &self.config
    }
}

impl<B, P> CheckoutFlowApi<B, P>
where
    B: MarketplaceDatabase,
    P: PaymentProvider,
{
    /// The configured provider client, if it handles `kind`.
    fn provider_for(&self, kind: PaymentProviderKind) -> Option<&P> {
        self.provider.as_ref().filter(|p| p.kind() == kind)
    }

    /// `true` if purchases for `kind` are settled by an external provider rather than directly.
    pub fn has_provider_for(&self, kind: PaymentProviderKind) -> bool {
        self.provider_for(kind).is_some()
    }

    /// The full checkout: create the purchase, then either hand off to the provider or settle directly.
    ///
    /// If the provider cannot be reached, the error carries the id of the (still pending) purchase so that the
    /// checkout can be retried with [`Self::begin_provider_checkout`].
    pub async fn checkout(&self, request: CheckoutRequest) -> Result<CheckoutResult, CheckoutError> {
        let purchase = self.initiate(request).await?;
        if self.has_provider_for(purchase.provider) {
            let (purchase, session) = self.begin_provider_checkout(&purchase.id).await?;
            Ok(CheckoutResult::Redirect { purchase, session })
        } else {
            debug!("🛒️ No {} client is configured. Settling purchase {} directly", purchase.provider, purchase.id);
            let purchase = self.settle_direct(&purchase.id).await?;
            Ok(CheckoutResult::Settled { purchase })
        }
    }

    /// Creates a `pending` purchase from a cart.
    ///
    /// Product ids are resolved against the *active* catalog in a single read, and each line item snapshots the
    /// product's title, price, currency, and seller as they were at that moment. Ids that do not resolve are dropped.
    /// If none resolve, the cart is invalid. No catalog stats change here.
    pub async fn initiate(&self, request: CheckoutRequest) -> Result<Purchase, CheckoutError> {
        let cart = request.validated_cart()?;
        let ids = cart.iter().map(|i| i.product_id.clone()).collect::<Vec<_>>();
        let mut resolved = self.db.resolve_products(&ids).await?;
        let mut items = Vec::with_capacity(cart.len());
        for item in cart {
            match resolved.remove(&item.product_id) {
                Some(entry) => items.push(PurchaseItem::from_entry(entry, item.quantity)),
                None => info!("🛒️ Product {} is not available. Dropping it from the cart", item.product_id),
            }
        }
        let currency = match items.first() {
            Some(item) => item.currency.clone(),
            None => {
                info!("🛒️ None of the {} products in {}'s cart could be resolved", ids.len(), request.buyer_email);
                return Err(CheckoutError::InvalidCart);
            },
        };
        if items.iter().any(|i| !i.currency.eq_ignore_ascii_case(&currency)) {
            let mut currencies = items.iter().map(|i| i.currency.to_lowercase()).collect::<Vec<_>>();
            currencies.sort();
            currencies.dedup();
            return Err(CheckoutError::MixedCurrencies(currencies.join(", ")));
        }
        let new_purchase = NewPurchase::new(request.buyer_email, request.provider, items)
            .ok_or_else(|| CheckoutError::InvalidRequest("The purchase total is too large".into()))?;
        let purchase = self.db.insert_purchase(new_purchase).await?;
        info!(
            "🛒️ Purchase {} created for {} ({} {}, {} items)",
            purchase.id,
            purchase.buyer_email,
            purchase.total_amount,
            purchase.currency,
            purchase.items.len()
        );
        Ok(purchase)
    }

    /// Asks the provider for a hosted checkout session and records its reference on the purchase.
    ///
    /// The purchase must be pending. Calling this again for the same purchase (a retry) creates a new session and
    /// replaces the stored reference; see [`Self::reconcile`] for completions of the earlier session. Provider errors
    /// and timeouts leave the purchase pending and untouched.
    pub async fn begin_provider_checkout(
        &self,
        purchase_id: &PurchaseId,
    ) -> Result<(Purchase, ProviderSession), CheckoutError> {
        let purchase = self.fetch_purchase(purchase_id).await?;
        if purchase.payment_status != PaymentStatus::Pending {
            return Err(CheckoutError::PurchaseNotPending { id: purchase.id, status: purchase.payment_status });
        }
        let provider = self.provider_for(purchase.provider).ok_or_else(|| CheckoutError::ProviderUnavailable {
            purchase_id: purchase.id.clone(),
            reason: format!("No {} client is configured", purchase.provider),
        })?;
        let timeout = self.config.provider_timeout;
        let session = match tokio::time::timeout(timeout, provider.create_checkout_session(&purchase)).await {
            Ok(Ok(session)) => session,
            Ok(Err(e)) => {
                warn!("🛒️ Could not create a {} checkout for purchase {}. {e}", purchase.provider, purchase.id);
                return Err(CheckoutError::ProviderUnavailable { purchase_id: purchase.id, reason: e.to_string() });
            },
            Err(_) => {
                warn!("🛒️ {} did not respond within {timeout:?} for purchase {}", purchase.provider, purchase.id);
                return Err(CheckoutError::ProviderUnavailable {
                    purchase_id: purchase.id,
                    reason: format!("The provider did not respond within {timeout:?}"),
                });
            },
        };
        let purchase = self.db.assign_transaction_id(&purchase.id, &session.external_ref).await?;
        debug!("🛒️ Purchase {} is awaiting payment at {}", purchase.id, session.external_ref);
        Ok((purchase, session))
    }

    /// Settles a purchase immediately, with a synthetic reference of the form `direct_{purchase_id}`.
    ///
    /// Only available when no provider client handles the purchase's provider. Settling an already-paid purchase is a
    /// no-op that returns the purchase.
    pub async fn settle_direct(&self, purchase_id: &PurchaseId) -> Result<Purchase, CheckoutError> {
        let purchase = self.fetch_purchase(purchase_id).await?;
        if self.has_provider_for(purchase.provider) {
            return Err(CheckoutError::DirectSettlementNotAllowed(purchase.provider));
        }
        let reference = format!("direct_{purchase_id}");
        match self.apply(purchase_id, StatusTransition::Settle, Some(&reference)).await? {
            TransitionResult::Applied(p) => Ok(p),
            TransitionResult::Unchanged(p) if p.payment_status == PaymentStatus::Paid => {
                debug!("🛒️ Purchase {purchase_id} was already settled");
                Ok(p)
            },
            TransitionResult::Unchanged(p) => {
                Err(InvalidTransition { from: p.payment_status, to: PaymentStatus::Paid }.into())
            },
        }
    }

    /// Applies a provider's verdict on the purchase holding `external_ref`.
    ///
    /// Notifications are delivered at least once and in any order, so this is idempotent: only a `pending` purchase
    /// moves, and it moves at most once. A reference that matches no purchase is not an error.
    pub async fn reconcile_from_provider_event(
        &self,
        event_type: &ProviderEventType,
        external_ref: &str,
    ) -> Result<ReconcileOutcome, CheckoutError> {
        self.reconcile(event_type, external_ref, None).await
    }

    /// Like [`Self::reconcile_from_provider_event`], but a completion for a session that is no longer the purchase's
    /// current one (the checkout was retried) is matched through `purchase_id` and settles the purchase, recording the
    /// completed session as its reference. Failures of superseded sessions never match this way.
    pub async fn reconcile(
        &self,
        event_type: &ProviderEventType,
        external_ref: &str,
        purchase_id: Option<&PurchaseId>,
    ) -> Result<ReconcileOutcome, CheckoutError> {
        let transition = match event_type {
            ProviderEventType::CheckoutCompleted => StatusTransition::Settle,
            ProviderEventType::PaymentFailed => StatusTransition::Fail,
            ProviderEventType::Other(t) => {
                debug!("🛒️ Ignoring provider event of type {t}");
                return Ok(ReconcileOutcome::Ignored(t.clone()));
            },
        };
        let (purchase, reference) = match self.db.fetch_purchase_by_transaction_id(external_ref).await? {
            Some(purchase) => (purchase, None),
            None => match self.superseded_session_owner(transition, external_ref, purchase_id).await? {
                Some(purchase) => (purchase, Some(external_ref)),
                None => {
                    info!("🛒️ Received a provider event for {external_ref}, but no purchase carries it");
                    return Ok(ReconcileOutcome::UnknownReference(external_ref.to_string()));
                },
            },
        };
        if purchase.payment_status != transition.from_status() {
            return Ok(Self::unchanged_outcome(purchase));
        }
        let outcome = match self.apply(&purchase.id, transition, reference).await? {
            TransitionResult::Applied(p) if p.payment_status == PaymentStatus::Paid => ReconcileOutcome::Settled(p),
            TransitionResult::Applied(p) => ReconcileOutcome::Failed(p),
            TransitionResult::Unchanged(p) => Self::unchanged_outcome(p),
        };
        Ok(outcome)
    }

    async fn superseded_session_owner(
        &self,
        transition: StatusTransition,
        external_ref: &str,
        purchase_id: Option<&PurchaseId>,
    ) -> Result<Option<Purchase>, CheckoutError> {
        let Some(id) = purchase_id.filter(|_| transition == StatusTransition::Settle) else {
            return Ok(None);
        };
        let purchase = self.db.fetch_purchase(id).await?;
        if let Some(p) = &purchase {
            let current = p.transaction_id.as_deref().unwrap_or("no session");
            info!("🛒️ Superseded session {external_ref} completed for purchase {}, which holds {current}", p.id);
        }
        Ok(purchase)
    }

    fn unchanged_outcome(purchase: Purchase) -> ReconcileOutcome {
        if purchase.payment_status == PaymentStatus::Paid {
            debug!("🛒️ Purchase {} is already paid. Nothing to do", purchase.id);
            ReconcileOutcome::AlreadySettled(purchase)
        } else {
            debug!("🛒️ Purchase {} is {}. The event does not apply", purchase.id, purchase.payment_status);
            ReconcileOutcome::NoChange(purchase)
        }
    }

    /// Authenticates a raw provider notification and reconciles it.
    ///
    /// The signature is checked against the exact payload bytes before anything is parsed. Authentic events that
    /// cannot be parsed, or that carry no reference, are ignored.
    pub async fn process_provider_notification(
        &self,
        payload: &[u8],
        signature_header: Option<&str>,
    ) -> Result<ReconcileOutcome, CheckoutError> {
        verify_signature(
            payload,
            signature_header,
            &self.config.webhook_secret,
            self.config.signature_tolerance,
            Utc::now(),
        )
        .map_err(|e| {
            warn!("🛒️ Rejecting provider notification. {e}");
            CheckoutError::UnauthenticatedEvent(e.to_string())
        })?;
        let event = match serde_json::from_slice::<ProviderEvent>(payload) {
            Ok(event) => event,
            Err(e) => {
                warn!("🛒️ Authentic provider notification could not be parsed. {e}");
                return Ok(ReconcileOutcome::Ignored("unparseable".into()));
            },
        };
        trace!("🛒️ Provider event {} ({})", event.id, event.event_type);
        match event.external_ref() {
            Some(external_ref) => self.reconcile(&event.kind(), external_ref, event.purchase_id().as_ref()).await,
            None => {
                warn!("🛒️ Provider event {} has no session reference", event.id);
                Ok(ReconcileOutcome::Ignored(event.event_type.clone()))
            },
        }
    }

    /// Refunds a paid purchase. Sales counters are left as they are.
    pub async fn refund_purchase(&self, purchase_id: &PurchaseId) -> Result<Purchase, CheckoutError> {
        self.modify_status(purchase_id, PaymentStatus::Refunded).await
    }

    /// Changes a purchase's status, applying the same side effects as the automated flows.
    ///
    /// | From \ To | Paid   | Failed | Refunded |
    /// |-----------|--------|--------|----------|
    /// | Pending   | Settle | Fail   | Err      |
    /// | Paid      | Err    | Err    | Refund   |
    /// | Failed    | Err    | Err    | Err      |
    /// | Refunded  | Err    | Err    | Err      |
    ///
    /// Settling here records no external reference. A change that loses a race with another transition is an error.
    pub async fn modify_status(
        &self,
        purchase_id: &PurchaseId,
        new_status: PaymentStatus,
    ) -> Result<Purchase, CheckoutError> {
        let purchase = self.fetch_purchase(purchase_id).await?;
        let transition = StatusTransition::between(purchase.payment_status, new_status)?;
        match self.apply(purchase_id, transition, None).await? {
            TransitionResult::Applied(p) => {
                info!("🛒️ Purchase {purchase_id} changed from {} to {new_status}", purchase.payment_status);
                Ok(p)
            },
            TransitionResult::Unchanged(p) => {
                warn!("🛒️ Purchase {purchase_id} became {} before it could be changed", p.payment_status);
                Err(InvalidTransition { from: p.payment_status, to: new_status }.into())
            },
        }
    }

    async fn fetch_purchase(&self, purchase_id: &PurchaseId) -> Result<Purchase, CheckoutError> {
        self.db.fetch_purchase(purchase_id).await?.ok_or_else(|| CheckoutError::PurchaseNotFound(purchase_id.clone()))
    }

    /// Runs the transition and, if it was applied, notifies subscribers.
    async fn apply(
        &self,
        purchase_id: &PurchaseId,
        transition: StatusTransition,
        transaction_id: Option<&str>,
    ) -> Result<TransitionResult, CheckoutError> {
        let result = self.db.apply_transition(purchase_id, transition, transaction_id).await?;
        if let TransitionResult::Applied(purchase) = &result {
            match transition {
                StatusTransition::Settle => self.call_purchase_paid_hook(purchase).await,
                StatusTransition::Fail | StatusTransition::Refund => self.call_purchase_annulled_hook(purchase).await,
            }
        }
        Ok(result)
    }

    async fn call_purchase_paid_hook(&self, purchase: &Purchase) {
        for emitter in &self.producers.purchase_paid_producer {
            debug!("🛒️ Notifying purchase paid hook subscribers");
            emitter.publish_event(PurchasePaidEvent::new(purchase.clone())).await;
        }
    }

    async fn call_purchase_annulled_hook(&self, purchase: &Purchase) {
        for emitter in &self.producers.purchase_annulled_producer {
            debug!("🛒️ Notifying purchase annulled hook subscribers");
            emitter.publish_event(PurchaseAnnulledEvent::new(purchase.clone())).await;
        }
    }
}
