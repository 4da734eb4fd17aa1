use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db_types::{PaymentProviderKind, Purchase};

/// A hosted checkout session at an external payment provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSession {
    /// The provider's reference for the session. Settlement notifications are matched on this value.
    pub external_ref: String,
    /// Where the buyer should be sent to pay
    pub redirect_url: String,
}

#[derive(Debug, Clone, Error)]
#[error("Payment provider error: {0}")]
pub struct ProviderError(pub String);

/// A client for an external payment provider that can host a checkout for a purchase.
#[allow(async_fn_in_trait)]
pub trait PaymentProvider {
    /// The provider this client talks to. Checkout requests for other providers settle directly.
    fn kind(&self) -> PaymentProviderKind;

    /// Creates a hosted checkout session for the purchase's line items.
    async fn create_checkout_session(&self, purchase: &Purchase) -> Result<ProviderSession, ProviderError>;
}
