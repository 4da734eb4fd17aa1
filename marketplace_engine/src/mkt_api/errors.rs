use thiserror::Error;

use crate::{
    db_types::{InvalidTransition, PaymentProviderKind, PaymentStatus, PurchaseId},
    traits::{CatalogError, PurchaseError},
};

#[derive(Debug, Clone, Error)]
pub enum CheckoutError {
    #[error("Invalid checkout request. {0}")]
    InvalidRequest(String),
    #[error("None of the requested products are available for purchase")]
    InvalidCart,
    #[error("The cart contains products priced in different currencies ({0})")]
    MixedCurrencies(String),
    #[error("The payment provider could not start a checkout for purchase {purchase_id}. {reason}")]
    ProviderUnavailable { purchase_id: PurchaseId, reason: String },
    #[error("The notification could not be authenticated. {0}")]
    UnauthenticatedEvent(String),
    #[error("Purchase {0} does not exist")]
    PurchaseNotFound(PurchaseId),
    #[error("Purchase {id} is {status}, but this operation requires a pending purchase")]
    PurchaseNotPending { id: PurchaseId, status: PaymentStatus },
    #[error("Purchases for {0} are settled by the payment provider, not directly")]
    DirectSettlementNotAllowed(PaymentProviderKind),
    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<PurchaseError> for CheckoutError {
    fn from(e: PurchaseError) -> Self {
        match e {
            PurchaseError::PurchaseNotFound(id) => Self::PurchaseNotFound(id),
            PurchaseError::PurchaseNotPending { id, status } => Self::PurchaseNotPending { id, status },
            PurchaseError::EmptyPurchase => Self::InvalidCart,
            e => Self::DatabaseError(e.to_string()),
        }
    }
}

impl From<CatalogError> for CheckoutError {
    fn from(e: CatalogError) -> Self {
        Self::DatabaseError(e.to_string())
    }
}

/// Errors from the read-side reporting APIs (purchases, payouts, analytics).
#[derive(Debug, Clone, Error)]
pub enum ReportingError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Invalid query. {0}")]
    QueryError(String),
}

impl From<PurchaseError> for ReportingError {
    fn from(e: PurchaseError) -> Self {
        Self::DatabaseError(e.to_string())
    }
}

impl From<CatalogError> for ReportingError {
    fn from(e: CatalogError) -> Self {
        Self::DatabaseError(e.to_string())
    }
}
