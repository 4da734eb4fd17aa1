use crate::{
    db_types::{PurchaseId, StatusTransition},
    traits::{CatalogManagement, PurchaseError, PurchaseManagement, TransitionResult},
};

/// The highest level of behaviour for marketplace backends.
///
/// Besides the catalog and the ledger, a backend must be able to move a purchase through its status machine
/// atomically, including the side effects attached to each transition.
#[allow(async_fn_in_trait)]
pub trait MarketplaceDatabase: Clone + CatalogManagement + PurchaseManagement {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Applies `transition` to the purchase in a single atomic unit.
    ///
    /// The update is conditional on the purchase currently being in the transition's source state. That condition is
    /// the idempotency gate: of any number of concurrent or repeated calls, at most one returns
    /// [`TransitionResult::Applied`]. The others return [`TransitionResult::Unchanged`] with the purchase as it now is.
    ///
    /// For [`StatusTransition::Settle`], every line item's product has its sales counter incremented by the item's
    /// quantity in the same transaction, and `transaction_id` (if given) replaces the stored reference.
    ///
    /// Returns [`PurchaseError::PurchaseNotFound`] if there is no such purchase.
    async fn apply_transition(
        &self,
        id: &PurchaseId,
        transition: StatusTransition,
        transaction_id: Option<&str>,
    ) -> Result<TransitionResult, PurchaseError>;
}
