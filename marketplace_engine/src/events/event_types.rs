use serde::{Deserialize, Serialize};

use crate::db_types::{PaymentStatus, Purchase};

/// Published once per purchase, after the `pending → paid` transition has been committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchasePaidEvent {
    pub purchase: Purchase,
}

impl PurchasePaidEvent {
    pub fn new(purchase: Purchase) -> Self {
        Self { purchase }
    }
}

/// Published when a purchase leaves the set of payout-eligible purchases without being paid (or stops being paid),
/// i.e. on `pending → failed` and `paid → refunded`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseAnnulledEvent {
    pub purchase: Purchase,
    pub status: PaymentStatus,
}

impl PurchaseAnnulledEvent {
    pub fn new(purchase: Purchase) -> Self {
        let status = purchase.payment_status;
        Self { purchase, status }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventType {
    PurchasePaid(PurchasePaidEvent),
    PurchaseAnnulled(PurchaseAnnulledEvent),
}
