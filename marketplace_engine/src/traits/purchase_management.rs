use thiserror::Error;

use crate::{
    db_types::{NewPurchase, PaymentStatus, Purchase, PurchaseId},
    traits::PurchaseQueryFilter,
};

#[derive(Debug, Clone, Error)]
pub enum PurchaseError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Purchase {0} does not exist")]
    PurchaseNotFound(PurchaseId),
    #[error("Purchase {id} is {status}, but this operation requires a pending purchase")]
    PurchaseNotPending { id: PurchaseId, status: PaymentStatus },
    #[error("Transaction reference {0} is already assigned to another purchase")]
    TransactionIdInUse(String),
    #[error("A purchase must contain at least one item")]
    EmptyPurchase,
}

impl From<sqlx::Error> for PurchaseError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                PurchaseError::DatabaseError(format!("Unique constraint violated. {db}"))
            },
            _ => PurchaseError::DatabaseError(e.to_string()),
        }
    }
}

#[allow(async_fn_in_trait)]
pub trait PurchaseManagement {
    /// Stores a new `pending` purchase. No catalog stats are touched.
    async fn insert_purchase(&self, purchase: NewPurchase) -> Result<Purchase, PurchaseError>;

    async fn fetch_purchase(&self, id: &PurchaseId) -> Result<Option<Purchase>, PurchaseError>;

    async fn fetch_purchase_by_transaction_id(&self, transaction_id: &str) -> Result<Option<Purchase>, PurchaseError>;

    /// Records the provider's session reference on a purchase without changing its status. The purchase must be
    /// pending. Re-assigning a new reference (e.g. after a retried checkout) replaces the old one.
    async fn assign_transaction_id(&self, id: &PurchaseId, transaction_id: &str) -> Result<Purchase, PurchaseError>;

    /// Purchases matching the filter, newest first.
    async fn search_purchases(&self, filter: PurchaseQueryFilter) -> Result<Vec<Purchase>, PurchaseError>;
}
