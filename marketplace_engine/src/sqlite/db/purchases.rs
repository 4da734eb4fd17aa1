use log::{debug, trace};
use sqlx::{types::Json, QueryBuilder, SqliteConnection};

use super::{first_row, one_row};

use crate::{
    db_types::{NewPurchase, PaymentStatus, Purchase, PurchaseId, StatusTransition},
    traits::{PurchaseError, PurchaseQueryFilter},
};

/// Inserts a new purchase. Status is always `pending`.
pub async fn insert_purchase(purchase: NewPurchase, conn: &mut SqliteConnection) -> Result<Purchase, PurchaseError> {
    if purchase.items.is_empty() {
        return Err(PurchaseError::EmptyPurchase);
    }
    let purchase: Purchase = sqlx::query_as(
        r#"
            INSERT INTO purchases (
                id,
                buyer_email,
                items,
                total_amount,
                currency,
                provider,
                payment_status,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, 'pending', $7, $8)
            RETURNING *;
        "#,
    )
    .bind(purchase.id)
    .bind(purchase.buyer_email)
    .bind(Json(purchase.items))
    .bind(purchase.total_amount)
    .bind(purchase.currency)
    .bind(purchase.provider)
    .bind(purchase.created_at)
    .bind(purchase.created_at)
    .fetch_all(conn)
    .await
    .and_then(one_row)?;
    debug!("🗃️ Purchase {} inserted. Total {} {}", purchase.id, purchase.total_amount, purchase.currency);
    Ok(purchase)
}

pub async fn fetch_purchase(id: &PurchaseId, conn: &mut SqliteConnection) -> Result<Option<Purchase>, sqlx::Error> {
    let purchase = sqlx::query_as("SELECT * FROM purchases WHERE id = $1")
        .bind(id.as_str())
        .fetch_all(conn)
        .await
        .map(first_row)?;
    Ok(purchase)
}

pub async fn fetch_purchase_by_transaction_id(
    transaction_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Purchase>, sqlx::Error> {
    let purchase = sqlx::query_as("SELECT * FROM purchases WHERE transaction_id = $1")
        .bind(transaction_id)
        .fetch_all(conn)
        .await
        .map(first_row)?;
    Ok(purchase)
}

/// Stores the provider reference on a pending purchase.
pub async fn assign_transaction_id(
    id: &PurchaseId,
    transaction_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Purchase, PurchaseError> {
    let updated: Option<Purchase> = sqlx::query_as(
        "UPDATE purchases SET transaction_id = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 AND payment_status = \
         'pending' RETURNING *",
    )
    .bind(transaction_id)
    .bind(id.as_str())
    .fetch_all(&mut *conn)
    .await
    .map(first_row)
    .map_err(|e| match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            PurchaseError::TransactionIdInUse(transaction_id.to_string())
        },
        _ => PurchaseError::from(e),
    })?;
    match updated {
        Some(p) => Ok(p),
        None => match fetch_purchase(id, conn).await? {
            Some(p) => Err(PurchaseError::PurchaseNotPending { id: p.id, status: p.payment_status }),
            None => Err(PurchaseError::PurchaseNotFound(id.clone())),
        },
    }
}

/// The conditional status update behind every transition. Returns `None` when the purchase is missing or not in the
/// transition's source state, in which case nothing was written.
pub async fn transition_status(
    id: &PurchaseId,
    transition: StatusTransition,
    transaction_id: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<Option<Purchase>, sqlx::Error> {
    let purchase = sqlx::query_as(
        r#"
        UPDATE purchases SET
            payment_status = $1,
            transaction_id = COALESCE($2, transaction_id),
            updated_at = CURRENT_TIMESTAMP
        WHERE id = $3 AND payment_status = $4
        RETURNING *
        "#,
    )
    .bind(transition.to_status())
    .bind(transaction_id)
    .bind(id.as_str())
    .bind(transition.from_status())
    .fetch_all(conn)
    .await
    .map(first_row)?;
    Ok(purchase)
}

/// Fetches purchases according to the filter, newest first.
pub async fn search_purchases(
    filter: PurchaseQueryFilter,
    conn: &mut SqliteConnection,
) -> Result<Vec<Purchase>, sqlx::Error> {
    let mut builder = QueryBuilder::new("SELECT * FROM purchases ");
    if !filter.is_empty() {
        builder.push("WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if let Some(email) = filter.buyer_email {
        where_clause.push("buyer_email = ");
        where_clause.push_bind_unseparated(email);
    }
    if let Some(statuses) = filter.statuses.filter(|s| !s.is_empty()) {
        let statuses = statuses.iter().map(|s: &PaymentStatus| format!("'{s}'")).collect::<Vec<String>>().join(",");
        where_clause.push(format!("payment_status IN ({statuses})"));
    }
    if let Some(provider) = filter.provider {
        where_clause.push("provider = ");
        where_clause.push_bind_unseparated(provider);
    }
    if let Some(since) = filter.since {
        where_clause.push("created_at >= ");
        where_clause.push_bind_unseparated(since);
    }
    if let Some(until) = filter.until {
        where_clause.push("created_at <= ");
        where_clause.push_bind_unseparated(until);
    }
    builder.push(" ORDER BY created_at DESC");
    trace!("🗃️ Executing query: {}", builder.sql());
    let purchases = builder.build_query_as::<Purchase>().fetch_all(conn).await?;
    Ok(purchases)
}
