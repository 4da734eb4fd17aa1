use sqlx::SqliteConnection;

use super::{first_row, one_row};

use crate::db_types::SellerAccount;

pub async fn upsert_seller_account(
    seller_id: &str,
    payout_account_id: &str,
    conn: &mut SqliteConnection,
) -> Result<SellerAccount, sqlx::Error> {
    let account = sqlx::query_as(
        r#"
        INSERT INTO sellers (seller_id, payout_account_id) VALUES ($1, $2)
        ON CONFLICT (seller_id) DO UPDATE SET
            payout_account_id = excluded.payout_account_id,
            updated_at = CURRENT_TIMESTAMP
        RETURNING *
        "#,
    )
    .bind(seller_id)
    .bind(payout_account_id)
    .fetch_all(conn)
    .await
    .and_then(one_row)?;
    Ok(account)
}

pub async fn fetch_seller_account(
    seller_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<SellerAccount>, sqlx::Error> {
    let account = sqlx::query_as("SELECT * FROM sellers WHERE seller_id = $1")
        .bind(seller_id)
        .fetch_all(conn)
        .await
        .map(first_row)?;
    Ok(account)
}
