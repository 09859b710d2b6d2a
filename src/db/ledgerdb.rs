// db/ledgerdb.rs
use async_trait::async_trait;
use sqlx::{Error, Row};
use uuid::Uuid;

use super::db::DBClient;

/// The only operation anywhere that mutates an affiliate's balance.
///
/// Implementations must perform the increment server-side in one statement;
/// a read-then-write from the caller would drop credits under concurrency.
#[async_trait]
pub trait BalanceStore {
    async fn credit_balance(&self, affiliate_id: Uuid, amount_cents: i64) -> Result<i64, Error>;

    async fn get_balance(&self, affiliate_id: Uuid) -> Result<i64, Error>;
}

#[async_trait]
impl BalanceStore for DBClient {
    async fn credit_balance(&self, affiliate_id: Uuid, amount_cents: i64) -> Result<i64, Error> {
        let row = sqlx::query(
            r#"
            UPDATE affiliates
            SET balance_cents = balance_cents + $2, updated_at = NOW()
            WHERE id = $1
            RETURNING balance_cents
            "#,
        )
        .bind(affiliate_id)
        .bind(amount_cents)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.get::<i64, _>("balance_cents"))
    }

    async fn get_balance(&self, affiliate_id: Uuid) -> Result<i64, Error> {
        let row = sqlx::query("SELECT balance_cents FROM affiliates WHERE id = $1")
            .bind(affiliate_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(row.get::<i64, _>("balance_cents"))
    }
}
