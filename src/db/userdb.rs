// db/userdb.rs
use async_trait::async_trait;
use sqlx::{Error, Postgres, Transaction};
use uuid::Uuid;

use super::db::DBClient;
use crate::models::usermodel::*;

#[async_trait]
pub trait UserExt {
    async fn get_user(&self, user_id: Uuid) -> Result<Option<User>, Error>;

    async fn get_ledger(&self, user_id: Uuid) -> Result<EarningsLedger, Error>;

    /// Upserts the ledger row and adds the delta in one statement.
    async fn apply_ledger_delta_tx(
        &self,
        user_id: Uuid,
        delta: &LedgerDelta,
        tx: &mut Transaction<'_, Postgres>,
    ) -> Result<EarningsLedger, Error>;

    /// Applies a withdrawal delta only while `earned - withdrawn` covers it.
    async fn withdraw_tx(
        &self,
        user_id: Uuid,
        delta: &LedgerDelta,
        method: &str,
        tx: &mut Transaction<'_, Postgres>,
    ) -> Result<Option<EarningsLedger>, Error>;
}

#[async_trait]
impl UserExt for DBClient {
    async fn get_user(&self, user_id: Uuid) -> Result<Option<User>, Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, role, created_at, updated_at
            FROM users
            WHERE id = $1
            "#
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_ledger(&self, user_id: Uuid) -> Result<EarningsLedger, Error> {
        let ledger = sqlx::query_as::<_, EarningsLedger>(
            r#"
            SELECT user_id, earned, in_escrow, withdrawn, updated_at
            FROM earnings_ledgers
            WHERE user_id = $1
            "#
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(ledger.unwrap_or_else(|| EarningsLedger::empty(user_id)))
    }

    async fn apply_ledger_delta_tx(
        &self,
        user_id: Uuid,
        delta: &LedgerDelta,
        tx: &mut Transaction<'_, Postgres>,
    ) -> Result<EarningsLedger, Error> {
        sqlx::query_as::<_, EarningsLedger>(
            r#"
            INSERT INTO earnings_ledgers (user_id, earned, in_escrow, withdrawn, updated_at)
            VALUES ($1, $2, $3, $4, NOW())
            ON CONFLICT (user_id) DO UPDATE
            SET earned = earnings_ledgers.earned + EXCLUDED.earned,
                in_escrow = earnings_ledgers.in_escrow + EXCLUDED.in_escrow,
                withdrawn = earnings_ledgers.withdrawn + EXCLUDED.withdrawn,
                updated_at = NOW()
            RETURNING user_id, earned, in_escrow, withdrawn, updated_at
            "#
        )
        .bind(user_id)
        .bind(&delta.earned)
        .bind(&delta.in_escrow)
        .bind(&delta.withdrawn)
        .fetch_one(&mut **tx)
        .await
    }

    async fn withdraw_tx(
        &self,
        user_id: Uuid,
        delta: &LedgerDelta,
        method: &str,
        tx: &mut Transaction<'_, Postgres>,
    ) -> Result<Option<EarningsLedger>, Error> {
        let amount = &delta.withdrawn;
        let ledger = sqlx::query_as::<_, EarningsLedger>(
            r#"
            UPDATE earnings_ledgers
            SET withdrawn = withdrawn + $2, updated_at = NOW()
            WHERE user_id = $1 AND earned - withdrawn >= $2
            RETURNING user_id, earned, in_escrow, withdrawn, updated_at
            "#
        )
        .bind(user_id)
        .bind(amount)
        .fetch_optional(&mut **tx)
        .await?;

        if ledger.is_some() {
            sqlx::query(
                r#"
                INSERT INTO withdrawals (user_id, amount, method)
                VALUES ($1, $2, $3)
                "#
            )
            .bind(user_id)
            .bind(amount)
            .bind(method)
            .execute(&mut **tx)
            .await?;
        }

        Ok(ledger)
    }
}
