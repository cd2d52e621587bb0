// db/paymentdb.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{types::BigDecimal, Error, Postgres, Transaction};
use uuid::Uuid;

use super::db::DBClient;
use crate::models::paymentmodel::*;

#[async_trait]
pub trait PaymentExt {
    async fn insert_payment_tx(
        &self,
        payment: &NewPayment,
        now: DateTime<Utc>,
        tx: &mut Transaction<'_, Postgres>,
    ) -> Result<Payment, Error>;

    async fn get_payment_by_id(&self, payment_id: Uuid) -> Result<Option<Payment>, Error>;

    async fn lock_payment_tx(
        &self,
        payment_id: Uuid,
        tx: &mut Transaction<'_, Postgres>,
    ) -> Result<Option<Payment>, Error>;

    /// Moves the payment to `to` only if it is still in `from`; `None` means
    /// someone else moved it first.
    async fn transition_payment_tx(
        &self,
        payment_id: Uuid,
        from: PaymentStatus,
        to: PaymentStatus,
        now: DateTime<Utc>,
        refund_reason: Option<String>,
        tx: &mut Transaction<'_, Postgres>,
    ) -> Result<Option<Payment>, Error>;

    async fn add_job_amount_paid_tx(
        &self,
        job_id: Uuid,
        amount: &BigDecimal,
        tx: &mut Transaction<'_, Postgres>,
    ) -> Result<(), Error>;

    async fn count_job_payments_tx(
        &self,
        job_id: Uuid,
        tx: &mut Transaction<'_, Postgres>,
    ) -> Result<i64, Error>;

    async fn get_user_payments(&self, user_id: Uuid) -> Result<Vec<Payment>, Error>;

    async fn get_released_payments(&self, freelancer_id: Uuid) -> Result<Vec<Payment>, Error>;
}

#[async_trait]
impl PaymentExt for DBClient {
    async fn insert_payment_tx(
        &self,
        payment: &NewPayment,
        now: DateTime<Utc>,
        tx: &mut Transaction<'_, Postgres>,
    ) -> Result<Payment, Error> {
        let released = payment.escrow_released();

        sqlx::query_as::<_, Payment>(
            r#"
            INSERT INTO payments
            (job_id, client_id, freelancer_id, amount, currency, status, payment_method,
            milestone, escrow_release_date, escrow_released, invoice_number, description,
            created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $13)
            RETURNING *
            "#
        )
        .bind(payment.job_id)
        .bind(payment.client_id)
        .bind(payment.freelancer_id)
        .bind(&payment.amount)
        .bind(&payment.currency)
        .bind(payment.status)
        .bind(&payment.payment_method)
        .bind(&payment.milestone)
        .bind(if released { Some(now) } else { None })
        .bind(released)
        .bind(&payment.invoice_number)
        .bind(&payment.description)
        .bind(now)
        .fetch_one(&mut **tx)
        .await
    }

    async fn get_payment_by_id(&self, payment_id: Uuid) -> Result<Option<Payment>, Error> {
        sqlx::query_as::<_, Payment>(
            r#"
            SELECT * FROM payments
            WHERE id = $1
            "#
        )
        .bind(payment_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn lock_payment_tx(
        &self,
        payment_id: Uuid,
        tx: &mut Transaction<'_, Postgres>,
    ) -> Result<Option<Payment>, Error> {
        sqlx::query_as::<_, Payment>(
            r#"
            SELECT * FROM payments
            WHERE id = $1
            FOR UPDATE
            "#
        )
        .bind(payment_id)
        .fetch_optional(&mut **tx)
        .await
    }

    async fn transition_payment_tx(
        &self,
        payment_id: Uuid,
        from: PaymentStatus,
        to: PaymentStatus,
        now: DateTime<Utc>,
        refund_reason: Option<String>,
        tx: &mut Transaction<'_, Postgres>,
    ) -> Result<Option<Payment>, Error> {
        let releasing = to == PaymentStatus::Released;

        sqlx::query_as::<_, Payment>(
            r#"
            UPDATE payments
            SET status = $3,
                escrow_released = CASE WHEN $4 THEN TRUE ELSE escrow_released END,
                escrow_release_date = CASE WHEN $4 THEN $5 ELSE escrow_release_date END,
                refund_reason = COALESCE($6, refund_reason),
                updated_at = $5
            WHERE id = $1 AND status = $2
            RETURNING *
            "#
        )
        .bind(payment_id)
        .bind(from)
        .bind(to)
        .bind(releasing)
        .bind(now)
        .bind(refund_reason)
        .fetch_optional(&mut **tx)
        .await
    }

    async fn add_job_amount_paid_tx(
        &self,
        job_id: Uuid,
        amount: &BigDecimal,
        tx: &mut Transaction<'_, Postgres>,
    ) -> Result<(), Error> {
        sqlx::query(
            r#"
            UPDATE jobs
            SET amount_paid = amount_paid + $2, updated_at = NOW()
            WHERE id = $1
            "#
        )
        .bind(job_id)
        .bind(amount)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    async fn count_job_payments_tx(
        &self,
        job_id: Uuid,
        tx: &mut Transaction<'_, Postgres>,
    ) -> Result<i64, Error> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM payments
            WHERE job_id = $1
            "#
        )
        .bind(job_id)
        .fetch_one(&mut **tx)
        .await
    }

    async fn get_user_payments(&self, user_id: Uuid) -> Result<Vec<Payment>, Error> {
        sqlx::query_as::<_, Payment>(
            r#"
            SELECT * FROM payments
            WHERE client_id = $1 OR freelancer_id = $1
            ORDER BY created_at DESC
            "#
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_released_payments(&self, freelancer_id: Uuid) -> Result<Vec<Payment>, Error> {
        sqlx::query_as::<_, Payment>(
            r#"
            SELECT * FROM payments
            WHERE freelancer_id = $1 AND status = 'released'::payment_status
            ORDER BY created_at DESC
            "#
        )
        .bind(freelancer_id)
        .fetch_all(&self.pool)
        .await
    }
}
