// service/escrow_service.rs
use std::sync::Arc;

use chrono::Utc;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::{
    db::{db::DBClient, jobdb::JobExt, paymentdb::PaymentExt, userdb::UserExt},
    dtos::paymentdtos::*,
    models::{
        jobmodel::Job,
        paymentmodel::*,
        usermodel::{EarningsLedger, LedgerDelta, User},
    },
    service::error::ServiceError,
    utils::decimal::money_from_f64,
};

#[derive(Debug, Clone)]
pub struct EscrowService {
    db_client: Arc<DBClient>,
}

impl EscrowService {
    pub fn new(db_client: Arc<DBClient>) -> Self {
        Self { db_client }
    }

    /// Job must exist and belong to `client_id`; the payee must exist. The job
    /// row stays locked until `tx` ends so a delete cannot race the insert.
    async fn job_for_client(
        &self,
        job_id: Uuid,
        client_id: Uuid,
        freelancer_id: Uuid,
        action: &str,
        tx: &mut Transaction<'_, Postgres>,
    ) -> Result<Job, ServiceError> {
        let job = self
            .db_client
            .lock_job_tx(job_id, tx)
            .await?
            .ok_or(ServiceError::JobNotFound(job_id))?;
        job.ensure_client(client_id, action)?;

        self.db_client
            .get_user(freelancer_id)
            .await?
            .ok_or(ServiceError::UserNotFound(freelancer_id))?;

        Ok(job)
    }

    /// Client funds escrow for a job. The payee's `in_escrow` grows; nothing
    /// becomes withdrawable yet.
    pub async fn create_payment(
        &self,
        client_id: Uuid,
        body: CreatePaymentDto,
    ) -> Result<Payment, ServiceError> {
        let amount = money_from_f64(body.amount, "amount")?;
        ensure_positive_amount(&amount)?;
        let mut tx = self.db_client.begin().await?;
        let job = self
            .job_for_client(body.job_id, client_id, body.freelancer_id, "fund escrow", &mut tx)
            .await?;

        let now = Utc::now();
        let new_payment = NewPayment {
            job_id: job.id,
            client_id,
            freelancer_id: body.freelancer_id,
            amount,
            currency: body.currency.to_uppercase(),
            status: PaymentStatus::Escrow,
            payment_method: body.payment_method,
            milestone: body.milestone,
            invoice_number: generate_invoice_number(now),
            description: body.description,
        };

        let payment = self.db_client.insert_payment_tx(&new_payment, now, &mut tx).await?;
        self.db_client
            .apply_ledger_delta_tx(payment.freelancer_id, &LedgerDelta::escrowed(&payment.amount), &mut tx)
            .await?;
        tx.commit().await?;

        tracing::info!(
            payment_id = %payment.id,
            job_id = %job.id,
            amount = %payment.amount,
            invoice = ?payment.invoice_number,
            "payment placed in escrow"
        );
        Ok(payment)
    }

    pub async fn create_release_request(
        &self,
        client_id: Uuid,
        body: ReleaseRequestDto,
    ) -> Result<Payment, ServiceError> {
        let amount = money_from_f64(body.amount, "amount")?;
        ensure_positive_amount(&amount)?;
        let mut tx = self.db_client.begin().await?;
        let job = self
            .job_for_client(body.job_id, client_id, body.freelancer_id, "request a release", &mut tx)
            .await?;

        let now = Utc::now();
        let new_payment = NewPayment {
            job_id: job.id,
            client_id,
            freelancer_id: body.freelancer_id,
            amount,
            currency: "USD".to_string(),
            status: PaymentStatus::PendingApproval,
            payment_method: "release_request".to_string(),
            milestone: body.milestone,
            invoice_number: generate_invoice_number(now),
            description: body.description,
        };

        let payment = self.db_client.insert_payment_tx(&new_payment, now, &mut tx).await?;
        tx.commit().await?;

        tracing::info!(payment_id = %payment.id, job_id = %job.id, "release requested");
        Ok(payment)
    }

    /// Payment status, freelancer ledger and job `amount_paid` move together.
    pub async fn release_payment(&self, payment_id: Uuid, caller_id: Uuid) -> Result<Payment, ServiceError> {
        let now = Utc::now();
        let mut tx = self.db_client.begin().await?;

        let payment = self
            .db_client
            .lock_payment_tx(payment_id, &mut tx)
            .await?
            .ok_or(ServiceError::PaymentNotFound(payment_id))?;

        payment.ensure_client(caller_id, "release")?;
        payment.ensure_transition(PaymentStatus::Released)?;
        let was_escrowed = payment.status == PaymentStatus::Escrow;

        let released = self
            .db_client
            .transition_payment_tx(payment_id, payment.status, PaymentStatus::Released, now, None, &mut tx)
            .await?
            .ok_or_else(|| ServiceError::invalid_state(format!("payment {} changed concurrently", payment_id)))?;

        self.db_client
            .apply_ledger_delta_tx(
                released.freelancer_id,
                &LedgerDelta::released(&released.amount, was_escrowed),
                &mut tx,
            )
            .await?;
        self.db_client
            .add_job_amount_paid_tx(released.job_id, &released.amount, &mut tx)
            .await?;

        tx.commit().await?;

        tracing::info!(
            payment_id = %payment_id,
            from = ?payment.status,
            freelancer_id = %released.freelancer_id,
            amount = %released.amount,
            "payment released"
        );
        Ok(released)
    }

    /// Admin payout of an approved milestone. Creates the payment already
    /// released and completes the milestone in the same transaction.
    pub async fn release_milestone_payment(
        &self,
        job_id: Uuid,
        milestone_id: Uuid,
        admin_id: Uuid,
    ) -> Result<Payment, ServiceError> {
        let now = Utc::now();
        let mut tx = self.db_client.begin().await?;

        let mut job = self
            .db_client
            .lock_job_tx(job_id, &mut tx)
            .await?
            .ok_or(ServiceError::JobNotFound(job_id))?;

        let (milestone, freelancer_id) = job.complete_milestone_for_release(milestone_id, now)?;
        self.db_client.save_job_tx(&job, &mut tx).await?;

        let new_payment = NewPayment {
            job_id,
            client_id: job.client_id,
            freelancer_id,
            amount: milestone.payment.clone(),
            currency: "USD".to_string(),
            status: PaymentStatus::Released,
            payment_method: "milestone".to_string(),
            milestone: Some(milestone.title.clone()),
            invoice_number: generate_invoice_number(now),
            description: Some(format!("Milestone payment: {}", milestone.title)),
        };
        let payment = self.db_client.insert_payment_tx(&new_payment, now, &mut tx).await?;

        self.db_client
            .apply_ledger_delta_tx(freelancer_id, &LedgerDelta::released(&payment.amount, false), &mut tx)
            .await?;

        tx.commit().await?;

        tracing::info!(
            job_id = %job_id,
            milestone_id = %milestone_id,
            payment_id = %payment.id,
            admin_id = %admin_id,
            amount = %payment.amount,
            "milestone payment released"
        );
        Ok(payment)
    }

    /// Funds go back to the client; an escrowed amount leaves the payee's
    /// `in_escrow`.
    pub async fn refund_payment(&self, caller_id: Uuid, body: RefundDto) -> Result<Payment, ServiceError> {
        let payment_id = body.payment_id;
        let now = Utc::now();
        let mut tx = self.db_client.begin().await?;

        let payment = self
            .db_client
            .lock_payment_tx(payment_id, &mut tx)
            .await?
            .ok_or(ServiceError::PaymentNotFound(payment_id))?;

        payment.ensure_client(caller_id, "refund")?;
        payment.ensure_transition(PaymentStatus::Refunded)?;
        let was_escrowed = payment.status == PaymentStatus::Escrow;

        let refunded = self
            .db_client
            .transition_payment_tx(
                payment_id,
                payment.status,
                PaymentStatus::Refunded,
                now,
                Some(body.reason),
                &mut tx,
            )
            .await?
            .ok_or_else(|| ServiceError::invalid_state(format!("payment {} changed concurrently", payment_id)))?;

        if was_escrowed {
            self.db_client
                .apply_ledger_delta_tx(
                    refunded.freelancer_id,
                    &LedgerDelta::refunded(&refunded.amount, true),
                    &mut tx,
                )
                .await?;
        }

        tx.commit().await?;

        tracing::info!(payment_id = %payment_id, from = ?payment.status, "payment refunded");
        Ok(refunded)
    }

    pub async fn cancel_payment(&self, payment_id: Uuid, caller_id: Uuid) -> Result<Payment, ServiceError> {
        let now = Utc::now();
        let mut tx = self.db_client.begin().await?;

        let payment = self
            .db_client
            .lock_payment_tx(payment_id, &mut tx)
            .await?
            .ok_or(ServiceError::PaymentNotFound(payment_id))?;

        payment.ensure_client(caller_id, "cancel")?;
        payment.ensure_transition(PaymentStatus::Cancelled)?;

        let cancelled = self
            .db_client
            .transition_payment_tx(payment_id, payment.status, PaymentStatus::Cancelled, now, None, &mut tx)
            .await?
            .ok_or_else(|| ServiceError::invalid_state(format!("payment {} changed concurrently", payment_id)))?;

        tx.commit().await?;

        tracing::info!(payment_id = %payment_id, from = ?payment.status, "payment cancelled");
        Ok(cancelled)
    }

    pub async fn get_payment(&self, payment_id: Uuid, user: &User) -> Result<Payment, ServiceError> {
        let payment = self
            .db_client
            .get_payment_by_id(payment_id)
            .await?
            .ok_or(ServiceError::PaymentNotFound(payment_id))?;

        if !payment.is_party(user.id) && !user.role.is_admin() {
            return Err(ServiceError::forbidden(user.id, format!("view payment {}", payment_id)));
        }
        Ok(payment)
    }

    pub async fn list_payments(&self, user_id: Uuid) -> Result<Vec<Payment>, ServiceError> {
        Ok(self.db_client.get_user_payments(user_id).await?)
    }

    pub async fn get_earnings(&self, freelancer_id: Uuid) -> Result<EarningsResponseDto, ServiceError> {
        let payments = self.db_client.get_released_payments(freelancer_id).await?;
        let ledger = self.db_client.get_ledger(freelancer_id).await?;

        Ok(EarningsResponseDto::new(
            EarningsSummary::from_payments(&payments, Utc::now()),
            &ledger,
        ))
    }

    pub async fn get_ledger(&self, user_id: Uuid) -> Result<EarningsLedger, ServiceError> {
        Ok(self.db_client.get_ledger(user_id).await?)
    }

    pub async fn withdraw(&self, user_id: Uuid, body: WithdrawDto) -> Result<EarningsLedger, ServiceError> {
        let amount = money_from_f64(body.amount, "amount")?;
        ensure_positive_amount(&amount)?;

        let ledger = self.db_client.get_ledger(user_id).await?;
        if !ledger.can_withdraw(&amount) {
            return Err(ServiceError::InsufficientFunds {
                requested: amount,
                available: ledger.available(),
            });
        }

        let mut tx = self.db_client.begin().await?;
        let updated = self
            .db_client
            .withdraw_tx(user_id, &LedgerDelta::withdrawn(&amount), &body.method, &mut tx)
            .await?;

        let Some(updated) = updated else {
            // Balance dropped between the read and the conditional update.
            tx.rollback().await?;
            let current = self.db_client.get_ledger(user_id).await?;
            return Err(ServiceError::InsufficientFunds {
                requested: amount,
                available: current.available(),
            });
        };
        tx.commit().await?;

        tracing::info!(
            user_id = %user_id,
            amount = %amount,
            method = %body.method,
            available = %updated.available(),
            "earnings withdrawn"
        );
        Ok(updated)
    }
}
