use std::collections::HashSet;

use chrono::{DateTime, Datelike, Utc};
use num_traits::Zero;
use rand::Rng;
use serde::{Deserialize, Serialize};
use sqlx::types::BigDecimal;
use uuid::Uuid;

use crate::service::error::ServiceError;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "payment_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Escrow,
    Released,
    Refunded,
    PendingApproval,
    Cancelled,
}

impl PaymentStatus {
    /// Forward-only. Nothing leaves `released`, `refunded` or `cancelled`.
    pub fn can_transition_to(&self, to: PaymentStatus) -> bool {
        use PaymentStatus::*;
        matches!(
            (self, to),
            (Pending, Escrow)
                | (Pending, Released)
                | (Pending, Refunded)
                | (Pending, Cancelled)
                | (Escrow, Released)
                | (Escrow, Refunded)
                | (PendingApproval, Released)
                | (PendingApproval, Refunded)
                | (PendingApproval, Cancelled)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PaymentStatus::Released | PaymentStatus::Refunded | PaymentStatus::Cancelled
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Payment {
    pub id: Uuid,
    pub job_id: Uuid,
    pub client_id: Uuid,
    pub freelancer_id: Uuid,
    pub amount: BigDecimal,
    pub currency: String,
    pub status: PaymentStatus,
    pub payment_method: String,
    pub milestone: Option<String>,
    pub escrow_release_date: Option<DateTime<Utc>>,
    pub escrow_released: bool,
    pub invoice_number: Option<String>,
    pub description: Option<String>,
    pub refund_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    pub fn ensure_client(&self, user_id: Uuid, action: &str) -> Result<(), ServiceError> {
        if self.client_id == user_id {
            Ok(())
        } else {
            Err(ServiceError::forbidden(user_id, format!("{} payment {}", action, self.id)))
        }
    }

    pub fn is_party(&self, user_id: Uuid) -> bool {
        self.client_id == user_id || self.freelancer_id == user_id
    }

    pub fn ensure_transition(&self, to: PaymentStatus) -> Result<(), ServiceError> {
        if self.status.can_transition_to(to) {
            Ok(())
        } else if self.status.is_terminal() {
            Err(ServiceError::invalid_state(format!(
                "payment {} is already {:?}",
                self.id, self.status
            )))
        } else {
            Err(ServiceError::invalid_state(format!(
                "payment {} cannot move from {:?} to {:?}",
                self.id, self.status, to
            )))
        }
    }
}

/// A payment about to be inserted.
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub job_id: Uuid,
    pub client_id: Uuid,
    pub freelancer_id: Uuid,
    pub amount: BigDecimal,
    pub currency: String,
    pub status: PaymentStatus,
    pub payment_method: String,
    pub milestone: Option<String>,
    pub invoice_number: String,
    pub description: Option<String>,
}

impl NewPayment {
    /// Released payments are created already settled.
    pub fn escrow_released(&self) -> bool {
        self.status == PaymentStatus::Released
    }
}

pub fn generate_invoice_number(now: DateTime<Utc>) -> String {
    let suffix: u16 = rand::rng().random_range(1000..10000);
    format!("INV-{}-{}", now.timestamp_millis(), suffix)
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EarningsSummary {
    pub total_earnings: BigDecimal,
    pub jobs_paid: usize,
    pub this_month: BigDecimal,
    pub released_payments: usize,
}

impl EarningsSummary {
    /// Aggregates `released` payments only; the month bucket compares the
    /// payment's creation month and year with `now`.
    pub fn from_payments(payments: &[Payment], now: DateTime<Utc>) -> Self {
        let released: Vec<&Payment> = payments
            .iter()
            .filter(|p| p.status == PaymentStatus::Released)
            .collect();

        let total_earnings = released.iter().map(|p| &p.amount).sum();
        let this_month = released
            .iter()
            .filter(|p| p.created_at.month() == now.month() && p.created_at.year() == now.year())
            .map(|p| &p.amount)
            .sum();
        let jobs_paid = released.iter().map(|p| p.job_id).collect::<HashSet<_>>().len();

        Self {
            total_earnings,
            jobs_paid,
            this_month,
            released_payments: released.len(),
        }
    }
}

pub fn ensure_positive_amount(amount: &BigDecimal) -> Result<(), ServiceError> {
    if amount.is_zero() || amount < &BigDecimal::zero() {
        return Err(ServiceError::Validation("Amount must be positive".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn payment(job_id: Uuid, amount: i32, status: PaymentStatus, created_at: DateTime<Utc>) -> Payment {
        Payment {
            id: Uuid::new_v4(),
            job_id,
            client_id: Uuid::new_v4(),
            freelancer_id: Uuid::new_v4(),
            amount: BigDecimal::from(amount),
            currency: "USD".to_string(),
            status,
            payment_method: "card".to_string(),
            milestone: None,
            escrow_release_date: None,
            escrow_released: false,
            invoice_number: None,
            description: None,
            refund_reason: None,
            created_at,
            updated_at: created_at,
        }
    }

    #[test]
    fn released_is_terminal() {
        use PaymentStatus::*;
        for to in [Pending, Escrow, Released, Refunded, PendingApproval, Cancelled] {
            assert!(!Released.can_transition_to(to));
            assert!(!Refunded.can_transition_to(to));
            assert!(!Cancelled.can_transition_to(to));
        }
        assert!(Escrow.can_transition_to(Released));
        assert!(Escrow.can_transition_to(Refunded));
        assert!(!Escrow.can_transition_to(Cancelled));
        assert!(PendingApproval.can_transition_to(Released));
        assert!(PendingApproval.can_transition_to(Cancelled));
        assert!(Released.is_terminal());
    }

    #[test]
    fn ensure_transition_reports_invalid_state() {
        let now = Utc::now();
        let p = payment(Uuid::new_v4(), 10, PaymentStatus::Released, now);
        assert!(matches!(
            p.ensure_transition(PaymentStatus::Released).unwrap_err(),
            ServiceError::InvalidState(_)
        ));
    }

    #[test]
    fn only_the_client_controls_a_payment() {
        let p = payment(Uuid::new_v4(), 10, PaymentStatus::Escrow, Utc::now());
        assert!(p.ensure_client(p.client_id, "release").is_ok());
        assert!(matches!(
            p.ensure_client(p.freelancer_id, "release").unwrap_err(),
            ServiceError::Forbidden { .. }
        ));
        assert!(p.is_party(p.freelancer_id));
    }

    #[test]
    fn earnings_count_released_only() {
        let now = Utc.with_ymd_and_hms(2026, 5, 20, 12, 0, 0).unwrap();
        let last_month = now - Duration::days(40);
        let job_a = Uuid::new_v4();
        let job_b = Uuid::new_v4();

        let payments = vec![
            payment(job_a, 100, PaymentStatus::Released, now),
            payment(job_a, 150, PaymentStatus::Released, last_month),
            payment(job_b, 70, PaymentStatus::Released, now),
            payment(job_b, 999, PaymentStatus::Escrow, now),
            payment(job_b, 500, PaymentStatus::Refunded, now),
        ];

        let summary = EarningsSummary::from_payments(&payments, now);

        assert_eq!(summary.total_earnings, BigDecimal::from(320));
        assert_eq!(summary.this_month, BigDecimal::from(170));
        assert_eq!(summary.jobs_paid, 2);
        assert_eq!(summary.released_payments, 3);
    }

    #[test]
    fn same_month_previous_year_is_not_this_month() {
        let now = Utc.with_ymd_and_hms(2026, 5, 20, 12, 0, 0).unwrap();
        let a_year_ago = Utc.with_ymd_and_hms(2025, 5, 20, 12, 0, 0).unwrap();
        let payments = vec![payment(Uuid::new_v4(), 40, PaymentStatus::Released, a_year_ago)];

        let summary = EarningsSummary::from_payments(&payments, now);
        assert_eq!(summary.this_month, BigDecimal::from(0));
        assert_eq!(summary.total_earnings, BigDecimal::from(40));
    }

    #[test]
    fn invoice_numbers_carry_timestamp() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let invoice = generate_invoice_number(now);
        assert!(invoice.starts_with(&format!("INV-{}-", now.timestamp_millis())));
        assert_eq!(invoice.rsplit('-').next().unwrap().len(), 4);
    }

    #[test]
    fn amounts_must_be_positive() {
        assert!(ensure_positive_amount(&BigDecimal::from(1)).is_ok());
        assert!(ensure_positive_amount(&BigDecimal::from(0)).is_err());
        assert!(ensure_positive_amount(&BigDecimal::from(-5)).is_err());
    }
}
