use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::{paymentmodel::EarningsSummary, usermodel::EarningsLedger};

fn default_currency() -> String {
    "USD".to_string()
}

fn default_method() -> String {
    "escrow".to_string()
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreatePaymentDto {
    pub job_id: Uuid,
    pub freelancer_id: Uuid,

    #[validate(range(min = 0.01, message = "Amount must be positive"))]
    pub amount: f64,

    #[serde(default = "default_method")]
    #[validate(length(min = 1, max = 50, message = "Payment method is required"))]
    pub payment_method: String,

    #[serde(default = "default_currency")]
    #[validate(length(equal = 3, message = "Currency must be a 3-letter code"))]
    pub currency: String,

    pub milestone: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct ReleaseRequestDto {
    pub job_id: Uuid,
    pub freelancer_id: Uuid,

    #[validate(range(min = 0.01, message = "Amount must be positive"))]
    pub amount: f64,

    pub milestone: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct RefundDto {
    pub payment_id: Uuid,

    #[validate(length(min = 1, max = 1000, message = "A refund reason is required"))]
    pub reason: String,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct WithdrawDto {
    #[validate(range(min = 0.01, message = "Amount must be positive"))]
    pub amount: f64,

    #[validate(length(min = 1, max = 50, message = "Withdrawal method is required"))]
    pub method: String,
}

#[derive(Debug, Serialize)]
pub struct EarningsResponseDto {
    #[serde(flatten)]
    pub summary: EarningsSummary,
    pub available_balance: sqlx::types::BigDecimal,
    pub in_escrow: sqlx::types::BigDecimal,
    pub withdrawn: sqlx::types::BigDecimal,
}

impl EarningsResponseDto {
    pub fn new(summary: EarningsSummary, ledger: &EarningsLedger) -> Self {
        Self {
            summary,
            available_balance: ledger.available(),
            in_escrow: ledger.in_escrow.clone(),
            withdrawn: ledger.withdrawn.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_payment_defaults_method_and_currency() {
        let body: CreatePaymentDto = serde_json::from_value(serde_json::json!({
            "job_id": Uuid::new_v4(),
            "freelancer_id": Uuid::new_v4(),
            "amount": 120.5
        }))
        .unwrap();

        assert_eq!(body.payment_method, "escrow");
        assert_eq!(body.currency, "USD");
        assert!(body.validate().is_ok());
    }

    #[test]
    fn refund_needs_reason() {
        let body = RefundDto { payment_id: Uuid::new_v4(), reason: String::new() };
        assert!(body.validate().is_err());
    }
}
