use chrono::prelude::*;
use serde::{Deserialize, Serialize};
use sqlx::types::BigDecimal;
use uuid::Uuid;

#[derive(Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Client,
    Freelancer,
    Admin,
    Both,
}

impl UserRole {
    pub fn to_str(&self) -> &str {
        match self {
            UserRole::Client => "client",
            UserRole::Freelancer => "freelancer",
            UserRole::Admin => "admin",
            UserRole::Both => "both",
        }
    }

    pub fn can_post_jobs(&self) -> bool {
        matches!(self, UserRole::Client | UserRole::Both)
    }

    pub fn can_bid(&self) -> bool {
        matches!(self, UserRole::Freelancer | UserRole::Both)
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, UserRole::Admin)
    }
}

#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: UserRole,

    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,

    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

/// One row per user. `earned` only grows through payment release,
/// `withdrawn` only through withdrawals.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct EarningsLedger {
    pub user_id: Uuid,
    pub earned: BigDecimal,
    pub in_escrow: BigDecimal,
    pub withdrawn: BigDecimal,
    pub updated_at: Option<DateTime<Utc>>,
}

impl EarningsLedger {
    pub fn empty(user_id: Uuid) -> Self {
        Self {
            user_id,
            earned: BigDecimal::from(0),
            in_escrow: BigDecimal::from(0),
            withdrawn: BigDecimal::from(0),
            updated_at: None,
        }
    }

    pub fn available(&self) -> BigDecimal {
        &self.earned - &self.withdrawn
    }

    /// Projects the withdrawal through the same delta the store applies.
    pub fn can_withdraw(&self, amount: &BigDecimal) -> bool {
        let mut after = self.clone();
        after.apply(&LedgerDelta::withdrawn(amount));
        after.withdrawn <= after.earned
    }

    pub fn apply(&mut self, delta: &LedgerDelta) {
        self.earned = &self.earned + &delta.earned;
        self.in_escrow = &self.in_escrow + &delta.in_escrow;
        self.withdrawn = &self.withdrawn + &delta.withdrawn;
    }
}

/// Signed change to a ledger row, applied in one UPDATE.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerDelta {
    pub earned: BigDecimal,
    pub in_escrow: BigDecimal,
    pub withdrawn: BigDecimal,
}

impl LedgerDelta {
    fn zero() -> Self {
        Self {
            earned: BigDecimal::from(0),
            in_escrow: BigDecimal::from(0),
            withdrawn: BigDecimal::from(0),
        }
    }

    pub fn escrowed(amount: &BigDecimal) -> Self {
        Self { in_escrow: amount.clone(), ..Self::zero() }
    }

    /// Credits `earned`; escrowed funds leave `in_escrow` at the same time.
    pub fn released(amount: &BigDecimal, was_escrowed: bool) -> Self {
        Self {
            earned: amount.clone(),
            in_escrow: if was_escrowed { -amount.clone() } else { BigDecimal::from(0) },
            ..Self::zero()
        }
    }

    pub fn refunded(amount: &BigDecimal, was_escrowed: bool) -> Self {
        Self {
            in_escrow: if was_escrowed { -amount.clone() } else { BigDecimal::from(0) },
            ..Self::zero()
        }
    }

    pub fn withdrawn(amount: &BigDecimal) -> Self {
        Self { withdrawn: amount.clone(), ..Self::zero() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn roles_gate_posting_and_bidding() {
        assert!(UserRole::Client.can_post_jobs());
        assert!(UserRole::Both.can_post_jobs());
        assert!(!UserRole::Freelancer.can_post_jobs());
        assert!(UserRole::Freelancer.can_bid());
        assert!(UserRole::Both.can_bid());
        assert!(!UserRole::Admin.can_bid());
    }

    #[test]
    fn available_is_earned_minus_withdrawn() {
        let mut ledger = EarningsLedger::empty(Uuid::new_v4());
        ledger.earned = BigDecimal::from(300);
        ledger.withdrawn = BigDecimal::from(120);
        ledger.in_escrow = BigDecimal::from(1000);

        assert_eq!(ledger.available(), BigDecimal::from(180));
        assert!(ledger.can_withdraw(&BigDecimal::from(180)));
        assert!(!ledger.can_withdraw(&BigDecimal::from_str("180.01").unwrap()));
    }

    #[test]
    fn releases_add_up_in_any_order() {
        let amounts: Vec<BigDecimal> = ["100", "150.50", "49.50"]
            .iter()
            .map(|a| BigDecimal::from_str(a).unwrap())
            .collect();
        let user = Uuid::new_v4();

        let mut forward = EarningsLedger::empty(user);
        for a in &amounts {
            forward.apply(&LedgerDelta::escrowed(a));
            forward.apply(&LedgerDelta::released(a, true));
        }

        let mut backward = EarningsLedger::empty(user);
        for a in amounts.iter().rev() {
            backward.apply(&LedgerDelta::released(a, false));
        }

        assert_eq!(forward.earned, BigDecimal::from(300));
        assert_eq!(forward.earned, backward.earned);
        assert_eq!(forward.in_escrow, BigDecimal::from(0));
    }

    #[test]
    fn refund_and_withdrawal_deltas() {
        let mut ledger = EarningsLedger::empty(Uuid::new_v4());
        let amount = BigDecimal::from(80);

        ledger.apply(&LedgerDelta::escrowed(&amount));
        ledger.apply(&LedgerDelta::refunded(&amount, true));
        assert_eq!(ledger.in_escrow, BigDecimal::from(0));
        assert_eq!(ledger.earned, BigDecimal::from(0));

        ledger.apply(&LedgerDelta::released(&BigDecimal::from(300), false));
        ledger.apply(&LedgerDelta::withdrawn(&BigDecimal::from(100)));
        assert_eq!(ledger.available(), BigDecimal::from(200));
        assert_eq!(ledger.earned, BigDecimal::from(300));
    }
}
