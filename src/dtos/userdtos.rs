use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::BigDecimal;

use crate::models::usermodel::{EarningsLedger, User};

#[derive(Debug, Serialize, Deserialize)]
pub struct FilterUserDto {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl FilterUserDto {
    pub fn filter_user(user: &User) -> Self {
        FilterUserDto {
            id: user.id.to_string(),
            name: user.name.to_owned(),
            email: user.email.to_owned(),
            role: user.role.to_str().to_string(),
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserData {
    pub user: FilterUserDto,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponseDto {
    pub status: String,
    pub data: UserData,
}

/// Ledger as exposed to its owner. `total_earnings` is the lifetime credited
/// amount and `available_balance` what can still be withdrawn.
#[derive(Debug, Serialize)]
pub struct LedgerResponseDto {
    pub total_earnings: BigDecimal,
    pub available_balance: BigDecimal,
    pub in_escrow: BigDecimal,
    pub withdrawn: BigDecimal,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<&EarningsLedger> for LedgerResponseDto {
    fn from(ledger: &EarningsLedger) -> Self {
        Self {
            total_earnings: ledger.earned.clone(),
            available_balance: ledger.available(),
            in_escrow: ledger.in_escrow.clone(),
            withdrawn: ledger.withdrawn.clone(),
            updated_at: ledger.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::usermodel::LedgerDelta;
    use uuid::Uuid;

    #[test]
    fn ledger_response_derives_available_balance() {
        let mut ledger = EarningsLedger::empty(Uuid::new_v4());
        ledger.apply(&LedgerDelta::released(&BigDecimal::from(300), false));
        ledger.apply(&LedgerDelta::withdrawn(&BigDecimal::from(120)));

        let dto = LedgerResponseDto::from(&ledger);
        assert_eq!(dto.total_earnings, BigDecimal::from(300));
        assert_eq!(dto.available_balance, BigDecimal::from(180));
        assert_eq!(dto.withdrawn, BigDecimal::from(120));
    }
}
