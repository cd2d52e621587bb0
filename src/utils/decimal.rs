use num_traits::FromPrimitive;
use sqlx::types::BigDecimal;

use crate::service::error::ServiceError;

/// Money arrives as JSON numbers and is kept to two decimal places.
pub fn money_from_f64(value: f64, field: &str) -> Result<BigDecimal, ServiceError> {
    if !value.is_finite() {
        return Err(ServiceError::Validation(format!("{} must be a finite number", field)));
    }

    BigDecimal::from_f64(value)
        .map(|amount| amount.round(2))
        .ok_or_else(|| ServiceError::Validation(format!("{} is not a valid amount", field)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn money_is_rounded_to_cents() {
        assert_eq!(money_from_f64(99.999, "amount").unwrap(), BigDecimal::from_str("100.00").unwrap());
        assert_eq!(money_from_f64(0.1, "amount").unwrap(), BigDecimal::from_str("0.10").unwrap());
        assert!(money_from_f64(f64::NAN, "amount").is_err());
        assert!(money_from_f64(f64::INFINITY, "amount").is_err());
    }
}
