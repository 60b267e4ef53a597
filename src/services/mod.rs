pub mod fields;
pub mod order_items;
pub mod orders;
pub mod products;

use crate::errors::ServiceError;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub use order_items::OrderItemService;
pub use orders::OrderService;
pub use products::ProductService;

pub const MISSING_FIELDS_MESSAGE: &str = "Missing required fields.";

/// Scale at which money columns are stored
const MONEY_SCALE: u32 = 2;

/// Largest value a `DECIMAL(10, 2)` column holds
const MAX_MONEY: Decimal = Decimal::from_parts(1_410_065_407, 2, 0, false, 2);

/// Plain `{"message": ...}` body returned by delete endpoints
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    #[schema(example = "Order deleted successfully.")]
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

pub(crate) fn missing_fields() -> ServiceError {
    ServiceError::ValidationError(MISSING_FIELDS_MESSAGE.to_string())
}

/// Narrows requested ids to the primary-key range. Ids outside it match no row.
pub(crate) fn key_ids(ids: &[i64]) -> Vec<i32> {
    ids.iter().filter_map(|id| i32::try_from(*id).ok()).collect()
}

/// Normalizes a money value to two decimal places.
pub fn money(value: Decimal) -> Decimal {
    let mut value = value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero);
    value.rescale(MONEY_SCALE);
    value
}

/// Checks that a client-supplied amount fits a money column and normalizes it.
pub(crate) fn checked_money(value: Decimal, field: &str) -> Result<Decimal, ServiceError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(ServiceError::ValidationError(format!(
            "{field} must not be negative."
        )));
    }
    let value = money(value);
    if value > MAX_MONEY {
        return Err(ServiceError::ValidationError(format!(
            "{field} must not exceed {MAX_MONEY}."
        )));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;

    #[test]
    fn out_of_range_ids_are_dropped() {
        assert_eq!(key_ids(&[1, 3_000_000_000, -2, i64::MIN]), vec![1, -2]);
        assert!(key_ids(&[]).is_empty());
    }

    #[test]
    fn money_has_two_decimal_places() {
        assert_eq!(money(dec!(10)).to_string(), "10.00");
        assert_eq!(money(dec!(25.5)).to_string(), "25.50");
        assert_eq!(money(dec!(0.125)).to_string(), "0.13");
    }

    #[test]
    fn negative_amounts_are_rejected() {
        assert_matches!(
            checked_money(dec!(-0.01), "price"),
            Err(ServiceError::ValidationError(msg)) if msg == "price must not be negative."
        );
        assert_eq!(checked_money(dec!(0), "price").unwrap().to_string(), "0.00");
    }

    #[test]
    fn amounts_beyond_column_range_are_rejected() {
        assert_eq!(MAX_MONEY, dec!(99999999.99));
        assert!(checked_money(dec!(99999999.99), "price").is_ok());
        assert!(checked_money(dec!(100000000), "price").is_err());
    }
}
