//! Common types used across the trading engine.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Price type for monetary precision (VND).
pub type Price = Decimal;

/// Order quantity type (shares).
pub type Quantity = Decimal;

/// Fractional type (0.01 = 1%).
pub type Fraction = Decimal;

/// Extension trait for Decimal operations.
pub trait DecimalExt {
    /// Formats the value as a percentage string (e.g. "5.25%").
    fn to_percentage_string(&self) -> String;

    /// Rounds to the given number of decimal places, away from zero at midpoint.
    fn round_dp(&self, dp: u32) -> Decimal;
}

impl DecimalExt for Decimal {
    fn to_percentage_string(&self) -> String {
        let pct = *self * Decimal::from(100);
        format!("{:.2}%", pct)
    }

    fn round_dp(&self, dp: u32) -> Decimal {
        self.round_dp_with_strategy(dp, rust_decimal::RoundingStrategy::MidpointAwayFromZero)
    }
}

/// An amount of money with its currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    /// Amount
    pub amount: Decimal,
    /// Currency code
    pub currency: String,
}

impl Money {
    /// Creates a new amount.
    pub fn new(amount: Decimal, currency: impl Into<String>) -> Self {
        Self {
            amount,
            currency: currency.into().to_uppercase(),
        }
    }

    /// Creates a VND amount.
    pub fn vnd(amount: Decimal) -> Self {
        Self::new(amount, "VND")
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.amount, self.currency)
    }
}
