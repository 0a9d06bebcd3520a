//! Position tracking with exit parameters.
//!
//! A `Position` is the holding of a single ticker: entry data, the peak
//! price observed since entry (for the trailing stop), the configured
//! exit fractions, and the settlement inputs the scheduler needs.

use crate::types::{Fraction, Price, Quantity};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Exit parameters attached to a position at entry time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ExitParams {
    /// Take-profit fraction above entry (0.15 = +15%)
    pub take_profit: Fraction,
    /// Trailing-stop fraction below the peak (0.05 = -5% from peak)
    pub trailing_stop: Fraction,
    /// Stop-loss fraction below entry (0.05 = -5%)
    pub stop_loss: Fraction,
    /// Maximum holding period in trading days before a forced exit trigger
    pub max_holding_days: u32,
    /// Minimum holding period in trading days (settlement rule)
    pub min_holding_days: u32,
}

impl Default for ExitParams {
    fn default() -> Self {
        use rust_decimal_macros::dec;
        Self {
            take_profit: dec!(0.15),
            trailing_stop: dec!(0.05),
            stop_loss: dec!(0.05),
            max_holding_days: 10,
            min_holding_days: 2,
        }
    }
}

/// A holding in a single ticker.
///
/// One position per ticker: created on the first fill, augmented by
/// subsequent buys, destroyed when a sell empties it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    /// Internal position ID
    pub id: Uuid,
    /// Trading ticker
    pub ticker: String,
    /// Current held quantity
    pub quantity: Quantity,
    /// Average entry price
    pub entry_price: Price,
    /// Trading date of the first fill (settlement reference)
    pub entry_date: NaiveDate,
    /// Current market price
    pub current_price: Price,
    /// Highest price observed since entry
    pub peak_price: Price,
    /// Exit parameters
    pub exit_params: ExitParams,
    /// Unrealized P&L at the current price
    pub unrealized_pnl: Decimal,
    /// Realized P&L from partial exits
    pub realized_pnl: Decimal,
    /// Set when an exit trigger fired before the holding period elapsed
    pub pending_eligibility: bool,
    /// Reason the position was entered
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_reason: Option<String>,
    /// Position open timestamp
    pub opened_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Position {
    /// Opens a new position.
    pub fn new(
        ticker: impl Into<String>,
        quantity: Quantity,
        entry_price: Price,
        entry_date: NaiveDate,
        exit_params: ExitParams,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            ticker: ticker.into(),
            quantity,
            entry_price,
            entry_date,
            current_price: entry_price,
            peak_price: entry_price,
            exit_params,
            unrealized_pnl: Decimal::ZERO,
            realized_pnl: Decimal::ZERO,
            pending_eligibility: false,
            entry_reason: None,
            opened_at: now,
            updated_at: now,
        }
    }

    /// Sets the entry reason.
    pub fn with_entry_reason(mut self, reason: impl Into<String>) -> Self {
        self.entry_reason = Some(reason.into());
        self
    }

    /// Updates the current price, the peak and the unrealized P&L.
    pub fn update_price(&mut self, price: Price) {
        self.current_price = price;
        if price > self.peak_price {
            self.peak_price = price;
        }
        self.unrealized_pnl = (price - self.entry_price) * self.quantity;
        self.updated_at = Utc::now();
    }

    /// Unrealized return as a fraction of the entry price.
    pub fn return_fraction(&self) -> Fraction {
        if self.entry_price.is_zero() {
            return Decimal::ZERO;
        }
        (self.current_price - self.entry_price) / self.entry_price
    }

    /// Notional value at the current price.
    pub fn notional_value(&self) -> Decimal {
        self.current_price * self.quantity
    }

    /// Notional value at entry.
    pub fn entry_notional_value(&self) -> Decimal {
        self.entry_price * self.quantity
    }

    /// Stop-loss trigger price: entry x (1 - stop_loss).
    pub fn stop_loss_price(&self) -> Price {
        self.entry_price * (Decimal::ONE - self.exit_params.stop_loss)
    }

    /// Trailing-stop trigger price: peak x (1 - trailing_stop).
    pub fn trailing_stop_price(&self) -> Price {
        self.peak_price * (Decimal::ONE - self.exit_params.trailing_stop)
    }

    /// Take-profit trigger price: entry x (1 + take_profit).
    pub fn take_profit_price(&self) -> Price {
        self.entry_price * (Decimal::ONE + self.exit_params.take_profit)
    }

    /// Augments the position with an additional fill, re-averaging entry.
    pub fn add(&mut self, quantity: Quantity, price: Price) {
        let total_cost = (self.entry_price * self.quantity) + (price * quantity);
        self.quantity += quantity;
        if !self.quantity.is_zero() {
            self.entry_price = total_cost / self.quantity;
        }
        self.update_price(self.current_price.max(price));
    }

    /// Reduces the position, returning realized P&L for the reduced part.
    pub fn reduce(&mut self, quantity: Quantity, price: Price) -> Decimal {
        let reduce_qty = quantity.min(self.quantity);
        let pnl = (price - self.entry_price) * reduce_qty;

        self.quantity -= reduce_qty;
        self.realized_pnl += pnl;
        self.update_price(price);
        pnl
    }

    /// Whether the position still holds shares.
    pub fn is_open(&self) -> bool {
        self.quantity > Decimal::ZERO
    }
}

/// Aggregated view over a set of positions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionSummary {
    /// Number of open positions
    pub total_positions: usize,
    /// Total unrealized P&L
    pub total_unrealized_pnl: Decimal,
    /// Total realized P&L
    pub total_realized_pnl: Decimal,
    /// Total notional value at current prices
    pub total_notional_value: Decimal,
    /// Positions currently locked by the settlement rule
    pub pending_eligibility_count: usize,
}

impl PositionSummary {
    /// Builds a summary from a list of positions.
    pub fn from_positions<'a>(positions: impl IntoIterator<Item = &'a Position>) -> Self {
        let mut summary = Self {
            total_positions: 0,
            total_unrealized_pnl: Decimal::ZERO,
            total_realized_pnl: Decimal::ZERO,
            total_notional_value: Decimal::ZERO,
            pending_eligibility_count: 0,
        };

        for position in positions {
            summary.total_realized_pnl += position.realized_pnl;
            if position.is_open() {
                summary.total_positions += 1;
                summary.total_unrealized_pnl += position.unrealized_pnl;
                summary.total_notional_value += position.notional_value();
                if position.pending_eligibility {
                    summary.pending_eligibility_count += 1;
                }
            }
        }

        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn entry_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 3).unwrap()
    }

    #[test]
    fn test_position_pnl() {
        let mut position =
            Position::new("ACB", dec!(500), dec!(26500), entry_date(), ExitParams::default());

        position.update_price(dec!(27500));
        assert_eq!(position.unrealized_pnl, dec!(500000));

        position.update_price(dec!(26000));
        assert_eq!(position.unrealized_pnl, dec!(-250000));
    }

    #[test]
    fn test_peak_only_rises() {
        let mut position =
            Position::new("HPG", dec!(100), dec!(27800), entry_date(), ExitParams::default());

        position.update_price(dec!(29000));
        assert_eq!(position.peak_price, dec!(29000));

        // A drop does not lower the peak
        position.update_price(dec!(28000));
        assert_eq!(position.peak_price, dec!(29000));
    }

    #[test]
    fn test_trigger_prices() {
        let params = ExitParams {
            take_profit: dec!(0.15),
            trailing_stop: dec!(0.05),
            stop_loss: dec!(0.05),
            max_holding_days: 10,
            min_holding_days: 2,
        };
        let mut position = Position::new("VNM", dec!(100), dec!(78500), entry_date(), params);

        assert_eq!(position.stop_loss_price(), dec!(74575.00));
        assert_eq!(position.take_profit_price(), dec!(90275.00));

        position.update_price(dec!(84000));
        assert_eq!(position.trailing_stop_price(), dec!(79800.00));
    }

    #[test]
    fn test_position_add_reaverages_entry() {
        let mut position =
            Position::new("FPT", dec!(100), dec!(128000), entry_date(), ExitParams::default());

        position.add(dec!(100), dec!(130000));

        assert_eq!(position.quantity, dec!(200));
        assert_eq!(position.entry_price, dec!(129000));
    }

    #[test]
    fn test_position_reduce_and_close() {
        let mut position =
            Position::new("MBB", dec!(200), dec!(25300), entry_date(), ExitParams::default());

        let pnl = position.reduce(dec!(100), dec!(26300));
        assert_eq!(pnl, dec!(100000));
        assert_eq!(position.quantity, dec!(100));
        assert!(position.is_open());

        position.reduce(dec!(100), dec!(26300));
        assert!(!position.is_open());
        assert_eq!(position.realized_pnl, dec!(200000));
    }

    #[test]
    fn test_summary() {
        let mut a = Position::new("ACB", dec!(500), dec!(26500), entry_date(), ExitParams::default());
        a.update_price(dec!(27000));
        let mut b = Position::new("VCB", dec!(100), dec!(92500), entry_date(), ExitParams::default());
        b.pending_eligibility = true;

        let summary = PositionSummary::from_positions([&a, &b]);
        assert_eq!(summary.total_positions, 2);
        assert_eq!(summary.total_unrealized_pnl, dec!(250000));
        assert_eq!(summary.pending_eligibility_count, 1);
    }
}
