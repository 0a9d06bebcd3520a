//! Portfolio state: cash, positions, and the loss metrics the circuit
//! breaker evaluates.
//!
//! There is exactly one logical owner of this state; every mutation
//! passes through one serialized critical section in the engine.

use crate::domain::Position;
use crate::types::{Fraction, Price};
use chrono::{NaiveDate, Utc};
use chrono_tz::Asia::Ho_Chi_Minh;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Portfolio-level mutable state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioState {
    /// Available cash (VND)
    pub cash: Decimal,
    /// Open positions keyed by ticker
    pub positions: HashMap<String, Position>,
    /// Equity at the start of the current trading day
    pub day_start_equity: Decimal,
    /// Highest equity observed since inception
    pub peak_equity: Decimal,
    /// Exchange-local date the day-start equity belongs to
    pub current_day: NaiveDate,
}

impl PortfolioState {
    /// Creates a portfolio with an initial cash balance.
    pub fn new(initial_cash: Decimal) -> Self {
        Self {
            cash: initial_cash,
            positions: HashMap::new(),
            day_start_equity: initial_cash,
            peak_equity: initial_cash,
            current_day: Self::exchange_today(),
        }
    }

    /// Current date in the exchange timezone.
    pub fn exchange_today() -> NaiveDate {
        Utc::now().with_timezone(&Ho_Chi_Minh).date_naive()
    }

    /// Total equity: cash plus position notionals at current prices.
    pub fn equity(&self) -> Decimal {
        let positions_value: Decimal = self
            .positions
            .values()
            .filter(|p| p.is_open())
            .map(|p| p.notional_value())
            .sum();
        self.cash + positions_value
    }

    /// Daily P&L as a fraction of day-start equity (-0.03 = -3%).
    pub fn daily_pnl_fraction(&self) -> Fraction {
        if self.day_start_equity.is_zero() {
            return Decimal::ZERO;
        }
        (self.equity() - self.day_start_equity) / self.day_start_equity
    }

    /// Drawdown from peak equity as a fraction (-0.10 = -10%).
    pub fn drawdown_fraction(&self) -> Fraction {
        if self.peak_equity.is_zero() {
            return Decimal::ZERO;
        }
        (self.equity() - self.peak_equity) / self.peak_equity
    }

    /// Updates the running peak and rolls the trading day over when the
    /// exchange-local date has changed.
    pub fn refresh_marks(&mut self) {
        let equity = self.equity();
        if equity > self.peak_equity {
            self.peak_equity = equity;
        }

        let today = Self::exchange_today();
        if today != self.current_day {
            self.current_day = today;
            self.day_start_equity = equity;
        }
    }

    /// Applies the latest price to the ticker's position, if any.
    pub fn mark_price(&mut self, ticker: &str, price: Price) {
        if let Some(position) = self.positions.get_mut(ticker) {
            position.update_price(price);
        }
        self.refresh_marks();
    }

    /// Open positions, in no particular order.
    pub fn open_positions(&self) -> Vec<&Position> {
        self.positions.values().filter(|p| p.is_open()).collect()
    }

    /// Held quantity for a ticker (zero when no position).
    pub fn held_quantity(&self, ticker: &str) -> Decimal {
        self.positions
            .get(ticker)
            .filter(|p| p.is_open())
            .map(|p| p.quantity)
            .unwrap_or(Decimal::ZERO)
    }

    /// Notional exposure of the current position in a ticker.
    pub fn position_exposure(&self, ticker: &str) -> Decimal {
        self.positions
            .get(ticker)
            .filter(|p| p.is_open())
            .map(|p| p.notional_value())
            .unwrap_or(Decimal::ZERO)
    }
}
