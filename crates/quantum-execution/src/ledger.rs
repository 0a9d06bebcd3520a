//! Fill application to the portfolio.
//!
//! A filled order mutates exactly one piece of shared state: the
//! portfolio (cash and positions). Buys open or augment the ticker's
//! position and deduct cash plus commission; sells credit proceeds net
//! of commission and selling tax, realize P&L, and destroy the position
//! when it empties.

use chrono::NaiveDate;
use quantum_core::{
    ExitParams, Order, OrderStatus, PortfolioState, Position, QuantError, QuantResult, Side,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Cost model applied when fills hit the portfolio.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FillSettings {
    /// Commission rate per order (0.0015 = 0.15%)
    pub commission_rate: Decimal,
    /// Tax rate on sell proceeds (0.001 = 0.1%)
    pub selling_tax_rate: Decimal,
}

impl Default for FillSettings {
    fn default() -> Self {
        use rust_decimal_macros::dec;
        Self {
            commission_rate: dec!(0.0015),
            selling_tax_rate: dec!(0.001),
        }
    }
}

impl FillSettings {
    /// Commission for a notional amount.
    pub fn commission(&self, notional: Decimal) -> Decimal {
        notional * self.commission_rate
    }

    /// Selling tax for a notional amount.
    pub fn selling_tax(&self, notional: Decimal) -> Decimal {
        notional * self.selling_tax_rate
    }
}

/// What a fill did to the portfolio.
#[derive(Debug, Clone)]
pub enum FillOutcome {
    /// A new position was opened
    Opened { ticker: String },
    /// An existing position was augmented
    Augmented { ticker: String },
    /// A position was partially reduced
    Reduced { ticker: String, realized_pnl: Decimal },
    /// A position was fully closed and removed
    Closed { ticker: String, realized_pnl: Decimal },
}

/// Applies a filled order to the portfolio.
///
/// The order must be in the `Filled` state with a fill price. Buys of a
/// ticker without an open position receive `entry_date` and
/// `exit_params`; buys into an existing position re-average its entry.
pub fn apply_fill(
    portfolio: &mut PortfolioState,
    order: &Order,
    settings: &FillSettings,
    entry_date: NaiveDate,
    exit_params: ExitParams,
) -> QuantResult<FillOutcome> {
    if order.status != OrderStatus::Filled {
        return Err(QuantError::Order(format!(
            "cannot apply fill for order {} in state {}",
            order.id, order.status
        )));
    }
    let fill_price = order
        .fill_price
        .ok_or_else(|| QuantError::Order(format!("order {} has no fill price", order.id)))?;

    let notional = fill_price * order.quantity;
    let commission = settings.commission(notional);

    let outcome = match order.side {
        Side::Buy => {
            portfolio.cash -= notional + commission;

            if let Some(position) = portfolio
                .positions
                .get_mut(&order.ticker)
                .filter(|p| p.is_open())
            {
                position.add(order.quantity, fill_price);
                FillOutcome::Augmented {
                    ticker: order.ticker.clone(),
                }
            } else {
                let mut position = Position::new(
                    &order.ticker,
                    order.quantity,
                    fill_price,
                    entry_date,
                    exit_params,
                );
                if let Some(origin) = &order.origin {
                    position = position.with_entry_reason(origin.clone());
                }
                portfolio.positions.insert(order.ticker.clone(), position);
                FillOutcome::Opened {
                    ticker: order.ticker.clone(),
                }
            }
        }
        Side::Sell => {
            let position = portfolio
                .positions
                .get_mut(&order.ticker)
                .filter(|p| p.is_open())
                .ok_or_else(|| {
                    QuantError::Position(format!("no open position in {}", order.ticker))
                })?;

            if order.quantity > position.quantity {
                return Err(QuantError::Position(format!(
                    "sell quantity {} exceeds held quantity {} in {}",
                    order.quantity, position.quantity, order.ticker
                )));
            }

            let tax = settings.selling_tax(notional);
            let gross_pnl = position.reduce(order.quantity, fill_price);
            let realized_pnl = gross_pnl - commission - tax;
            portfolio.cash += notional - commission - tax;

            if position.is_open() {
                FillOutcome::Reduced {
                    ticker: order.ticker.clone(),
                    realized_pnl,
                }
            } else {
                portfolio.positions.remove(&order.ticker);
                FillOutcome::Closed {
                    ticker: order.ticker.clone(),
                    realized_pnl,
                }
            }
        }
    };

    portfolio.refresh_marks();
    info!(
        ticker = %order.ticker,
        side = %order.side,
        quantity = %order.quantity,
        price = %fill_price,
        cash = %portfolio.cash,
        "fill applied"
    );

    Ok(outcome)
}
