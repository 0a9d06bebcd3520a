//! Pre-trade risk validation.
//!
//! `RiskManager::validate_order` runs the configured checks in a fixed
//! order and short-circuits on the first violation. Validation is pure:
//! no portfolio state is touched, and the result carries the violated
//! rule as a reason string for observability.

use crate::config::RiskConfig;
use quantum_core::{
    HoseTickSize, OrderRequest, PortfolioState, PriceBand, Side, TickSizeProvider,
};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Result of a risk validation pass.
#[derive(Debug, Clone)]
pub struct RiskValidation {
    /// Whether the order passed every check
    pub is_valid: bool,
    /// Violation reason (first failed rule) or warnings
    pub messages: Vec<String>,
}

impl RiskValidation {
    /// Creates a passing result.
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            messages: vec![],
        }
    }

    /// Creates a failing result with the violated rule.
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            messages: vec![reason.into()],
        }
    }

    /// The first violation reason, when invalid.
    pub fn reason(&self) -> Option<&str> {
        if self.is_valid {
            None
        } else {
            self.messages.first().map(String::as_str)
        }
    }
}

/// Pre-trade order validator.
pub struct RiskManager {
    config: RiskConfig,
    tick_provider: Arc<dyn TickSizeProvider>,
    /// Ticker -> sector label, when metadata is available
    sectors: HashMap<String, String>,
}

impl RiskManager {
    /// Creates a risk manager with the HOSE tick grid.
    pub fn new(config: RiskConfig) -> Self {
        Self {
            config,
            tick_provider: Arc::new(HoseTickSize::new()),
            sectors: HashMap::new(),
        }
    }

    /// Replaces the tick-size provider.
    pub fn with_tick_provider(mut self, provider: Arc<dyn TickSizeProvider>) -> Self {
        self.tick_provider = provider;
        self
    }

    /// Loads sector metadata used for the exposure check.
    pub fn with_sectors(mut self, sectors: HashMap<String, String>) -> Self {
        self.sectors = sectors;
        self
    }

    /// Sector label for a ticker, when known.
    pub fn sector_of(&self, ticker: &str) -> Option<&str> {
        self.sectors.get(ticker).map(String::as_str)
    }

    /// Validates a proposed order against the portfolio.
    ///
    /// Checks, in order, short-circuiting on the first failure:
    /// 1. quantity is a positive lot-size multiple
    /// 2. price sits on the exchange tick grid
    /// 3. price is inside the daily band, when a reference is supplied
    /// 4. resulting position stays under the per-position cap
    /// 5. resulting sector exposure stays under the sector cap
    /// 6. cash covers the notional plus costs (buy), or the held
    ///    quantity covers the order (sell)
    pub fn validate_order(
        &self,
        order: &OrderRequest,
        portfolio: &PortfolioState,
    ) -> RiskValidation {
        let failure = self
            .check_quantity(order)
            .or_else(|| self.check_tick_grid(order))
            .or_else(|| self.check_price_band(order))
            .or_else(|| self.check_position_cap(order, portfolio))
            .or_else(|| self.check_sector_cap(order, portfolio))
            .or_else(|| self.check_funding(order, portfolio));

        if let Some(reason) = failure {
            debug!(ticker = %order.ticker, side = %order.side, %reason, "order rejected by risk gate");
            return RiskValidation::invalid(reason);
        }

        RiskValidation::valid()
    }

    fn check_quantity(&self, order: &OrderRequest) -> Option<String> {
        let lot = Decimal::from(self.config.lot_size);
        if order.quantity <= Decimal::ZERO {
            return Some(format!("quantity {} is not positive", order.quantity));
        }
        if !(order.quantity % lot).is_zero() {
            return Some(format!(
                "quantity {} is not a multiple of lot size {}",
                order.quantity, lot
            ));
        }
        None
    }

    fn check_tick_grid(&self, order: &OrderRequest) -> Option<String> {
        if !self.tick_provider.is_valid_price(order.price) {
            let tick = self.tick_provider.tick_size(order.price);
            return Some(format!(
                "price {} is off the {} tick grid",
                order.price, tick
            ));
        }
        None
    }

    fn check_price_band(&self, order: &OrderRequest) -> Option<String> {
        let reference = order.reference_price?;
        let band = PriceBand::from_reference(reference, self.config.band_fraction);
        if !band.contains(order.price) {
            return Some(format!(
                "price {} outside the band [{}, {}] around reference {}",
                order.price, band.floor, band.ceiling, reference
            ));
        }
        None
    }

    fn check_position_cap(
        &self,
        order: &OrderRequest,
        portfolio: &PortfolioState,
    ) -> Option<String> {
        if order.side != Side::Buy {
            return None;
        }

        let equity = portfolio.equity();
        if equity.is_zero() {
            return Some("portfolio equity is zero".to_string());
        }

        let resulting = portfolio.position_exposure(&order.ticker) + order.notional_value();
        let cap = equity * self.config.max_position_fraction;
        if resulting > cap {
            return Some(format!(
                "resulting position {} exceeds cap {} ({} of equity)",
                resulting,
                cap,
                self.config.max_position_fraction
            ));
        }
        None
    }

    fn check_sector_cap(&self, order: &OrderRequest, portfolio: &PortfolioState) -> Option<String> {
        if order.side != Side::Buy {
            return None;
        }
        // Skipped when no sector metadata is available for the ticker
        let sector = self.sectors.get(&order.ticker)?;

        let sector_exposure: Decimal = portfolio
            .open_positions()
            .iter()
            .filter(|p| self.sectors.get(&p.ticker) == Some(sector))
            .map(|p| p.notional_value())
            .sum();

        let resulting = sector_exposure + order.notional_value();
        let cap = portfolio.equity() * self.config.max_sector_fraction;
        if resulting > cap {
            return Some(format!(
                "resulting {} exposure {} exceeds sector cap {}",
                sector, resulting, cap
            ));
        }
        None
    }

    fn check_funding(&self, order: &OrderRequest, portfolio: &PortfolioState) -> Option<String> {
        match order.side {
            Side::Buy => {
                let required =
                    order.notional_value() * (Decimal::ONE + self.config.commission_rate);
                if required > portfolio.cash {
                    return Some(format!(
                        "required cash {} exceeds available {}",
                        required, portfolio.cash
                    ));
                }
            }
            Side::Sell => {
                let held = portfolio.held_quantity(&order.ticker);
                if order.quantity > held {
                    return Some(format!(
                        "sell quantity {} exceeds held quantity {}",
                        order.quantity, held
                    ));
                }
            }
        }
        None
    }
}
