//! Configuration management.
//!
//! Sectioned application configuration with per-section defaults,
//! loadable from a TOML file layered with `QUANTUM_`-prefixed
//! environment variables.

use crate::error::{QuantError, QuantResult};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Application configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    /// Trading parameters
    #[serde(default)]
    pub trading: TradingConfig,
    /// Advisor coordination parameters
    #[serde(default)]
    pub agents: AgentsConfig,
    /// Exit scheduler parameters
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    /// Circuit breaker thresholds
    #[serde(default)]
    pub breaker: BreakerConfig,
    /// Holiday calendar data
    #[serde(default)]
    pub calendar: CalendarConfig,
    /// Logging settings
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Trading and sizing parameters.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TradingConfig {
    /// Initial cash balance (VND)
    pub initial_balance: Decimal,
    /// Exchange lot size (shares)
    pub lot_size: u32,
    /// Fraction of equity allocated per new position (0.125 = 12.5%)
    pub position_fraction: Decimal,
    /// Commission rate per order (0.0015 = 0.15%)
    pub commission_rate: Decimal,
    /// Tax rate on sells (0.001 = 0.1%)
    pub selling_tax_rate: Decimal,
    /// Take-profit fraction above entry (0.15 = +15%)
    pub take_profit: Decimal,
    /// Trailing-stop fraction below the peak (0.05 = -5%)
    pub trailing_stop: Decimal,
    /// Stop-loss fraction below entry (0.05 = -5%)
    pub stop_loss: Decimal,
    /// Minimum holding period in trading days (settlement rule)
    pub min_holding_days: u32,
    /// Maximum holding period in trading days
    pub max_holding_days: u32,
}

impl Default for TradingConfig {
    fn default() -> Self {
        use rust_decimal_macros::dec;
        Self {
            initial_balance: dec!(100_000_000),
            lot_size: 100,
            position_fraction: dec!(0.125),
            commission_rate: dec!(0.0015),
            selling_tax_rate: dec!(0.001),
            take_profit: dec!(0.15),
            trailing_stop: dec!(0.05),
            stop_loss: dec!(0.05),
            min_holding_days: 2,
            max_holding_days: 10,
        }
    }
}

/// Advisor coordination parameters.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AgentsConfig {
    /// Deadline for one full consensus round, in seconds
    pub deadline_secs: u64,
    /// Minimum consensus confidence for a non-Hold action
    pub activation_threshold: f64,
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            deadline_secs: 15,
            activation_threshold: 0.5,
        }
    }
}

/// Exit scheduler parameters.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SchedulerConfig {
    /// Evaluation interval, in seconds
    pub check_interval_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            check_interval_secs: 60,
        }
    }
}

/// Circuit breaker thresholds, as fractions of equity.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BreakerConfig {
    /// Daily loss beyond which new orders are scaled down (0.03 = -3%)
    pub caution_daily_loss: Decimal,
    /// Daily loss beyond which new orders are blocked (0.05 = -5%)
    pub halt_daily_loss: Decimal,
    /// Drawdown beyond which positions are force-liquidated (0.10 = -10%)
    pub emergency_drawdown: Decimal,
    /// Order size multiplier while at Caution
    pub caution_scale: Decimal,
    /// Allow emergency liquidation to bypass the settlement lock
    pub emergency_override: bool,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        use rust_decimal_macros::dec;
        Self {
            caution_daily_loss: dec!(0.03),
            halt_daily_loss: dec!(0.05),
            emergency_drawdown: dec!(0.10),
            caution_scale: dec!(0.5),
            emergency_override: false,
        }
    }
}

/// Holiday calendar configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CalendarConfig {
    /// Non-trading dates in ISO format ("2025-01-28"); empty means the
    /// bundled Vietnamese list for the current year is used
    #[serde(default)]
    pub holidays: Vec<String>,
}

/// Logging settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingSettings {
    /// Log level
    pub level: String,
    /// Log format (pretty, json, compact)
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file, layered with environment
    /// variables using the `QUANTUM_` prefix (e.g.
    /// `QUANTUM_TRADING__LOT_SIZE=100`).
    pub fn load(path: impl AsRef<Path>) -> QuantResult<Self> {
        let builder = config::Config::builder()
            .add_source(config::File::from(path.as_ref()).required(false))
            .add_source(
                config::Environment::with_prefix("QUANTUM")
                    .prefix_separator("_")
                    .separator("__"),
            );

        builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| QuantError::Config(e.to_string()))
    }

    /// Parses the configured holiday list into dates.
    pub fn holiday_dates(&self) -> QuantResult<Vec<chrono::NaiveDate>> {
        self.calendar
            .holidays
            .iter()
            .map(|s| {
                s.parse::<chrono::NaiveDate>()
                    .map_err(|e| QuantError::Config(format!("invalid holiday '{}': {}", s, e)))
            })
            .collect()
    }
}
