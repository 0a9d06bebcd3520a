//! Risk management configuration.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Limits applied by the pre-trade risk gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Exchange lot size (shares)
    pub lot_size: u32,
    /// Maximum single-position notional as a fraction of equity (0.20 = 20%)
    pub max_position_fraction: Decimal,
    /// Maximum sector notional as a fraction of equity (0.35 = 35%)
    pub max_sector_fraction: Decimal,
    /// Commission rate applied to order notionals (0.0015 = 0.15%)
    pub commission_rate: Decimal,
    /// Daily price band around the reference price (0.07 = +/-7%)
    pub band_fraction: Decimal,
}

impl Default for RiskConfig {
    fn default() -> Self {
        use rust_decimal_macros::dec;
        Self {
            lot_size: 100,
            max_position_fraction: dec!(0.20),
            max_sector_fraction: dec!(0.35),
            commission_rate: dec!(0.0015),
            band_fraction: dec!(0.07),
        }
    }
}
