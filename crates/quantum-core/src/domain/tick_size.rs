//! Exchange tick-size (price step) rules.
//!
//! Each exchange mandates a price grid; the step depends on the price
//! band. This module provides grid validation and rounding, plus the
//! daily ceiling/floor band applied to limit prices.

use rust_decimal::Decimal;

/// Rounding method for snapping a price onto the tick grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundMethod {
    /// Round to the nearest tick
    Round,
    /// Round down (conservative for buys)
    Floor,
    /// Round up (conservative for sells)
    Ceil,
}

/// Per-exchange tick-size provider trait.
pub trait TickSizeProvider: Send + Sync {
    /// Returns the tick size for the given price band.
    fn tick_size(&self, price: Decimal) -> Decimal;

    /// Rounds the price onto the tick grid.
    fn round_to_tick(&self, price: Decimal, method: RoundMethod) -> Decimal {
        let tick = self.tick_size(price);
        if tick.is_zero() {
            return price;
        }

        let ticks = price / tick;
        let rounded_ticks = match method {
            RoundMethod::Round => ticks.round(),
            RoundMethod::Floor => ticks.floor(),
            RoundMethod::Ceil => ticks.ceil(),
        };

        rounded_ticks * tick
    }

    /// Whether the price sits on the tick grid.
    fn is_valid_price(&self, price: Decimal) -> bool {
        let tick = self.tick_size(price);
        if tick.is_zero() {
            return true;
        }

        (price % tick).is_zero()
    }
}

/// HOSE (Ho Chi Minh Stock Exchange) tick-size provider.
///
/// Three price bands apply to stocks, in VND:
/// - below 10,000: 10
/// - 10,000 to below 50,000: 50
/// - 50,000 and above: 100
#[derive(Debug, Clone, Default)]
pub struct HoseTickSize;

impl HoseTickSize {
    pub fn new() -> Self {
        Self
    }
}

impl TickSizeProvider for HoseTickSize {
    fn tick_size(&self, price: Decimal) -> Decimal {
        use rust_decimal_macros::dec;

        if price < dec!(10_000) {
            dec!(10)
        } else if price < dec!(50_000) {
            dec!(50)
        } else {
            dec!(100)
        }
    }
}

/// Daily price band limits derived from a reference price.
///
/// HOSE allows intraday prices within +/-7% of the reference price.
#[derive(Debug, Clone, Copy)]
pub struct PriceBand {
    /// Upper limit (ceiling)
    pub ceiling: Decimal,
    /// Lower limit (floor)
    pub floor: Decimal,
}

impl PriceBand {
    /// Computes the band for a reference price with the given fraction.
    pub fn from_reference(reference: Decimal, band_fraction: Decimal) -> Self {
        Self {
            ceiling: reference * (Decimal::ONE + band_fraction),
            floor: reference * (Decimal::ONE - band_fraction),
        }
    }

    /// HOSE band (+/-7%) for a reference price.
    pub fn hose(reference: Decimal) -> Self {
        use rust_decimal_macros::dec;
        Self::from_reference(reference, dec!(0.07))
    }

    /// Whether the price is inside the band (inclusive).
    pub fn contains(&self, price: Decimal) -> bool {
        price >= self.floor && price <= self.ceiling
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_hose_tick_size_bands() {
        let provider = HoseTickSize::new();

        assert_eq!(provider.tick_size(dec!(5_000)), dec!(10));
        assert_eq!(provider.tick_size(dec!(9_990)), dec!(10));
        assert_eq!(provider.tick_size(dec!(10_000)), dec!(50));
        assert_eq!(provider.tick_size(dec!(49_950)), dec!(50));
        assert_eq!(provider.tick_size(dec!(50_000)), dec!(100));
        assert_eq!(provider.tick_size(dec!(128_000)), dec!(100));
    }

    #[test]
    fn test_round_to_tick() {
        let provider = HoseTickSize::new();

        // 26,532 sits in the 50-step band
        assert_eq!(
            provider.round_to_tick(dec!(26_532), RoundMethod::Round),
            dec!(26_550)
        );
        assert_eq!(
            provider.round_to_tick(dec!(26_532), RoundMethod::Floor),
            dec!(26_500)
        );
        assert_eq!(
            provider.round_to_tick(dec!(26_532), RoundMethod::Ceil),
            dec!(26_550)
        );

        // 92,530 sits in the 100-step band
        assert_eq!(
            provider.round_to_tick(dec!(92_530), RoundMethod::Round),
            dec!(92_500)
        );
    }

    #[test]
    fn test_is_valid_price() {
        let provider = HoseTickSize::new();

        assert!(provider.is_valid_price(dec!(26_500)));
        assert!(provider.is_valid_price(dec!(92_500)));
        assert!(provider.is_valid_price(dec!(9_990)));

        assert!(!provider.is_valid_price(dec!(26_532)));
        assert!(!provider.is_valid_price(dec!(92_550)));
    }

    #[test]
    fn test_price_band() {
        let band = PriceBand::hose(dec!(26_000));

        assert_eq!(band.ceiling, dec!(27_820.00));
        assert_eq!(band.floor, dec!(24_180.00));
        assert!(band.contains(dec!(26_500)));
        assert!(!band.contains(dec!(28_000)));
        assert!(!band.contains(dec!(24_000)));
    }
}
