//! Market data snapshots and the data-provider port.
//!
//! Market data ingestion is an external collaborator. The engine sees
//! it through `MarketDataProvider`: a single blocking call with its own
//! timeout and retry policy behind the boundary.

use crate::error::QuantResult;
use crate::types::Price;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A quoted price with its observation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceQuote {
    /// Trading ticker
    pub ticker: String,
    /// Last traded price
    pub price: Price,
    /// Session reference price, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_price: Option<Price>,
    /// Observation timestamp
    pub as_of: DateTime<Utc>,
}

/// Technical/market context snapshot handed to the advisors.
///
/// Indicators arrive precomputed from the data pipeline; the engine
/// never computes them itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketSnapshot {
    /// Trading ticker
    pub ticker: String,
    /// Current price
    pub price: Price,
    /// Session change, as a fraction (-0.02 = -2%)
    pub change_pct: f64,
    /// Relative Strength Index (0-100)
    pub rsi: f64,
    /// 20-period EMA
    pub ema20: Price,
    /// 50-period EMA
    pub ema50: Price,
    /// MACD line minus signal line
    pub macd_histogram: f64,
    /// Session volume relative to the average (1.0 = average)
    pub volume_ratio: f64,
    /// Sector label, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sector: Option<String>,
    /// Snapshot timestamp
    pub as_of: DateTime<Utc>,
}

impl MarketSnapshot {
    /// Creates a neutral snapshot around a price, for tests and defaults.
    pub fn neutral(ticker: impl Into<String>, price: Price) -> Self {
        Self {
            ticker: ticker.into(),
            price,
            change_pct: 0.0,
            rsi: 50.0,
            ema20: price,
            ema50: price,
            macd_histogram: 0.0,
            volume_ratio: 1.0,
            sector: None,
            as_of: Utc::now(),
        }
    }

    /// Sets the sector label.
    pub fn with_sector(mut self, sector: impl Into<String>) -> Self {
        self.sector = Some(sector.into());
        self
    }
}

/// Port to the external market-data collaborator.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Returns the latest quote for a ticker.
    ///
    /// A failure here means the price is unknown for this tick; it must
    /// never be interpreted as a price of zero.
    async fn get_price(&self, ticker: &str) -> QuantResult<PriceQuote>;

    /// Returns the current market snapshot for a ticker.
    async fn get_snapshot(&self, ticker: &str) -> QuantResult<MarketSnapshot>;
}
