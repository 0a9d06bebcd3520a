//! Technical analyst advisor.
//!
//! Objective, data-driven scoring over the indicator snapshot: trend,
//! momentum and volume blocks combined into one bullishness score.
//! Carries a slightly higher weight than the perspective advisors.

use crate::advisor::Advisor;
use crate::advisors::score_to_vote;
use async_trait::async_trait;
use quantum_core::{AdvisorVote, MarketSnapshot, QuantResult};

/// Weighted technical scoring advisor.
#[derive(Debug, Clone, Default)]
pub struct AnalystAdvisor;

impl AnalystAdvisor {
    pub fn new() -> Self {
        Self
    }

    fn trend_score(snapshot: &MarketSnapshot, signals: &mut Vec<String>) -> f64 {
        let mut score = 50.0;

        if snapshot.ema20 > snapshot.ema50 {
            score += 15.0;
            signals.push("EMA20 > EMA50".to_string());
        } else if snapshot.ema20 < snapshot.ema50 {
            score -= 15.0;
            signals.push("EMA20 < EMA50".to_string());
        }

        if snapshot.price > snapshot.ema20 {
            score += 10.0;
        } else if snapshot.price < snapshot.ema20 {
            score -= 10.0;
        }

        score
    }

    fn momentum_score(snapshot: &MarketSnapshot, signals: &mut Vec<String>) -> f64 {
        let mut score = 50.0;

        if snapshot.rsi < 30.0 {
            score += 20.0;
            signals.push(format!("RSI {:.0} oversold", snapshot.rsi));
        } else if snapshot.rsi > 70.0 {
            score -= 20.0;
            signals.push(format!("RSI {:.0} overbought", snapshot.rsi));
        } else if snapshot.rsi > 50.0 {
            score += 5.0;
        } else if snapshot.rsi < 50.0 {
            score -= 5.0;
        }

        if snapshot.macd_histogram > 0.0 {
            score += 15.0;
            signals.push("MACD bullish".to_string());
        } else if snapshot.macd_histogram < 0.0 {
            score -= 15.0;
            signals.push("MACD bearish".to_string());
        }

        score
    }

    fn volume_score(snapshot: &MarketSnapshot, signals: &mut Vec<String>) -> f64 {
        let mut score = 50.0;

        if snapshot.volume_ratio > 2.0 {
            if snapshot.change_pct > 0.0 {
                score += 25.0;
                signals.push(format!(
                    "volume spike {:.1}x with price up",
                    snapshot.volume_ratio
                ));
            } else {
                score -= 25.0;
                signals.push(format!(
                    "volume spike {:.1}x with price down",
                    snapshot.volume_ratio
                ));
            }
        } else if snapshot.volume_ratio < 0.5 {
            // Thin tape, pull conviction toward neutral
            score = 50.0;
            signals.push("low volume".to_string());
        } else if snapshot.change_pct > 0.0 {
            score += 10.0;
        } else if snapshot.change_pct < 0.0 {
            score -= 10.0;
        }

        score
    }
}

#[async_trait]
impl Advisor for AnalystAdvisor {
    fn name(&self) -> &str {
        "analyst"
    }

    fn weight(&self) -> f64 {
        1.2
    }

    async fn evaluate(&self, snapshot: &MarketSnapshot) -> QuantResult<AdvisorVote> {
        let mut signals = Vec::new();

        let trend = Self::trend_score(snapshot, &mut signals);
        let momentum = Self::momentum_score(snapshot, &mut signals);
        let volume = Self::volume_score(snapshot, &mut signals);

        let score = trend * 0.4 + momentum * 0.4 + volume * 0.2;
        let (action, confidence) = score_to_vote(score, 60.0, 40.0);

        Ok(AdvisorVote::new(self.name(), action, confidence, self.weight())
            .with_reasoning(signals.join(" | ")))
    }
}
