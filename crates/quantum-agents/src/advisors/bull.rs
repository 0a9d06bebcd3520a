//! Bull advisor: the upside case.
//!
//! Leans into momentum and accumulation evidence and is quicker to
//! recommend entries than the analyst; the bear advisor balances it.

use crate::advisor::Advisor;
use crate::advisors::score_to_vote;
use async_trait::async_trait;
use quantum_core::{AdvisorVote, MarketSnapshot, QuantResult};

/// Momentum-chasing optimistic advisor.
#[derive(Debug, Clone, Default)]
pub struct BullAdvisor;

impl BullAdvisor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Advisor for BullAdvisor {
    fn name(&self) -> &str {
        "bull"
    }

    fn weight(&self) -> f64 {
        1.0
    }

    async fn evaluate(&self, snapshot: &MarketSnapshot) -> QuantResult<AdvisorVote> {
        let mut score: f64 = 50.0;
        let mut signals = Vec::new();

        if snapshot.change_pct > 0.02 {
            score += 15.0;
            signals.push(format!("strong session +{:.1}%", snapshot.change_pct * 100.0));
        } else if snapshot.change_pct > 0.0 {
            score += 5.0;
        }

        if snapshot.volume_ratio > 1.5 && snapshot.change_pct > 0.0 {
            score += 15.0;
            signals.push(format!("accumulation {:.1}x volume", snapshot.volume_ratio));
        }

        if snapshot.ema20 > snapshot.ema50 {
            score += 10.0;
            signals.push("trend intact".to_string());
        }

        if snapshot.macd_histogram > 0.0 {
            score += 10.0;
        }

        // Dip-buying: pullback inside an uptrend
        if snapshot.rsi < 40.0 && snapshot.ema20 > snapshot.ema50 {
            score += 10.0;
            signals.push(format!("pullback RSI {:.0} in uptrend", snapshot.rsi));
        }

        // Even the bull steps aside when momentum is exhausted
        if snapshot.rsi > 80.0 {
            score -= 20.0;
            signals.push(format!("RSI {:.0} exhausted", snapshot.rsi));
        }

        let (action, confidence) = score_to_vote(score, 55.0, 30.0);

        Ok(AdvisorVote::new(self.name(), action, confidence, self.weight())
            .with_reasoning(signals.join(" | ")))
    }
}
