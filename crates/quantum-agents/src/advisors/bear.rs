//! Bear advisor: the downside case.
//!
//! Hunts for distribution, broken trends and stretched momentum. Its
//! vote keeps the bull advisor honest in the consensus.

use crate::advisor::Advisor;
use crate::advisors::score_to_vote;
use async_trait::async_trait;
use quantum_core::{AdvisorVote, MarketSnapshot, QuantResult};

/// Risk-first pessimistic advisor.
#[derive(Debug, Clone, Default)]
pub struct BearAdvisor;

impl BearAdvisor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Advisor for BearAdvisor {
    fn name(&self) -> &str {
        "bear"
    }

    fn weight(&self) -> f64 {
        1.0
    }

    async fn evaluate(&self, snapshot: &MarketSnapshot) -> QuantResult<AdvisorVote> {
        let mut score: f64 = 50.0;
        let mut signals = Vec::new();

        if snapshot.rsi > 70.0 {
            score -= 15.0;
            signals.push(format!("RSI {:.0} overbought", snapshot.rsi));
        }

        if snapshot.volume_ratio > 1.5 && snapshot.change_pct < 0.0 {
            score -= 15.0;
            signals.push(format!("distribution {:.1}x volume", snapshot.volume_ratio));
        }

        if snapshot.ema20 < snapshot.ema50 {
            score -= 10.0;
            signals.push("trend broken".to_string());
        }

        if snapshot.macd_histogram < 0.0 {
            score -= 10.0;
        }

        if snapshot.change_pct < -0.02 {
            score -= 10.0;
            signals.push(format!("weak session {:.1}%", snapshot.change_pct * 100.0));
        }

        // A washed-out tape is the one setup the bear concedes
        if snapshot.rsi < 25.0 && snapshot.change_pct > 0.0 {
            score += 20.0;
            signals.push(format!("capitulation RSI {:.0}", snapshot.rsi));
        }

        let (action, confidence) = score_to_vote(score, 70.0, 45.0);

        Ok(AdvisorVote::new(self.name(), action, confidence, self.weight())
            .with_reasoning(signals.join(" | ")))
    }
}
