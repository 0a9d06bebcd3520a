//! Deterministic rule-based fallback voting.
//!
//! When an advisor times out or fails, its slot is filled by this
//! heuristic over the same snapshot, so every consensus round sees a
//! full set of votes. The rules are intentionally conservative: absent
//! a clear oversold/overbought or trend signal, the fallback holds.

use quantum_core::{AdvisorVote, MarketSnapshot, TradeAction};

/// Baseline confidence of a neutral fallback hold.
const HOLD_CONFIDENCE: f64 = 0.4;

/// Produces the fallback vote for an advisor slot.
pub fn fallback_vote(advisor: &str, weight: f64, snapshot: &MarketSnapshot) -> AdvisorVote {
    let (action, confidence, reasoning) = classify(snapshot);

    AdvisorVote::new(advisor, action, confidence, weight)
        .with_reasoning(reasoning)
        .as_fallback()
}

fn classify(snapshot: &MarketSnapshot) -> (TradeAction, f64, String) {
    // Oversold bounce, unless the session is already in free fall
    if snapshot.rsi < 30.0 && snapshot.change_pct > -0.02 {
        let confidence = 0.5 + (30.0 - snapshot.rsi) / 100.0;
        return (
            TradeAction::Buy,
            confidence,
            format!("fallback: RSI {:.1} oversold", snapshot.rsi),
        );
    }

    // Overbought
    if snapshot.rsi > 70.0 {
        let confidence = 0.5 + (snapshot.rsi - 70.0) / 100.0;
        return (
            TradeAction::Sell,
            confidence,
            format!("fallback: RSI {:.1} overbought", snapshot.rsi),
        );
    }

    // Confirmed uptrend with sane momentum
    if snapshot.ema20 > snapshot.ema50
        && snapshot.macd_histogram > 0.0
        && (45.0..=65.0).contains(&snapshot.rsi)
    {
        return (
            TradeAction::Buy,
            0.55,
            "fallback: uptrend with positive momentum".to_string(),
        );
    }

    (
        TradeAction::Hold,
        HOLD_CONFIDENCE,
        "fallback: no clear signal".to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_neutral_snapshot_holds() {
        let snapshot = MarketSnapshot::neutral("ACB", dec!(26500));
        let vote = fallback_vote("bull", 1.0, &snapshot);

        assert_eq!(vote.action, TradeAction::Hold);
        assert_eq!(vote.confidence, 0.4);
        assert!(vote.fallback);
    }

    #[test]
    fn test_oversold_buys() {
        let mut snapshot = MarketSnapshot::neutral("ACB", dec!(26500));
        snapshot.rsi = 22.0;

        let vote = fallback_vote("analyst", 1.2, &snapshot);
        assert_eq!(vote.action, TradeAction::Buy);
        assert!(vote.confidence > 0.5);
    }

    #[test]
    fn test_crash_suppresses_oversold_buy() {
        let mut snapshot = MarketSnapshot::neutral("ACB", dec!(26500));
        snapshot.rsi = 22.0;
        snapshot.change_pct = -0.05;

        let vote = fallback_vote("analyst", 1.2, &snapshot);
        assert_eq!(vote.action, TradeAction::Hold);
    }

    #[test]
    fn test_overbought_sells() {
        let mut snapshot = MarketSnapshot::neutral("VCB", dec!(92500));
        snapshot.rsi = 81.0;

        let vote = fallback_vote("bear", 1.0, &snapshot);
        assert_eq!(vote.action, TradeAction::Sell);
        assert!((vote.confidence - 0.61).abs() < 1e-9);
    }

    #[test]
    fn test_deterministic() {
        let snapshot = MarketSnapshot::neutral("HPG", dec!(27800));
        let a = fallback_vote("bull", 1.0, &snapshot);
        let b = fallback_vote("bull", 1.0, &snapshot);

        assert_eq!(a.action, b.action);
        assert_eq!(a.confidence, b.confidence);
    }
}
