//! Concrete advisor implementations.

mod analyst;
mod bear;
mod bull;

pub use analyst::AnalystAdvisor;
pub use bear::BearAdvisor;
pub use bull::BullAdvisor;

use quantum_core::TradeAction;

/// Maps a 0-100 bullishness score to an action and a confidence.
///
/// `buy_threshold` and `sell_threshold` shape the advisor's bias:
/// scores at or above the buy threshold vote Buy with confidence
/// score/100, scores at or below the sell threshold vote Sell with
/// confidence (100-score)/100, anything in between holds.
pub(crate) fn score_to_vote(
    score: f64,
    buy_threshold: f64,
    sell_threshold: f64,
) -> (TradeAction, f64) {
    let score = score.clamp(0.0, 100.0);
    if score >= buy_threshold {
        (TradeAction::Buy, score / 100.0)
    } else if score <= sell_threshold {
        (TradeAction::Sell, (100.0 - score) / 100.0)
    } else {
        // Conviction in holding decays as the score drifts off center
        (TradeAction::Hold, 0.5 - (score - 50.0).abs() / 100.0)
    }
}
