//! Portfolio-level circuit breaker.
//!
//! A strictly ordered severity state machine consulted before every new
//! order and evaluated against portfolio loss metrics each scheduler
//! tick. Escalation is immediate and monotonic; de-escalation happens
//! only through an explicit administrative reset, never silently.

use chrono::{DateTime, Utc};
use quantum_core::{BreakerConfig, Fraction};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Breaker severity levels, in strictly increasing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakerLevel {
    /// Normal operation
    Normal,
    /// Elevated losses: new order sizes are scaled down
    Caution,
    /// Severe daily loss: no new orders, exits still monitored
    Halt,
    /// Drawdown emergency: all open positions are force-liquidated
    Emergency,
}

impl std::fmt::Display for BreakerLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BreakerLevel::Normal => write!(f, "NORMAL"),
            BreakerLevel::Caution => write!(f, "CAUTION"),
            BreakerLevel::Halt => write!(f, "HALT"),
            BreakerLevel::Emergency => write!(f, "EMERGENCY"),
        }
    }
}

/// A recorded level transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakerTransition {
    /// Level before the transition
    pub from: BreakerLevel,
    /// Level after the transition
    pub to: BreakerLevel,
    /// What caused the transition
    pub reason: String,
    /// Daily P&L fraction at transition time
    pub daily_pnl: Fraction,
    /// Drawdown fraction at transition time
    pub drawdown: Fraction,
    /// Transition timestamp
    pub at: DateTime<Utc>,
}

/// Portfolio circuit breaker.
#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    level: BreakerLevel,
    config: BreakerConfig,
    history: Vec<BreakerTransition>,
}

impl CircuitBreaker {
    /// Creates a breaker at `Normal`.
    pub fn new(config: BreakerConfig) -> Self {
        Self {
            level: BreakerLevel::Normal,
            config,
            history: Vec::new(),
        }
    }

    /// Current level.
    pub fn level(&self) -> BreakerLevel {
        self.level
    }

    /// Recorded transition history, oldest first.
    pub fn history(&self) -> &[BreakerTransition] {
        &self.history
    }

    /// Whether emergency liquidation may bypass the settlement lock.
    pub fn emergency_override(&self) -> bool {
        self.config.emergency_override
    }

    /// Evaluates the loss metrics and escalates when a threshold is hit.
    ///
    /// Returns the new level when an escalation happened. The level
    /// never moves down here: a recovering P&L does not de-escalate.
    pub fn evaluate(&mut self, daily_pnl: Fraction, drawdown: Fraction) -> Option<BreakerLevel> {
        let target = self.target_level(daily_pnl, drawdown);
        if target <= self.level {
            return None;
        }

        let reason = match target {
            BreakerLevel::Caution => format!(
                "daily loss {} beyond caution threshold -{}",
                daily_pnl, self.config.caution_daily_loss
            ),
            BreakerLevel::Halt => format!(
                "daily loss {} beyond halt threshold -{}",
                daily_pnl, self.config.halt_daily_loss
            ),
            BreakerLevel::Emergency => format!(
                "drawdown {} beyond emergency threshold -{}",
                drawdown, self.config.emergency_drawdown
            ),
            BreakerLevel::Normal => unreachable!("escalation target is never Normal"),
        };

        self.transition(target, reason, daily_pnl, drawdown);
        Some(target)
    }

    fn target_level(&self, daily_pnl: Fraction, drawdown: Fraction) -> BreakerLevel {
        if drawdown <= -self.config.emergency_drawdown {
            BreakerLevel::Emergency
        } else if daily_pnl <= -self.config.halt_daily_loss {
            BreakerLevel::Halt
        } else if daily_pnl <= -self.config.caution_daily_loss {
            BreakerLevel::Caution
        } else {
            BreakerLevel::Normal
        }
    }

    /// Forces the breaker to `Emergency` (administrative stop).
    pub fn force_emergency(&mut self, reason: impl Into<String>) {
        if self.level == BreakerLevel::Emergency {
            return;
        }
        self.transition(
            BreakerLevel::Emergency,
            reason.into(),
            Decimal::ZERO,
            Decimal::ZERO,
        );
    }

    /// Explicit administrative reset back to `Normal`.
    ///
    /// The only de-escalation path; the reset itself is recorded in the
    /// transition history.
    pub fn reset(&mut self, reason: impl Into<String>) {
        if self.level == BreakerLevel::Normal {
            return;
        }
        let reason = reason.into();
        info!(from = %self.level, %reason, "circuit breaker reset");
        self.transition(BreakerLevel::Normal, reason, Decimal::ZERO, Decimal::ZERO);
    }

    /// Quantity multiplier for new orders at the current level.
    ///
    /// `None` means new orders are blocked entirely.
    pub fn order_scale(&self) -> Option<Decimal> {
        match self.level {
            BreakerLevel::Normal => Some(Decimal::ONE),
            BreakerLevel::Caution => Some(self.config.caution_scale),
            BreakerLevel::Halt | BreakerLevel::Emergency => None,
        }
    }

    /// Whether open positions must be force-liquidated.
    pub fn requires_liquidation(&self) -> bool {
        self.level == BreakerLevel::Emergency
    }

    fn transition(
        &mut self,
        to: BreakerLevel,
        reason: String,
        daily_pnl: Fraction,
        drawdown: Fraction,
    ) {
        warn!(from = %self.level, %to, %reason, "circuit breaker transition");
        self.history.push(BreakerTransition {
            from: self.level,
            to,
            reason,
            daily_pnl,
            drawdown,
            at: Utc::now(),
        });
        self.level = to;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn breaker() -> CircuitBreaker {
        CircuitBreaker::new(BreakerConfig::default())
    }

    #[test]
    fn test_level_ordering() {
        assert!(BreakerLevel::Normal < BreakerLevel::Caution);
        assert!(BreakerLevel::Caution < BreakerLevel::Halt);
        assert!(BreakerLevel::Halt < BreakerLevel::Emergency);
    }

    #[test]
    fn test_daily_loss_escalates_to_caution() {
        let mut breaker = breaker();

        // -4% daily loss sits between the caution and halt thresholds
        let escalated = breaker.evaluate(dec!(-0.04), dec!(-0.04));
        assert_eq!(escalated, Some(BreakerLevel::Caution));
        assert_eq!(breaker.level(), BreakerLevel::Caution);
        assert_eq!(breaker.order_scale(), Some(dec!(0.5)));
    }

    #[test]
    fn test_halt_blocks_orders() {
        let mut breaker = breaker();

        breaker.evaluate(dec!(-0.055), dec!(-0.055));
        assert_eq!(breaker.level(), BreakerLevel::Halt);
        assert_eq!(breaker.order_scale(), None);
        assert!(!breaker.requires_liquidation());
    }

    #[test]
    fn test_drawdown_triggers_emergency() {
        let mut breaker = breaker();

        breaker.evaluate(dec!(-0.02), dec!(-0.12));
        assert_eq!(breaker.level(), BreakerLevel::Emergency);
        assert!(breaker.requires_liquidation());
        assert_eq!(breaker.order_scale(), None);
    }

    #[test]
    fn test_monotonic_no_silent_deescalation() {
        let mut breaker = breaker();

        breaker.evaluate(dec!(-0.06), dec!(-0.06));
        assert_eq!(breaker.level(), BreakerLevel::Halt);

        // P&L recovery does not bring the level back down
        assert_eq!(breaker.evaluate(dec!(0.01), dec!(0.0)), None);
        assert_eq!(breaker.level(), BreakerLevel::Halt);

        // Nor does a milder loss re-trigger a lower level
        assert_eq!(breaker.evaluate(dec!(-0.035), dec!(-0.035)), None);
        assert_eq!(breaker.level(), BreakerLevel::Halt);
    }

    #[test]
    fn test_levels_only_increase_until_reset() {
        let mut breaker = breaker();
        let mut observed = vec![breaker.level()];

        for (daily, drawdown) in [
            (dec!(-0.035), dec!(-0.035)),
            (dec!(-0.01), dec!(-0.01)),
            (dec!(-0.055), dec!(-0.055)),
            (dec!(-0.02), dec!(-0.11)),
        ] {
            breaker.evaluate(daily, drawdown);
            observed.push(breaker.level());
        }

        for window in observed.windows(2) {
            assert!(window[0] <= window[1], "level went down without a reset");
        }
    }

    #[test]
    fn test_explicit_reset() {
        let mut breaker = breaker();
        breaker.evaluate(dec!(-0.06), dec!(-0.06));

        breaker.reset("operator review complete");
        assert_eq!(breaker.level(), BreakerLevel::Normal);
        assert_eq!(breaker.order_scale(), Some(Decimal::ONE));

        // Both the escalation and the reset are in the history
        let history = breaker.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].to, BreakerLevel::Normal);
        assert!(history[1].reason.contains("operator review"));
    }

    #[test]
    fn test_force_emergency() {
        let mut breaker = breaker();
        breaker.force_emergency("manual emergency stop");

        assert_eq!(breaker.level(), BreakerLevel::Emergency);
        assert_eq!(breaker.history().len(), 1);

        // Idempotent while already at Emergency
        breaker.force_emergency("again");
        assert_eq!(breaker.history().len(), 1);
    }

    #[test]
    fn test_transition_history_records_metrics() {
        let mut breaker = breaker();
        breaker.evaluate(dec!(-0.04), dec!(-0.045));

        let transition = &breaker.history()[0];
        assert_eq!(transition.from, BreakerLevel::Normal);
        assert_eq!(transition.to, BreakerLevel::Caution);
        assert_eq!(transition.daily_pnl, dec!(-0.04));
        assert_eq!(transition.drawdown, dec!(-0.045));
    }
}
