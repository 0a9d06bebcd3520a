//! Consensus signals and advisor votes.
//!
//! This module defines the aggregated output of a multi-advisor
//! analysis round:
//! - `TradeAction` - the recommended action
//! - `AdvisorVote` - one advisor's contribution
//! - `ConsensusSignal` - the aggregated recommendation with every
//!   sub-vote preserved for auditability

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Recommended trade action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeAction {
    /// Enter or add to a long position
    Buy,
    /// Exit or reduce a position
    Sell,
    /// Take no action
    Hold,
}

impl std::fmt::Display for TradeAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TradeAction::Buy => write!(f, "BUY"),
            TradeAction::Sell => write!(f, "SELL"),
            TradeAction::Hold => write!(f, "HOLD"),
        }
    }
}

/// One advisor's vote in a consensus round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvisorVote {
    /// Advisor name (e.g. "analyst", "bull", "bear")
    pub advisor: String,
    /// Recommended action
    pub action: TradeAction,
    /// Confidence in [0, 1]
    pub confidence: f64,
    /// Fixed weight of the advisor role
    pub weight: f64,
    /// Short reasoning line for the audit trail
    pub reasoning: String,
    /// Whether this vote was substituted by the deterministic fallback
    pub fallback: bool,
}

impl AdvisorVote {
    /// Creates a new vote, clamping confidence into [0, 1].
    pub fn new(
        advisor: impl Into<String>,
        action: TradeAction,
        confidence: f64,
        weight: f64,
    ) -> Self {
        Self {
            advisor: advisor.into(),
            action,
            confidence: confidence.clamp(0.0, 1.0),
            weight,
            reasoning: String::new(),
            fallback: false,
        }
    }

    /// Sets the reasoning line.
    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = reasoning.into();
        self
    }

    /// Marks the vote as a fallback substitution.
    pub fn as_fallback(mut self) -> Self {
        self.fallback = true;
        self
    }

    /// Weighted confidence contribution of this vote.
    pub fn weighted_confidence(&self) -> f64 {
        self.confidence * self.weight
    }
}

/// Aggregated trade recommendation.
///
/// Immutable once produced; owned by whichever call produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsensusSignal {
    /// Unique signal ID
    pub id: Uuid,
    /// Trading ticker
    pub ticker: String,
    /// Consensus action
    pub action: TradeAction,
    /// Aggregated confidence in [0, 1]
    pub confidence: f64,
    /// Every advisor vote that entered the aggregation
    pub votes: Vec<AdvisorVote>,
    /// Confident bullish and bearish votes coexist
    pub has_conflict: bool,
    /// Generation timestamp
    pub generated_at: DateTime<Utc>,
}

impl ConsensusSignal {
    /// Creates a new consensus signal.
    pub fn new(
        ticker: impl Into<String>,
        action: TradeAction,
        confidence: f64,
        votes: Vec<AdvisorVote>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            ticker: ticker.into(),
            action,
            confidence: confidence.clamp(0.0, 1.0),
            votes,
            has_conflict: false,
            generated_at: Utc::now(),
        }
    }

    /// Flags the signal as conflicted.
    pub fn with_conflict(mut self, has_conflict: bool) -> Self {
        self.has_conflict = has_conflict;
        self
    }

    /// Whether the signal recommends acting at all.
    pub fn is_actionable(&self) -> bool {
        self.action != TradeAction::Hold
    }

    /// Number of votes substituted by the fallback.
    pub fn fallback_count(&self) -> usize {
        self.votes.iter().filter(|v| v.fallback).count()
    }
}
