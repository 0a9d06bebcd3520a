//! Advisor trait definition.

use async_trait::async_trait;
use quantum_core::{AdvisorVote, MarketSnapshot, QuantResult};

/// One independent evaluator contributing a vote to consensus.
///
/// Advisors are held by the coordinator as a homogeneous list; each
/// carries a fixed role weight used during aggregation. An advisor may
/// fail or run past the coordinator deadline - both are absorbed by
/// substituting the deterministic fallback for its slot.
#[async_trait]
pub trait Advisor: Send + Sync {
    /// Advisor name, used in votes and logs.
    fn name(&self) -> &str;

    /// Fixed aggregation weight of this advisor role.
    fn weight(&self) -> f64;

    /// Evaluates the snapshot and produces a vote.
    async fn evaluate(&self, snapshot: &MarketSnapshot) -> QuantResult<AdvisorVote>;
}
