//! Multi-advisor orchestration and consensus building.
//!
//! Runs every advisor in parallel under one global deadline, replaces
//! timed-out or failed advisors with the deterministic fallback, and
//! aggregates the full vote set into a single consensus signal. A
//! consensus round never fails: in the worst case every slot is a
//! fallback vote.

use crate::advisor::Advisor;
use crate::fallback::fallback_vote;
use futures::future::join_all;
use quantum_core::{AdvisorVote, ConsensusSignal, MarketSnapshot, TradeAction};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Coordinator configuration.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Deadline for one full consensus round
    pub deadline: Duration,
    /// Minimum consensus confidence for a non-Hold action
    pub activation_threshold: f64,
    /// Vote confidence above which a directional vote counts toward a conflict
    pub conflict_confidence: f64,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            deadline: Duration::from_secs(15),
            activation_threshold: 0.5,
            conflict_confidence: 0.6,
        }
    }
}

impl From<&quantum_core::AgentsConfig> for CoordinatorConfig {
    fn from(settings: &quantum_core::AgentsConfig) -> Self {
        Self {
            deadline: Duration::from_secs(settings.deadline_secs),
            activation_threshold: settings.activation_threshold,
            ..Self::default()
        }
    }
}

/// Orchestrates a fixed set of advisors into one consensus per request.
pub struct AgentCoordinator {
    advisors: Vec<Arc<dyn Advisor>>,
    config: CoordinatorConfig,
}

impl AgentCoordinator {
    /// Creates a coordinator over a fixed advisor set.
    pub fn new(advisors: Vec<Arc<dyn Advisor>>, config: CoordinatorConfig) -> Self {
        Self { advisors, config }
    }

    /// Creates a coordinator with the standard advisor lineup.
    pub fn standard(config: CoordinatorConfig) -> Self {
        use crate::advisors::{AnalystAdvisor, BearAdvisor, BullAdvisor};
        Self::new(
            vec![
                Arc::new(AnalystAdvisor::new()),
                Arc::new(BullAdvisor::new()),
                Arc::new(BearAdvisor::new()),
            ],
            config,
        )
    }

    /// Number of configured advisors.
    pub fn advisor_count(&self) -> usize {
        self.advisors.len()
    }

    /// Runs one full consensus round for a snapshot.
    ///
    /// Every advisor is spawned concurrently and bounded by the
    /// configured deadline. A slot whose advisor times out or errors is
    /// filled by the deterministic fallback; the round itself never
    /// fails.
    pub async fn analyze(&self, snapshot: &MarketSnapshot) -> ConsensusSignal {
        let handles: Vec<_> = self
            .advisors
            .iter()
            .map(|advisor| {
                let advisor = Arc::clone(advisor);
                let snapshot = snapshot.clone();
                let deadline = self.config.deadline;
                tokio::spawn(async move {
                    timeout(deadline, advisor.evaluate(&snapshot)).await
                })
            })
            .collect();

        let results = join_all(handles).await;

        let mut votes = Vec::with_capacity(self.advisors.len());
        for (advisor, joined) in self.advisors.iter().zip(results) {
            let vote = match joined {
                Ok(Ok(Ok(vote))) => vote,
                Ok(Ok(Err(error))) => {
                    warn!(
                        advisor = advisor.name(),
                        %error,
                        "advisor failed, substituting fallback vote"
                    );
                    fallback_vote(advisor.name(), advisor.weight(), snapshot)
                }
                Ok(Err(_elapsed)) => {
                    warn!(
                        advisor = advisor.name(),
                        deadline_ms = self.config.deadline.as_millis() as u64,
                        "advisor exceeded deadline, substituting fallback vote"
                    );
                    fallback_vote(advisor.name(), advisor.weight(), snapshot)
                }
                Err(join_error) => {
                    warn!(
                        advisor = advisor.name(),
                        error = %join_error,
                        "advisor task aborted, substituting fallback vote"
                    );
                    fallback_vote(advisor.name(), advisor.weight(), snapshot)
                }
            };
            debug!(
                advisor = %vote.advisor,
                action = %vote.action,
                confidence = vote.confidence,
                fallback = vote.fallback,
                "advisor vote"
            );
            votes.push(vote);
        }

        let signal = self.aggregate(&snapshot.ticker, votes);
        info!(
            ticker = %signal.ticker,
            action = %signal.action,
            confidence = signal.confidence,
            fallback_votes = signal.fallback_count(),
            conflict = signal.has_conflict,
            "consensus"
        );
        signal
    }

    /// Aggregates a full vote set into the consensus signal.
    ///
    /// The action with the most votes wins; ties break on total
    /// weighted confidence. Consensus confidence is the weighted
    /// confidence of winner-aligned votes over the total weight of all
    /// votes, fallback votes included. A non-Hold winner below the
    /// activation threshold decays to Hold.
    fn aggregate(&self, ticker: &str, votes: Vec<AdvisorVote>) -> ConsensusSignal {
        let total_weight: f64 = votes.iter().map(|v| v.weight).sum();

        let mut vote_counts: HashMap<TradeAction, usize> = HashMap::new();
        let mut weighted_confidence: HashMap<TradeAction, f64> = HashMap::new();
        for vote in &votes {
            *vote_counts.entry(vote.action).or_insert(0) += 1;
            *weighted_confidence.entry(vote.action).or_insert(0.0) +=
                vote.weighted_confidence();
        }

        let winner = vote_counts
            .iter()
            .map(|(&action, &count)| {
                let tiebreak = weighted_confidence.get(&action).copied().unwrap_or(0.0);
                (action, count, tiebreak)
            })
            .max_by(|a, b| {
                a.1.cmp(&b.1)
                    .then(a.2.partial_cmp(&b.2).unwrap_or(std::cmp::Ordering::Equal))
            })
            .map(|(action, _, _)| action)
            .unwrap_or(TradeAction::Hold);

        let confidence = if total_weight > 0.0 {
            weighted_confidence.get(&winner).copied().unwrap_or(0.0) / total_weight
        } else {
            0.0
        };

        let action = if winner != TradeAction::Hold && confidence < self.config.activation_threshold
        {
            debug!(
                ticker,
                %winner,
                confidence,
                threshold = self.config.activation_threshold,
                "consensus below activation threshold, holding"
            );
            TradeAction::Hold
        } else {
            winner
        };

        let has_conflict = self.detect_conflict(&votes);

        ConsensusSignal::new(ticker, action, confidence, votes).with_conflict(has_conflict)
    }

    /// Confident bullish and bearish votes coexisting in one round.
    fn detect_conflict(&self, votes: &[AdvisorVote]) -> bool {
        let threshold = self.config.conflict_confidence;
        let bullish = votes
            .iter()
            .any(|v| v.action == TradeAction::Buy && v.confidence > threshold);
        let bearish = votes
            .iter()
            .any(|v| v.action == TradeAction::Sell && v.confidence > threshold);
        bullish && bearish
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use quantum_core::{QuantError, QuantResult};
    use rust_decimal_macros::dec;

    /// Advisor returning a fixed vote.
    struct FixedAdvisor {
        name: &'static str,
        weight: f64,
        action: TradeAction,
        confidence: f64,
    }

    #[async_trait]
    impl Advisor for FixedAdvisor {
        fn name(&self) -> &str {
            self.name
        }

        fn weight(&self) -> f64 {
            self.weight
        }

        async fn evaluate(&self, _snapshot: &MarketSnapshot) -> QuantResult<AdvisorVote> {
            Ok(AdvisorVote::new(self.name, self.action, self.confidence, self.weight))
        }
    }

    /// Advisor that never finishes inside any reasonable deadline.
    struct StalledAdvisor {
        name: &'static str,
        weight: f64,
    }

    #[async_trait]
    impl Advisor for StalledAdvisor {
        fn name(&self) -> &str {
            self.name
        }

        fn weight(&self) -> f64 {
            self.weight
        }

        async fn evaluate(&self, _snapshot: &MarketSnapshot) -> QuantResult<AdvisorVote> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            unreachable!("stalled advisor must be cut off at the deadline")
        }
    }

    /// Advisor that always errors.
    struct FailingAdvisor;

    #[async_trait]
    impl Advisor for FailingAdvisor {
        fn name(&self) -> &str {
            "failing"
        }

        fn weight(&self) -> f64 {
            1.0
        }

        async fn evaluate(&self, _snapshot: &MarketSnapshot) -> QuantResult<AdvisorVote> {
            Err(QuantError::Advisor("indicator feed unavailable".to_string()))
        }
    }

    fn config_with_deadline(deadline: Duration) -> CoordinatorConfig {
        CoordinatorConfig {
            deadline,
            activation_threshold: 0.5,
            conflict_confidence: 0.6,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_weighted_consensus_with_timeout_fallback() {
        // Three advisors with weights [1.2, 1.0, 1.0]: BUY(0.9), a
        // stall that falls back to HOLD(0.4), BUY(0.6). The consensus
        // is BUY and the fallback weight stays in the denominator:
        // (1.2*0.9 + 1.0*0.6) / 3.2 = 0.525.
        let coordinator = AgentCoordinator::new(
            vec![
                Arc::new(FixedAdvisor {
                    name: "analyst",
                    weight: 1.2,
                    action: TradeAction::Buy,
                    confidence: 0.9,
                }),
                Arc::new(StalledAdvisor {
                    name: "bull",
                    weight: 1.0,
                }),
                Arc::new(FixedAdvisor {
                    name: "bear",
                    weight: 1.0,
                    action: TradeAction::Buy,
                    confidence: 0.6,
                }),
            ],
            config_with_deadline(Duration::from_millis(100)),
        );

        let snapshot = MarketSnapshot::neutral("ACB", dec!(26500));
        let signal = coordinator.analyze(&snapshot).await;

        assert_eq!(signal.action, TradeAction::Buy);
        assert!((signal.confidence - 0.525).abs() < 1e-9);
        assert_eq!(signal.votes.len(), 3);
        assert_eq!(signal.fallback_count(), 1);

        let fallback = signal.votes.iter().find(|v| v.fallback).unwrap();
        assert_eq!(fallback.advisor, "bull");
        assert_eq!(fallback.action, TradeAction::Hold);
        assert_eq!(fallback.confidence, 0.4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_advisors_timeout_still_returns_signal() {
        let coordinator = AgentCoordinator::new(
            vec![
                Arc::new(StalledAdvisor {
                    name: "analyst",
                    weight: 1.2,
                }),
                Arc::new(StalledAdvisor {
                    name: "bull",
                    weight: 1.0,
                }),
                Arc::new(StalledAdvisor {
                    name: "bear",
                    weight: 1.0,
                }),
            ],
            config_with_deadline(Duration::from_millis(100)),
        );

        let snapshot = MarketSnapshot::neutral("VCB", dec!(92500));
        let started = tokio::time::Instant::now();
        let signal = coordinator.analyze(&snapshot).await;
        let elapsed = started.elapsed();

        // All fallback votes, neutral snapshot: consensus holds
        assert_eq!(signal.action, TradeAction::Hold);
        assert_eq!(signal.fallback_count(), 3);
        assert_eq!(signal.votes.len(), 3);
        // Bounded by the deadline plus overhead, not by the stalls
        assert!(elapsed < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_advisor_error_substituted() {
        let coordinator = AgentCoordinator::new(
            vec![
                Arc::new(FailingAdvisor),
                Arc::new(FixedAdvisor {
                    name: "analyst",
                    weight: 1.2,
                    action: TradeAction::Buy,
                    confidence: 0.8,
                }),
            ],
            config_with_deadline(Duration::from_secs(5)),
        );

        let snapshot = MarketSnapshot::neutral("HPG", dec!(27800));
        let signal = coordinator.analyze(&snapshot).await;

        assert_eq!(signal.votes.len(), 2);
        assert_eq!(signal.fallback_count(), 1);
    }

    #[tokio::test]
    async fn test_activation_threshold_decays_to_hold() {
        // One weak BUY against two HOLDs: BUY never reaches the
        // activation threshold once all weights sit in the denominator.
        let coordinator = AgentCoordinator::new(
            vec![
                Arc::new(FixedAdvisor {
                    name: "analyst",
                    weight: 1.2,
                    action: TradeAction::Buy,
                    confidence: 0.9,
                }),
                Arc::new(FixedAdvisor {
                    name: "bull",
                    weight: 1.0,
                    action: TradeAction::Buy,
                    confidence: 0.2,
                }),
                Arc::new(FixedAdvisor {
                    name: "bear",
                    weight: 1.0,
                    action: TradeAction::Sell,
                    confidence: 0.3,
                }),
            ],
            CoordinatorConfig {
                deadline: Duration::from_secs(5),
                activation_threshold: 0.6,
                conflict_confidence: 0.6,
            },
        );

        let snapshot = MarketSnapshot::neutral("ACB", dec!(26500));
        let signal = coordinator.analyze(&snapshot).await;

        // (1.2*0.9 + 1.0*0.2) / 3.2 = 0.4 < 0.6 threshold
        assert_eq!(signal.action, TradeAction::Hold);
        assert!((signal.confidence - 0.4).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_tie_breaks_on_weighted_confidence() {
        let coordinator = AgentCoordinator::new(
            vec![
                Arc::new(FixedAdvisor {
                    name: "analyst",
                    weight: 1.0,
                    action: TradeAction::Buy,
                    confidence: 0.9,
                }),
                Arc::new(FixedAdvisor {
                    name: "bear",
                    weight: 1.0,
                    action: TradeAction::Sell,
                    confidence: 0.7,
                }),
            ],
            CoordinatorConfig {
                deadline: Duration::from_secs(5),
                activation_threshold: 0.4,
                conflict_confidence: 0.6,
            },
        );

        let snapshot = MarketSnapshot::neutral("ACB", dec!(26500));
        let signal = coordinator.analyze(&snapshot).await;

        // One vote each: the higher weighted confidence wins the tie
        assert_eq!(signal.action, TradeAction::Buy);
        assert!(signal.has_conflict);
    }

    #[tokio::test]
    async fn test_standard_lineup() {
        let coordinator = AgentCoordinator::standard(CoordinatorConfig::default());
        assert_eq!(coordinator.advisor_count(), 3);

        let snapshot = MarketSnapshot::neutral("ACB", dec!(26500));
        let signal = coordinator.analyze(&snapshot).await;
        assert_eq!(signal.votes.len(), 3);
        assert_eq!(signal.fallback_count(), 0);
    }
}
