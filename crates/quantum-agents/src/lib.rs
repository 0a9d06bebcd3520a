//! # Quantum Agents
//!
//! Multi-advisor stock analysis and consensus building.
//!
//! A fixed set of independent advisors evaluates the same market
//! snapshot in parallel under a global deadline. Slow or failing
//! advisors are replaced by a deterministic rule-based fallback so
//! every advisor slot always yields a vote; the coordinator aggregates
//! the votes into one weighted consensus signal.

pub mod advisor;
pub mod advisors;
pub mod coordinator;
pub mod fallback;

pub use advisor::Advisor;
pub use advisors::{AnalystAdvisor, BearAdvisor, BullAdvisor};
pub use coordinator::{AgentCoordinator, CoordinatorConfig};
pub use fallback::fallback_vote;
