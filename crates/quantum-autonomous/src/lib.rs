//! # Quantum Autonomous
//!
//! The autonomous decision-and-execution control loop:
//! - `ExecutionEngine` - consensus, risk gate, circuit breaker and
//!   order pipeline orchestration plus administrative controls
//! - `PositionExitScheduler` - the periodic exit-evaluation loop over
//!   every open position

pub mod engine;
pub mod exit_scheduler;

pub use engine::{EngineStatus, ExecutionEngine, ExitExecution};
pub use exit_scheduler::{ExitEvent, ExitTrigger, PositionExitScheduler};
