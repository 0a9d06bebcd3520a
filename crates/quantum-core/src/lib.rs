//! # Quantum Core
//!
//! Core domain models and types for the autonomous trading engine.
//!
//! This crate provides the foundation shared by every other crate in
//! the workspace:
//! - order and order-request types
//! - position tracking with exit parameters
//! - consensus signals and advisor votes
//! - the trading calendar and settlement arithmetic
//! - tick-size rules for the HOSE price grid
//! - market data ports and snapshots
//! - portfolio state and drawdown metrics
//! - configuration management
//! - logging infrastructure

pub mod config;
pub mod domain;
pub mod error;
pub mod logging;
pub mod types;

pub use config::*;
pub use domain::*;
pub use error::*;
pub use logging::*;
pub use types::*;
