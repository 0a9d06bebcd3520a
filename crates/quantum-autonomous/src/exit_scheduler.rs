//! Position exit scheduler.
//!
//! A periodic loop that re-evaluates every open position: refresh the
//! price, update the peak, evaluate the exit triggers in fixed priority
//! order, and issue the SELL once the settlement rule allows it.
//!
//! Exit logic per position and tick, strictly sequential:
//! 1. refresh the current price (a failed refresh skips the position
//!    for this tick only - it is never treated as a price of zero)
//! 2. update the peak price
//! 3. evaluate triggers: stop-loss, then trailing-stop, then
//!    take-profit, then max-holding-days
//! 4. the first satisfied trigger sells through the engine, which
//!    enforces the minimum holding period and per-ticker serialization
//!
//! The loop is cancellable as a whole: shutdown lets the in-flight tick
//! finish and starts no new one.

use crate::engine::ExecutionEngine;
use chrono::{DateTime, Utc};
use quantum_core::{PortfolioState, Position};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, error, info, warn};

/// Exit trigger kinds, in evaluation priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitTrigger {
    /// Price at or below entry x (1 - stop_loss)
    StopLoss,
    /// Price at or below peak x (1 - trailing_stop)
    TrailingStop,
    /// Price at or above entry x (1 + take_profit)
    TakeProfit,
    /// Held longer than the maximum holding period
    MaxHoldingDays,
}

impl std::fmt::Display for ExitTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExitTrigger::StopLoss => write!(f, "STOP_LOSS"),
            ExitTrigger::TrailingStop => write!(f, "TRAILING_STOP"),
            ExitTrigger::TakeProfit => write!(f, "TAKE_PROFIT"),
            ExitTrigger::MaxHoldingDays => write!(f, "MAX_HOLDING_DAYS"),
        }
    }
}

/// A completed position exit, broadcast to observers.
#[derive(Debug, Clone)]
pub struct ExitEvent {
    /// Liquidated ticker
    pub ticker: String,
    /// Trigger that fired
    pub trigger: ExitTrigger,
    /// Realized P&L net of costs
    pub realized_pnl: Decimal,
    /// Exit timestamp
    pub at: DateTime<Utc>,
}

/// Periodic exit-evaluation loop over every open position.
pub struct PositionExitScheduler {
    engine: Arc<ExecutionEngine>,
    check_interval: Duration,
    running: Arc<RwLock<bool>>,
    exit_tx: broadcast::Sender<ExitEvent>,
}

impl PositionExitScheduler {
    /// Creates a scheduler over the engine's positions.
    pub fn new(engine: Arc<ExecutionEngine>, check_interval: Duration) -> Self {
        let (exit_tx, _) = broadcast::channel(64);
        Self {
            engine,
            check_interval,
            running: Arc::new(RwLock::new(false)),
            exit_tx,
        }
    }

    /// Creates a scheduler from the configured interval.
    pub fn from_config(engine: Arc<ExecutionEngine>, config: &quantum_core::SchedulerConfig) -> Self {
        Self::new(engine, Duration::from_secs(config.check_interval_secs))
    }

    /// Subscribes to exit events.
    pub fn subscribe(&self) -> broadcast::Receiver<ExitEvent> {
        self.exit_tx.subscribe()
    }

    /// Whether the loop is running.
    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }

    /// Runs the evaluation loop until shutdown.
    pub async fn run(&self) {
        {
            let mut running = self.running.write().await;
            if *running {
                warn!("exit scheduler already running");
                return;
            }
            *running = true;
        }

        info!(
            interval_secs = self.check_interval.as_secs(),
            "position exit scheduler started"
        );

        let mut interval = tokio::time::interval(self.check_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick of tokio's interval fires immediately
        interval.tick().await;

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if self.engine.is_paused() {
                        debug!("engine paused, tick skipped");
                        continue;
                    }
                    self.tick().await;
                }
                _ = self.wait_for_shutdown() => {
                    break;
                }
            }
        }

        info!("position exit scheduler stopped");
    }

    /// Requests a graceful shutdown: the in-flight tick finishes, no
    /// new tick starts.
    pub async fn shutdown(&self) {
        let mut running = self.running.write().await;
        *running = false;
    }

    async fn wait_for_shutdown(&self) {
        loop {
            tokio::time::sleep(Duration::from_millis(100)).await;
            if !*self.running.read().await {
                break;
            }
        }
    }

    /// One full evaluation pass: breaker first, then every position.
    pub async fn tick(&self) {
        self.engine.evaluate_breaker().await;

        for ticker in self.engine.open_tickers().await {
            self.evaluate_position(&ticker).await;
        }
    }

    /// Evaluates one position: price refresh, peak update, triggers.
    async fn evaluate_position(&self, ticker: &str) {
        let quote = match self.engine.market_data().get_price(ticker).await {
            Ok(quote) => quote,
            Err(err) => {
                // Collaborator failure: skip this position for this
                // tick; the next tick retries
                warn!(%ticker, error = %err, "price refresh failed, position skipped this tick");
                return;
            }
        };

        self.engine.mark_price(ticker, quote.price).await;

        let position = match self.engine.position(ticker).await {
            Some(position) => position,
            None => return,
        };

        let trigger = match Self::first_trigger(
            &position,
            self.engine.calendar(),
            PortfolioState::exchange_today(),
        ) {
            Some(trigger) => trigger,
            None => return,
        };

        debug!(%ticker, %trigger, price = %quote.price, "exit trigger satisfied");

        match self
            .engine
            .sell_position(ticker, quote.price, &trigger.to_string(), false)
            .await
        {
            Ok(Some(execution)) => {
                let event = ExitEvent {
                    ticker: execution.ticker,
                    trigger,
                    realized_pnl: execution.realized_pnl,
                    at: Utc::now(),
                };
                info!(
                    ticker = %event.ticker,
                    %trigger,
                    realized_pnl = %event.realized_pnl,
                    "position exited"
                );
                let _ = self.exit_tx.send(event);
            }
            Ok(None) => {
                // Held: inside the settlement lock (flagged
                // pending-eligibility by the engine) or pipeline busy
            }
            Err(err) => {
                error!(%ticker, %trigger, error = %err, "exit order failed, retried next tick");
            }
        }
    }

    /// First satisfied trigger in the fixed priority order.
    fn first_trigger(
        position: &Position,
        calendar: &quantum_core::TradingCalendar,
        as_of: chrono::NaiveDate,
    ) -> Option<ExitTrigger> {
        let price = position.current_price;

        if price <= position.stop_loss_price() {
            return Some(ExitTrigger::StopLoss);
        }
        if price <= position.trailing_stop_price() {
            return Some(ExitTrigger::TrailingStop);
        }
        if price >= position.take_profit_price() {
            return Some(ExitTrigger::TakeProfit);
        }

        let held = calendar.trading_days_between(position.entry_date, as_of);
        if held >= position.exit_params.max_holding_days {
            return Some(ExitTrigger::MaxHoldingDays);
        }

        None
    }
}
