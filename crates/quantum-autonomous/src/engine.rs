//! Execution engine: the decision-and-execution pipeline.
//!
//! One opportunity flows consensus -> sizing -> circuit breaker gate ->
//! risk validation -> order lifecycle -> fill application. The
//! portfolio is the single piece of mutable shared state; every
//! mutation happens inside its write lock. Order pipelines are
//! serialized per ticker so no two orders for the same symbol are ever
//! in flight together.

use chrono::NaiveDate;
use quantum_agents::AgentCoordinator;
use quantum_core::{
    AppConfig, ConsensusSignal, ExitParams, HoseTickSize, MarketDataProvider, MarketSnapshot,
    Order, OrderRequest, PortfolioState, Position, PositionSummary, Price, QuantError,
    QuantResult, RoundMethod, TickSizeProvider, TradeAction, TradingCalendar,
};
use quantum_execution::{apply_fill, BrokerPort, FillOutcome, FillSettings, OrderManager};
use quantum_risk::{BreakerLevel, CircuitBreaker, RiskConfig, RiskManager};
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Result of a scheduler- or breaker-driven position exit.
#[derive(Debug, Clone)]
pub struct ExitExecution {
    /// Ticker that was (partially) liquidated
    pub ticker: String,
    /// The sell order that closed the position
    pub order_id: Uuid,
    /// Realized P&L net of costs
    pub realized_pnl: Decimal,
    /// What drove the exit
    pub reason: String,
}

/// Point-in-time engine status for operators.
#[derive(Debug, Clone)]
pub struct EngineStatus {
    /// Current equity
    pub equity: Decimal,
    /// Available cash
    pub cash: Decimal,
    /// Daily P&L fraction
    pub daily_pnl: Decimal,
    /// Drawdown fraction from peak equity
    pub drawdown: Decimal,
    /// Circuit breaker level
    pub breaker_level: BreakerLevel,
    /// Whether the engine is paused
    pub paused: bool,
    /// Position aggregate
    pub positions: PositionSummary,
}

/// An order that made it through the pipeline, with what its fill did
/// to the portfolio (absent for risk-rejected orders).
struct PlacedOrder {
    order: Order,
    outcome: Option<FillOutcome>,
}

/// Orchestrates consensus, risk, the breaker and order execution.
pub struct ExecutionEngine {
    config: AppConfig,
    coordinator: AgentCoordinator,
    risk: RiskManager,
    breaker: RwLock<CircuitBreaker>,
    orders: RwLock<OrderManager>,
    portfolio: RwLock<PortfolioState>,
    broker: Arc<dyn BrokerPort>,
    market_data: Arc<dyn MarketDataProvider>,
    calendar: TradingCalendar,
    tick_provider: HoseTickSize,
    fill_settings: FillSettings,
    paused: AtomicBool,
    /// Tickers with an order pipeline currently in flight
    in_flight: Mutex<HashSet<String>>,
}

impl ExecutionEngine {
    /// Wires the engine from configuration and its collaborators.
    pub fn new(
        config: AppConfig,
        coordinator: AgentCoordinator,
        market_data: Arc<dyn MarketDataProvider>,
        broker: Arc<dyn BrokerPort>,
        calendar: TradingCalendar,
    ) -> Self {
        let risk = RiskManager::new(RiskConfig {
            lot_size: config.trading.lot_size,
            commission_rate: config.trading.commission_rate,
            ..RiskConfig::default()
        });
        let breaker = CircuitBreaker::new(config.breaker.clone());
        let portfolio = PortfolioState::new(config.trading.initial_balance);
        let fill_settings = FillSettings {
            commission_rate: config.trading.commission_rate,
            selling_tax_rate: config.trading.selling_tax_rate,
        };

        Self {
            config,
            coordinator,
            risk,
            breaker: RwLock::new(breaker),
            orders: RwLock::new(OrderManager::new()),
            portfolio: RwLock::new(portfolio),
            broker,
            market_data,
            calendar,
            tick_provider: HoseTickSize::new(),
            fill_settings,
            paused: AtomicBool::new(false),
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Loads sector metadata into the risk gate.
    pub fn with_sectors(mut self, sectors: std::collections::HashMap<String, String>) -> Self {
        self.risk = self.risk.with_sectors(sectors);
        self
    }

    /// The market-data collaborator this engine reads prices from.
    pub fn market_data(&self) -> Arc<dyn MarketDataProvider> {
        Arc::clone(&self.market_data)
    }

    /// The trading calendar in effect.
    pub fn calendar(&self) -> &TradingCalendar {
        &self.calendar
    }

    /// Exit parameters applied to newly opened positions.
    fn exit_params(&self) -> ExitParams {
        ExitParams {
            take_profit: self.config.trading.take_profit,
            trailing_stop: self.config.trading.trailing_stop,
            stop_loss: self.config.trading.stop_loss,
            max_holding_days: self.config.trading.max_holding_days,
            min_holding_days: self.config.trading.min_holding_days,
        }
    }

    // ==================== analysis ====================

    /// Runs one consensus round without acting on it.
    pub async fn request_analysis(&self, snapshot: &MarketSnapshot) -> ConsensusSignal {
        self.coordinator.analyze(snapshot).await
    }

    /// Analyzes an opportunity and enters a position when the consensus
    /// and every gate agree.
    ///
    /// Returns the terminal order (filled or risk-rejected) when one
    /// was produced, `None` when the pipeline stopped before creating
    /// an order (hold consensus, breaker block, pipeline already in
    /// flight, zero sizing, pause).
    pub async fn handle_opportunity(
        &self,
        snapshot: &MarketSnapshot,
    ) -> QuantResult<Option<Order>> {
        if self.is_paused() {
            debug!(ticker = %snapshot.ticker, "engine paused, opportunity skipped");
            return Ok(None);
        }

        let signal = self.coordinator.analyze(snapshot).await;
        if signal.action != TradeAction::Buy {
            debug!(ticker = %signal.ticker, action = %signal.action, "consensus is not an entry");
            return Ok(None);
        }

        let ticker = snapshot.ticker.clone();
        if !self.begin_pipeline(&ticker).await {
            warn!(%ticker, "order pipeline already in flight, opportunity dropped");
            return Ok(None);
        }
        let result = self.enter_position(snapshot, &signal).await;
        self.end_pipeline(&ticker).await;
        result
    }

    async fn enter_position(
        &self,
        snapshot: &MarketSnapshot,
        signal: &ConsensusSignal,
    ) -> QuantResult<Option<Order>> {
        // Breaker gate: blocked entirely at Halt and above, scaled at Caution
        let scale = match self.breaker.read().await.order_scale() {
            Some(scale) => scale,
            None => {
                let level = self.breaker.read().await.level();
                warn!(ticker = %signal.ticker, %level, "new orders blocked by circuit breaker");
                return Ok(None);
            }
        };

        let price = self
            .tick_provider
            .round_to_tick(snapshot.price, RoundMethod::Floor);

        let quantity = {
            let portfolio = self.portfolio.read().await;
            self.sized_quantity(portfolio.equity(), price, scale)
        };
        if quantity.is_zero() {
            debug!(ticker = %signal.ticker, "sized quantity is zero, no order");
            return Ok(None);
        }

        let request = OrderRequest::limit_buy(&signal.ticker, quantity, price)
            .with_origin(format!("consensus {:.2}", signal.confidence));

        let placed = self.place_and_fill(request).await?;
        if let Some(placed) = &placed {
            info!(
                ticker = %placed.order.ticker,
                quantity = %placed.order.quantity,
                price = %placed.order.price,
                status = %placed.order.status,
                confidence = signal.confidence,
                "entry pipeline finished"
            );
        }
        Ok(placed.map(|p| p.order))
    }

    /// Sizes an entry: the configured equity fraction, lot-floored,
    /// then breaker-scaled and lot-floored again.
    fn sized_quantity(&self, equity: Decimal, price: Price, scale: Decimal) -> Decimal {
        if price <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        let lot = Decimal::from(self.config.trading.lot_size);
        let target_notional = equity * self.config.trading.position_fraction;
        let raw = target_notional / price;
        let base = (raw / lot).floor() * lot;
        ((base * scale) / lot).floor() * lot
    }

    /// Runs one order through create -> risk gate -> submit -> broker ->
    /// fill -> portfolio application.
    async fn place_and_fill(&self, request: OrderRequest) -> QuantResult<Option<PlacedOrder>> {
        let order = {
            let mut orders = self.orders.write().await;
            orders
                .create_order(request.clone())
                .map_err(|e| QuantError::Order(e.to_string()))?
        };
        let order_id = order.id;

        // Risk gate before submission; rejection terminates the order
        let validation = {
            let portfolio = self.portfolio.read().await;
            self.risk.validate_order(&request, &portfolio)
        };
        if !validation.is_valid {
            let reason = validation.reason().unwrap_or("risk rejection").to_string();
            let mut orders = self.orders.write().await;
            let rejected = orders
                .reject(order_id, reason.clone())
                .map_err(|e| QuantError::Order(e.to_string()))?;
            warn!(ticker = %request.ticker, %reason, "order rejected before submission");
            return Ok(Some(PlacedOrder {
                order: rejected.clone(),
                outcome: None,
            }));
        }

        {
            let mut orders = self.orders.write().await;
            orders
                .submit(order_id)
                .map_err(|e| QuantError::Order(e.to_string()))?;
        }

        let ack = match self.broker.place_order(&request).await {
            Ok(ack) => ack,
            Err(error) => {
                // Collaborator failure: terminate this order, the
                // operation as a whole is retried on a later tick
                let mut orders = self.orders.write().await;
                let _ = orders.cancel(order_id, Some(format!("broker failure: {}", error)));
                warn!(ticker = %request.ticker, %error, "broker placement failed");
                return Err(error);
            }
        };

        let notional = ack.fill_price * request.quantity;
        let commission = self.fill_settings.commission(notional);
        let tax = match request.side {
            quantum_core::Side::Sell => self.fill_settings.selling_tax(notional),
            quantum_core::Side::Buy => Decimal::ZERO,
        };

        let filled = {
            let mut orders = self.orders.write().await;
            orders
                .fill(order_id, ack.fill_price, commission, tax)
                .map_err(|e| QuantError::Order(e.to_string()))?
                .clone()
        };

        let outcome = {
            let mut portfolio = self.portfolio.write().await;
            apply_fill(
                &mut portfolio,
                &filled,
                &self.fill_settings,
                PortfolioState::exchange_today(),
                self.exit_params(),
            )?
        };

        Ok(Some(PlacedOrder {
            order: filled,
            outcome: Some(outcome),
        }))
    }

    // ==================== exits ====================

    /// Sells an open position at the given price.
    ///
    /// The settlement gate applies unless `bypass_settlement` is set
    /// (emergency override only): an ineligible position is flagged
    /// `pending_eligibility` and held, never sold early.
    pub async fn sell_position(
        &self,
        ticker: &str,
        price: Price,
        reason: &str,
        bypass_settlement: bool,
    ) -> QuantResult<Option<ExitExecution>> {
        if !self.begin_pipeline(ticker).await {
            debug!(%ticker, "order pipeline already in flight, exit deferred");
            return Ok(None);
        }
        let result = self
            .sell_position_inner(ticker, price, reason, bypass_settlement)
            .await;
        self.end_pipeline(ticker).await;
        result
    }

    async fn sell_position_inner(
        &self,
        ticker: &str,
        price: Price,
        reason: &str,
        bypass_settlement: bool,
    ) -> QuantResult<Option<ExitExecution>> {
        let (quantity, entry_date, min_holding) = {
            let portfolio = self.portfolio.read().await;
            let position = portfolio
                .positions
                .get(ticker)
                .filter(|p| p.is_open())
                .ok_or_else(|| QuantError::Position(format!("no open position in {}", ticker)))?;
            (
                position.quantity,
                position.entry_date,
                position.exit_params.min_holding_days,
            )
        };

        if !bypass_settlement
            && !self.settlement_eligible(entry_date, min_holding, PortfolioState::exchange_today())
        {
            let mut portfolio = self.portfolio.write().await;
            if let Some(position) = portfolio.positions.get_mut(ticker) {
                position.pending_eligibility = true;
            }
            warn!(
                %ticker,
                %entry_date,
                min_holding,
                %reason,
                "exit trigger fired inside the holding period, position held"
            );
            return Ok(None);
        }

        let sell_price = self.tick_provider.round_to_tick(price, RoundMethod::Floor);
        let request = OrderRequest::limit_sell(ticker, quantity, sell_price)
            .with_origin(reason.to_string());

        let placed = match self.place_and_fill(request).await? {
            Some(placed) => placed,
            None => return Ok(None),
        };
        if placed.order.status != quantum_core::OrderStatus::Filled {
            // Risk-rejected exit: surfaced to the caller via the order book
            return Ok(None);
        }

        let realized_pnl = match placed.outcome {
            Some(FillOutcome::Closed { realized_pnl, .. })
            | Some(FillOutcome::Reduced { realized_pnl, .. }) => realized_pnl,
            _ => Decimal::ZERO,
        };

        info!(
            %ticker,
            %reason,
            order_id = %placed.order.id,
            %realized_pnl,
            "position exit executed"
        );

        Ok(Some(ExitExecution {
            ticker: ticker.to_string(),
            order_id: placed.order.id,
            realized_pnl,
            reason: reason.to_string(),
        }))
    }

    /// Whether the settlement rule allows selling a position today.
    pub fn settlement_eligible(
        &self,
        entry_date: NaiveDate,
        min_holding_days: u32,
        as_of: NaiveDate,
    ) -> bool {
        self.calendar.trading_days_between(entry_date, as_of) >= min_holding_days
    }

    // ==================== circuit breaker ====================

    /// Refreshes portfolio marks and evaluates the circuit breaker.
    ///
    /// An escalation to `Emergency` triggers force-liquidation of every
    /// open position.
    pub async fn evaluate_breaker(&self) -> Option<BreakerLevel> {
        let (daily, drawdown) = {
            let mut portfolio = self.portfolio.write().await;
            portfolio.refresh_marks();
            (portfolio.daily_pnl_fraction(), portfolio.drawdown_fraction())
        };

        let escalated = {
            let mut breaker = self.breaker.write().await;
            breaker.evaluate(daily, drawdown)
        };

        if matches!(escalated, Some(BreakerLevel::Emergency)) {
            self.force_liquidate_all().await;
        }

        escalated
    }

    /// Issues a force-liquidation SELL for every open position.
    ///
    /// Settlement locks still apply unless the emergency override is
    /// configured. A position whose price refresh fails is skipped this
    /// round and retried on the next tick.
    pub async fn force_liquidate_all(&self) {
        let bypass = self.breaker.read().await.emergency_override();
        let tickers: Vec<String> = {
            let portfolio = self.portfolio.read().await;
            portfolio
                .open_positions()
                .iter()
                .map(|p| p.ticker.clone())
                .collect()
        };

        warn!(count = tickers.len(), bypass, "force-liquidating open positions");

        for ticker in tickers {
            let quote = match self.market_data.get_price(&ticker).await {
                Ok(quote) => quote,
                Err(error) => {
                    warn!(%ticker, %error, "price refresh failed, liquidation retried next tick");
                    continue;
                }
            };
            {
                let mut portfolio = self.portfolio.write().await;
                portfolio.mark_price(&ticker, quote.price);
            }
            if let Err(error) = self
                .sell_position(&ticker, quote.price, "FORCE_LIQUIDATION", bypass)
                .await
            {
                warn!(%ticker, %error, "force liquidation failed for ticker");
            }
        }
    }

    // ==================== administrative controls ====================

    /// Forces the breaker to `Emergency` and liquidates.
    pub async fn emergency_stop(&self) {
        {
            let mut breaker = self.breaker.write().await;
            breaker.force_emergency("administrative emergency stop");
        }
        self.force_liquidate_all().await;
    }

    /// Pauses opportunity handling and scheduler evaluation.
    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
        info!("engine paused");
    }

    /// Resumes after a pause.
    pub fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
        info!("engine resumed");
    }

    /// Whether the engine is paused.
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    /// Explicit administrative breaker reset.
    pub async fn reset_breaker(&self, reason: impl Into<String>) {
        let mut breaker = self.breaker.write().await;
        breaker.reset(reason);
    }

    /// Current breaker level.
    pub async fn breaker_level(&self) -> BreakerLevel {
        self.breaker.read().await.level()
    }

    // ==================== queries ====================

    /// Snapshot of all open positions.
    pub async fn positions(&self) -> Vec<Position> {
        let portfolio = self.portfolio.read().await;
        portfolio.open_positions().into_iter().cloned().collect()
    }

    /// Tickers with open positions.
    pub async fn open_tickers(&self) -> Vec<String> {
        let portfolio = self.portfolio.read().await;
        portfolio
            .open_positions()
            .iter()
            .map(|p| p.ticker.clone())
            .collect()
    }

    /// Snapshot of all tracked orders.
    pub async fn orders(&self) -> Vec<Order> {
        let orders = self.orders.read().await;
        orders.all_orders().into_iter().cloned().collect()
    }

    /// Applies a fresh price to a position (scheduler price refresh).
    pub async fn mark_price(&self, ticker: &str, price: Price) {
        let mut portfolio = self.portfolio.write().await;
        portfolio.mark_price(ticker, price);
    }

    /// A cloned view of a single position.
    pub async fn position(&self, ticker: &str) -> Option<Position> {
        let portfolio = self.portfolio.read().await;
        portfolio.positions.get(ticker).filter(|p| p.is_open()).cloned()
    }

    /// Operator-facing status snapshot.
    pub async fn status(&self) -> EngineStatus {
        let portfolio = self.portfolio.read().await;
        let breaker = self.breaker.read().await;
        EngineStatus {
            equity: portfolio.equity(),
            cash: portfolio.cash,
            daily_pnl: portfolio.daily_pnl_fraction(),
            drawdown: portfolio.drawdown_fraction(),
            breaker_level: breaker.level(),
            paused: self.is_paused(),
            positions: PositionSummary::from_positions(
                portfolio.positions.values(),
            ),
        }
    }

    // ==================== internal ====================

    async fn begin_pipeline(&self, ticker: &str) -> bool {
        self.in_flight.lock().await.insert(ticker.to_string())
    }

    async fn end_pipeline(&self, ticker: &str) {
        self.in_flight.lock().await.remove(ticker);
    }

    /// Seeds a position directly into the portfolio, bypassing the
    /// order pipeline. Test-builds only.
    #[cfg(test)]
    pub(crate) async fn insert_position_for_tests(
        &self,
        ticker: &str,
        quantity: Decimal,
        price: Price,
        entry_date: NaiveDate,
    ) {
        let mut portfolio = self.portfolio.write().await;
        let position = Position::new(ticker, quantity, price, entry_date, ExitParams::default());
        portfolio.cash -= position.entry_notional_value();
        portfolio.positions.insert(ticker.to_string(), position);
    }
}
