//! Order lifecycle management.
//!
//! The order manager owns every order and enforces the lifecycle state
//! machine:
//!
//! ```text
//! Pending -> Submitted -> {Filled, Rejected, Cancelled}
//! Pending -> {Rejected, Cancelled}
//! ```
//!
//! Repeated fill/reject/cancel calls on a terminal order are rejected
//! as invalid-transition errors rather than silently ignored, so
//! ordering bugs surface at the call site.

use chrono::{DateTime, Utc};
use quantum_core::{Order, OrderRequest, OrderStatus};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

/// Order manager error type.
#[derive(Debug, Error)]
pub enum OrderManagerError {
    #[error("Order not found: {0}")]
    OrderNotFound(Uuid),

    #[error("Order already exists: {0}")]
    OrderAlreadyExists(Uuid),

    #[error("Invalid state transition: {0} -> {1}")]
    InvalidTransition(OrderStatus, OrderStatus),
}

/// Order event for change tracking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OrderEvent {
    /// Order created
    Created {
        order_id: Uuid,
        timestamp: DateTime<Utc>,
    },
    /// Order submitted to the broker
    Submitted {
        order_id: Uuid,
        timestamp: DateTime<Utc>,
    },
    /// Order fully filled
    Filled {
        order_id: Uuid,
        fill_price: Decimal,
        timestamp: DateTime<Utc>,
    },
    /// Order rejected
    Rejected {
        order_id: Uuid,
        reason: String,
        timestamp: DateTime<Utc>,
    },
    /// Order cancelled
    Cancelled {
        order_id: Uuid,
        reason: Option<String>,
        timestamp: DateTime<Utc>,
    },
}

impl OrderEvent {
    /// Order ID of the event.
    pub fn order_id(&self) -> Uuid {
        match self {
            OrderEvent::Created { order_id, .. } => *order_id,
            OrderEvent::Submitted { order_id, .. } => *order_id,
            OrderEvent::Filled { order_id, .. } => *order_id,
            OrderEvent::Rejected { order_id, .. } => *order_id,
            OrderEvent::Cancelled { order_id, .. } => *order_id,
        }
    }
}

/// Tracks every order and enforces lifecycle transitions.
#[derive(Debug, Default)]
pub struct OrderManager {
    /// All orders by ID
    orders: HashMap<Uuid, Order>,
    /// Orders by ticker
    orders_by_ticker: HashMap<String, Vec<Uuid>>,
    /// Order event history
    events: Vec<OrderEvent>,
    /// Maximum retained event count
    max_history_size: usize,
}

impl OrderManager {
    /// Creates a new order manager.
    pub fn new() -> Self {
        Self {
            orders: HashMap::new(),
            orders_by_ticker: HashMap::new(),
            events: Vec::new(),
            max_history_size: 10_000,
        }
    }

    /// Creates a manager with a custom event history size.
    pub fn with_history_size(max_history_size: usize) -> Self {
        Self {
            max_history_size,
            ..Self::new()
        }
    }

    // ==================== order creation ====================

    /// Creates and tracks a new order in the `Pending` state.
    pub fn create_order(&mut self, request: OrderRequest) -> Result<Order, OrderManagerError> {
        let order = Order::from_request(request);
        self.add_order(order.clone())?;
        Ok(order)
    }

    /// Adds an existing order to tracking.
    pub fn add_order(&mut self, order: Order) -> Result<(), OrderManagerError> {
        if self.orders.contains_key(&order.id) {
            return Err(OrderManagerError::OrderAlreadyExists(order.id));
        }

        let order_id = order.id;
        let ticker = order.ticker.clone();

        self.orders.insert(order_id, order);
        self.orders_by_ticker.entry(ticker).or_default().push(order_id);

        self.record_event(OrderEvent::Created {
            order_id,
            timestamp: Utc::now(),
        });

        Ok(())
    }

    // ==================== transitions ====================

    /// Submits a pending order: `Pending -> Submitted`.
    pub fn submit(&mut self, order_id: Uuid) -> Result<&Order, OrderManagerError> {
        let order = self.get_mut(order_id)?;
        if order.status != OrderStatus::Pending {
            return Err(OrderManagerError::InvalidTransition(
                order.status,
                OrderStatus::Submitted,
            ));
        }

        order.status = OrderStatus::Submitted;
        order.updated_at = Utc::now();

        self.record_event(OrderEvent::Submitted {
            order_id,
            timestamp: Utc::now(),
        });
        debug!(%order_id, "order submitted");

        Ok(&self.orders[&order_id])
    }

    /// Fills a submitted order: `Submitted -> Filled`.
    ///
    /// The caller applies the resulting fill to the portfolio via
    /// `ledger::apply_fill`.
    pub fn fill(
        &mut self,
        order_id: Uuid,
        fill_price: Decimal,
        commission: Decimal,
        tax: Decimal,
    ) -> Result<&Order, OrderManagerError> {
        let order = self.get_mut(order_id)?;
        if order.status != OrderStatus::Submitted {
            return Err(OrderManagerError::InvalidTransition(
                order.status,
                OrderStatus::Filled,
            ));
        }

        order.status = OrderStatus::Filled;
        order.fill_price = Some(fill_price);
        order.commission = commission;
        order.tax = tax;
        order.updated_at = Utc::now();

        self.record_event(OrderEvent::Filled {
            order_id,
            fill_price,
            timestamp: Utc::now(),
        });
        debug!(%order_id, %fill_price, "order filled");

        Ok(&self.orders[&order_id])
    }

    /// Rejects an order: `Pending -> Rejected` (risk gate) or
    /// `Submitted -> Rejected` (broker).
    pub fn reject(
        &mut self,
        order_id: Uuid,
        reason: impl Into<String>,
    ) -> Result<&Order, OrderManagerError> {
        let order = self.get_mut(order_id)?;
        if order.status.is_terminal() {
            return Err(OrderManagerError::InvalidTransition(
                order.status,
                OrderStatus::Rejected,
            ));
        }

        let reason = reason.into();
        order.status = OrderStatus::Rejected;
        order.reject_reason = Some(reason.clone());
        order.updated_at = Utc::now();

        self.record_event(OrderEvent::Rejected {
            order_id,
            reason,
            timestamp: Utc::now(),
        });

        Ok(&self.orders[&order_id])
    }

    /// Cancels an active order: `Pending | Submitted -> Cancelled`.
    pub fn cancel(
        &mut self,
        order_id: Uuid,
        reason: Option<String>,
    ) -> Result<&Order, OrderManagerError> {
        let order = self.get_mut(order_id)?;
        if order.status.is_terminal() {
            return Err(OrderManagerError::InvalidTransition(
                order.status,
                OrderStatus::Cancelled,
            ));
        }

        order.status = OrderStatus::Cancelled;
        order.updated_at = Utc::now();

        self.record_event(OrderEvent::Cancelled {
            order_id,
            reason,
            timestamp: Utc::now(),
        });

        Ok(&self.orders[&order_id])
    }

    // ==================== queries ====================

    /// Order by ID.
    pub fn get_order(&self, order_id: Uuid) -> Option<&Order> {
        self.orders.get(&order_id)
    }

    /// All orders, in no particular order.
    pub fn all_orders(&self) -> Vec<&Order> {
        self.orders.values().collect()
    }

    /// Active (non-terminal) orders.
    pub fn active_orders(&self) -> Vec<&Order> {
        self.orders.values().filter(|o| o.is_active()).collect()
    }

    /// Orders for a ticker, all states.
    pub fn orders_for_ticker(&self, ticker: &str) -> Vec<&Order> {
        self.orders_by_ticker
            .get(ticker)
            .map(|ids| ids.iter().filter_map(|id| self.orders.get(id)).collect())
            .unwrap_or_default()
    }

    /// Whether any active order exists for a ticker.
    pub fn has_active_order(&self, ticker: &str) -> bool {
        self.orders_for_ticker(ticker).iter().any(|o| o.is_active())
    }

    /// Total tracked order count.
    pub fn total_orders(&self) -> usize {
        self.orders.len()
    }

    /// Event history, oldest first.
    pub fn events(&self) -> &[OrderEvent] {
        &self.events
    }

    /// Removes terminal orders older than the cutoff.
    pub fn cleanup_old_orders(&mut self, older_than: DateTime<Utc>) {
        let stale: Vec<Uuid> = self
            .orders
            .iter()
            .filter(|(_, o)| o.status.is_terminal() && o.updated_at < older_than)
            .map(|(id, _)| *id)
            .collect();

        for order_id in stale {
            if let Some(order) = self.orders.remove(&order_id) {
                if let Some(ids) = self.orders_by_ticker.get_mut(&order.ticker) {
                    ids.retain(|id| *id != order_id);
                }
            }
        }
    }

    // ==================== internal ====================

    fn get_mut(&mut self, order_id: Uuid) -> Result<&mut Order, OrderManagerError> {
        self.orders
            .get_mut(&order_id)
            .ok_or(OrderManagerError::OrderNotFound(order_id))
    }

    fn record_event(&mut self, event: OrderEvent) {
        self.events.push(event);
        if self.events.len() > self.max_history_size {
            let drain_count = self.events.len() - self.max_history_size;
            self.events.drain(0..drain_count);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quantum_core::Side;
    use rust_decimal_macros::dec;

    fn buy_request() -> OrderRequest {
        OrderRequest::limit_buy("ACB", dec!(500), dec!(26_500))
    }

    #[test]
    fn test_create_order_is_pending() {
        let mut manager = OrderManager::new();
        let order = manager.create_order(buy_request()).unwrap();

        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(manager.total_orders(), 1);
        assert!(manager.has_active_order("ACB"));
    }

    #[test]
    fn test_full_lifecycle() {
        let mut manager = OrderManager::new();
        let order = manager.create_order(buy_request()).unwrap();

        manager.submit(order.id).unwrap();
        let filled = manager
            .fill(order.id, dec!(26_500), dec!(19_875), Decimal::ZERO)
            .unwrap();

        assert_eq!(filled.status, OrderStatus::Filled);
        assert_eq!(filled.fill_price, Some(dec!(26_500)));
        assert_eq!(filled.commission, dec!(19_875));
        assert!(!manager.has_active_order("ACB"));

        // Created, Submitted, Filled
        assert_eq!(manager.events().len(), 3);
    }

    #[test]
    fn test_fill_requires_submission() {
        let mut manager = OrderManager::new();
        let order = manager.create_order(buy_request()).unwrap();

        // Pending -> Filled skips submission and must fail
        let result = manager.fill(order.id, dec!(26_500), Decimal::ZERO, Decimal::ZERO);
        assert!(matches!(
            result,
            Err(OrderManagerError::InvalidTransition(
                OrderStatus::Pending,
                OrderStatus::Filled
            ))
        ));
    }

    #[test]
    fn test_double_submit_fails() {
        let mut manager = OrderManager::new();
        let order = manager.create_order(buy_request()).unwrap();

        manager.submit(order.id).unwrap();
        let result = manager.submit(order.id);
        assert!(matches!(
            result,
            Err(OrderManagerError::InvalidTransition(
                OrderStatus::Submitted,
                OrderStatus::Submitted
            ))
        ));
    }

    #[test]
    fn test_reject_pending_order() {
        let mut manager = OrderManager::new();
        let order = manager.create_order(buy_request()).unwrap();

        let rejected = manager.reject(order.id, "quantity not a lot multiple").unwrap();
        assert_eq!(rejected.status, OrderStatus::Rejected);
        assert_eq!(
            rejected.reject_reason.as_deref(),
            Some("quantity not a lot multiple")
        );
    }

    #[test]
    fn test_cancel_pending_and_submitted() {
        let mut manager = OrderManager::new();

        let pending = manager.create_order(buy_request()).unwrap();
        manager.cancel(pending.id, None).unwrap();
        assert_eq!(
            manager.get_order(pending.id).unwrap().status,
            OrderStatus::Cancelled
        );

        let submitted = manager.create_order(buy_request()).unwrap();
        manager.submit(submitted.id).unwrap();
        manager.cancel(submitted.id, Some("shutdown".to_string())).unwrap();
        assert_eq!(
            manager.get_order(submitted.id).unwrap().status,
            OrderStatus::Cancelled
        );
    }

    #[test]
    fn test_terminal_orders_reject_every_transition() {
        let mut manager = OrderManager::new();
        let order = manager.create_order(buy_request()).unwrap();
        manager.submit(order.id).unwrap();
        manager
            .fill(order.id, dec!(26_500), Decimal::ZERO, Decimal::ZERO)
            .unwrap();

        // A terminal order surfaces every further transition as an error
        assert!(matches!(
            manager.fill(order.id, dec!(26_500), Decimal::ZERO, Decimal::ZERO),
            Err(OrderManagerError::InvalidTransition(OrderStatus::Filled, _))
        ));
        assert!(matches!(
            manager.cancel(order.id, None),
            Err(OrderManagerError::InvalidTransition(OrderStatus::Filled, _))
        ));
        assert!(matches!(
            manager.reject(order.id, "late"),
            Err(OrderManagerError::InvalidTransition(OrderStatus::Filled, _))
        ));
        assert!(matches!(
            manager.submit(order.id),
            Err(OrderManagerError::InvalidTransition(OrderStatus::Filled, _))
        ));
    }

    #[test]
    fn test_unknown_order() {
        let mut manager = OrderManager::new();
        let result = manager.submit(Uuid::new_v4());
        assert!(matches!(result, Err(OrderManagerError::OrderNotFound(_))));
    }

    #[test]
    fn test_orders_by_ticker() {
        let mut manager = OrderManager::new();
        manager.create_order(buy_request()).unwrap();
        manager
            .create_order(OrderRequest::limit_sell("ACB", dec!(200), dec!(27_000)))
            .unwrap();
        manager
            .create_order(OrderRequest::limit_buy("VCB", dec!(100), dec!(92_500)))
            .unwrap();

        assert_eq!(manager.orders_for_ticker("ACB").len(), 2);
        assert_eq!(manager.orders_for_ticker("VCB").len(), 1);
        let sides: Vec<Side> = manager
            .orders_for_ticker("ACB")
            .iter()
            .map(|o| o.side)
            .collect();
        assert!(sides.contains(&Side::Buy) && sides.contains(&Side::Sell));
    }

    #[test]
    fn test_cleanup_old_orders() {
        use chrono::Duration;

        let mut manager = OrderManager::new();
        let order = manager.create_order(buy_request()).unwrap();
        manager.submit(order.id).unwrap();
        manager
            .fill(order.id, dec!(26_500), Decimal::ZERO, Decimal::ZERO)
            .unwrap();

        // Backdate the terminal order, then sweep
        manager
            .orders
            .get_mut(&order.id)
            .unwrap()
            .updated_at = Utc::now() - Duration::days(10);

        let active = manager.create_order(buy_request()).unwrap();
        manager.cleanup_old_orders(Utc::now() - Duration::days(5));

        assert_eq!(manager.total_orders(), 1);
        assert!(manager.get_order(active.id).is_some());
        assert!(manager.get_order(order.id).is_none());
    }
}
