//! Broker port and the paper-trading fill simulator.
//!
//! Real trading and paper trading satisfy the same contract: an order
//! is placed and comes back acknowledged with a fill, or rejected, or
//! the collaborator fails (retryable on the next tick). The engine
//! never distinguishes the two implementations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quantum_core::{OrderRequest, OrderStatus, Price, QuantError, QuantResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use tracing::info;

/// Broker acknowledgement of a placed order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerAck {
    /// Broker-side order reference
    pub broker_ref: String,
    /// Execution price
    pub fill_price: Price,
    /// Execution timestamp
    pub executed_at: DateTime<Utc>,
}

/// Port to the broker/execution collaborator.
#[async_trait]
pub trait BrokerPort: Send + Sync {
    /// Places an order and returns the execution acknowledgement.
    ///
    /// An `Err` is a collaborator failure: the operation failed for
    /// this tick and may be retried; it is never a partial fill.
    async fn place_order(&self, request: &OrderRequest) -> QuantResult<BrokerAck>;

    /// Queries the broker-side status of a previously placed order.
    async fn fill_status(&self, broker_ref: &str) -> QuantResult<OrderStatus>;
}

/// Deterministic paper-trading broker.
///
/// Simulates an immediate full fill at the limit price, which keeps
/// simulation results reproducible. No market impact, no partial fills.
#[derive(Debug, Default)]
pub struct PaperBroker {
    counter: std::sync::atomic::AtomicU64,
    offline: AtomicBool,
    executed_refs: Mutex<HashSet<String>>,
}

impl PaperBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulates a broker outage (for failure-path tests and drills).
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }
}

#[async_trait]
impl BrokerPort for PaperBroker {
    async fn place_order(&self, request: &OrderRequest) -> QuantResult<BrokerAck> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(QuantError::Broker("paper broker offline".to_string()));
        }

        let seq = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        let ack = BrokerAck {
            broker_ref: format!("PAPER_{:06}", seq),
            fill_price: request.price,
            executed_at: Utc::now(),
        };

        info!(
            ticker = %request.ticker,
            side = %request.side,
            quantity = %request.quantity,
            price = %request.price,
            broker_ref = %ack.broker_ref,
            "paper fill"
        );

        self.executed_refs.lock().await.insert(ack.broker_ref.clone());

        Ok(ack)
    }

    async fn fill_status(&self, broker_ref: &str) -> QuantResult<OrderStatus> {
        let known = self.executed_refs.lock().await.contains(broker_ref);
        if known {
            Ok(OrderStatus::Filled)
        } else {
            Err(QuantError::NotFound(format!("broker ref {}", broker_ref)))
        }
    }
}
