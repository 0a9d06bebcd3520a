//! Order types and lifecycle states.
//!
//! This module defines the order-related types of the trading engine:
//! - `Side` - order direction (buy/sell)
//! - `OrderStatus` - lifecycle state
//! - `OrderRequest` - a proposed order before tracking begins
//! - `Order` - the tracked order entity

use crate::types::{Price, Quantity};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Order direction (buy or sell).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Buy
    Buy,
    /// Sell
    Sell,
}

impl Side {
    /// Returns the opposite direction.
    pub fn opposite(&self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// Order lifecycle state.
///
/// Valid transitions: `Pending -> Submitted -> {Filled, Rejected, Cancelled}`,
/// plus `Pending -> Rejected` (risk rejection before submission) and
/// `Pending -> Cancelled`. Filled, Rejected and Cancelled are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Order created, not yet submitted
    Pending,
    /// Order submitted to the broker
    Submitted,
    /// Order fully filled
    Filled,
    /// Order rejected (risk gate or broker)
    Rejected,
    /// Order cancelled
    Cancelled,
}

impl OrderStatus {
    /// Whether the order has reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Filled | OrderStatus::Rejected | OrderStatus::Cancelled
        )
    }

    /// Whether the order is still active.
    pub fn is_active(&self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::Submitted)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatus::Pending => write!(f, "PENDING"),
            OrderStatus::Submitted => write!(f, "SUBMITTED"),
            OrderStatus::Filled => write!(f, "FILLED"),
            OrderStatus::Rejected => write!(f, "REJECTED"),
            OrderStatus::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// A proposed order, before the order manager starts tracking it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRequest {
    /// Trading ticker (e.g. "ACB", "VCB")
    pub ticker: String,
    /// Order direction
    pub side: Side,
    /// Quantity in shares (must be a positive lot-size multiple)
    pub quantity: Quantity,
    /// Requested limit price
    pub price: Price,
    /// Reference price used for band checks, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_price: Option<Price>,
    /// Origin of the order (consensus entry, scheduler exit, liquidation)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
}

impl OrderRequest {
    /// Creates a limit buy request.
    pub fn limit_buy(ticker: impl Into<String>, quantity: Quantity, price: Price) -> Self {
        Self {
            ticker: ticker.into(),
            side: Side::Buy,
            quantity,
            price,
            reference_price: None,
            origin: None,
        }
    }

    /// Creates a limit sell request.
    pub fn limit_sell(ticker: impl Into<String>, quantity: Quantity, price: Price) -> Self {
        Self {
            ticker: ticker.into(),
            side: Side::Sell,
            quantity,
            price,
            reference_price: None,
            origin: None,
        }
    }

    /// Sets the reference price for ceiling/floor validation.
    pub fn with_reference_price(mut self, reference: Price) -> Self {
        self.reference_price = Some(reference);
        self
    }

    /// Tags the request with its origin.
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// Notional value of the request.
    pub fn notional_value(&self) -> Decimal {
        self.price * self.quantity
    }
}

/// A tracked order entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// Internal order ID
    pub id: Uuid,
    /// Trading ticker
    pub ticker: String,
    /// Order direction
    pub side: Side,
    /// Requested quantity
    pub quantity: Quantity,
    /// Requested limit price
    pub price: Price,
    /// Current lifecycle state
    pub status: OrderStatus,
    /// Fill price once filled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill_price: Option<Price>,
    /// Commission charged on fill
    pub commission: Decimal,
    /// Selling tax charged on fill (sell orders only)
    pub tax: Decimal,
    /// Rejection reason, when rejected
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reject_reason: Option<String>,
    /// Origin of the order
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Creates a new order from a request, in the `Pending` state.
    pub fn from_request(request: OrderRequest) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            ticker: request.ticker,
            side: request.side,
            quantity: request.quantity,
            price: request.price,
            status: OrderStatus::Pending,
            fill_price: None,
            commission: Decimal::ZERO,
            tax: Decimal::ZERO,
            reject_reason: None,
            origin: request.origin,
            created_at: now,
            updated_at: now,
        }
    }

    /// Notional value at the requested price.
    pub fn notional_value(&self) -> Decimal {
        self.price * self.quantity
    }

    /// Notional value at the fill price, when filled.
    pub fn filled_notional(&self) -> Option<Decimal> {
        self.fill_price.map(|p| p * self.quantity)
    }

    /// Whether the order is still active.
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }
}
