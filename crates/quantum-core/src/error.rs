//! Error types for the trading engine.

use thiserror::Error;

/// Core trading error.
#[derive(Debug, Error)]
pub enum QuantError {
    /// Configuration error
    #[error("config error: {0}")]
    Config(String),

    /// Market data collaborator error (price feed unreachable, stale)
    #[error("market data error: {0}")]
    Market(String),

    /// Broker collaborator error
    #[error("broker error: {0}")]
    Broker(String),

    /// Order error
    #[error("order error: {0}")]
    Order(String),

    /// Position error
    #[error("position error: {0}")]
    Position(String),

    /// Risk management error
    #[error("risk error: {0}")]
    Risk(String),

    /// Advisor evaluation error
    #[error("advisor error: {0}")]
    Advisor(String),

    /// Trading halted by the circuit breaker
    #[error("trading halted: {0}")]
    Halted(String),

    /// Insufficient funds
    #[error("insufficient funds: {0}")]
    InsufficientFunds(String),

    /// Invalid input
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Not found
    #[error("not found: {0}")]
    NotFound(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type for trading operations.
pub type QuantResult<T> = Result<T, QuantError>;

impl QuantError {
    /// Whether the failed operation may be retried on the next tick.
    ///
    /// Collaborator failures (market data, broker) are transient by
    /// contract: the affected operation fails for that tick only and is
    /// retried on the next one. It is never substituted with a price of
    /// zero or a default fill.
    pub fn is_retryable(&self) -> bool {
        matches!(self, QuantError::Market(_) | QuantError::Broker(_))
    }

    /// Whether the error should stop the engine rather than one operation.
    pub fn is_critical(&self) -> bool {
        matches!(
            self,
            QuantError::Halted(_) | QuantError::InsufficientFunds(_) | QuantError::Config(_)
        )
    }
}

impl From<serde_json::Error> for QuantError {
    fn from(err: serde_json::Error) -> Self {
        QuantError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_retryable() {
        let market_err = QuantError::Market("feed timeout".to_string());
        assert!(market_err.is_retryable());

        let order_err = QuantError::Order("invalid quantity".to_string());
        assert!(!order_err.is_retryable());
    }

    #[test]
    fn test_error_critical() {
        let halted = QuantError::Halted("daily loss limit".to_string());
        assert!(halted.is_critical());

        let advisor_err = QuantError::Advisor("evaluation failed".to_string());
        assert!(!advisor_err.is_critical());
    }
}
