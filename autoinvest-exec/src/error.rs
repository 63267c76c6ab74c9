//! Execution layer error types.

use autoinvest_domain::OrderId;
use thiserror::Error;

/// Errors that can occur during broker operations.
#[derive(Debug, Error)]
pub enum ExecError {
    /// Broker communication error
    #[error("Broker error: {0}")]
    Broker(String),

    /// Order was rejected by the broker
    #[error("Order rejected: {0}")]
    OrderRejected(String),

    /// Broker does not know the order
    #[error("Unknown order: {0}")]
    UnknownOrder(OrderId),

    /// No subscription or price for the symbol
    #[error("Market data error: {0}")]
    MarketData(String),

    /// Domain error
    #[error("Domain error: {0}")]
    Domain(#[from] autoinvest_domain::DomainError),

    /// Engine error
    #[error("Engine error: {0}")]
    Engine(#[from] autoinvest_engine::EngineError),
}

/// Result type for execution operations.
pub type ExecResult<T> = Result<T, ExecError>;
