//! Daemon error types.

use autoinvest_domain::{DomainError, OrderId, Symbol};
use autoinvest_engine::EngineError;
use autoinvest_exec::ExecError;
use thiserror::Error;

/// Daemon-level errors.
#[derive(Debug, Error)]
pub enum DaemonError {
    /// Domain error
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    /// Engine error
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// Execution error
    #[error("Execution error: {0}")]
    Exec(#[from] ExecError),

    /// No actor is running for the symbol
    #[error("Unknown contract: {0}")]
    UnknownContract(Symbol),

    /// The actor owning the contract has stopped
    #[error("Contract actor stopped: {0}")]
    ActorStopped(Symbol),

    /// A manual order was requested while another order is outstanding
    #[error("Order {order_id} outstanding for {symbol}")]
    OrderOutstanding { symbol: Symbol, order_id: OrderId },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for daemon operations.
pub type DaemonResult<T> = Result<T, DaemonError>;
