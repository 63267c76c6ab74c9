//! Engine error types.

use autoinvest_domain::{DomainError, Symbol};
use thiserror::Error;

/// Errors raised while driving a contract.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The driver asked for a state the contract must never reach.
    ///
    /// These are defects in the calling code. They are reported, never
    /// corrected automatically.
    #[error("Invariant violation for {symbol}: {reason}")]
    InvariantViolation { symbol: Symbol, reason: String },

    /// A contract for this symbol already has an owner
    #[error("Contract already registered: {0}")]
    AlreadyRegistered(Symbol),

    /// The task serializing a contract's events has stopped
    #[error("Contract driver unavailable: {0}")]
    DriverUnavailable(String),

    /// Domain error
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),
}

impl EngineError {
    pub(crate) fn invariant(symbol: &Symbol, reason: impl Into<String>) -> Self {
        EngineError::InvariantViolation {
            symbol: symbol.clone(),
            reason: reason.into(),
        }
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
