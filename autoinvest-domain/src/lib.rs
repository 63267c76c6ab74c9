//! Auto-Invest Domain Layer
//!
//! Pure domain logic with zero I/O dependencies.
//! Contains the contract state, its write capability, order descriptors,
//! and the price and sizing rules.

#![warn(clippy::all)]

// Public modules
pub mod contract;
pub mod orders;
pub mod sizing;
pub mod trailing;
pub mod value_objects;

// Re-export commonly used types
pub use contract::{
    Contract, ContractConfig, ContractEditor, ContractSnapshot, RiskParameters, TradingState,
};
pub use orders::{ActionDetails, MarketOrder, StopLimit};
pub use trailing::{BoundPosition, TriggerBounds};
pub use value_objects::{
    DomainError, Fraction, OrderId, OrderSide, Price, Quantity, RunState, Symbol,
};
