//! Auto-Invest Engine Layer
//!
//! Pure decision logic, deterministic, no I/O.
//! Takes ticks and fills → returns actions to execute.
//!
//! # Components
//!
//! - **Engine**: owns one contract's write capability and decides its moves
//! - **Registry**: hands each contract to exactly one engine
//! - **BuySellLogic**: callback surface for completed orders

#![warn(clippy::all)]

pub mod engine;
pub mod error;
pub mod logic;
pub mod registry;

pub use engine::{Engine, EngineAction};
pub use error::{EngineError, EngineResult};
pub use logic::BuySellLogic;
pub use registry::ContractRegistry;
