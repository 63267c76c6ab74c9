//! Auto-Invest Execution Layer
//!
//! Carries engine decisions out against a broker.
//!
//! # Architecture
//!
//! ```text
//! Engine Decision → Executor → Broker → ActionResult → Engine
//! ```
//!
//! # Components
//!
//! - **Ports**: Traits defining interfaces for broker and market data
//! - **Executor**: Maps engine actions to broker operations
//! - **Stub**: Test implementations for development
//!
//! # Example
//!
//! ```rust,ignore
//! use autoinvest_exec::{Executor, StubBroker};
//! use std::sync::Arc;
//!
//! let broker = Arc::new(StubBroker::new());
//! let executor = Executor::new(broker);
//!
//! // Execute engine actions, then feed the results back to the engine
//! let results = executor.execute(actions).await?;
//! ```

#![warn(clippy::all)]

pub mod error;
pub mod executor;
pub mod ports;
pub mod stub;

// Re-exports for convenience
pub use error::{ExecError, ExecResult};
pub use executor::{ActionResult, Executor};
pub use ports::{BrokerPort, MarketDataPort, OrderAck, PriceUpdate};
pub use stub::{StubBroker, StubFill, StubMarketData};
