//! Auto-Invest Daemon Library
//!
//! Runtime orchestrator for the trailing-stop rebalancing contracts.
//!
//! # Architecture
//!
//! ```text
//! Market Data → Daemon → ContractHandle → ContractActor → Engine → Executor → Broker
//!                  ↑                                                            │
//!                  └──────────────────────── fills ◀────────────────────────────┘
//! ```
//!
//! # Components
//!
//! - **Daemon**: Main runtime orchestrator
//! - **Actor**: One task per contract, owning its engine
//! - **Config**: Environment-based configuration
//!
//! # Example
//!
//! ```rust,ignore
//! use autoinvestd::{Config, Daemon};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let daemon = Daemon::start_stub(config).await?;
//!     daemon.run().await?;
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]

pub mod actor;
pub mod config;
pub mod daemon;
pub mod error;

// Re-exports for convenience
pub use actor::{ContractActor, ContractHandle};
pub use config::{Config, Environment, RuntimeConfig};
pub use daemon::Daemon;
pub use error::{DaemonError, DaemonResult};
