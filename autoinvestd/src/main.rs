//! Auto-Invest Daemon
//!
//! Runtime orchestrator for contracts, engine and execution.
//!
//! # Usage
//!
//! ```bash
//! # Start with default configuration
//! cargo run -p autoinvestd
//!
//! # Start with a contracts file
//! AUTOINVEST_CONTRACTS_FILE=contracts.json cargo run -p autoinvestd
//! ```
//!
//! # Environment Variables
//!
//! - `AUTOINVEST_ENV`: Environment (test, development, production)
//! - `AUTOINVEST_CHANNEL_CAPACITY`: Actor mailbox size (default: 256)
//! - `AUTOINVEST_CONTRACTS_FILE`: JSON array of contract configurations
//! - `AUTOINVEST_STUB_PRICE`: Price published on startup (default: 100)

use autoinvestd::{Config, Daemon};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("autoinvestd=info".parse()?))
        .init();

    // Load configuration
    let config = Config::from_env()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = %config.environment,
        contracts = config.contracts.len(),
        channel_capacity = config.runtime.channel_capacity,
        "Auto-Invest Daemon"
    );

    // Create and run daemon
    let daemon = Daemon::start_stub(config).await?;
    daemon.run().await?;

    Ok(())
}
