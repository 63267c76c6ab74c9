//! Daemon configuration.
//!
//! Loads configuration from environment variables with sensible defaults.

use crate::error::{DaemonError, DaemonResult};
use autoinvest_domain::{ContractConfig, Price};
use rust_decimal::Decimal;
use std::env;
use std::path::Path;
use std::str::FromStr;

// =============================================================================
// Configuration
// =============================================================================

/// Daemon configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Runtime configuration
    pub runtime: RuntimeConfig,

    /// Contracts to register at startup
    pub contracts: Vec<ContractConfig>,

    /// Environment (test, development, production)
    pub environment: Environment,
}

/// Runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Mailbox size of each contract actor
    pub channel_capacity: usize,
    /// Price published for every contract on startup (stub market data only)
    pub stub_price: Option<Price>,
}

/// Environment type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    /// Test environment (uses stubs)
    Test,
    /// Development environment
    Development,
    /// Production environment
    Production,
}

const DEFAULT_CHANNEL_CAPACITY: usize = 256;

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> DaemonResult<Self> {
        // Load .env file if present (ignore errors)
        let _ = dotenvy::dotenv();

        let environment = Self::load_environment()?;
        let runtime = Self::load_runtime_config()?;
        let contracts = match env::var("AUTOINVEST_CONTRACTS_FILE") {
            Ok(path) => load_contracts(Path::new(&path))?,
            Err(_) => Vec::new(),
        };

        Ok(Self {
            runtime,
            contracts,
            environment,
        })
    }

    /// Create test configuration.
    pub fn test() -> Self {
        Self {
            runtime: RuntimeConfig {
                channel_capacity: 16,
                stub_price: None, // Tests drive prices themselves
            },
            contracts: Vec::new(),
            environment: Environment::Test,
        }
    }

    /// Replace the contract list.
    pub fn with_contracts(mut self, contracts: Vec<ContractConfig>) -> Self {
        self.contracts = contracts;
        self
    }

    fn load_environment() -> DaemonResult<Environment> {
        let env_str = env::var("AUTOINVEST_ENV").unwrap_or_else(|_| "development".to_string());

        match env_str.to_lowercase().as_str() {
            "test" => Ok(Environment::Test),
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(DaemonError::Config(format!(
                "Invalid AUTOINVEST_ENV: {}. Expected: test, development, production",
                other
            ))),
        }
    }

    fn load_runtime_config() -> DaemonResult<RuntimeConfig> {
        let capacity_str = env::var("AUTOINVEST_CHANNEL_CAPACITY")
            .unwrap_or_else(|_| DEFAULT_CHANNEL_CAPACITY.to_string());

        let channel_capacity = capacity_str
            .parse::<usize>()
            .ok()
            .filter(|capacity| *capacity > 0)
            .ok_or_else(|| {
                DaemonError::Config(format!("Invalid AUTOINVEST_CHANNEL_CAPACITY: {}", capacity_str))
            })?;

        let stub_price = Self::load_decimal_env("AUTOINVEST_STUB_PRICE", Decimal::ONE_HUNDRED)?;
        let stub_price = Price::new(stub_price).map_err(|e| {
            DaemonError::Config(format!("Invalid AUTOINVEST_STUB_PRICE: {}", e))
        })?;

        Ok(RuntimeConfig {
            channel_capacity,
            stub_price: Some(stub_price),
        })
    }

    fn load_decimal_env(key: &str, default: Decimal) -> DaemonResult<Decimal> {
        match env::var(key) {
            Ok(val) => Decimal::from_str(&val)
                .map_err(|_| DaemonError::Config(format!("Invalid {} value: {}", key, val))),
            Err(_) => Ok(default),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            runtime: RuntimeConfig {
                channel_capacity: DEFAULT_CHANNEL_CAPACITY,
                stub_price: Price::new(Decimal::ONE_HUNDRED).ok(),
            },
            contracts: Vec::new(),
            environment: Environment::Development,
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Test => write!(f, "test"),
            Environment::Development => write!(f, "development"),
            Environment::Production => write!(f, "production"),
        }
    }
}

// =============================================================================
// Contracts file
// =============================================================================

/// Read a JSON array of contract configurations.
pub fn load_contracts(path: &Path) -> DaemonResult<Vec<ContractConfig>> {
    let json = std::fs::read_to_string(path).map_err(|e| {
        DaemonError::Config(format!("Failed to read contracts file {}: {}", path.display(), e))
    })?;
    parse_contracts(&json)
}

/// Parse a JSON array of contract configurations.
///
/// Optional fractions may be omitted and default to 1.
pub fn parse_contracts(json: &str) -> DaemonResult<Vec<ContractConfig>> {
    serde_json::from_str(json)
        .map_err(|e| DaemonError::Config(format!("Invalid contracts file: {}", e)))
}

// =============================================================================
// Tests
// =============================================================================
