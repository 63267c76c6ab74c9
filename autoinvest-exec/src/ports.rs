//! Execution layer port definitions.
//!
//! Ports define the interfaces for external services (broker, market data).
//! Adapters implement these ports for specific services (stub, a real
//! broker gateway, etc.).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use autoinvest_domain::{MarketOrder, OrderId, OrderSide, Price, StopLimit, Symbol};

use crate::error::ExecError;

// =============================================================================
// Broker Port
// =============================================================================

/// Port for broker operations (placing/cancelling orders).
///
/// Implementations:
/// - `StubBroker` - For testing (fills stops when the stub price crosses them)
#[async_trait]
pub trait BrokerPort: Send + Sync {
    /// Submit a stop order.
    ///
    /// # Returns
    ///
    /// `OrderAck` carrying the broker-assigned tracking id.
    async fn place_stop_order(&self, order: &StopLimit) -> Result<OrderAck, ExecError>;

    /// Submit an immediate-execution order.
    async fn place_market_order(&self, order: &MarketOrder) -> Result<OrderAck, ExecError>;

    /// Cancel an existing order.
    ///
    /// # Arguments
    ///
    /// * `symbol` - Instrument of the order
    /// * `order_id` - Broker tracking id to cancel
    async fn cancel_order(&self, symbol: &Symbol, order_id: OrderId) -> Result<(), ExecError>;

    /// Check if the broker is healthy/connected.
    async fn health_check(&self) -> Result<(), ExecError>;
}

/// Broker acknowledgement of a submitted order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderAck {
    /// Broker-assigned tracking id
    pub order_id: OrderId,
    /// Client-provided idempotency key, when the order carried one
    pub client_order_id: Option<Uuid>,
    pub symbol: Symbol,
    pub side: OrderSide,
    pub accepted_at: DateTime<Utc>,
}

// =============================================================================
// Market Data Port
// =============================================================================

/// Port for market data subscriptions.
///
/// Implementations:
/// - `StubMarketData` - For testing (manual price injection)
#[async_trait]
pub trait MarketDataPort: Send + Sync {
    /// Subscribe to price updates for a symbol.
    ///
    /// Returns a receiver that yields price updates.
    async fn subscribe(
        &self,
        symbol: &Symbol,
    ) -> Result<tokio::sync::mpsc::Receiver<PriceUpdate>, ExecError>;

    /// Get current snapshot price (without subscription).
    async fn get_price(&self, symbol: &Symbol) -> Result<Price, ExecError>;
}

/// Price update from market data feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceUpdate {
    pub symbol: Symbol,
    pub price: Price,
    pub timestamp: DateTime<Utc>,
}

impl PriceUpdate {
    /// Price update stamped with the current time.
    pub fn now(symbol: Symbol, price: Price) -> Self {
        Self {
            symbol,
            price,
            timestamp: Utc::now(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
