//! Stub implementations for testing.
//!
//! These implementations simulate broker and market data behavior
//! without making real API calls.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::{PoisonError, RwLock};
use tokio::sync::mpsc;

use autoinvest_domain::{
    ActionDetails, MarketOrder, OrderId, OrderSide, Price, StopLimit, Symbol,
};

use crate::error::ExecError;
use crate::ports::{BrokerPort, MarketDataPort, OrderAck, PriceUpdate};

// =============================================================================
// Stub Broker
// =============================================================================

/// A fill produced by the stub broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StubFill {
    pub side: OrderSide,
    pub details: ActionDetails,
}

/// Stub broker for testing.
///
/// Stop orders rest until [`StubBroker::on_price`] sees a price that
/// crosses them and then fill at their stop price. Market orders fill
/// immediately at their price per unit. Fills queue up until drained.
pub struct StubBroker {
    /// Resting stop orders by tracking id
    open_orders: RwLock<BTreeMap<OrderId, StopLimit>>,
    /// Fills not yet delivered
    fills: RwLock<Vec<StubFill>>,
    /// Order counter for generating ids
    order_counter: RwLock<OrderId>,
    /// Whether to simulate failures
    fail_next: RwLock<bool>,
}

impl StubBroker {
    /// Create a new stub broker with no orders.
    pub fn new() -> Self {
        Self {
            open_orders: RwLock::new(BTreeMap::new()),
            fills: RwLock::new(Vec::new()),
            order_counter: RwLock::new(0),
            fail_next: RwLock::new(false),
        }
    }

    /// Configure the next operation to fail.
    pub fn set_fail_next(&self, fail: bool) {
        *self.fail_next.write().unwrap_or_else(PoisonError::into_inner) = fail;
    }

    /// Resting stop orders.
    pub fn open_orders(&self) -> Vec<StopLimit> {
        self.open_orders
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    /// Trigger every resting stop crossed by this price.
    ///
    /// Returns the number of orders filled.
    pub fn on_price(&self, symbol: &Symbol, price: Price) -> usize {
        let mut open = self.open_orders.write().unwrap_or_else(PoisonError::into_inner);
        let triggered: Vec<OrderId> = open
            .iter()
            .filter(|(_, order)| &order.symbol == symbol && Self::is_triggered(order, price))
            .map(|(id, _)| *id)
            .collect();

        let mut fills = self.fills.write().unwrap_or_else(PoisonError::into_inner);
        for id in &triggered {
            if let Some(order) = open.remove(id) {
                tracing::debug!(order_id = id, %price, stop = %order.stop_price, "Stub: stop triggered");
                fills.push(StubFill {
                    side: order.side,
                    details: ActionDetails::new(*id, order.symbol, order.stop_price, order.quantity),
                });
            }
        }

        triggered.len()
    }

    /// Take every fill produced so far.
    pub fn drain_fills(&self) -> Vec<StubFill> {
        std::mem::take(&mut *self.fills.write().unwrap_or_else(PoisonError::into_inner))
    }

    fn is_triggered(order: &StopLimit, price: Price) -> bool {
        match order.side {
            OrderSide::Sell => price <= order.stop_price,
            OrderSide::Buy => price >= order.stop_price,
        }
    }

    /// Generate a unique order id.
    fn next_order_id(&self) -> OrderId {
        let mut counter = self.order_counter.write().unwrap_or_else(PoisonError::into_inner);
        *counter += 1;
        *counter
    }

    /// Check if we should fail the next operation.
    fn should_fail(&self) -> bool {
        let mut fail_next = self.fail_next.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *fail_next, false)
    }
}

impl Default for StubBroker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BrokerPort for StubBroker {
    async fn place_stop_order(&self, order: &StopLimit) -> Result<OrderAck, ExecError> {
        if self.should_fail() {
            return Err(ExecError::OrderRejected("Simulated stop order rejection".to_string()));
        }

        let mut open = self.open_orders.write().unwrap_or_else(PoisonError::into_inner);

        // Same client id twice returns the original ack
        if let Some((id, existing)) =
            open.iter().find(|(_, o)| o.client_order_id == order.client_order_id)
        {
            return Ok(OrderAck {
                order_id: *id,
                client_order_id: Some(existing.client_order_id),
                symbol: existing.symbol.clone(),
                side: existing.side,
                accepted_at: Utc::now(),
            });
        }

        let order_id = self.next_order_id();
        let mut resting = order.clone();
        resting.order_id = Some(order_id);
        open.insert(order_id, resting);

        Ok(OrderAck {
            order_id,
            client_order_id: Some(order.client_order_id),
            symbol: order.symbol.clone(),
            side: order.side,
            accepted_at: Utc::now(),
        })
    }

    async fn place_market_order(&self, order: &MarketOrder) -> Result<OrderAck, ExecError> {
        if self.should_fail() {
            return Err(ExecError::OrderRejected("Simulated market order rejection".to_string()));
        }

        let order_id = self.next_order_id();
        self.fills.write().unwrap_or_else(PoisonError::into_inner).push(StubFill {
            side: order.side,
            details: ActionDetails::new(
                order_id,
                order.symbol.clone(),
                order.price_per_unit,
                order.quantity,
            ),
        });

        Ok(OrderAck {
            order_id,
            client_order_id: None,
            symbol: order.symbol.clone(),
            side: order.side,
            accepted_at: Utc::now(),
        })
    }

    async fn cancel_order(&self, _symbol: &Symbol, order_id: OrderId) -> Result<(), ExecError> {
        if self.should_fail() {
            return Err(ExecError::Broker("Simulated cancel failure".to_string()));
        }

        let removed = self
            .open_orders
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&order_id);

        match removed {
            Some(_) => {
                tracing::debug!(order_id, "Stub: order cancelled");
                Ok(())
            },
            None => Err(ExecError::UnknownOrder(order_id)),
        }
    }

    async fn health_check(&self) -> Result<(), ExecError> {
        if self.should_fail() {
            return Err(ExecError::Broker("Simulated health check failure".to_string()));
        }
        Ok(())
    }
}

// =============================================================================
// Stub Market Data
// =============================================================================

/// Stub market data provider for testing.
///
/// Allows manual price injection for testing scenarios.
pub struct StubMarketData {
    /// Current prices by symbol
    prices: RwLock<HashMap<Symbol, Price>>,
    /// Active subscriptions (symbol -> sender)
    subscriptions: RwLock<HashMap<Symbol, mpsc::Sender<PriceUpdate>>>,
}

impl StubMarketData {
    /// Create a new stub market data provider.
    pub fn new() -> Self {
        Self {
            prices: RwLock::new(HashMap::new()),
            subscriptions: RwLock::new(HashMap::new()),
        }
    }

    /// Set price and notify subscribers.
    ///
    /// Returns `false` when nobody is subscribed to the symbol.
    pub async fn set_price(&self, symbol: &Symbol, price: Price) -> bool {
        self.prices
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(symbol.clone(), price);

        // Clone the sender so no lock is held across the await
        let sender = self
            .subscriptions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(symbol)
            .cloned();

        match sender {
            Some(sender) => sender.send(PriceUpdate::now(symbol.clone(), price)).await.is_ok(),
            None => false,
        }
    }
}

impl Default for StubMarketData {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MarketDataPort for StubMarketData {
    async fn subscribe(&self, symbol: &Symbol) -> Result<mpsc::Receiver<PriceUpdate>, ExecError> {
        let (sender, receiver) = mpsc::channel(100);
        self.subscriptions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(symbol.clone(), sender);
        Ok(receiver)
    }

    async fn get_price(&self, symbol: &Symbol) -> Result<Price, ExecError> {
        self.prices
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(symbol)
            .copied()
            .ok_or_else(|| ExecError::MarketData(format!("No price for {}", symbol)))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use autoinvest_domain::Quantity;
    use rust_decimal_macros::dec;

    fn symbol() -> Symbol {
        Symbol::new("AAPL").unwrap()
    }

    fn stop(side: OrderSide, stop_price: rust_decimal::Decimal) -> StopLimit {
        StopLimit::new(
            symbol(),
            side,
            Quantity::new(dec!(10)).unwrap(),
            Price::new(stop_price).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_stop_order_gets_increasing_ids() {
        let broker = StubBroker::new();

        let first = broker.place_stop_order(&stop(OrderSide::Sell, dec!(107.8))).await.unwrap();
        let second = broker.place_stop_order(&stop(OrderSide::Buy, dec!(91.8))).await.unwrap();

        assert_eq!(first.order_id, 1);
        assert_eq!(second.order_id, 2);
        assert_eq!(broker.open_orders().len(), 2);
    }

    #[tokio::test]
    async fn test_resubmission_is_idempotent() {
        let broker = StubBroker::new();
        let order = stop(OrderSide::Sell, dec!(107.8));

        let first = broker.place_stop_order(&order).await.unwrap();
        let again = broker.place_stop_order(&order).await.unwrap();

        assert_eq!(first.order_id, again.order_id);
        assert_eq!(broker.open_orders().len(), 1);
    }

    #[tokio::test]
    async fn test_sell_stop_fills_when_price_drops_to_it() {
        let broker = StubBroker::new();
        let ack = broker.place_stop_order(&stop(OrderSide::Sell, dec!(107.8))).await.unwrap();

        assert_eq!(broker.on_price(&symbol(), Price::new(dec!(108)).unwrap()), 0);
        assert_eq!(broker.on_price(&symbol(), Price::new(dec!(107)).unwrap()), 1);

        let fills = broker.drain_fills();
        assert_eq!(fills.len(), 1);
        assert_eq!(fills[0].side, OrderSide::Sell);
        assert_eq!(fills[0].details.order_id, ack.order_id);
        assert_eq!(fills[0].details.price.as_decimal(), dec!(107.8));
        assert!(broker.open_orders().is_empty());
        assert!(broker.drain_fills().is_empty());
    }

    #[tokio::test]
    async fn test_buy_stop_fills_when_price_rises_to_it() {
        let broker = StubBroker::new();
        broker.place_stop_order(&stop(OrderSide::Buy, dec!(91.8))).await.unwrap();

        assert_eq!(broker.on_price(&symbol(), Price::new(dec!(91)).unwrap()), 0);
        assert_eq!(broker.on_price(&symbol(), Price::new(dec!(91.8)).unwrap()), 1);
    }

    #[tokio::test]
    async fn test_other_symbols_do_not_trigger() {
        let broker = StubBroker::new();
        broker.place_stop_order(&stop(OrderSide::Sell, dec!(107.8))).await.unwrap();

        let msft = Symbol::new("MSFT").unwrap();
        assert_eq!(broker.on_price(&msft, Price::new(dec!(1)).unwrap()), 0);
    }

    #[tokio::test]
    async fn test_market_order_fills_immediately() {
        let broker = StubBroker::new();
        let order = MarketOrder {
            symbol: symbol(),
            side: OrderSide::Buy,
            price_per_unit: Price::new(dec!(99)).unwrap(),
            quantity: Quantity::new(dec!(2)).unwrap(),
        };

        let ack = broker.place_market_order(&order).await.unwrap();
        let fills = broker.drain_fills();

        assert_eq!(fills.len(), 1);
        assert_eq!(fills[0].details.order_id, ack.order_id);
        assert_eq!(fills[0].details.value(), dec!(198));
    }

    #[tokio::test]
    async fn test_cancel_removes_order() {
        let broker = StubBroker::new();
        let ack = broker.place_stop_order(&stop(OrderSide::Sell, dec!(107.8))).await.unwrap();

        broker.cancel_order(&symbol(), ack.order_id).await.unwrap();
        assert!(broker.open_orders().is_empty());
        assert!(matches!(
            broker.cancel_order(&symbol(), ack.order_id).await,
            Err(ExecError::UnknownOrder(_))
        ));
    }

    #[tokio::test]
    async fn test_fail_next_only_fails_once() {
        let broker = StubBroker::new();
        broker.set_fail_next(true);

        assert!(broker.health_check().await.is_err());
        assert!(broker.health_check().await.is_ok());
    }

    #[tokio::test]
    async fn test_market_data_subscription() {
        let market_data = StubMarketData::new();
        let mut receiver = market_data.subscribe(&symbol()).await.unwrap();

        assert!(market_data.set_price(&symbol(), Price::new(dec!(101)).unwrap()).await);

        let update = receiver.recv().await.unwrap();
        assert_eq!(update.price.as_decimal(), dec!(101));
        assert_eq!(market_data.get_price(&symbol()).await.unwrap().as_decimal(), dec!(101));
    }

    #[tokio::test]
    async fn test_market_data_without_subscriber() {
        let market_data = StubMarketData::new();
        let msft = Symbol::new("MSFT").unwrap();

        assert!(market_data.get_price(&msft).await.is_err());
        assert!(!market_data.set_price(&msft, Price::new(dec!(1)).unwrap()).await);
    }
}
