//! Order and fill descriptors
//!
//! Plain data handed between the engine and the broker layer.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::value_objects::{OrderId, OrderSide, Price, Quantity, Symbol};

/// Stop order emitted when a trailing limit is hit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopLimit {
    /// Broker tracking number, `None` until the broker accepts the order
    pub order_id: Option<OrderId>,
    /// Idempotency key for submission (UUID v7)
    pub client_order_id: Uuid,
    pub symbol: Symbol,
    pub quantity: Quantity,
    pub stop_price: Price,
    pub side: OrderSide,
}

impl StopLimit {
    /// Create an unsubmitted stop order
    pub fn new(symbol: Symbol, side: OrderSide, quantity: Quantity, stop_price: Price) -> Self {
        Self {
            order_id: None,
            client_order_id: Uuid::now_v7(),
            symbol,
            quantity,
            stop_price,
            side,
        }
    }
}

/// Immediate-execution order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketOrder {
    pub symbol: Symbol,
    pub side: OrderSide,
    pub price_per_unit: Price,
    pub quantity: Quantity,
}

impl MarketOrder {
    /// Quantity × price per unit
    pub fn notional(&self) -> Decimal {
        self.quantity.as_decimal() * self.price_per_unit.as_decimal()
    }
}

/// Fill notification for a completed buy or sell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionDetails {
    /// Order that was filled
    pub order_id: OrderId,
    pub symbol: Symbol,
    /// Actual fill price
    pub price: Price,
    /// Actual filled quantity
    pub qty: Quantity,
    pub filled_at: DateTime<Utc>,
}

impl ActionDetails {
    /// Create fill details stamped with the current time
    pub fn new(order_id: OrderId, symbol: Symbol, price: Price, qty: Quantity) -> Self {
        Self {
            order_id,
            symbol,
            price,
            qty,
            filled_at: Utc::now(),
        }
    }

    /// Fill price × filled quantity
    pub fn value(&self) -> Decimal {
        self.price.as_decimal() * self.qty.as_decimal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_stop_limit_starts_unsubmitted() {
        let order = StopLimit::new(
            Symbol::new("aapl").unwrap(),
            OrderSide::Sell,
            Quantity::new(dec!(10)).unwrap(),
            Price::new(dec!(107.8)).unwrap(),
        );

        assert_eq!(order.order_id, None);
        assert_eq!(order.symbol.as_str(), "AAPL");
        assert_eq!(order.client_order_id.get_version_num(), 7);
    }

    #[test]
    fn test_market_order_notional() {
        let order = MarketOrder {
            symbol: Symbol::new("AAPL").unwrap(),
            side: OrderSide::Buy,
            price_per_unit: Price::new(dec!(12.5)).unwrap(),
            quantity: Quantity::new(dec!(4)).unwrap(),
        };

        assert_eq!(order.notional(), dec!(50));
    }

    #[test]
    fn test_action_details_serialization() {
        let details = ActionDetails::new(
            9,
            Symbol::new("AAPL").unwrap(),
            Price::new(dec!(95)).unwrap(),
            Quantity::new(dec!(2)).unwrap(),
        );

        let json = serde_json::to_string(&details).unwrap();
        let parsed: ActionDetails = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed, details);
        assert_eq!(parsed.value(), dec!(190));
    }
}
