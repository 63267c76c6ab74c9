//! Executor: carries engine decisions out against the broker.
//!
//! The Executor is the bridge between the pure Engine (decisions) and
//! the impure broker (I/O). It never writes to a contract itself: the
//! results it returns are fed back to the engine by the caller.
//!
//! # Flow
//!
//! ```text
//! Engine Decision → Executor → Broker → ActionResult → Engine
//! ```

use std::sync::Arc;
use tracing::{debug, info, warn};

use autoinvest_domain::{MarketOrder, OrderId, OrderSide, StopLimit, Symbol};
use autoinvest_engine::EngineAction;

use crate::error::ExecResult;
use crate::ports::{BrokerPort, OrderAck};

// =============================================================================
// Execution Result
// =============================================================================

/// Result of executing an engine action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionResult {
    /// Broker accepted a stop order
    OrderPlaced { side: OrderSide, order_id: OrderId },
    /// Broker refused a stop order
    Rejected { side: OrderSide, reason: String },
    /// Order cancelled at the broker
    OrderCancelled { side: OrderSide, order_id: OrderId },
    /// Broker could not cancel; the order may still fill
    CancelFailed {
        side: OrderSide,
        order_id: OrderId,
        reason: String,
    },
    /// Audit-only action (no broker interaction)
    Recorded,
}

// =============================================================================
// Executor
// =============================================================================

/// Executes engine actions against a broker.
pub struct Executor<B: BrokerPort> {
    broker: Arc<B>,
}

impl<B: BrokerPort> Executor<B> {
    /// Create a new executor.
    pub fn new(broker: Arc<B>) -> Self {
        Self { broker }
    }

    /// Execute a list of engine actions.
    ///
    /// Actions are executed in order. A refused stop order becomes
    /// [`ActionResult::Rejected`] and a refused cancel becomes
    /// [`ActionResult::CancelFailed`].
    pub async fn execute(&self, actions: Vec<EngineAction>) -> ExecResult<Vec<ActionResult>> {
        let mut results = Vec::with_capacity(actions.len());

        for action in actions {
            let result = self.execute_action(action).await?;
            results.push(result);
        }

        Ok(results)
    }

    /// Execute a single engine action.
    async fn execute_action(&self, action: EngineAction) -> ExecResult<ActionResult> {
        match action {
            EngineAction::PlaceStopOrder(order) => Ok(self.place_stop_order(&order).await),

            EngineAction::CancelOrder { symbol, side, order_id } => {
                Ok(self.cancel_order(&symbol, side, order_id).await)
            },

            EngineAction::UpdateTrailingLimit {
                symbol,
                side,
                previous,
                new,
                trigger_price,
            } => {
                debug!(
                    %symbol,
                    %side,
                    %previous,
                    %new,
                    trigger = %trigger_price,
                    "Trailing limit updated"
                );
                Ok(ActionResult::Recorded)
            },

            EngineAction::RunStateChanged { symbol, previous, new } => {
                debug!(%symbol, %previous, %new, "Run state changed");
                Ok(ActionResult::Recorded)
            },
        }
    }

    async fn place_stop_order(&self, order: &StopLimit) -> ActionResult {
        info!(
            symbol = %order.symbol,
            side = %order.side,
            stop = %order.stop_price,
            quantity = %order.quantity,
            client_order_id = %order.client_order_id,
            "Placing stop order"
        );

        match self.broker.place_stop_order(order).await {
            Ok(ack) => {
                info!(symbol = %ack.symbol, side = %ack.side, order_id = ack.order_id, "Stop order accepted");
                ActionResult::OrderPlaced {
                    side: order.side,
                    order_id: ack.order_id,
                }
            },
            Err(e) => {
                warn!(symbol = %order.symbol, side = %order.side, error = %e, "Stop order rejected");
                ActionResult::Rejected {
                    side: order.side,
                    reason: e.to_string(),
                }
            },
        }
    }

    async fn cancel_order(&self, symbol: &Symbol, side: OrderSide, order_id: OrderId) -> ActionResult {
        info!(%symbol, %side, order_id, "Cancelling order");

        match self.broker.cancel_order(symbol, order_id).await {
            Ok(()) => ActionResult::OrderCancelled { side, order_id },
            Err(e) => {
                warn!(%symbol, %side, order_id, error = %e, "Cancel failed");
                ActionResult::CancelFailed {
                    side,
                    order_id,
                    reason: e.to_string(),
                }
            },
        }
    }

    /// Submit an immediate-execution order.
    pub async fn execute_market_order(&self, order: &MarketOrder) -> ExecResult<OrderAck> {
        info!(
            symbol = %order.symbol,
            side = %order.side,
            price = %order.price_per_unit,
            quantity = %order.quantity,
            "Placing market order"
        );

        self.broker.place_market_order(order).await.map_err(|e| {
            warn!(symbol = %order.symbol, error = %e, "Market order failed");
            e
        })
    }

    /// Broker connectivity check.
    pub async fn health_check(&self) -> ExecResult<()> {
        self.broker.health_check().await
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExecError;
    use crate::stub::StubBroker;
    use autoinvest_domain::{Price, Quantity, RunState};
    use rust_decimal_macros::dec;

    fn symbol() -> Symbol {
        Symbol::new("AAPL").unwrap()
    }

    fn stop_action() -> EngineAction {
        EngineAction::PlaceStopOrder(StopLimit::new(
            symbol(),
            OrderSide::Sell,
            Quantity::new(dec!(10)).unwrap(),
            Price::new(dec!(107.8)).unwrap(),
        ))
    }

    #[tokio::test]
    async fn test_stop_order_placed() {
        let broker = Arc::new(StubBroker::new());
        let executor = Executor::new(broker.clone());

        let results = executor.execute(vec![stop_action()]).await.unwrap();

        assert_eq!(
            results,
            vec![ActionResult::OrderPlaced {
                side: OrderSide::Sell,
                order_id: 1
            }]
        );
        assert_eq!(broker.open_orders().len(), 1);
    }

    #[tokio::test]
    async fn test_rejection_is_a_result_not_an_error() {
        let broker = Arc::new(StubBroker::new());
        broker.set_fail_next(true);
        let executor = Executor::new(broker.clone());

        let results = executor.execute(vec![stop_action()]).await.unwrap();

        assert!(matches!(
            results[0],
            ActionResult::Rejected { side: OrderSide::Sell, .. }
        ));
        assert!(broker.open_orders().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_and_audit_actions() {
        let broker = Arc::new(StubBroker::new());
        let executor = Executor::new(broker.clone());
        executor.execute(vec![stop_action()]).await.unwrap();

        let results = executor
            .execute(vec![
                EngineAction::CancelOrder {
                    symbol: symbol(),
                    side: OrderSide::Sell,
                    order_id: 1,
                },
                EngineAction::RunStateChanged {
                    symbol: symbol(),
                    previous: RunState::TrailingSell,
                    new: RunState::Waiting,
                },
            ])
            .await
            .unwrap();

        assert_eq!(
            results,
            vec![
                ActionResult::OrderCancelled {
                    side: OrderSide::Sell,
                    order_id: 1
                },
                ActionResult::Recorded
            ]
        );
        assert!(broker.open_orders().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_of_unknown_order_fails() {
        let executor = Executor::new(Arc::new(StubBroker::new()));

        let results = executor
            .execute(vec![EngineAction::CancelOrder {
                symbol: symbol(),
                side: OrderSide::Buy,
                order_id: 42,
            }])
            .await
            .unwrap();

        assert_eq!(
            results,
            vec![ActionResult::CancelFailed {
                side: OrderSide::Buy,
                order_id: 42,
                reason: ExecError::UnknownOrder(42).to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_failed_cancel_leaves_order_open() {
        let broker = Arc::new(StubBroker::new());
        let executor = Executor::new(broker.clone());
        executor.execute(vec![stop_action()]).await.unwrap();
        broker.set_fail_next(true);

        let results = executor
            .execute(vec![EngineAction::CancelOrder {
                symbol: symbol(),
                side: OrderSide::Sell,
                order_id: 1,
            }])
            .await
            .unwrap();

        assert!(matches!(
            results[0],
            ActionResult::CancelFailed { side: OrderSide::Sell, order_id: 1, .. }
        ));
        assert_eq!(broker.open_orders().len(), 1);
    }

    #[tokio::test]
    async fn test_market_order() {
        let broker = Arc::new(StubBroker::new());
        let executor = Executor::new(broker.clone());
        let order = MarketOrder {
            symbol: symbol(),
            side: OrderSide::Buy,
            price_per_unit: Price::new(dec!(50)).unwrap(),
            quantity: Quantity::new(dec!(4)).unwrap(),
        };

        let ack = executor.execute_market_order(&order).await.unwrap();

        assert_eq!(ack.side, OrderSide::Buy);
        assert_eq!(broker.drain_fills().len(), 1);
    }
}
