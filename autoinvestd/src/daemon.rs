//! Daemon: Main runtime orchestrator.
//!
//! The Daemon ties together all components:
//! - Contract registry (one engine per symbol)
//! - Contract actors (serialized tick/fill processing)
//! - Market data (price updates)
//! - Stub broker (stop triggering and fills)
//!
//! # Lifecycle
//!
//! 1. Load configuration
//! 2. Register contracts and spawn one actor per symbol
//! 3. Subscribe to market data for every symbol
//! 4. Main event loop (prices in, fills back to actors)
//! 5. Graceful shutdown on SIGINT

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use autoinvest_domain::{Contract, OrderSide, Symbol};
use autoinvest_engine::{BuySellLogic, ContractRegistry};
use autoinvest_exec::{BrokerPort, Executor, MarketDataPort, PriceUpdate, StubBroker, StubMarketData};

use crate::actor::{ContractActor, ContractHandle};
use crate::config::Config;
use crate::error::{DaemonError, DaemonResult};

// =============================================================================
// Daemon
// =============================================================================

/// The main Auto-Invest daemon, wired to the in-memory broker and feed.
pub struct Daemon {
    /// Configuration
    config: Config,
    /// Broker shared by every actor
    broker: Arc<StubBroker>,
    /// Market data source
    market_data: Arc<StubMarketData>,
    /// Actor handles by symbol
    handles: BTreeMap<Symbol, ContractHandle>,
    /// Merged price updates of every subscription
    prices: mpsc::Receiver<PriceUpdate>,
    /// Actor and subscription tasks
    tasks: Vec<JoinHandle<()>>,
    /// Stops every task on shutdown
    cancel_token: CancellationToken,
}

impl Daemon {
    /// Register the configured contracts and start their actors.
    ///
    /// # Errors
    ///
    /// Fails on an invalid contract configuration, a symbol configured
    /// twice, or an unhealthy broker.
    pub async fn start(
        config: Config,
        broker: Arc<StubBroker>,
        market_data: Arc<StubMarketData>,
    ) -> DaemonResult<Self> {
        broker.health_check().await?;

        let mut registry = ContractRegistry::new();
        for contract_config in &config.contracts {
            registry.register(Contract::new(contract_config.clone())?)?;
        }
        if registry.is_empty() {
            warn!("No contracts configured");
        } else {
            let symbols: Vec<&str> = registry.symbols().map(Symbol::as_str).collect();
            info!(?symbols, "Contracts loaded");
        }

        let cancel_token = CancellationToken::new();
        let (price_sender, prices) = mpsc::channel(config.runtime.channel_capacity);
        let mut handles = BTreeMap::new();
        let mut tasks = Vec::new();

        for engine in registry.into_engines() {
            let symbol = engine.symbol().clone();
            let (handle, task) = ContractActor::spawn(
                engine,
                Executor::new(broker.clone()),
                config.runtime.channel_capacity,
                cancel_token.child_token(),
            );
            tasks.push(task);

            let subscription = market_data.subscribe(&symbol).await?;
            tasks.push(Self::forward_prices(
                subscription,
                price_sender.clone(),
                cancel_token.child_token(),
            ));

            handles.insert(symbol, handle);
        }

        info!(contracts = handles.len(), "Contract actors started");

        Ok(Self {
            config,
            broker,
            market_data,
            handles,
            prices,
            tasks,
            cancel_token,
        })
    }

    /// Start with fresh stub components (for testing/development).
    pub async fn start_stub(config: Config) -> DaemonResult<Self> {
        Self::start(config, Arc::new(StubBroker::new()), Arc::new(StubMarketData::new())).await
    }

    /// Handle of the actor driving a symbol.
    pub fn handle(&self, symbol: &Symbol) -> DaemonResult<&ContractHandle> {
        self.handles
            .get(symbol)
            .ok_or_else(|| DaemonError::UnknownContract(symbol.clone()))
    }

    /// Registered symbols in order.
    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.handles.keys()
    }

    pub fn broker(&self) -> &Arc<StubBroker> {
        &self.broker
    }

    pub fn market_data(&self) -> &Arc<StubMarketData> {
        &self.market_data
    }

    /// Run the daemon.
    ///
    /// This method blocks until shutdown is requested (SIGINT).
    pub async fn run(mut self) -> DaemonResult<()> {
        info!(
            version = env!("CARGO_PKG_VERSION"),
            environment = %self.config.environment,
            "Starting Auto-Invest daemon"
        );

        if let Some(price) = self.config.runtime.stub_price {
            for symbol in self.handles.keys() {
                self.market_data.set_price(symbol, price).await;
            }
        }

        info!("Entering main event loop");
        loop {
            tokio::select! {
                update = self.prices.recv() => {
                    match update {
                        Some(update) => {
                            if let Err(e) = self.on_price(update).await {
                                error!(error = %e, "Error handling price update");
                            }
                        }
                        None => {
                            warn!("Market data closed");
                            break;
                        }
                    }
                }

                // Handle shutdown signals
                _ = tokio::signal::ctrl_c() => {
                    info!("Received shutdown signal");
                    break;
                }
            }
        }

        self.shutdown().await;
        Ok(())
    }

    /// Route a price update: tick the contract, then trigger crossed stops.
    ///
    /// Returns the number of fills delivered.
    pub async fn on_price(&self, update: PriceUpdate) -> DaemonResult<usize> {
        debug!(symbol = %update.symbol, price = %update.price, "Price update");

        self.handle(&update.symbol)?.tick(update.price).await?;
        self.broker.on_price(&update.symbol, update.price);
        self.deliver_fills().await
    }

    /// Hand every pending broker fill to the owning actor.
    ///
    /// Fills the engine refuses, or for a symbol with no contract, are
    /// logged and dropped; the rest of the batch is still delivered.
    pub async fn deliver_fills(&self) -> DaemonResult<usize> {
        let fills = self.broker.drain_fills();
        let count = fills.len();

        for fill in fills {
            let order_id = fill.details.order_id;
            let Some(handle) = self.handles.get(&fill.details.symbol) else {
                error!(symbol = %fill.details.symbol, order_id, "Fill for unknown contract dropped");
                continue;
            };

            let result = match fill.side {
                OrderSide::Buy => handle.buy_action_complete(fill.details).await,
                OrderSide::Sell => handle.sell_action_complete(fill.details).await,
            };

            if let Err(e) = result {
                error!(symbol = %handle.symbol(), order_id, error = %e, "Fill not applied");
            }
        }

        Ok(count)
    }

    /// Stop every actor and subscription.
    pub async fn shutdown(self) {
        info!("Shutting down");
        self.cancel_token.cancel();

        for task in self.tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "Task ended abnormally");
            }
        }

        info!("Daemon stopped");
    }

    fn forward_prices(
        mut subscription: mpsc::Receiver<PriceUpdate>,
        sender: mpsc::Sender<PriceUpdate>,
        cancel_token: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    update = subscription.recv() => {
                        let Some(update) = update else { break };
                        if sender.send(update).await.is_err() {
                            break;
                        }
                    }
                    _ = cancel_token.cancelled() => break,
                }
            }
        })
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use autoinvest_domain::{ContractConfig, MarketOrder, Price, Quantity};
    use autoinvest_engine::EngineError;
    use rust_decimal_macros::dec;

    fn config() -> Config {
        Config::test().with_contracts(vec![
            ContractConfig::new("aapl", dec!(1000), dec!(0.02), dec!(0.05)),
            ContractConfig::new("msft", dec!(500), dec!(0.01), dec!(0.1)),
        ])
    }

    #[tokio::test]
    async fn test_start_spawns_one_actor_per_contract() {
        let daemon = Daemon::start_stub(config()).await.unwrap();

        assert_eq!(
            daemon.symbols().map(Symbol::as_str).collect::<Vec<_>>(),
            vec!["AAPL", "MSFT"]
        );
        daemon.shutdown().await;
    }

    #[tokio::test]
    async fn test_duplicate_symbol_fails_start() {
        let config = Config::test().with_contracts(vec![
            ContractConfig::new("aapl", dec!(1000), dec!(0.02), dec!(0.05)),
            ContractConfig::new("AAPL", dec!(1000), dec!(0.02), dec!(0.05)),
        ]);

        assert!(matches!(
            Daemon::start_stub(config).await,
            Err(DaemonError::Engine(EngineError::AlreadyRegistered(_)))
        ));
    }

    #[tokio::test]
    async fn test_invalid_contract_fails_start() {
        let config = Config::test()
            .with_contracts(vec![ContractConfig::new("aapl", dec!(0), dec!(0.02), dec!(0.05))]);

        assert!(matches!(Daemon::start_stub(config).await, Err(DaemonError::Domain(_))));
    }

    #[tokio::test]
    async fn test_price_for_unknown_symbol() {
        let daemon = Daemon::start_stub(config()).await.unwrap();
        let update = PriceUpdate::now(Symbol::new("TSLA").unwrap(), Price::new(dec!(1)).unwrap());

        assert!(matches!(
            daemon.on_price(update).await,
            Err(DaemonError::UnknownContract(_))
        ));
        daemon.shutdown().await;
    }

    #[tokio::test]
    async fn test_unknown_fill_does_not_drop_batch() {
        let daemon = Daemon::start_stub(config()).await.unwrap();
        let aapl = Symbol::new("AAPL").unwrap();
        daemon
            .on_price(PriceUpdate::now(aapl.clone(), Price::new(dec!(100)).unwrap()))
            .await
            .unwrap();

        let foreign = MarketOrder {
            symbol: Symbol::new("TSLA").unwrap(),
            side: OrderSide::Buy,
            price_per_unit: Price::new(dec!(10)).unwrap(),
            quantity: Quantity::new(dec!(1)).unwrap(),
        };
        daemon.broker().place_market_order(&foreign).await.unwrap();

        let handle = daemon.handle(&aapl).unwrap();
        handle.market_order(OrderSide::Buy, Price::new(dec!(100)).unwrap()).await.unwrap();

        assert_eq!(daemon.deliver_fills().await.unwrap(), 2);

        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.state.quantity, dec!(10));
        assert_eq!(snapshot.state.buy_order_id, None);
        daemon.shutdown().await;
    }

    #[tokio::test]
    async fn test_unhealthy_broker_fails_start() {
        let broker = Arc::new(StubBroker::new());
        broker.set_fail_next(true);

        let result = Daemon::start(config(), broker, Arc::new(StubMarketData::new())).await;
        assert!(matches!(result, Err(DaemonError::Exec(_))));
    }
}
