//! Per-contract actor task.
//!
//! Each registered contract is driven by exactly one actor. The actor owns
//! the contract's [`Engine`] (and therefore its write capability) and
//! processes commands from a bounded mailbox one at a time, so tick
//! evaluation and fill application never interleave.
//!
//! ```text
//! ContractHandle ──mpsc──▶ ContractActor ──▶ Engine ──▶ Executor ──▶ Broker
//!        ▲                                                              │
//!        └──────────────────── BuySellLogic (fills) ◀──────────────────┘
//! ```

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use autoinvest_domain::{ActionDetails, ContractSnapshot, OrderSide, Price, Symbol};
use autoinvest_engine::{BuySellLogic, Engine, EngineAction, EngineError, EngineResult};
use autoinvest_exec::{ActionResult, BrokerPort, Executor, OrderAck};

use crate::error::{DaemonError, DaemonResult};

// =============================================================================
// Commands
// =============================================================================

/// Messages accepted by a contract actor.
#[derive(Debug)]
enum Command {
    Tick {
        price: Price,
        reply: oneshot::Sender<()>,
    },
    BuyCompleted {
        details: ActionDetails,
        reply: oneshot::Sender<EngineResult<()>>,
    },
    SellCompleted {
        details: ActionDetails,
        reply: oneshot::Sender<EngineResult<()>>,
    },
    MarketOrder {
        side: OrderSide,
        price: Price,
        reply: oneshot::Sender<DaemonResult<Option<OrderAck>>>,
    },
    Cancel {
        reply: oneshot::Sender<()>,
    },
    Snapshot {
        reply: oneshot::Sender<ContractSnapshot>,
    },
}

// =============================================================================
// Handle
// =============================================================================

/// Cloneable address of a running contract actor.
#[derive(Debug, Clone)]
pub struct ContractHandle {
    symbol: Symbol,
    sender: mpsc::Sender<Command>,
}

impl ContractHandle {
    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    /// Evaluate a tick. Returns once the actor has processed it.
    pub async fn tick(&self, price: Price) -> DaemonResult<()> {
        self.request(|reply| Command::Tick { price, reply }).await
    }

    /// Size and submit an immediate-execution order (manual override).
    ///
    /// Returns `None` when there is nothing to trade on that side.
    ///
    /// # Errors
    ///
    /// `DaemonError::OrderOutstanding` if a stop order is still working.
    pub async fn market_order(&self, side: OrderSide, price: Price) -> DaemonResult<Option<OrderAck>> {
        self.request(|reply| Command::MarketOrder { side, price, reply })
            .await?
    }

    /// Cancel the outstanding order, if any.
    pub async fn cancel(&self) -> DaemonResult<()> {
        self.request(|reply| Command::Cancel { reply }).await
    }

    /// Copy of the contract's current state.
    pub async fn snapshot(&self) -> DaemonResult<ContractSnapshot> {
        self.request(|reply| Command::Snapshot { reply }).await
    }

    async fn request<T>(&self, command: impl FnOnce(oneshot::Sender<T>) -> Command) -> DaemonResult<T> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(command(reply))
            .await
            .map_err(|_| DaemonError::ActorStopped(self.symbol.clone()))?;
        response
            .await
            .map_err(|_| DaemonError::ActorStopped(self.symbol.clone()))
    }

    async fn complete(
        &self,
        command: impl FnOnce(oneshot::Sender<EngineResult<()>>) -> Command,
    ) -> EngineResult<()> {
        self.request(command)
            .await
            .map_err(|e| EngineError::DriverUnavailable(e.to_string()))?
    }
}

#[async_trait]
impl BuySellLogic for ContractHandle {
    async fn buy_action_complete(&self, details: ActionDetails) -> EngineResult<()> {
        self.complete(|reply| Command::BuyCompleted { details, reply }).await
    }

    async fn sell_action_complete(&self, details: ActionDetails) -> EngineResult<()> {
        self.complete(|reply| Command::SellCompleted { details, reply }).await
    }
}

// =============================================================================
// Actor
// =============================================================================

/// Task owning one contract's engine.
pub struct ContractActor<B: BrokerPort + 'static> {
    engine: Engine,
    executor: Executor<B>,
    receiver: mpsc::Receiver<Command>,
    cancel_token: CancellationToken,
}

impl<B: BrokerPort + 'static> ContractActor<B> {
    /// Spawn an actor for the engine.
    ///
    /// The actor stops when the token is cancelled or every handle is dropped.
    pub fn spawn(
        engine: Engine,
        executor: Executor<B>,
        capacity: usize,
        cancel_token: CancellationToken,
    ) -> (ContractHandle, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(capacity);
        let handle = ContractHandle {
            symbol: engine.symbol().clone(),
            sender,
        };

        let actor = Self {
            engine,
            executor,
            receiver,
            cancel_token,
        };

        (handle, tokio::spawn(actor.run()))
    }

    async fn run(mut self) {
        let symbol = self.engine.symbol().clone();
        info!(%symbol, "Contract actor started");

        loop {
            tokio::select! {
                command = self.receiver.recv() => {
                    match command {
                        Some(command) => self.handle(command).await,
                        None => {
                            debug!(%symbol, "All handles dropped");
                            break;
                        }
                    }
                }
                _ = self.cancel_token.cancelled() => {
                    debug!(%symbol, "Contract actor cancelled");
                    break;
                }
            }
        }

        let contract = self.engine.contract();
        info!(
            %symbol,
            run_state = %contract.run_state(),
            quantity = %contract.quantity(),
            funding = %contract.funding(),
            "Contract actor stopped"
        );
    }

    async fn handle(&mut self, command: Command) {
        match command {
            Command::Tick { price, reply } => {
                match self.engine.on_tick(price) {
                    Ok(actions) => self.execute(actions).await,
                    // Already logged by the engine
                    Err(e) => debug!(symbol = %self.engine.symbol(), error = %e, "Tick rejected"),
                }
                let _ = reply.send(());
            },

            Command::BuyCompleted { details, reply } => {
                let result = self.engine.apply_buy_fill(&details).map(|_| ());
                let _ = reply.send(result);
            },

            Command::SellCompleted { details, reply } => {
                let result = self.engine.apply_sell_fill(&details).map(|_| ());
                let _ = reply.send(result);
            },

            Command::MarketOrder { side, price, reply } => {
                let result = self.market_order(side, price).await;
                let _ = reply.send(result);
            },

            Command::Cancel { reply } => {
                let actions = self.engine.cancel_outstanding();
                self.execute(actions).await;
                let _ = reply.send(());
            },

            Command::Snapshot { reply } => {
                let _ = reply.send(self.engine.contract().snapshot());
            },
        }
    }

    /// Run actions against the broker and feed the results back.
    async fn execute(&mut self, mut actions: Vec<EngineAction>) {
        while !actions.is_empty() {
            let results = match self.executor.execute(std::mem::take(&mut actions)).await {
                Ok(results) => results,
                Err(e) => {
                    error!(symbol = %self.engine.symbol(), error = %e, "Broker action failed");
                    return;
                },
            };

            for result in results {
                match result {
                    ActionResult::OrderPlaced { side, order_id } => {
                        if let Err(e) = self.engine.order_placed(side, order_id) {
                            warn!(symbol = %self.engine.symbol(), error = %e, "Placed order not recorded");
                        }
                    },
                    ActionResult::Rejected { side, reason } => {
                        actions.extend(self.engine.order_rejected(side, &reason));
                    },
                    ActionResult::OrderCancelled { side, order_id } => {
                        match self.engine.cancel_confirmed(side, order_id) {
                            Ok(more) => actions.extend(more),
                            Err(e) => {
                                warn!(symbol = %self.engine.symbol(), error = %e, "Cancel not recorded")
                            },
                        }
                    },
                    ActionResult::CancelFailed { side, order_id, reason } => {
                        self.engine.cancel_failed(side, order_id, &reason);
                    },
                    ActionResult::Recorded => {},
                }
            }
        }
    }

    async fn market_order(&mut self, side: OrderSide, price: Price) -> DaemonResult<Option<OrderAck>> {
        if let Some((_, order_id)) = self.engine.contract().outstanding_order() {
            return Err(DaemonError::OrderOutstanding {
                symbol: self.engine.symbol().clone(),
                order_id,
            });
        }

        let Some(order) = self.engine.market_order(side, price) else {
            info!(symbol = %self.engine.symbol(), %side, %price, "Nothing to trade");
            return Ok(None);
        };

        let ack = self.executor.execute_market_order(&order).await?;
        self.engine.market_order_placed(side, ack.order_id)?;
        Ok(Some(ack))
    }
}

// =============================================================================
// Tests
// =============================================================================
