//! Fill-completion callbacks.

use async_trait::async_trait;

use autoinvest_domain::ActionDetails;

use crate::error::EngineResult;

/// Receiver of completed buys and sells for a contract.
///
/// The broker layer calls these from its own task. Implementations must
/// funnel the details into the same serialization point that evaluates
/// ticks for the contract before applying them.
#[async_trait]
pub trait BuySellLogic: Send + Sync {
    /// A buy order was filled.
    async fn buy_action_complete(&self, details: ActionDetails) -> EngineResult<()>;

    /// A sell order was filled.
    async fn sell_action_complete(&self, details: ActionDetails) -> EngineResult<()>;
}
