//! Contract: per-instrument trading state and its write gate
//!
//! A [`Contract`] exposes read-only views of its state. The only way to
//! change that state is through the [`ContractEditor`] returned by
//! [`Contract::register_editor`], which takes the contract by value so
//! exactly one owner can ever write to it.
//!
//! ```text
//! ContractConfig ──new()──▶ Contract ──register_editor()──▶ ContractEditor
//!                                 ▲                              │
//!                                 └────────── contract() ────────┘
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::trailing::TriggerBounds;
use crate::value_objects::{DomainError, Fraction, OrderId, OrderSide, RunState, Symbol};

// =============================================================================
// ContractConfig
// =============================================================================

fn one() -> Decimal {
    Decimal::ONE
}

/// Construction parameters for a [`Contract`]
///
/// Values are taken as supplied (signs, integral parts and zeros included);
/// normalization happens in [`Contract::new`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractConfig {
    /// Instrument ticker
    pub symbol: String,
    /// Cash allocated to the contract
    pub funding: Decimal,
    /// Offset of the trailing limit from the best price seen
    pub trailing_offset: Decimal,
    /// Distance of the trigger bounds from the average price
    pub trigger_range: Decimal,
    /// Share of funding risked on a buy
    #[serde(default = "one")]
    pub funding_risk: Decimal,
    /// Share of the average price considered fully under value
    #[serde(default = "one")]
    pub buy_base_line: Decimal,
    /// Hard cap on buy notional as a share of funding
    #[serde(default = "one")]
    pub margin_risk: Decimal,
    /// Scale applied to the candidate buy spend
    #[serde(default = "one")]
    pub buy_magnification: Decimal,
    /// Scale applied to the held quantity when selling
    #[serde(default = "one")]
    pub sell_magnification: Decimal,
}

impl ContractConfig {
    /// Create a config with the required parameters; optional ones default to 1
    pub fn new(
        symbol: impl Into<String>,
        funding: Decimal,
        trailing_offset: Decimal,
        trigger_range: Decimal,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            funding,
            trailing_offset,
            trigger_range,
            funding_risk: Decimal::ONE,
            buy_base_line: Decimal::ONE,
            margin_risk: Decimal::ONE,
            buy_magnification: Decimal::ONE,
            sell_magnification: Decimal::ONE,
        }
    }

    /// Set the funding risk
    pub fn with_funding_risk(mut self, value: Decimal) -> Self {
        self.funding_risk = value;
        self
    }

    /// Set the buy base line
    pub fn with_buy_base_line(mut self, value: Decimal) -> Self {
        self.buy_base_line = value;
        self
    }

    /// Set the margin risk
    pub fn with_margin_risk(mut self, value: Decimal) -> Self {
        self.margin_risk = value;
        self
    }

    /// Set the buy magnification
    pub fn with_buy_magnification(mut self, value: Decimal) -> Self {
        self.buy_magnification = value;
        self
    }

    /// Set the sell magnification
    pub fn with_sell_magnification(mut self, value: Decimal) -> Self {
        self.sell_magnification = value;
        self
    }
}

// =============================================================================
// Contract
// =============================================================================

/// Fixed risk and sizing parameters of a contract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskParameters {
    pub trailing_offset: Fraction,
    pub trigger_range: Fraction,
    pub funding_risk: Fraction,
    pub buy_base_line: Fraction,
    pub margin_risk: Fraction,
    pub buy_magnification: Fraction,
    pub sell_magnification: Fraction,
}

/// Mutable trading state of a contract
///
/// Only reachable for writing through [`ContractEditor`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TradingState {
    pub run_state: RunState,
    pub average_price: Decimal,
    pub total_cost: Decimal,
    pub quantity: Decimal,
    pub funding: Decimal,
    pub upper_bound: Decimal,
    pub lower_bound: Decimal,
    pub sell_order_limit: Decimal,
    pub buy_order_limit: Decimal,
    pub sell_qty: Decimal,
    pub buy_qty: Decimal,
    pub buy_order_id: Option<OrderId>,
    pub sell_order_id: Option<OrderId>,
}

/// Per-instrument trading state with fixed risk parameters
///
/// # Invariants
/// - Every risk fraction lies in (0, 1]
/// - The symbol is non-blank and upper-cased
/// - State changes only through the registered [`ContractEditor`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contract {
    symbol: Symbol,
    risk: RiskParameters,
    state: TradingState,
}

impl Contract {
    /// Create a contract from its construction parameters
    ///
    /// # Examples
    ///
    /// ```
    /// # use autoinvest_domain::contract::{Contract, ContractConfig};
    /// # use autoinvest_domain::value_objects::RunState;
    /// # use rust_decimal_macros::dec;
    /// let contract = Contract::new(ContractConfig::new("aapl", dec!(-1000), dec!(0.02), dec!(0.05))).unwrap();
    ///
    /// assert_eq!(contract.symbol().as_str(), "AAPL");
    /// assert_eq!(contract.funding(), dec!(1000));
    /// assert_eq!(contract.run_state(), RunState::Waiting);
    /// assert_eq!(contract.funding_risk().as_decimal(), dec!(1));
    /// ```
    ///
    /// # Errors
    ///
    /// - `DomainError::InvalidSymbol` if the symbol is blank
    /// - `DomainError::InvalidConfiguration` naming `funding`, `trigger_range`
    ///   or `trailing_offset` when that value is zero
    pub fn new(config: ContractConfig) -> Result<Self, DomainError> {
        let symbol = Symbol::new(&config.symbol)?;

        if config.funding.is_zero() {
            return Err(DomainError::zero("funding"));
        }
        if config.trigger_range.is_zero() {
            return Err(DomainError::zero("trigger_range"));
        }
        if config.trailing_offset.is_zero() {
            return Err(DomainError::zero("trailing_offset"));
        }

        let risk = RiskParameters {
            trailing_offset: Fraction::normalize(config.trailing_offset),
            trigger_range: Fraction::normalize(config.trigger_range),
            funding_risk: Fraction::normalize(config.funding_risk),
            buy_base_line: Fraction::normalize(config.buy_base_line),
            margin_risk: Fraction::normalize(config.margin_risk),
            buy_magnification: Fraction::normalize(config.buy_magnification),
            sell_magnification: Fraction::normalize(config.sell_magnification),
        };

        Ok(Self {
            symbol,
            risk,
            state: TradingState {
                funding: config.funding.abs(),
                ..TradingState::default()
            },
        })
    }

    /// Hand out the single write capability for this contract
    ///
    /// Consumes the contract: the editor becomes its only owner, so a
    /// second registration on the same instance cannot be expressed.
    pub fn register_editor(self) -> ContractEditor {
        ContractEditor { contract: self }
    }

    /// Copy of all fields for auditing and comparison
    pub fn snapshot(&self) -> ContractSnapshot {
        ContractSnapshot {
            symbol: self.symbol.clone(),
            risk: self.risk,
            state: self.state.clone(),
        }
    }

    /// Current trigger bounds, `None` until they have been set
    pub fn bounds(&self) -> Option<TriggerBounds> {
        if self.state.upper_bound.is_zero() && self.state.lower_bound.is_zero() {
            return None;
        }
        Some(TriggerBounds {
            upper: self.state.upper_bound,
            lower: self.state.lower_bound,
        })
    }

    /// The outstanding order, if any
    pub fn outstanding_order(&self) -> Option<(OrderSide, OrderId)> {
        match (self.state.buy_order_id, self.state.sell_order_id) {
            (Some(id), None) => Some((OrderSide::Buy, id)),
            (None, Some(id)) => Some((OrderSide::Sell, id)),
            // Both set breaks the single-order invariant; callers check that separately
            (Some(id), Some(_)) => Some((OrderSide::Buy, id)),
            (None, None) => None,
        }
    }

    /// Check if both order ids are set at once
    pub fn has_conflicting_orders(&self) -> bool {
        self.state.buy_order_id.is_some() && self.state.sell_order_id.is_some()
    }

    /// Stock symbol of the contract
    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    /// All fixed risk parameters
    pub fn risk(&self) -> &RiskParameters {
        &self.risk
    }

    pub fn trailing_offset(&self) -> Fraction {
        self.risk.trailing_offset
    }

    pub fn trigger_range(&self) -> Fraction {
        self.risk.trigger_range
    }

    pub fn funding_risk(&self) -> Fraction {
        self.risk.funding_risk
    }

    pub fn buy_base_line(&self) -> Fraction {
        self.risk.buy_base_line
    }

    pub fn margin_risk(&self) -> Fraction {
        self.risk.margin_risk
    }

    pub fn buy_magnification(&self) -> Fraction {
        self.risk.buy_magnification
    }

    pub fn sell_magnification(&self) -> Fraction {
        self.risk.sell_magnification
    }

    /// Whether the contract is waiting or trailing a buy/sell
    pub fn run_state(&self) -> RunState {
        self.state.run_state
    }

    /// Average price of the stock held
    pub fn average_price(&self) -> Decimal {
        self.state.average_price
    }

    /// Aggregated cost of the stock held
    pub fn total_cost(&self) -> Decimal {
        self.state.total_cost
    }

    /// Amount of stock held
    pub fn quantity(&self) -> Decimal {
        self.state.quantity
    }

    /// Liquid cash held for the contract
    pub fn funding(&self) -> Decimal {
        self.state.funding
    }

    pub fn upper_bound(&self) -> Decimal {
        self.state.upper_bound
    }

    pub fn lower_bound(&self) -> Decimal {
        self.state.lower_bound
    }

    /// Market price that triggers a sell order
    pub fn sell_order_limit(&self) -> Decimal {
        self.state.sell_order_limit
    }

    /// Market price that triggers a buy order
    pub fn buy_order_limit(&self) -> Decimal {
        self.state.buy_order_limit
    }

    pub fn sell_qty(&self) -> Decimal {
        self.state.sell_qty
    }

    pub fn buy_qty(&self) -> Decimal {
        self.state.buy_qty
    }

    pub fn buy_order_id(&self) -> Option<OrderId> {
        self.state.buy_order_id
    }

    pub fn sell_order_id(&self) -> Option<OrderId> {
        self.state.sell_order_id
    }
}

/// Serializable copy of a contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractSnapshot {
    pub symbol: Symbol,
    pub risk: RiskParameters,
    pub state: TradingState,
}

// =============================================================================
// ContractEditor
// =============================================================================

/// Write capability for exactly one [`Contract`]
///
/// Each setter replaces a single field and does nothing else: no
/// validation, no derived recomputation. Deriving consistent values is the
/// owner's job.
#[derive(Debug)]
pub struct ContractEditor {
    contract: Contract,
}

impl ContractEditor {
    /// Read-only view of the edited contract
    pub fn contract(&self) -> &Contract {
        &self.contract
    }

    pub fn set_run_state(&mut self, new_state: RunState) {
        self.contract.state.run_state = new_state;
    }

    pub fn set_average_price(&mut self, new_value: Decimal) {
        self.contract.state.average_price = new_value;
    }

    pub fn set_total_cost(&mut self, new_value: Decimal) {
        self.contract.state.total_cost = new_value;
    }

    pub fn set_quantity(&mut self, new_value: Decimal) {
        self.contract.state.quantity = new_value;
    }

    pub fn set_funding(&mut self, new_value: Decimal) {
        self.contract.state.funding = new_value;
    }

    pub fn set_upper_bound(&mut self, new_value: Decimal) {
        self.contract.state.upper_bound = new_value;
    }

    pub fn set_lower_bound(&mut self, new_value: Decimal) {
        self.contract.state.lower_bound = new_value;
    }

    pub fn set_sell_limit(&mut self, new_value: Decimal) {
        self.contract.state.sell_order_limit = new_value;
    }

    pub fn set_buy_limit(&mut self, new_value: Decimal) {
        self.contract.state.buy_order_limit = new_value;
    }

    pub fn set_sell_qty(&mut self, new_value: Decimal) {
        self.contract.state.sell_qty = new_value;
    }

    pub fn set_buy_qty(&mut self, new_value: Decimal) {
        self.contract.state.buy_qty = new_value;
    }

    pub fn set_buy_order_id(&mut self, new_value: Option<OrderId>) {
        self.contract.state.buy_order_id = new_value;
    }

    pub fn set_sell_order_id(&mut self, new_value: Option<OrderId>) {
        self.contract.state.sell_order_id = new_value;
    }
}

// =============================================================================
// Tests
// =============================================================================
