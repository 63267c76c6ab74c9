//! Order Sizing and Fill Arithmetic (Pure Functions)
//!
//! # Buy sizing
//!
//! ```text
//! reference  = average_price × buy_base_line
//! cheapness  = min(1, reference / buy_limit)      (1 while no average price)
//! spend      = funding × funding_risk × buy_magnification × cheapness
//! buy_qty    = spend / buy_limit
//! buy_qty    = min(buy_qty, funding × margin_risk / buy_limit)   (applied last)
//! ```
//!
//! # Sell sizing
//!
//! ```text
//! sell_qty = min(quantity × sell_magnification, quantity)
//! ```
//!
//! Quantities are truncated to [`QUANTITY_DP`] decimal places so a capped
//! notional never rounds above its ceiling.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::contract::Contract;
use crate::trailing::{trigger_bounds, TriggerBounds};
use crate::value_objects::{Price, Quantity};

/// Decimal places kept on derived order quantities
pub const QUANTITY_DP: u32 = 8;

fn truncate(quantity: Decimal) -> Decimal {
    quantity.round_dp_with_strategy(QUANTITY_DP, RoundingStrategy::ToZero)
}

/// Most cash a single buy may commit
pub fn max_buy_notional(contract: &Contract) -> Decimal {
    (contract.funding() * contract.margin_risk().as_decimal()).max(Decimal::ZERO)
}

/// Quantity to buy when the buy limit is hit
///
/// Returns zero when there is no funding or no usable limit.
///
/// # Examples
///
/// ```
/// # use autoinvest_domain::contract::{Contract, ContractConfig};
/// # use autoinvest_domain::sizing::buy_quantity;
/// # use rust_decimal_macros::dec;
/// let contract = Contract::new(
///     ContractConfig::new("AAPL", dec!(1000), dec!(0.02), dec!(0.05))
///         .with_funding_risk(dec!(0.5))
///         .with_margin_risk(dec!(0.2)),
/// )
/// .unwrap();
///
/// // Spend 500 at 50 would be 10 units, but the 200 cap allows only 4
/// assert_eq!(buy_quantity(&contract, dec!(50)), dec!(4));
/// ```
pub fn buy_quantity(contract: &Contract, buy_limit: Decimal) -> Decimal {
    let funding = contract.funding();
    if buy_limit <= Decimal::ZERO || funding <= Decimal::ZERO {
        return Decimal::ZERO;
    }

    let reference = contract.average_price() * contract.buy_base_line().as_decimal();
    let cheapness = if reference > Decimal::ZERO && buy_limit > reference {
        reference / buy_limit
    } else {
        Decimal::ONE
    };

    let spend = funding
        * contract.funding_risk().as_decimal()
        * contract.buy_magnification().as_decimal()
        * cheapness;
    let candidate = spend / buy_limit;

    // Hard ceiling on exposure, after magnification
    let ceiling = max_buy_notional(contract) / buy_limit;

    truncate(candidate.min(ceiling))
}

/// Quantity to sell when the sell limit is hit
///
/// # Examples
///
/// ```
/// # use autoinvest_domain::contract::{Contract, ContractConfig};
/// # use autoinvest_domain::sizing::sell_quantity;
/// # use rust_decimal_macros::dec;
/// let contract = Contract::new(ContractConfig::new("AAPL", dec!(1000), dec!(0.02), dec!(0.05))).unwrap();
/// assert_eq!(sell_quantity(&contract), dec!(0)); // nothing held yet
/// ```
pub fn sell_quantity(contract: &Contract) -> Decimal {
    let held = contract.quantity();
    if held <= Decimal::ZERO {
        return Decimal::ZERO;
    }

    let candidate = held * contract.sell_magnification().as_decimal();
    truncate(candidate.min(held))
}

// =============================================================================
// Fill application
// =============================================================================

/// Contract values after a fill has been applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillOutcome {
    pub average_price: Decimal,
    pub total_cost: Decimal,
    pub quantity: Decimal,
    pub funding: Decimal,
    /// Bounds around the new average price
    pub bounds: Option<TriggerBounds>,
}

/// Values after a buy fill
///
/// ```text
/// average = (average × held + price × qty) / (held + qty)
/// total_cost += price × qty
/// quantity   += qty
/// funding    -= price × qty
/// ```
pub fn buy_fill(contract: &Contract, price: Price, qty: Quantity) -> FillOutcome {
    let held = contract.quantity();
    let cost = price.as_decimal() * qty.as_decimal();
    let quantity = held + qty.as_decimal();

    let average_price = if quantity > Decimal::ZERO {
        (contract.average_price() * held + cost) / quantity
    } else {
        price.as_decimal()
    };

    FillOutcome {
        average_price,
        total_cost: contract.total_cost() + cost,
        quantity,
        funding: contract.funding() - cost,
        bounds: trigger_bounds(average_price, contract.trigger_range()),
    }
}

/// Values after a sell fill
///
/// The average price is kept; only the cost basis of the remainder persists.
///
/// ```text
/// quantity   -= qty
/// total_cost  = average × quantity
/// funding    += price × qty
/// ```
pub fn sell_fill(contract: &Contract, price: Price, qty: Quantity) -> FillOutcome {
    let average_price = contract.average_price();
    let quantity = contract.quantity() - qty.as_decimal();

    FillOutcome {
        average_price,
        total_cost: average_price * quantity,
        quantity,
        funding: contract.funding() + price.as_decimal() * qty.as_decimal(),
        bounds: trigger_bounds(average_price, contract.trigger_range()),
    }
}

// =============================================================================
// Tests
// =============================================================================
