//! Trigger Bounds and Trailing Limits (Pure Functions)
//!
//! This module contains pure functions for the price rules of a contract.
//! All functions are deterministic and have no side effects.
//!
//! # Trigger Bounds
//!
//! ```text
//! upper_bound = average_price × (1 + trigger_range)
//! lower_bound = average_price × (1 − trigger_range)
//! ```
//!
//! Prices strictly between the bounds are the dead zone.
//!
//! # Trailing Limits (percentage offset)
//!
//! - SELL run: limit = peak × (1 − trailing_offset)
//! - BUY run:  limit = trough × (1 + trailing_offset)
//!
//! Key invariants:
//! - Sell limit only rises, buy limit only falls
//! - A limit only moves when price makes a new favorable extreme
//!
//! Because the offset is a fixed fraction, the limit alone encodes the
//! extreme seen so far, so no separate peak/trough needs to be stored.

use crate::value_objects::{Fraction, OrderSide, Price};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Trigger bounds around an average price
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerBounds {
    /// Crossing at or above this starts a sell run
    pub upper: Decimal,
    /// Crossing at or below this starts a buy run
    pub lower: Decimal,
}

/// Where a price sits relative to the trigger bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundPosition {
    /// At or above the upper bound
    Upper,
    /// Strictly between the bounds
    DeadZone,
    /// At or below the lower bound
    Lower,
}

impl TriggerBounds {
    /// Classify a price against these bounds
    pub fn position_of(&self, price: Price) -> BoundPosition {
        let price = price.as_decimal();
        if price >= self.upper {
            BoundPosition::Upper
        } else if price <= self.lower {
            BoundPosition::Lower
        } else {
            BoundPosition::DeadZone
        }
    }

    /// Check if a price is strictly inside the dead zone
    pub fn contains(&self, price: Price) -> bool {
        matches!(self.position_of(price), BoundPosition::DeadZone)
    }
}

/// Derive trigger bounds from an average price
///
/// Returns `None` while there is no average price (bounds undefined).
///
/// # Examples
///
/// ```
/// # use autoinvest_domain::trailing::trigger_bounds;
/// # use autoinvest_domain::value_objects::Fraction;
/// # use rust_decimal_macros::dec;
/// let bounds = trigger_bounds(dec!(100), Fraction::normalize(dec!(0.05))).unwrap();
/// assert_eq!(bounds.upper, dec!(105));
/// assert_eq!(bounds.lower, dec!(95));
///
/// assert!(trigger_bounds(dec!(0), Fraction::normalize(dec!(0.05))).is_none());
/// ```
pub fn trigger_bounds(average_price: Decimal, trigger_range: Fraction) -> Option<TriggerBounds> {
    if average_price <= Decimal::ZERO {
        return None;
    }
    let range = trigger_range.as_decimal();
    Some(TriggerBounds {
        upper: average_price * (Decimal::ONE + range),
        lower: average_price * (Decimal::ONE - range),
    })
}

/// Limit price for an extreme price on the given side
///
/// ```text
/// SELL: extreme × (1 − offset)
/// BUY:  extreme × (1 + offset)
/// ```
pub fn trailing_limit(side: OrderSide, extreme: Price, trailing_offset: Fraction) -> Decimal {
    let offset = trailing_offset.as_decimal();
    match side {
        OrderSide::Sell => extreme.as_decimal() * (Decimal::ONE - offset),
        OrderSide::Buy => extreme.as_decimal() * (Decimal::ONE + offset),
    }
}

/// Ratchet a trailing limit towards the current price
///
/// # Arguments
///
/// * `side` - Side of the run (Sell trails up, Buy trails down)
/// * `current_price` - Current market price
/// * `current_limit` - Current limit, `None` when the run has just started
/// * `trailing_offset` - Offset fraction
///
/// # Returns
///
/// * `Some(limit)` - When the limit should move to a more favorable price
/// * `None` - When the limit stays where it is
///
/// # Examples
///
/// ```
/// # use autoinvest_domain::trailing::ratchet_limit;
/// # use autoinvest_domain::value_objects::{Fraction, OrderSide, Price};
/// # use rust_decimal_macros::dec;
/// let offset = Fraction::normalize(dec!(0.02));
///
/// // Sell run starts at 106
/// let limit = ratchet_limit(OrderSide::Sell, Price::new(dec!(106)).unwrap(), None, offset).unwrap();
/// assert_eq!(limit, dec!(103.88));
///
/// // New peak at 110 moves it up
/// let limit = ratchet_limit(OrderSide::Sell, Price::new(dec!(110)).unwrap(), Some(limit), offset).unwrap();
/// assert_eq!(limit, dec!(107.8));
///
/// // Pull back to 107 leaves it alone
/// assert!(ratchet_limit(OrderSide::Sell, Price::new(dec!(107)).unwrap(), Some(limit), offset).is_none());
/// ```
pub fn ratchet_limit(
    side: OrderSide,
    current_price: Price,
    current_limit: Option<Decimal>,
    trailing_offset: Fraction,
) -> Option<Decimal> {
    let candidate = trailing_limit(side, current_price, trailing_offset);
    let Some(current) = current_limit else {
        return Some(candidate);
    };

    let improves = match side {
        // SELL: only move UP
        OrderSide::Sell => candidate > current,
        // BUY: only move DOWN
        OrderSide::Buy => candidate < current,
    };

    improves.then_some(candidate)
}

/// Check if a trailing limit is hit
///
/// * SELL - price fell to or below the limit
/// * BUY - price rose to or above the limit
///
/// # Examples
///
/// ```
/// # use autoinvest_domain::trailing::is_limit_hit;
/// # use autoinvest_domain::value_objects::{OrderSide, Price};
/// # use rust_decimal_macros::dec;
/// let limit = dec!(107.8);
/// assert!(is_limit_hit(OrderSide::Sell, Price::new(dec!(107.8)).unwrap(), limit));
/// assert!(!is_limit_hit(OrderSide::Sell, Price::new(dec!(108)).unwrap(), limit));
/// assert!(is_limit_hit(OrderSide::Buy, Price::new(dec!(108)).unwrap(), limit));
/// ```
pub fn is_limit_hit(side: OrderSide, current_price: Price, limit: Decimal) -> bool {
    match side {
        OrderSide::Sell => current_price.as_decimal() <= limit,
        OrderSide::Buy => current_price.as_decimal() >= limit,
    }
}

// =============================================================================
// Tests
// =============================================================================
