//! Value Objects for the Auto-Invest Domain
//!
//! Immutable, validated domain primitives.
//! All value objects enforce invariants at construction time.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Broker-assigned tracking number for an order
pub type OrderId = u64;

/// Domain errors for value object validation and contract construction
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    /// Price must be positive
    #[error("Invalid price: {0}")]
    InvalidPrice(String),

    /// Quantity must be positive
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),

    /// Symbol must be non-blank
    #[error("Invalid symbol: {0}")]
    InvalidSymbol(String),

    /// A construction parameter was rejected
    #[error("Invalid configuration: {parameter} {reason}")]
    InvalidConfiguration {
        /// Name of the offending parameter
        parameter: &'static str,
        /// Why it was rejected
        reason: String,
    },
}

impl DomainError {
    pub(crate) fn zero(parameter: &'static str) -> Self {
        DomainError::InvalidConfiguration {
            parameter,
            reason: "cannot be 0".to_string(),
        }
    }
}

// =============================================================================
// Price
// =============================================================================

/// Price represents a positive decimal price
///
/// # Invariants
/// - Must be > 0
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Price(Decimal);

impl Price {
    /// Create a new Price with validation
    ///
    /// # Errors
    /// Returns `DomainError::InvalidPrice` if value <= 0
    pub fn new(value: Decimal) -> Result<Self, DomainError> {
        if value <= Decimal::ZERO {
            return Err(DomainError::InvalidPrice(format!("{} is not positive", value)));
        }
        Ok(Self(value))
    }

    /// Get the underlying Decimal value
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Quantity
// =============================================================================

/// Quantity represents a positive amount of the traded asset
///
/// # Invariants
/// - Must be > 0
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Quantity(Decimal);

impl Quantity {
    /// Create a new Quantity with validation
    ///
    /// # Errors
    /// Returns `DomainError::InvalidQuantity` if value <= 0
    pub fn new(value: Decimal) -> Result<Self, DomainError> {
        if value <= Decimal::ZERO {
            return Err(DomainError::InvalidQuantity(format!("{} is not positive", value)));
        }
        Ok(Self(value))
    }

    /// Get the underlying Decimal value
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Fraction
// =============================================================================

/// A risk or sizing fraction in the half-open interval (0, 1]
///
/// Supplied values are normalized the same way for every parameter:
/// the sign is dropped, the integral part is discarded, and a result of
/// exactly zero becomes one.
///
/// # Examples
/// ```
/// # use autoinvest_domain::value_objects::Fraction;
/// # use rust_decimal_macros::dec;
/// assert_eq!(Fraction::normalize(dec!(0.25)).as_decimal(), dec!(0.25));
/// assert_eq!(Fraction::normalize(dec!(-1.25)).as_decimal(), dec!(0.25));
/// assert_eq!(Fraction::normalize(dec!(0)).as_decimal(), dec!(1));
/// assert_eq!(Fraction::normalize(dec!(3)).as_decimal(), dec!(1));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Fraction(Decimal);

impl Fraction {
    /// The full fraction (100%)
    pub const ONE: Fraction = Fraction(Decimal::ONE);

    /// Normalize a supplied value into (0, 1]
    pub fn normalize(value: Decimal) -> Self {
        let fractional = (value % Decimal::ONE).abs();
        if fractional.is_zero() {
            Self::ONE
        } else {
            Self(fractional)
        }
    }

    /// Get the underlying Decimal value
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }
}

impl Default for Fraction {
    fn default() -> Self {
        Self::ONE
    }
}

impl TryFrom<Decimal> for Fraction {
    type Error = DomainError;

    /// Strict conversion used when reading back serialized contracts
    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        if value <= Decimal::ZERO || value > Decimal::ONE {
            return Err(DomainError::InvalidConfiguration {
                parameter: "fraction",
                reason: format!("{} is outside (0, 1]", value),
            });
        }
        Ok(Self(value))
    }
}

impl From<Fraction> for Decimal {
    fn from(value: Fraction) -> Self {
        value.0
    }
}

impl fmt::Display for Fraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Symbol
// =============================================================================

/// Symbol identifies the single traded instrument of a contract (e.g., AAPL)
///
/// # Invariants
/// - Non-blank
/// - Stored trimmed and upper-cased
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol(String);

impl Symbol {
    /// Create a Symbol from a raw ticker
    ///
    /// # Examples
    /// ```
    /// # use autoinvest_domain::value_objects::Symbol;
    /// let symbol = Symbol::new(" aapl ").unwrap();
    /// assert_eq!(symbol.as_str(), "AAPL");
    /// ```
    ///
    /// # Errors
    /// Returns `DomainError::InvalidSymbol` if the ticker is blank
    pub fn new(raw: &str) -> Result<Self, DomainError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(DomainError::InvalidSymbol("symbol cannot be blank".to_string()));
        }
        Ok(Self(trimmed.to_uppercase()))
    }

    /// Get the ticker as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Symbol {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<Symbol> for String {
    fn from(value: Symbol) -> Self {
        value.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// OrderSide
// =============================================================================

/// OrderSide represents the order direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderSide {
    /// Buy order
    Buy,
    /// Sell order
    Sell,
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "BUY"),
            OrderSide::Sell => write!(f, "SELL"),
        }
    }
}

// =============================================================================
// RunState
// =============================================================================

/// The running streak of a contract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RunState {
    /// Price is inside the trigger bounds, nothing is being tracked
    #[default]
    Waiting,
    /// Lower bound was crossed, trailing a buy stop down
    TrailingBuy,
    /// Upper bound was crossed, trailing a sell stop up
    TrailingSell,
}

impl RunState {
    /// The order side this state is trailing, if any
    pub fn trailing_side(&self) -> Option<OrderSide> {
        match self {
            RunState::Waiting => None,
            RunState::TrailingBuy => Some(OrderSide::Buy),
            RunState::TrailingSell => Some(OrderSide::Sell),
        }
    }

    /// Get the name of the state for display
    pub fn name(&self) -> &'static str {
        match self {
            RunState::Waiting => "waiting",
            RunState::TrailingBuy => "trailing_buy",
            RunState::TrailingSell => "trailing_sell",
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Tests
// =============================================================================
