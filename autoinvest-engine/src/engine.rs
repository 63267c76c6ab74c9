//! Engine: drives one contract through ticks and fills.
//!
//! The engine owns the contract's [`ContractEditor`] and is the only code
//! that writes to the contract. It is synchronous and does no I/O: it takes
//! a tick or a fill and returns the [`EngineAction`]s the caller must carry
//! out against the broker.
//!
//! # Tick evaluation
//!
//! ```text
//! no bounds yet      → anchor average price at the tick, derive bounds
//! manual order       → wait for its fill
//! stop outstanding   → cancel it if price is back in the dead zone, else wait
//! Waiting            → ≥ upper: start sell run, ≤ lower: start buy run
//! Trailing{side}     → ratchet limit, emit stop order when hit,
//!                      abandon run when price re-enters the dead zone
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, trace, warn};

use autoinvest_domain::sizing::{self, FillOutcome};
use autoinvest_domain::trailing::{self, BoundPosition, TriggerBounds};
use autoinvest_domain::{
    ActionDetails, Contract, ContractEditor, MarketOrder, OrderId, OrderSide, Price, Quantity,
    RunState, StopLimit, Symbol,
};

use crate::error::{EngineError, EngineResult};

// =============================================================================
// Engine Actions
// =============================================================================

/// Work the engine hands back to its caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineAction {
    /// Submit a stop order to the broker
    PlaceStopOrder(StopLimit),

    /// Cancel an outstanding order at the broker
    CancelOrder {
        symbol: Symbol,
        side: OrderSide,
        order_id: OrderId,
    },

    /// Trailing limit moved (audit only)
    UpdateTrailingLimit {
        symbol: Symbol,
        side: OrderSide,
        previous: Decimal,
        new: Decimal,
        trigger_price: Price,
    },

    /// Run state changed (audit only)
    RunStateChanged {
        symbol: Symbol,
        previous: RunState,
        new: RunState,
    },
}

// =============================================================================
// Engine
// =============================================================================

/// Decision logic for a single contract.
#[derive(Debug)]
pub struct Engine {
    editor: ContractEditor,
    /// Side of a stop order emitted but not yet acknowledged by the broker
    submitting: Option<OrderSide>,
    /// The outstanding order is a manual market order, not a trailing stop
    manual_order: bool,
}

impl Engine {
    /// Take ownership of a contract's write capability.
    pub fn new(editor: ContractEditor) -> Self {
        Self {
            editor,
            submitting: None,
            manual_order: false,
        }
    }

    /// Read-only view of the driven contract.
    pub fn contract(&self) -> &Contract {
        self.editor.contract()
    }

    pub fn symbol(&self) -> &Symbol {
        self.contract().symbol()
    }

    /// Check if a stop order is waiting for broker acknowledgement.
    pub fn is_submitting(&self) -> bool {
        self.submitting.is_some()
    }

    // =========================================================================
    // Ticks
    // =========================================================================

    /// Evaluate a market tick.
    ///
    /// # Errors
    ///
    /// `EngineError::InvariantViolation` if both order ids are set.
    pub fn on_tick(&mut self, price: Price) -> EngineResult<Vec<EngineAction>> {
        self.check_single_order()?;
        let mut actions = Vec::new();

        let Some(bounds) = self.contract().bounds() else {
            self.anchor(price);
            return Ok(actions);
        };

        if let Some((side, order_id)) = self.contract().outstanding_order() {
            if self.manual_order {
                trace!(symbol = %self.symbol(), order_id, %price, "Manual order outstanding, tick ignored");
            } else if bounds.contains(price) {
                info!(
                    symbol = %self.symbol(),
                    %side,
                    order_id,
                    %price,
                    "Price back inside trigger bounds, cancelling outstanding order"
                );
                actions.push(EngineAction::CancelOrder {
                    symbol: self.symbol().clone(),
                    side,
                    order_id,
                });
            } else {
                trace!(symbol = %self.symbol(), order_id, %price, "Order outstanding, tick ignored");
            }
            return Ok(actions);
        }

        if let Some(side) = self.submitting {
            trace!(symbol = %self.symbol(), %side, %price, "Awaiting order placement, tick ignored");
            return Ok(actions);
        }

        match self.contract().run_state() {
            RunState::Waiting => match bounds.position_of(price) {
                BoundPosition::Upper => self.start_run(OrderSide::Sell, price, &mut actions),
                BoundPosition::Lower => self.start_run(OrderSide::Buy, price, &mut actions),
                BoundPosition::DeadZone => {},
            },
            RunState::TrailingBuy => self.trail(OrderSide::Buy, price, bounds, &mut actions),
            RunState::TrailingSell => self.trail(OrderSide::Sell, price, bounds, &mut actions),
        }

        Ok(actions)
    }

    /// First tick on a contract without bounds fixes the reference price.
    fn anchor(&mut self, price: Price) {
        let average = match self.contract().average_price() {
            avg if avg > Decimal::ZERO => avg,
            _ => price.as_decimal(),
        };

        self.editor.set_average_price(average);
        self.write_bounds(trailing::trigger_bounds(average, self.contract().trigger_range()));

        info!(
            symbol = %self.symbol(),
            average_price = %average,
            upper = %self.contract().upper_bound(),
            lower = %self.contract().lower_bound(),
            "Contract anchored"
        );
    }

    fn start_run(&mut self, side: OrderSide, price: Price, actions: &mut Vec<EngineAction>) {
        let limit = trailing::trailing_limit(side, price, self.contract().trailing_offset());
        self.write_limit(side, limit);

        let new_state = match side {
            OrderSide::Buy => RunState::TrailingBuy,
            OrderSide::Sell => RunState::TrailingSell,
        };
        actions.extend(self.change_state(new_state));

        info!(
            symbol = %self.symbol(),
            %side,
            %price,
            %limit,
            "Trigger bound crossed, trailing started"
        );
    }

    fn trail(
        &mut self,
        side: OrderSide,
        price: Price,
        bounds: TriggerBounds,
        actions: &mut Vec<EngineAction>,
    ) {
        let current = self.limit(side);
        let current = (current > Decimal::ZERO).then_some(current);

        if let Some(new_limit) =
            trailing::ratchet_limit(side, price, current, self.contract().trailing_offset())
        {
            debug!(symbol = %self.symbol(), %side, %price, limit = %new_limit, "Trailing limit moved");
            actions.push(EngineAction::UpdateTrailingLimit {
                symbol: self.symbol().clone(),
                side,
                previous: current.unwrap_or(Decimal::ZERO),
                new: new_limit,
                trigger_price: price,
            });
            self.write_limit(side, new_limit);
        }

        if trailing::is_limit_hit(side, price, self.limit(side)) {
            self.trigger(side, price, actions);
        } else if bounds.contains(price) {
            info!(symbol = %self.symbol(), %side, %price, "Price back inside trigger bounds, run abandoned");
            actions.extend(self.finish_run());
        }
    }

    fn trigger(&mut self, side: OrderSide, price: Price, actions: &mut Vec<EngineAction>) {
        let limit = self.limit(side);
        // Resize against current funding and holdings
        self.write_limit(side, limit);
        let quantity = match side {
            OrderSide::Buy => self.contract().buy_qty(),
            OrderSide::Sell => self.contract().sell_qty(),
        };

        match (Quantity::new(quantity), Price::new(limit)) {
            (Ok(quantity), Ok(stop_price)) => {
                info!(
                    symbol = %self.symbol(),
                    %side,
                    %price,
                    %stop_price,
                    %quantity,
                    "Trailing limit hit, placing stop order"
                );
                self.submitting = Some(side);
                actions.push(EngineAction::PlaceStopOrder(StopLimit::new(
                    self.symbol().clone(),
                    side,
                    quantity,
                    stop_price,
                )));
            },
            _ => {
                debug!(symbol = %self.symbol(), %side, %price, "Trailing limit hit with nothing to trade, run abandoned");
                actions.extend(self.finish_run());
            },
        }
    }

    // =========================================================================
    // Orders
    // =========================================================================

    /// Record the broker id of a submitted order.
    ///
    /// # Errors
    ///
    /// `EngineError::InvariantViolation` if an order is already outstanding.
    pub fn order_placed(&mut self, side: OrderSide, order_id: OrderId) -> EngineResult<()> {
        self.record_order(side, order_id)?;
        self.manual_order = false;
        info!(symbol = %self.symbol(), %side, order_id, "Order placed");
        Ok(())
    }

    /// Record the broker id of a manual market order.
    ///
    /// The order is never cancelled by a tick; only its fill clears it.
    ///
    /// # Errors
    ///
    /// `EngineError::InvariantViolation` if an order is already outstanding.
    pub fn market_order_placed(&mut self, side: OrderSide, order_id: OrderId) -> EngineResult<()> {
        self.record_order(side, order_id)?;
        self.manual_order = true;
        info!(symbol = %self.symbol(), %side, order_id, "Market order placed");
        Ok(())
    }

    fn record_order(&mut self, side: OrderSide, order_id: OrderId) -> EngineResult<()> {
        if let Some((outstanding_side, outstanding_id)) = self.contract().outstanding_order() {
            return Err(self.violation(format!(
                "{} order {} placed while {} order {} is outstanding",
                side, order_id, outstanding_side, outstanding_id
            )));
        }

        match side {
            OrderSide::Buy => self.editor.set_buy_order_id(Some(order_id)),
            OrderSide::Sell => self.editor.set_sell_order_id(Some(order_id)),
        }
        self.submitting = None;
        Ok(())
    }

    /// The broker refused a submitted stop order; the run starts over.
    pub fn order_rejected(&mut self, side: OrderSide, reason: &str) -> Vec<EngineAction> {
        warn!(symbol = %self.symbol(), %side, reason, "Order rejected, run abandoned");
        self.submitting = None;
        self.finish_run().into_iter().collect()
    }

    /// Ask the broker to cancel the outstanding stop order, if any.
    ///
    /// The order id stays recorded until [`Engine::cancel_confirmed`].
    /// Manual market orders are not cancelled.
    pub fn cancel_outstanding(&mut self) -> Vec<EngineAction> {
        match self.contract().outstanding_order() {
            Some((side, order_id)) if !self.manual_order => vec![EngineAction::CancelOrder {
                symbol: self.symbol().clone(),
                side,
                order_id,
            }],
            Some((_, order_id)) => {
                debug!(symbol = %self.symbol(), order_id, "Manual order outstanding, nothing to cancel");
                Vec::new()
            },
            None => Vec::new(),
        }
    }

    /// The broker cancelled the order: forget it and return to waiting.
    ///
    /// # Errors
    ///
    /// `EngineError::InvariantViolation` if the order is not the
    /// outstanding one.
    pub fn cancel_confirmed(
        &mut self,
        side: OrderSide,
        order_id: OrderId,
    ) -> EngineResult<Vec<EngineAction>> {
        if self.contract().outstanding_order() != Some((side, order_id)) {
            return Err(self.violation(format!(
                "cancel confirmed for {} order {} which is not outstanding",
                side, order_id
            )));
        }

        match side {
            OrderSide::Buy => self.editor.set_buy_order_id(None),
            OrderSide::Sell => self.editor.set_sell_order_id(None),
        }

        info!(symbol = %self.symbol(), %side, order_id, "Order cancelled");
        Ok(self.finish_run().into_iter().collect())
    }

    /// The broker could not cancel the order; it stays outstanding.
    ///
    /// A later fill for it is applied as usual.
    pub fn cancel_failed(&mut self, side: OrderSide, order_id: OrderId, reason: &str) {
        warn!(symbol = %self.symbol(), %side, order_id, reason, "Cancel failed, order kept");
    }

    /// Size an immediate-execution order at the given price.
    ///
    /// Returns `None` when there is nothing to trade on that side.
    pub fn market_order(&self, side: OrderSide, price: Price) -> Option<MarketOrder> {
        let quantity = match side {
            OrderSide::Buy => sizing::buy_quantity(self.contract(), price.as_decimal()),
            OrderSide::Sell => sizing::sell_quantity(self.contract()),
        };

        Quantity::new(quantity).ok().map(|quantity| MarketOrder {
            symbol: self.symbol().clone(),
            side,
            price_per_unit: price,
            quantity,
        })
    }

    // =========================================================================
    // Fills
    // =========================================================================

    /// Apply a completed buy.
    ///
    /// # Errors
    ///
    /// `EngineError::InvariantViolation` if the fill does not match the
    /// outstanding buy order.
    pub fn apply_buy_fill(&mut self, details: &ActionDetails) -> EngineResult<FillOutcome> {
        self.check_fill(OrderSide::Buy, details)?;

        let outcome = sizing::buy_fill(self.contract(), details.price, details.qty);
        self.write_fill(OrderSide::Buy, &outcome);

        info!(
            symbol = %self.symbol(),
            order_id = details.order_id,
            price = %details.price,
            qty = %details.qty,
            cost = %details.value(),
            average_price = %outcome.average_price,
            funding = %outcome.funding,
            "Buy completed"
        );
        Ok(outcome)
    }

    /// Apply a completed sell.
    ///
    /// # Errors
    ///
    /// `EngineError::InvariantViolation` if the fill does not match the
    /// outstanding sell order or sells more than is held.
    pub fn apply_sell_fill(&mut self, details: &ActionDetails) -> EngineResult<FillOutcome> {
        self.check_fill(OrderSide::Sell, details)?;

        let held = self.contract().quantity();
        if details.qty.as_decimal() > held {
            return Err(self.violation(format!(
                "sell fill of {} exceeds held quantity {}",
                details.qty, held
            )));
        }

        let outcome = sizing::sell_fill(self.contract(), details.price, details.qty);
        self.write_fill(OrderSide::Sell, &outcome);

        info!(
            symbol = %self.symbol(),
            order_id = details.order_id,
            price = %details.price,
            qty = %details.qty,
            proceeds = %details.value(),
            quantity = %outcome.quantity,
            funding = %outcome.funding,
            "Sell completed"
        );
        Ok(outcome)
    }

    fn check_fill(&self, side: OrderSide, details: &ActionDetails) -> EngineResult<()> {
        self.check_single_order()?;

        if &details.symbol != self.symbol() {
            return Err(self.violation(format!("fill for foreign symbol {}", details.symbol)));
        }

        let tracked = match side {
            OrderSide::Buy => self.contract().buy_order_id(),
            OrderSide::Sell => self.contract().sell_order_id(),
        };

        match tracked {
            Some(id) if id == details.order_id => Ok(()),
            Some(id) => Err(self.violation(format!(
                "{} fill for order {} while tracking order {}",
                side, details.order_id, id
            ))),
            None => Err(self.violation(format!(
                "{} fill for order {} without an outstanding order",
                side, details.order_id
            ))),
        }
    }

    fn write_fill(&mut self, side: OrderSide, outcome: &FillOutcome) {
        self.editor.set_average_price(outcome.average_price);
        self.editor.set_total_cost(outcome.total_cost);
        self.editor.set_quantity(outcome.quantity);
        self.editor.set_funding(outcome.funding);
        self.write_bounds(outcome.bounds);

        match side {
            OrderSide::Buy => self.editor.set_buy_order_id(None),
            OrderSide::Sell => self.editor.set_sell_order_id(None),
        }
        self.submitting = None;
        self.manual_order = false;
        self.finish_run();
    }

    // =========================================================================
    // Field helpers
    // =========================================================================

    fn limit(&self, side: OrderSide) -> Decimal {
        match side {
            OrderSide::Buy => self.contract().buy_order_limit(),
            OrderSide::Sell => self.contract().sell_order_limit(),
        }
    }

    /// Store a limit together with the order size it implies.
    fn write_limit(&mut self, side: OrderSide, limit: Decimal) {
        match side {
            OrderSide::Buy => {
                self.editor.set_buy_limit(limit);
                let quantity = sizing::buy_quantity(self.contract(), limit);
                self.editor.set_buy_qty(quantity);
            },
            OrderSide::Sell => {
                self.editor.set_sell_limit(limit);
                let quantity = sizing::sell_quantity(self.contract());
                self.editor.set_sell_qty(quantity);
            },
        }
    }

    fn write_bounds(&mut self, bounds: Option<TriggerBounds>) {
        let (upper, lower) = bounds.map_or((Decimal::ZERO, Decimal::ZERO), |b| (b.upper, b.lower));
        self.editor.set_upper_bound(upper);
        self.editor.set_lower_bound(lower);
    }

    fn change_state(&mut self, new_state: RunState) -> Option<EngineAction> {
        let previous = self.contract().run_state();
        if previous == new_state {
            return None;
        }
        self.editor.set_run_state(new_state);
        Some(EngineAction::RunStateChanged {
            symbol: self.symbol().clone(),
            previous,
            new: new_state,
        })
    }

    /// Back to waiting with all trailing progress discarded.
    fn finish_run(&mut self) -> Option<EngineAction> {
        self.editor.set_sell_limit(Decimal::ZERO);
        self.editor.set_buy_limit(Decimal::ZERO);
        self.editor.set_sell_qty(Decimal::ZERO);
        self.editor.set_buy_qty(Decimal::ZERO);
        self.change_state(RunState::Waiting)
    }

    fn check_single_order(&self) -> EngineResult<()> {
        if self.contract().has_conflicting_orders() {
            return Err(self.violation(format!(
                "buy order {:?} and sell order {:?} are both outstanding",
                self.contract().buy_order_id(),
                self.contract().sell_order_id()
            )));
        }
        Ok(())
    }

    fn violation(&self, reason: String) -> EngineError {
        error!(symbol = %self.symbol(), %reason, "Invariant violation");
        EngineError::invariant(self.symbol(), reason)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use autoinvest_domain::{Contract, ContractConfig};
    use rust_decimal_macros::dec;

    fn price(value: Decimal) -> Price {
        Price::new(value).unwrap()
    }

    fn config() -> ContractConfig {
        ContractConfig::new("aapl", dec!(1000), dec!(0.02), dec!(0.05))
    }

    /// Engine holding 10 units at an average of 100, bounds 95/105.
    fn seeded_engine(config: ContractConfig) -> Engine {
        let mut editor = Contract::new(config).unwrap().register_editor();
        editor.set_average_price(dec!(100));
        editor.set_quantity(dec!(10));
        editor.set_total_cost(dec!(1000));
        editor.set_upper_bound(dec!(105));
        editor.set_lower_bound(dec!(95));
        Engine::new(editor)
    }

    fn placed_order(actions: &[EngineAction]) -> Option<&StopLimit> {
        actions.iter().find_map(|a| match a {
            EngineAction::PlaceStopOrder(order) => Some(order),
            _ => None,
        })
    }

    fn details(engine: &Engine, order_id: OrderId, p: Decimal, qty: Decimal) -> ActionDetails {
        ActionDetails::new(order_id, engine.symbol().clone(), price(p), Quantity::new(qty).unwrap())
    }

    // =========================================================================
    // Anchoring
    // =========================================================================

    #[test]
    fn test_first_tick_anchors_bounds() {
        let editor = Contract::new(config()).unwrap().register_editor();
        let mut engine = Engine::new(editor);

        let actions = engine.on_tick(price(dec!(100))).unwrap();

        assert!(actions.is_empty());
        assert_eq!(engine.contract().average_price(), dec!(100));
        assert_eq!(engine.contract().upper_bound(), dec!(105));
        assert_eq!(engine.contract().lower_bound(), dec!(95));
        assert_eq!(engine.contract().run_state(), RunState::Waiting);
    }

    #[test]
    fn test_dead_zone_does_nothing() {
        let mut engine = seeded_engine(config());
        let before = engine.contract().snapshot();

        for p in [dec!(95.01), dec!(100), dec!(104.99)] {
            assert!(engine.on_tick(price(p)).unwrap().is_empty());
        }

        assert_eq!(engine.contract().snapshot(), before);
    }

    // =========================================================================
    // Sell run
    // =========================================================================

    #[test]
    fn test_sell_run_ratchets_and_triggers() {
        let mut engine = seeded_engine(config());

        engine.on_tick(price(dec!(106))).unwrap();
        assert_eq!(engine.contract().run_state(), RunState::TrailingSell);
        assert_eq!(engine.contract().sell_order_limit(), dec!(103.88));
        assert_eq!(engine.contract().sell_qty(), dec!(10));

        engine.on_tick(price(dec!(110))).unwrap();
        assert_eq!(engine.contract().sell_order_limit(), dec!(107.8));

        let actions = engine.on_tick(price(dec!(107))).unwrap();
        assert_eq!(engine.contract().sell_order_limit(), dec!(107.8));

        let order = placed_order(&actions).expect("stop order");
        assert_eq!(order.side, OrderSide::Sell);
        assert_eq!(order.stop_price.as_decimal(), dec!(107.8));
        assert_eq!(order.quantity.as_decimal(), dec!(10));
        assert_eq!(order.symbol.as_str(), "AAPL");
        assert!(engine.is_submitting());
    }

    #[test]
    fn test_sell_limit_holds_on_pullback_above_it() {
        let mut engine = seeded_engine(config());

        for p in [dec!(106), dec!(110), dec!(108)] {
            let actions = engine.on_tick(price(p)).unwrap();
            assert!(placed_order(&actions).is_none());
        }

        assert_eq!(engine.contract().run_state(), RunState::TrailingSell);
        assert_eq!(engine.contract().sell_order_limit(), dec!(107.8));
    }

    #[test]
    fn test_sell_quantity_respects_magnification() {
        let mut engine = seeded_engine(config().with_sell_magnification(dec!(0.5)));

        engine.on_tick(price(dec!(110))).unwrap();
        let actions = engine.on_tick(price(dec!(107))).unwrap();

        let order = placed_order(&actions).unwrap();
        assert_eq!(order.quantity.as_decimal(), dec!(5));
        assert!(order.quantity.as_decimal() <= engine.contract().quantity());
    }

    #[test]
    fn test_reentering_dead_zone_abandons_run() {
        let mut engine = seeded_engine(config());

        engine.on_tick(price(dec!(106))).unwrap();
        let actions = engine.on_tick(price(dec!(104))).unwrap();

        assert_eq!(engine.contract().run_state(), RunState::Waiting);
        assert_eq!(engine.contract().sell_order_limit(), Decimal::ZERO);
        assert_eq!(engine.contract().sell_qty(), Decimal::ZERO);
        assert!(actions.contains(&EngineAction::RunStateChanged {
            symbol: engine.symbol().clone(),
            previous: RunState::TrailingSell,
            new: RunState::Waiting,
        }));

        // A fresh run starts from scratch
        engine.on_tick(price(dec!(105))).unwrap();
        assert_eq!(engine.contract().sell_order_limit(), dec!(102.9));
    }

    #[test]
    fn test_sell_hit_with_nothing_held_abandons_run() {
        let mut engine = seeded_engine(config());
        engine.editor.set_quantity(Decimal::ZERO);

        engine.on_tick(price(dec!(110))).unwrap();
        let actions = engine.on_tick(price(dec!(107))).unwrap();

        assert!(placed_order(&actions).is_none());
        assert!(!engine.is_submitting());
        assert_eq!(engine.contract().run_state(), RunState::Waiting);
    }

    // =========================================================================
    // Buy run
    // =========================================================================

    #[test]
    fn test_buy_run_ratchets_down_and_triggers() {
        let mut engine = seeded_engine(config().with_margin_risk(dec!(0.5)));

        engine.on_tick(price(dec!(94))).unwrap();
        assert_eq!(engine.contract().run_state(), RunState::TrailingBuy);
        assert_eq!(engine.contract().buy_order_limit(), dec!(95.88));

        engine.on_tick(price(dec!(90))).unwrap();
        assert_eq!(engine.contract().buy_order_limit(), dec!(91.8));

        let actions = engine.on_tick(price(dec!(92))).unwrap();
        assert_eq!(engine.contract().buy_order_limit(), dec!(91.8));

        let order = placed_order(&actions).expect("stop order");
        assert_eq!(order.side, OrderSide::Buy);
        assert_eq!(order.stop_price.as_decimal(), dec!(91.8));
        assert_eq!(order.quantity.as_decimal(), sizing::buy_quantity(engine.contract(), dec!(91.8)));
        assert!(order.quantity.as_decimal() * dec!(91.8) <= dec!(500));
    }

    // =========================================================================
    // Orders and fills
    // =========================================================================

    #[test]
    fn test_ticks_ignored_until_order_placed() {
        let mut engine = seeded_engine(config());
        engine.on_tick(price(dec!(110))).unwrap();
        engine.on_tick(price(dec!(107))).unwrap();

        // Still below the limit, but no second order
        let actions = engine.on_tick(price(dec!(106))).unwrap();
        assert!(actions.is_empty());

        engine.order_placed(OrderSide::Sell, 77).unwrap();
        assert!(!engine.is_submitting());
        assert_eq!(engine.contract().sell_order_id(), Some(77));
        assert_eq!(engine.contract().buy_order_id(), None);
    }

    #[test]
    fn test_sell_fill_resets_contract() {
        let mut engine = seeded_engine(config());
        engine.on_tick(price(dec!(110))).unwrap();
        engine.on_tick(price(dec!(107))).unwrap();
        engine.order_placed(OrderSide::Sell, 77).unwrap();

        let fill = details(&engine, 77, dec!(107.8), dec!(10));
        let outcome = engine.apply_sell_fill(&fill).unwrap();

        let contract = engine.contract();
        assert_eq!(contract.buy_order_id(), None);
        assert_eq!(contract.sell_order_id(), None);
        assert_eq!(contract.run_state(), RunState::Waiting);
        assert_eq!(contract.quantity(), Decimal::ZERO);
        assert_eq!(contract.funding(), dec!(2078));
        assert_eq!(contract.average_price(), dec!(100));
        assert_eq!(contract.sell_order_limit(), Decimal::ZERO);
        assert_eq!(outcome.funding, dec!(2078));
    }

    #[test]
    fn test_buy_fill_moves_bounds() {
        let mut engine = seeded_engine(config());
        engine.on_tick(price(dec!(90))).unwrap();
        engine.on_tick(price(dec!(92))).unwrap();
        engine.order_placed(OrderSide::Buy, 5).unwrap();

        let fill = details(&engine, 5, dec!(90), dec!(10));
        engine.apply_buy_fill(&fill).unwrap();

        let contract = engine.contract();
        assert_eq!(contract.average_price(), dec!(95));
        assert_eq!(contract.quantity(), dec!(20));
        assert_eq!(contract.funding(), dec!(100));
        assert_eq!(contract.upper_bound(), dec!(99.75));
        assert_eq!(contract.lower_bound(), dec!(90.25));
        assert_eq!(contract.buy_order_id(), None);
        assert_eq!(contract.run_state(), RunState::Waiting);
    }

    #[test]
    fn test_fill_without_outstanding_order_is_violation() {
        let mut engine = seeded_engine(config());
        let fill = details(&engine, 1, dec!(100), dec!(1));

        let err = engine.apply_buy_fill(&fill).unwrap_err();
        assert!(matches!(err, EngineError::InvariantViolation { .. }));
        assert_eq!(engine.contract().quantity(), dec!(10));
    }

    #[test]
    fn test_fill_for_other_order_is_violation() {
        let mut engine = seeded_engine(config());
        engine.order_placed(OrderSide::Sell, 2).unwrap();

        let fill = details(&engine, 3, dec!(100), dec!(1));
        assert!(matches!(
            engine.apply_sell_fill(&fill),
            Err(EngineError::InvariantViolation { .. })
        ));
        assert_eq!(engine.contract().sell_order_id(), Some(2));
    }

    #[test]
    fn test_oversized_sell_fill_is_violation() {
        let mut engine = seeded_engine(config());
        engine.order_placed(OrderSide::Sell, 2).unwrap();

        let fill = details(&engine, 2, dec!(100), dec!(11));
        assert!(engine.apply_sell_fill(&fill).is_err());
    }

    #[test]
    fn test_second_order_is_violation() {
        let mut engine = seeded_engine(config());
        engine.order_placed(OrderSide::Buy, 1).unwrap();

        let err = engine.order_placed(OrderSide::Sell, 2).unwrap_err();
        assert!(err.to_string().contains("outstanding"));
        assert_eq!(engine.contract().sell_order_id(), None);
    }

    #[test]
    fn test_conflicting_ids_surface_on_tick() {
        let mut engine = seeded_engine(config());
        engine.editor.set_buy_order_id(Some(1));
        engine.editor.set_sell_order_id(Some(2));

        assert!(matches!(
            engine.on_tick(price(dec!(100))),
            Err(EngineError::InvariantViolation { .. })
        ));
        // Nothing is corrected behind the driver's back
        assert!(engine.contract().has_conflicting_orders());
    }

    #[test]
    fn test_outstanding_order_cancelled_in_dead_zone() {
        let mut engine = seeded_engine(config());
        engine.on_tick(price(dec!(110))).unwrap();
        engine.on_tick(price(dec!(107))).unwrap();
        engine.order_placed(OrderSide::Sell, 9).unwrap();

        // Outside the dead zone the order is left alone
        assert!(engine.on_tick(price(dec!(106))).unwrap().is_empty());

        let actions = engine.on_tick(price(dec!(101))).unwrap();
        assert_eq!(
            actions,
            vec![EngineAction::CancelOrder {
                symbol: engine.symbol().clone(),
                side: OrderSide::Sell,
                order_id: 9,
            }]
        );
        // Kept until the broker confirms
        assert_eq!(engine.contract().sell_order_id(), Some(9));

        let actions = engine.cancel_confirmed(OrderSide::Sell, 9).unwrap();
        assert!(actions.contains(&EngineAction::RunStateChanged {
            symbol: engine.symbol().clone(),
            previous: RunState::TrailingSell,
            new: RunState::Waiting,
        }));
        assert_eq!(engine.contract().sell_order_id(), None);
        assert_eq!(engine.contract().run_state(), RunState::Waiting);
    }

    #[test]
    fn test_failed_cancel_keeps_order_for_its_fill() {
        let mut engine = seeded_engine(config());
        engine.on_tick(price(dec!(110))).unwrap();
        engine.on_tick(price(dec!(107))).unwrap();
        engine.order_placed(OrderSide::Sell, 9).unwrap();

        engine.on_tick(price(dec!(101))).unwrap();
        engine.cancel_failed(OrderSide::Sell, 9, "broker unavailable");

        assert_eq!(engine.contract().sell_order_id(), Some(9));
        assert_eq!(engine.contract().run_state(), RunState::TrailingSell);

        // The next dead-zone tick retries
        assert_eq!(engine.on_tick(price(dec!(100))).unwrap().len(), 1);

        let fill = details(&engine, 9, dec!(107.8), dec!(10));
        engine.apply_sell_fill(&fill).unwrap();
        assert_eq!(engine.contract().quantity(), Decimal::ZERO);
        assert_eq!(engine.contract().funding(), dec!(2078));
    }

    #[test]
    fn test_cancel_confirmed_for_unknown_order_is_violation() {
        let mut engine = seeded_engine(config());
        engine.order_placed(OrderSide::Buy, 4).unwrap();

        assert!(matches!(
            engine.cancel_confirmed(OrderSide::Buy, 5),
            Err(EngineError::InvariantViolation { .. })
        ));
        assert_eq!(engine.contract().buy_order_id(), Some(4));
    }

    #[test]
    fn test_manual_order_survives_dead_zone_ticks() {
        let mut engine = seeded_engine(config());
        let order = engine.market_order(OrderSide::Buy, price(dec!(100))).unwrap();
        engine.market_order_placed(OrderSide::Buy, 3).unwrap();

        assert!(engine.on_tick(price(dec!(100))).unwrap().is_empty());
        assert!(engine.cancel_outstanding().is_empty());
        assert_eq!(engine.contract().buy_order_id(), Some(3));

        let fill = details(&engine, 3, dec!(100), order.quantity.as_decimal());
        engine.apply_buy_fill(&fill).unwrap();

        assert_eq!(engine.contract().buy_order_id(), None);
        assert_eq!(engine.contract().quantity(), dec!(10) + order.quantity.as_decimal());
    }

    #[test]
    fn test_rejected_order_restarts_run() {
        let mut engine = seeded_engine(config());
        engine.on_tick(price(dec!(110))).unwrap();
        engine.on_tick(price(dec!(107))).unwrap();

        engine.order_rejected(OrderSide::Sell, "insufficient shares");

        assert!(!engine.is_submitting());
        assert_eq!(engine.contract().run_state(), RunState::Waiting);
        assert_eq!(engine.contract().sell_order_id(), None);
    }

    #[test]
    fn test_cancel_without_order_is_noop() {
        let mut engine = seeded_engine(config());
        assert!(engine.cancel_outstanding().is_empty());
    }

    #[test]
    fn test_market_order_sizing() {
        let engine = seeded_engine(config().with_margin_risk(dec!(0.2)));

        let buy = engine.market_order(OrderSide::Buy, price(dec!(50))).unwrap();
        assert_eq!(buy.quantity.as_decimal(), dec!(4));
        assert!(buy.notional() <= dec!(200));

        let sell = engine.market_order(OrderSide::Sell, price(dec!(120))).unwrap();
        assert_eq!(sell.quantity.as_decimal(), dec!(10));
    }
}
