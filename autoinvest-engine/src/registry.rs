//! Contract registry: one engine per symbol.
//!
//! Registration is where a contract's write capability changes hands. The
//! registry turns a second registration for the same symbol into an error
//! instead of quietly creating a second writer.

use std::collections::BTreeMap;

use tracing::info;

use autoinvest_domain::{Contract, Symbol};

use crate::engine::Engine;
use crate::error::{EngineError, EngineResult};

/// Owner of every registered contract's engine.
#[derive(Debug, Default)]
pub struct ContractRegistry {
    engines: BTreeMap<Symbol, Engine>,
}

impl ContractRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a contract and take its write capability.
    ///
    /// # Errors
    ///
    /// `EngineError::AlreadyRegistered` if the symbol already has an engine.
    pub fn register(&mut self, contract: Contract) -> EngineResult<&mut Engine> {
        let symbol = contract.symbol().clone();
        if self.engines.contains_key(&symbol) {
            return Err(EngineError::AlreadyRegistered(symbol));
        }

        info!(%symbol, funding = %contract.funding(), "Contract registered");
        let engine = Engine::new(contract.register_editor());
        Ok(self.engines.entry(symbol).or_insert(engine))
    }

    /// Registered symbols in order.
    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.engines.keys()
    }

    pub fn len(&self) -> usize {
        self.engines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.engines.is_empty()
    }

    /// Hand every engine to its own owner (e.g., one task per symbol).
    pub fn into_engines(self) -> impl Iterator<Item = Engine> {
        self.engines.into_values()
    }
}
