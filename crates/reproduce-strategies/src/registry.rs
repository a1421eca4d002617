// crates/reproduce-strategies/src/registry.rs
// ============================================================================
// Module: Strategy Registry
// Description: Name-keyed lookup table of build strategies.
// Purpose: Resolve the configured strategy once, before any I/O.
// Dependencies: reproduce-core
// ============================================================================

//! ## Overview
//! The registry maps strategy names to shared strategy instances. Hosts may
//! register additional strategies; names are unique.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use reproduce_core::BuildStrategy;
use reproduce_core::StrategyError;

use crate::npm::NpmStrategy;
use crate::pnpm::PnpmStrategy;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Strategy used when none is configured.
pub const DEFAULT_STRATEGY: &str = "npm";

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Build strategy registry keyed by strategy name.
///
/// # Invariants
/// - Strategy names are unique within the registry.
/// - Registered strategies are `Send + Sync` and shared behind `Arc`.
#[derive(Default)]
pub struct StrategyRegistry {
    /// Strategy implementations keyed by name.
    strategies: BTreeMap<String, Arc<dyn BuildStrategy>>,
}

impl StrategyRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            strategies: BTreeMap::new(),
        }
    }

    /// Creates a registry with the built-in strategies registered.
    #[must_use]
    pub fn with_builtin_strategies() -> Self {
        let mut strategies: BTreeMap<String, Arc<dyn BuildStrategy>> = BTreeMap::new();
        strategies.insert("npm".to_string(), Arc::new(NpmStrategy::new()));
        strategies.insert("pnpm".to_string(), Arc::new(PnpmStrategy::new()));
        Self {
            strategies,
        }
    }

    /// Registers a strategy under its own name.
    ///
    /// # Errors
    ///
    /// Returns [`StrategyError::Duplicate`] when the name is already taken.
    pub fn register_strategy(&mut self, strategy: impl BuildStrategy + 'static) -> Result<(), StrategyError> {
        let name = strategy.name().to_string();
        if self.strategies.contains_key(&name) {
            return Err(StrategyError::Duplicate(name));
        }
        self.strategies.insert(name, Arc::new(strategy));
        Ok(())
    }

    /// Resolves a strategy by name.
    ///
    /// # Errors
    ///
    /// Returns [`StrategyError::Unknown`] when no strategy has that name.
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn BuildStrategy>, StrategyError> {
        self.strategies.get(name).cloned().ok_or_else(|| StrategyError::Unknown(name.to_string()))
    }

    /// Returns true when a strategy is registered under `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.strategies.contains_key(name)
    }

    /// Returns the registered names in sorted order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.strategies.keys().map(String::as_str).collect()
    }
}
