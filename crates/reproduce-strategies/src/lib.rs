// crates/reproduce-strategies/src/lib.rs
// ============================================================================
// Module: Reproduce Build Strategies
// Description: Built-in build strategies and the name-keyed strategy registry.
// Purpose: Describe how each package manager installs and packs a checkout.
// Dependencies: reproduce-core, serde, serde_json, tracing
// ============================================================================

//! ## Overview
//! This crate ships the `npm` and `pnpm` build strategies and a registry that
//! resolves a strategy by name once at startup. Strategies only describe
//! commands; execution belongs to the engine's process runner.
//! Invariants:
//! - Strategy names are unique within a [`StrategyRegistry`].
//! - An unregistered name fails before any network or process activity.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod npm;
pub mod pnpm;
pub mod registry;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use npm::NpmStrategy;
pub use pnpm::PnpmStrategy;
pub use registry::DEFAULT_STRATEGY;
pub use registry::StrategyRegistry;
