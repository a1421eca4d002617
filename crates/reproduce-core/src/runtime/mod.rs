// crates/reproduce-core/src/runtime/mod.rs
// ============================================================================
// Module: Reproduce Runtime
// Description: Reproduction engine, checkout planning, and in-memory store.
// Purpose: Execute the reproduction pipeline against pluggable collaborators.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! The runtime composes the validator, manifest provider, locator resolver,
//! build strategy, and cache store into a single per-spec pipeline. Every
//! call terminates in a [`ReproduceOutcome`]; per-spec failures never escape.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod checkout;
pub mod engine;
pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use checkout::checkout_plan;
pub use engine::EngineConfig;
pub use engine::ReproduceOutcome;
pub use engine::ReproduceRequest;
pub use engine::ReproductionEngine;
pub use engine::SOURCES_DIR_NAME;
pub use store::InMemoryCacheStore;
pub use store::SharedCacheStore;
