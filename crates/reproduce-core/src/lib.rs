// crates/reproduce-core/src/lib.rs
// ============================================================================
// Module: Reproduce Core Library
// Description: Public API surface for the reproduction engine.
// Purpose: Expose the data model, collaborator interfaces, and runtime engine.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Reproduce core decides whether a published registry package can be rebuilt
//! from its declared source repository with an identical integrity digest.
//! The crate owns the decision pipeline only; manifest fetching, process
//! execution, build tooling, and durable caching plug in through the traits
//! in [`interfaces`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use interfaces::BuildStrategy;
pub use interfaces::CacheStore;
pub use interfaces::CommandSpec;
pub use interfaces::ManifestError;
pub use interfaces::ManifestProvider;
pub use interfaces::PackedArtifact;
pub use interfaces::ProcessError;
pub use interfaces::ProcessRunner;
pub use interfaces::ProcessStage;
pub use interfaces::StoreError;
pub use interfaces::StrategyError;
pub use runtime::EngineConfig;
pub use runtime::InMemoryCacheStore;
pub use runtime::ReproduceOutcome;
pub use runtime::ReproduceRequest;
pub use runtime::ReproductionEngine;
pub use runtime::SOURCES_DIR_NAME;
pub use runtime::SharedCacheStore;
