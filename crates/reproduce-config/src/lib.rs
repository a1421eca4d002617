// crates/reproduce-config/src/lib.rs
// ============================================================================
// Module: Reproduce Config Library
// Description: Configuration model and validation for reproduce.toml.
// Purpose: Single source of truth for configuration semantics.
// Dependencies: dirs, serde, thiserror, toml
// ============================================================================

//! ## Overview
//! `reproduce-config` defines the `reproduce.toml` model. Loading is strict:
//! unknown fields, oversized files, and out-of-range values are rejected
//! before any package is processed.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
