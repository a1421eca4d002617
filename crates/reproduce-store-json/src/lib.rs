// crates/reproduce-store-json/src/lib.rs
// ============================================================================
// Module: JSON Cache Store
// Description: Durable CacheStore backend using a single JSON file.
// Purpose: Persist reproduction verdicts across runs and concurrent writers.
// Dependencies: reproduce-core, fs2, serde_json, tempfile
// ============================================================================

//! ## Overview
//! This crate provides a file-backed [`reproduce_core::CacheStore`] whose
//! on-disk format is a JSON object mapping spec strings to verdict records or
//! `false`. Writers merge with the current file contents under an exclusive
//! lock and replace the file atomically, so concurrent workers and processes
//! never drop each other's entries.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::DEFAULT_CACHE_FILE;
pub use store::JsonCacheStore;
pub use store::JsonStoreError;
