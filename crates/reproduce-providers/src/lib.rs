// crates/reproduce-providers/src/lib.rs
// ============================================================================
// Module: Reproduce Providers
// Description: Registry manifest provider and system process runner.
// Purpose: Connect the reproduction engine to the registry and the host OS.
// Dependencies: reproduce-core, reqwest, serde, thiserror, tokio-util, tracing
// ============================================================================

//! ## Overview
//! This crate ships the production implementations of the engine's I/O seams:
//! [`RegistryManifestProvider`] fetches version manifests over HTTPS with
//! strict size and time limits, and [`SystemProcessRunner`] executes build
//! commands without a shell under per-stage timeouts and cooperative
//! cancellation. The [`semver`] module resolves registry ranges.
//! Invariants:
//! - Registry responses larger than the configured limit fail closed.
//! - Child processes never outlive a timeout or a cancellation.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod process;
pub mod registry;
pub mod semver;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use process::ProcessTimeouts;
pub use process::SystemProcessRunner;
pub use registry::RegistryManifestProvider;
pub use registry::RegistryProviderConfig;
pub use semver::Range;
pub use semver::SemverError;
pub use semver::Version;
