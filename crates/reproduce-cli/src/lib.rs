// crates/reproduce-cli/src/lib.rs
// ============================================================================
// Module: Reproduce CLI Library
// Description: Shared helpers for the reproduce command-line interface.
// Purpose: Provide reusable components for the CLI binary and tests.
// Dependencies: reproduce-core, serde_json, tokio, tokio-util, tracing-subscriber
// ============================================================================

//! ## Overview
//! This library houses the pieces of the `reproduce` binary that are worth
//! testing on their own: the message catalog, the batch runner, verdict
//! rendering and exit codes, and logging setup. The binary entry point
//! (`src/main.rs`) wires them to the real engine.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod batch;
/// Internationalization helpers and message catalog.
pub mod i18n;
pub mod logging;
pub mod report;
