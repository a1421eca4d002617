// crates/reproduce-cli/src/logging.rs
// ============================================================================
// Module: CLI Logging
// Description: Tracing subscriber setup for the reproduce binary.
// Purpose: Route structured diagnostics to stderr with a configurable filter.
// Dependencies: tracing-subscriber
// ============================================================================

//! ## Overview
//! Diagnostics go to stderr so stdout stays reserved for verdicts. The
//! filter comes from `--log-level` when given, then the `REPRODUCE_LOG`
//! environment variable, then [`DEFAULT_LOG_FILTER`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;
use tracing_subscriber::EnvFilter;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Environment variable holding the log filter.
pub const LOG_ENV_VAR: &str = "REPRODUCE_LOG";
/// Filter used when neither the flag nor the environment sets one.
pub const DEFAULT_LOG_FILTER: &str = "warn";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Logging setup failures.
#[derive(Debug, Error)]
#[error("invalid log filter '{filter}': {message}")]
pub struct LoggingError {
    /// Filter directive that failed to parse.
    pub filter: String,
    /// Parser message.
    pub message: String,
}

// ============================================================================
// SECTION: Setup
// ============================================================================

/// Resolves the effective filter from the flag and environment values.
///
/// An explicit flag value must parse. A malformed environment value falls
/// back to the default rather than failing the run.
///
/// # Errors
///
/// Returns [`LoggingError`] when `flag` is not a valid filter directive.
pub fn resolve_filter(flag: Option<&str>, env_value: Option<&str>) -> Result<EnvFilter, LoggingError> {
    if let Some(filter) = flag {
        return EnvFilter::try_new(filter).map_err(|err| LoggingError {
            filter: filter.to_string(),
            message: err.to_string(),
        });
    }
    let filter = env_value
        .filter(|value| !value.trim().is_empty())
        .and_then(|value| EnvFilter::try_new(value).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER));
    Ok(filter)
}

/// Installs the global stderr subscriber.
///
/// A subscriber installed earlier (for example by a test harness) is kept.
///
/// # Errors
///
/// Returns [`LoggingError`] when `flag` is not a valid filter directive.
pub fn init_logging(flag: Option<&str>) -> Result<(), LoggingError> {
    let env_value = std::env::var(LOG_ENV_VAR).ok();
    let filter = resolve_filter(flag, env_value.as_deref())?;
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).with_target(false).try_init();
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
