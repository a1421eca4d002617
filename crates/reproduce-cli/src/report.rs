// crates/reproduce-cli/src/report.rs
// ============================================================================
// Module: Verdict Reporting
// Description: Human and JSON rendering of outcomes plus exit code mapping.
// Purpose: Keep presentation rules out of the binary entry point.
// Dependencies: reproduce-core, serde_json
// ============================================================================

//! ## Overview
//! Each outcome maps to an exit code: `0` reproduced, `1` built but not
//! reproduced, `2` not applicable or cancelled. A batch exits with the worst
//! code among its specs. JSON output is the recorded verdict, or `false` when
//! no verdict applies; batches render an object keyed by spec.

// ============================================================================
// SECTION: Imports
// ============================================================================

use reproduce_core::ReproduceOutcome;
use serde_json::Map;
use serde_json::Value;

use crate::t;

// ============================================================================
// SECTION: Exit Codes
// ============================================================================

/// Exit code for a reproduced package.
pub const EXIT_REPRODUCED: u8 = 0;
/// Exit code for a package that built but did not match.
pub const EXIT_NOT_REPRODUCED: u8 = 1;
/// Exit code for inapplicable specs, cancellation, and setup errors.
pub const EXIT_NOT_APPLICABLE: u8 = 2;

/// Returns the exit code for a single outcome.
#[must_use]
pub fn exit_code_for(outcome: &ReproduceOutcome) -> u8 {
    if outcome.is_reproduced() {
        EXIT_REPRODUCED
    } else if outcome.as_result().is_some() {
        EXIT_NOT_REPRODUCED
    } else {
        EXIT_NOT_APPLICABLE
    }
}

/// Returns the worst exit code across outcomes, `0` when empty.
#[must_use]
pub fn worst_exit_code<'a, I>(outcomes: I) -> u8
where
    I: IntoIterator<Item = &'a ReproduceOutcome>,
{
    outcomes.into_iter().map(exit_code_for).max().unwrap_or(EXIT_REPRODUCED)
}

// ============================================================================
// SECTION: Human Output
// ============================================================================

/// Renders the one-line human summary for a spec.
#[must_use]
pub fn render_human(spec: &str, outcome: &ReproduceOutcome) -> String {
    match outcome {
        ReproduceOutcome::Recorded(result) => {
            let line = if result.reproduced {
                t!("verdict.reproduced", spec = spec, source = result.source.spec, strategy = result.strategy)
            } else {
                t!("verdict.not_reproduced", spec = spec, source = result.source.spec, strategy = result.strategy)
            };
            if result.attested { t!("verdict.attested", line = line) } else { line }
        }
        ReproduceOutcome::NotApplicable => t!("verdict.not_applicable", spec = spec),
        ReproduceOutcome::Cancelled => t!("verdict.cancelled", spec = spec),
    }
}

// ============================================================================
// SECTION: JSON Output
// ============================================================================

/// Converts an outcome to its JSON value.
///
/// Cancelled runs render as `null` since no verdict was reached.
///
/// # Errors
///
/// Returns [`serde_json::Error`] when the verdict cannot be serialized.
pub fn outcome_json(outcome: &ReproduceOutcome) -> Result<Value, serde_json::Error> {
    match outcome {
        ReproduceOutcome::Recorded(result) => serde_json::to_value(result.as_ref()),
        ReproduceOutcome::NotApplicable => Ok(Value::Bool(false)),
        ReproduceOutcome::Cancelled => Ok(Value::Null),
    }
}

/// Renders the JSON document for a run.
///
/// A single-spec run renders the bare value; a batch renders an object keyed
/// by spec.
///
/// # Errors
///
/// Returns [`serde_json::Error`] when a verdict cannot be serialized.
pub fn render_json(results: &[(String, ReproduceOutcome)], batch: bool) -> Result<String, serde_json::Error> {
    if !batch && let [(_, outcome)] = results {
        return serde_json::to_string_pretty(&outcome_json(outcome)?);
    }
    let mut object = Map::new();
    for (spec, outcome) in results {
        object.insert(spec.clone(), outcome_json(outcome)?);
    }
    serde_json::to_string_pretty(&Value::Object(object))
}
