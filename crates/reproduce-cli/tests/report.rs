// crates/reproduce-cli/tests/report.rs
// ============================================================================
// Module: Verdict Reporting Tests
// Description: Exit code mapping and human/JSON rendering.
// Purpose: Ensure verdict presentation stays stable for scripts.
// Dependencies: reproduce-cli, reproduce-core, serde_json, time
// ============================================================================

//! ## Overview
//! Covers the exit code table, batch aggregation, and both output formats.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use reproduce_cli::report::EXIT_NOT_APPLICABLE;
use reproduce_cli::report::EXIT_NOT_REPRODUCED;
use reproduce_cli::report::EXIT_REPRODUCED;
use reproduce_cli::report::exit_code_for;
use reproduce_cli::report::render_human;
use reproduce_cli::report::render_json;
use reproduce_cli::report::worst_exit_code;
use reproduce_core::PackageRecord;
use reproduce_core::ReproduceOutcome;
use reproduce_core::ReproductionResult;
use reproduce_core::SourceRecord;
use serde_json::Value;
use time::OffsetDateTime;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

fn recorded(reproduced: bool, attested: bool) -> ReproduceOutcome {
    ReproduceOutcome::Recorded(Box::new(ReproductionResult {
        reproduce_version: "0.1.0".to_string(),
        timestamp: OffsetDateTime::UNIX_EPOCH,
        os: "linux".to_string(),
        arch: "x64".to_string(),
        strategy: "npm:10.2.4".to_string(),
        reproduced,
        attested,
        package: PackageRecord {
            spec: "left-pad@1.3.0".to_string(),
            name: "left-pad".to_string(),
            version: "1.3.0".to_string(),
            location: "https://registry.npmjs.org/left-pad/-/left-pad-1.3.0.tgz".to_string(),
            integrity: Some("sha512-a".to_string()),
        },
        source: SourceRecord {
            spec: "github:stevemao/left-pad#abc123".to_string(),
            location: "https://github.com/stevemao/left-pad.git".to_string(),
            integrity: Some(if reproduced { "sha512-a" } else { "sha512-b" }.to_string()),
        },
    }))
}

// ============================================================================
// SECTION: Exit Codes
// ============================================================================

/// Verifies each outcome maps to its documented exit code.
#[test]
fn exit_codes_follow_verdicts() {
    assert_eq!(exit_code_for(&recorded(true, false)), EXIT_REPRODUCED);
    assert_eq!(exit_code_for(&recorded(false, true)), EXIT_NOT_REPRODUCED);
    assert_eq!(exit_code_for(&ReproduceOutcome::NotApplicable), EXIT_NOT_APPLICABLE);
    assert_eq!(exit_code_for(&ReproduceOutcome::Cancelled), EXIT_NOT_APPLICABLE);
}

/// Verifies a batch exits with its worst code.
#[test]
fn worst_exit_code_wins() {
    let outcomes = [recorded(true, false), recorded(false, false), recorded(true, true)];
    assert_eq!(worst_exit_code(outcomes.iter()), EXIT_NOT_REPRODUCED);
    let outcomes = [recorded(true, false), ReproduceOutcome::NotApplicable];
    assert_eq!(worst_exit_code(outcomes.iter()), EXIT_NOT_APPLICABLE);
    assert_eq!(worst_exit_code(std::iter::empty()), EXIT_REPRODUCED);
}

// ============================================================================
// SECTION: Human Output
// ============================================================================

/// Verifies the human lines name the spec, source, and strategy.
#[test]
fn human_lines_describe_verdicts() {
    assert_eq!(
        render_human("left-pad@1.3.0", &recorded(true, false)),
        "left-pad@1.3.0: reproduced from github:stevemao/left-pad#abc123 (npm:10.2.4)"
    );
    assert_eq!(
        render_human("left-pad@1.3.0", &recorded(false, true)),
        "left-pad@1.3.0: not reproduced from github:stevemao/left-pad#abc123 (npm:10.2.4) [provenance attested]"
    );
    assert_eq!(render_human("x", &ReproduceOutcome::NotApplicable), "x: not applicable");
    assert_eq!(render_human("x", &ReproduceOutcome::Cancelled), "x: cancelled");
}

// ============================================================================
// SECTION: JSON Output
// ============================================================================

/// Verifies single-spec JSON is the bare record or `false`.
#[test]
fn single_json_is_bare_value() {
    let rendered = render_json(&[("left-pad@1.3.0".to_string(), recorded(true, false))], false).unwrap();
    let value: Value = serde_json::from_str(&rendered).unwrap();
    assert_eq!(value["reproduced"], Value::Bool(true));
    assert_eq!(value["reproduceVersion"], "0.1.0");
    assert_eq!(value["package"]["name"], "left-pad");

    let rendered = render_json(&[("bad".to_string(), ReproduceOutcome::NotApplicable)], false).unwrap();
    assert_eq!(rendered, "false");
}

/// Verifies batch JSON is keyed by spec.
#[test]
fn batch_json_is_keyed_by_spec() {
    let results = vec![
        ("left-pad@1.3.0".to_string(), recorded(false, false)),
        ("bad".to_string(), ReproduceOutcome::NotApplicable),
        ("late".to_string(), ReproduceOutcome::Cancelled),
    ];
    let value: Value = serde_json::from_str(&render_json(&results, true).unwrap()).unwrap();
    assert_eq!(value["left-pad@1.3.0"]["reproduced"], Value::Bool(false));
    assert_eq!(value["bad"], Value::Bool(false));
    assert_eq!(value["late"], Value::Null);
}
