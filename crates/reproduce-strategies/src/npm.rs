// crates/reproduce-strategies/src/npm.rs
// ============================================================================
// Module: npm Strategy
// Description: Build strategy driving the npm CLI.
// Purpose: Install dependencies and read the packed integrity from npm.
// Dependencies: reproduce-core, serde, serde_json
// ============================================================================

//! ## Overview
//! `npm pack --dry-run --json` reports the integrity of the tarball it would
//! publish without writing it. Lifecycle scripts run during packing may print
//! to stdout ahead of the JSON report, so the parser scans for the first
//! well-formed JSON array.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;

use reproduce_core::BuildStrategy;
use reproduce_core::CommandSpec;
use reproduce_core::PackedArtifact;
use reproduce_core::ProcessStage;
use reproduce_core::StrategyError;
use serde::Deserialize;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// npm executable name.
const NPM_PROGRAM: &str = "npm";

// ============================================================================
// SECTION: Types
// ============================================================================

/// One entry of the `npm pack --json` report.
#[derive(Debug, Deserialize)]
struct PackReport {
    /// Tarball integrity.
    #[serde(default)]
    integrity: Option<String>,
}

/// Build strategy for npm.
#[derive(Debug, Default, Clone, Copy)]
pub struct NpmStrategy;

impl NpmStrategy {
    /// Creates the npm strategy.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl BuildStrategy for NpmStrategy {
    fn name(&self) -> &str {
        "npm"
    }

    fn tool_version_command(&self) -> CommandSpec {
        CommandSpec::new(NPM_PROGRAM, ["--version"], ProcessStage::Version)
    }

    fn install(&self, dir: &Path) -> CommandSpec {
        CommandSpec::new(NPM_PROGRAM, ["install", "--no-audit", "--no-fund", "--silent"], ProcessStage::Install)
            .in_dir(dir)
    }

    fn pack(&self, dir: &Path) -> CommandSpec {
        CommandSpec::new(NPM_PROGRAM, ["pack", "--dry-run", "--json"], ProcessStage::Pack).in_dir(dir)
    }

    fn parse_pack(&self, _dir: &Path, output: &str) -> Result<PackedArtifact, StrategyError> {
        let reports = parse_pack_reports(output)?;
        let integrity = reports.into_iter().next().and_then(|report| report.integrity);
        Ok(PackedArtifact {
            integrity,
        })
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Finds and parses the JSON report array in pack output.
fn parse_pack_reports(output: &str) -> Result<Vec<PackReport>, StrategyError> {
    let starts = output
        .char_indices()
        .filter(|(index, ch)| *ch == '[' && (*index == 0 || output[.. *index].ends_with('\n')))
        .map(|(index, _)| index);
    for start in starts {
        let mut stream = serde_json::Deserializer::from_str(&output[start ..]).into_iter::<Vec<PackReport>>();
        if let Some(Ok(reports)) = stream.next() {
            return Ok(reports);
        }
    }
    Err(StrategyError::Parse("npm pack output contains no json report".to_string()))
}

// ============================================================================
// SECTION: Tests
// ============================================================================
