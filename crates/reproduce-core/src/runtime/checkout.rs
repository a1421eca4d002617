// crates/reproduce-core/src/runtime/checkout.rs
// ============================================================================
// Module: Source Checkout Plan
// Description: Git command sequence that materializes a locator on disk.
// Purpose: Describe a shallow, ref-pinned checkout as structured commands.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! A checkout initializes an empty repository in the work directory, adds the
//! clone URL as `origin`, fetches exactly the requested ref at depth one, and
//! detaches onto it. Fetching the ref directly works for commits, tags, and
//! branches alike, which a `clone --depth 1` of the default branch does not.
//! The work directory must exist before the plan runs.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;

use crate::core::SourceLocator;
use crate::interfaces::CommandSpec;
use crate::interfaces::ProcessStage;

// ============================================================================
// SECTION: Plan
// ============================================================================

/// Returns the git commands that check out `locator` into `work_dir`.
#[must_use]
pub fn checkout_plan(locator: &SourceLocator, work_dir: &Path) -> Vec<CommandSpec> {
    let git = |args: Vec<String>| CommandSpec::new("git", args, ProcessStage::Clone).in_dir(work_dir);
    vec![
        git(vec!["init".to_string(), "--quiet".to_string()]),
        git(vec![
            "remote".to_string(),
            "add".to_string(),
            "origin".to_string(),
            locator.clone_url(),
        ]),
        git(vec![
            "fetch".to_string(),
            "--quiet".to_string(),
            "--depth".to_string(),
            "1".to_string(),
            "origin".to_string(),
            locator.git_ref().to_string(),
        ]),
        git(vec![
            "checkout".to_string(),
            "--quiet".to_string(),
            "--detach".to_string(),
            "FETCH_HEAD".to_string(),
            "--".to_string(),
        ]),
    ]
}
