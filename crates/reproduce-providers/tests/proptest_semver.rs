// crates/reproduce-providers/tests/proptest_semver.rs
// ============================================================================
// Module: Semver Property-Based Tests
// Description: Randomized checks for version parsing and range matching.
// Purpose: Ensure range desugaring agrees with version ordering without panics.
// Dependencies: reproduce-providers, proptest
// ============================================================================
//! ## Overview
//! Properties over generated versions: display round-trips, caret and tilde
//! ranges contain their base, and prereleases never satisfy wildcards.

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
    reason = "Test-only assertions and helpers are permitted."
)]

use proptest::prelude::*;
use reproduce_providers::Range;
use reproduce_providers::Version;

proptest! {
    #[test]
    fn version_display_round_trips(major in 0u64 .. 10_000, minor in 0u64 .. 10_000, patch in 0u64 .. 10_000) {
        let version = Version::new(major, minor, patch);
        prop_assert_eq!(Version::parse(&version.to_string()).unwrap(), version);
    }

    #[test]
    fn caret_and_tilde_contain_base(major in 0u64 .. 50, minor in 0u64 .. 50, patch in 0u64 .. 50) {
        let version = Version::new(major, minor, patch);
        let caret = format!("^{version}");
        let tilde = format!("~{version}");
        let gte = format!(">={version}");
        let gt = format!(">{version}");
        prop_assert!(Range::parse(&caret).unwrap().satisfies(&version));
        prop_assert!(Range::parse(&tilde).unwrap().satisfies(&version));
        prop_assert!(Range::parse(&gte).unwrap().satisfies(&version));
        prop_assert!(!Range::parse(&gt).unwrap().satisfies(&version));
    }

    #[test]
    fn caret_excludes_next_breaking(major in 1u64 .. 50, minor in 0u64 .. 50, patch in 0u64 .. 50) {
        let range = Range::parse(&format!("^{major}.{minor}.{patch}")).unwrap();
        prop_assert!(!range.satisfies(&Version::new(major + 1, 0, 0)));
        prop_assert!(range.satisfies(&Version::new(major, minor + 1, 0)));
    }

    #[test]
    fn prereleases_never_satisfy_wildcard(major in 0u64 .. 50, tag in "[a-z]{1,8}") {
        let version = Version::parse(&format!("{major}.0.0-{tag}")).unwrap();
        prop_assert!(!Range::parse("*").unwrap().satisfies(&version));
    }

    #[test]
    fn arbitrary_input_never_panics(input in ".{0,40}") {
        let _ = Range::parse(&input);
        let _ = Version::parse(&input);
    }
}
