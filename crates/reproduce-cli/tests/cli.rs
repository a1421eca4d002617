// crates/reproduce-cli/tests/cli.rs
// ============================================================================
// Module: CLI Binary Tests
// Description: Runs the reproduce binary against seeded caches.
// Purpose: Exercise argument handling, output, and exit codes end to end.
// Dependencies: reproduce-cli binary, serde_json, tempfile
// ============================================================================

//! ## Overview
//! Every scenario either short-circuits on spec validation or hits a seeded
//! cache entry, so no network or build tool is needed.

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

use std::fs;
use std::path::PathBuf;
use std::process::Command;
use std::process::Output;

use serde_json::Value;
use serde_json::json;
use tempfile::TempDir;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

fn seeded_record(spec: &str, reproduced: bool) -> Value {
    json!({
        "reproduceVersion": "0.1.0",
        "timestamp": "2026-01-01T00:00:00Z",
        "os": "linux",
        "arch": "x64",
        "strategy": "npm:10.2.4",
        "reproduced": reproduced,
        "attested": false,
        "package": {
            "spec": spec,
            "name": "left-pad",
            "version": "1.3.0",
            "location": "https://registry.npmjs.org/left-pad/-/left-pad-1.3.0.tgz",
            "integrity": "sha512-a"
        },
        "source": {
            "spec": "github:stevemao/left-pad#abc123",
            "location": "https://github.com/stevemao/left-pad.git",
            "integrity": if reproduced { "sha512-a" } else { "sha512-b" }
        }
    })
}

/// Temporary directory holding an empty config file and the cache.
struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("reproduce.toml"), "").unwrap();
        Self {
            dir,
        }
    }

    fn cache_dir(&self) -> PathBuf {
        self.dir.path().join("cache")
    }

    fn seed(&self, entries: &Value) {
        fs::create_dir_all(self.cache_dir()).unwrap();
        fs::write(self.cache_dir().join("cache.json"), entries.to_string()).unwrap();
    }

    fn run(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_reproduce"))
            .arg("--config")
            .arg(self.dir.path().join("reproduce.toml"))
            .arg("--cache-dir")
            .arg(self.cache_dir())
            .args(args)
            .env_remove("REPRODUCE_LOG")
            .output()
            .unwrap()
    }

    fn cache(&self) -> Value {
        serde_json::from_slice(&fs::read(self.cache_dir().join("cache.json")).unwrap()).unwrap()
    }
}

fn stdout(output: &Output) -> String {
    String::from_utf8(output.stdout.clone()).unwrap()
}

// ============================================================================
// SECTION: Tests
// ============================================================================

/// Verifies the version flag prints and exits successfully.
#[test]
fn version_flag_prints_version() {
    let output = Command::new(env!("CARGO_BIN_EXE_reproduce")).arg("--version").output().unwrap();
    assert!(output.status.success());
    assert_eq!(stdout(&output).trim(), format!("reproduce {}", env!("CARGO_PKG_VERSION")));
}

/// Verifies a non-registry spec exits 2 and is cached as `false`.
#[test]
fn non_registry_spec_is_not_applicable() {
    let workspace = Workspace::new();
    let output = workspace.run(&["git+https://example.com/x.git"]);
    assert_eq!(output.status.code(), Some(2));
    assert_eq!(stdout(&output).trim(), "git+https://example.com/x.git: not applicable");
    assert_eq!(workspace.cache()["git+https://example.com/x.git"], Value::Bool(false));
}

/// Verifies JSON output for a not-applicable spec is `false`.
#[test]
fn json_not_applicable_is_false() {
    let workspace = Workspace::new();
    let output = workspace.run(&["--json", "github:org/repo"]);
    assert_eq!(output.status.code(), Some(2));
    assert_eq!(stdout(&output).trim(), "false");
}

/// Verifies a cached reproduced verdict exits 0 and prints the record.
#[test]
fn cached_reproduced_verdict_exits_zero() {
    let workspace = Workspace::new();
    workspace.seed(&json!({ "left-pad@1.3.0": seeded_record("left-pad@1.3.0", true) }));
    let output = workspace.run(&["-j", "left-pad@1.3.0"]);
    assert_eq!(output.status.code(), Some(0));
    let value: Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(value["reproduced"], Value::Bool(true));
    assert_eq!(value["source"]["spec"], "github:stevemao/left-pad#abc123");
}

/// Verifies a batch reports every spec and exits with the worst code.
#[test]
fn batch_reports_worst_code() {
    let workspace = Workspace::new();
    workspace.seed(&json!({
        "left-pad@1.3.0": seeded_record("left-pad@1.3.0", true),
        "left-pad@1.2.0": seeded_record("left-pad@1.2.0", false)
    }));
    let output = workspace.run(&["--json", "--jobs", "2", "left-pad@1.3.0", "left-pad@1.2.0", "left-pad@1.3.0"]);
    assert_eq!(output.status.code(), Some(1));
    let value: Value = serde_json::from_str(&stdout(&output)).unwrap();
    let object = value.as_object().unwrap();
    assert_eq!(object.len(), 2);
    assert_eq!(object["left-pad@1.3.0"]["reproduced"], Value::Bool(true));
    assert_eq!(object["left-pad@1.2.0"]["reproduced"], Value::Bool(false));
}

/// Verifies an unknown strategy is a setup error.
#[test]
fn unknown_strategy_is_rejected() {
    let workspace = Workspace::new();
    let output = workspace.run(&["--strategy", "yarn", "left-pad@1.3.0"]);
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("Unknown build strategy 'yarn'"));
    assert!(stderr.contains("npm, pnpm"));
    assert!(!workspace.cache_dir().exists(), "rejected strategy must not create the cache directory");
}

/// Verifies an invalid cache file override is rejected.
#[test]
fn cache_file_override_must_be_plain_name() {
    let workspace = Workspace::new();
    let output = workspace.run(&["--cache-file", "../escape.json", "left-pad@1.3.0"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8(output.stderr).unwrap().contains("--cache-file"));
}

/// Verifies specs are required without the version flag.
#[test]
fn specs_are_required() {
    let output = Command::new(env!("CARGO_BIN_EXE_reproduce")).output().unwrap();
    assert!(!output.status.success());
}
