// crates/reproduce-core/tests/result_serde.rs
// ============================================================================
// Module: Result Serialization Tests
// Description: Cache entry wire format and legacy record migration.
// Purpose: Ensure persisted verdicts stay compatible across releases.
// Dependencies: reproduce-core, serde_json
// ============================================================================
//! ## Overview
//! Checks the camelCase record shape, the `false` sentinel, and the load-time
//! migration of records written by earlier releases.

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

use std::collections::BTreeMap;

use reproduce_core::CacheEntry;
use reproduce_core::migrate_entry;
use serde_json::Value;
use serde_json::json;

fn legacy_record() -> Value {
    json!({
        "reproduceVersion": "1.0.0",
        "timestamp": "2024-05-01T12:00:00.000Z",
        "os": "linux",
        "arch": "x64",
        "strategy": "npm:10.2.4",
        "reproduced": false,
        "attested": false,
        "package": {
            "spec": "@scope/pkg@1.2.3",
            "location": "https://registry.npmjs.org/@scope/pkg/-/pkg-1.2.3.tgz",
            "integrity": "sha512-published"
        },
        "source": {
            "spec": "github:org/pkg#abc",
            "location": "git+https://github.com/org/pkg.git",
            "integrity": "null"
        }
    })
}

/// Verifies the cache file shape with records and `false` entries.
#[test]
fn cache_map_round_trips() {
    let raw = json!({
        "@scope/pkg@1.2.3": legacy_record(),
        "github:org/pkg": false
    });
    let entries: BTreeMap<String, CacheEntry> = serde_json::from_value(raw).unwrap();
    assert_eq!(entries.get("github:org/pkg"), Some(&CacheEntry::NotApplicable));

    let encoded = serde_json::to_value(&entries).unwrap();
    assert_eq!(encoded["github:org/pkg"], json!(false));
    assert_eq!(encoded["@scope/pkg@1.2.3"]["reproduceVersion"], json!("1.0.0"));
    assert_eq!(encoded["@scope/pkg@1.2.3"]["package"]["location"], legacy_record()["package"]["location"]);

    let decoded: BTreeMap<String, CacheEntry> = serde_json::from_value(encoded).unwrap();
    assert_eq!(decoded, entries);
}

/// Verifies `true` is not a valid cache entry.
#[test]
fn true_is_rejected() {
    assert!(serde_json::from_value::<CacheEntry>(json!(true)).is_err());
}

/// Verifies migration backfills name and version and clears the null digest.
#[test]
fn migration_backfills_legacy_fields() {
    let mut entry: CacheEntry = serde_json::from_value(legacy_record()).unwrap();

    assert!(migrate_entry(&mut entry));

    let result = entry.as_result().unwrap();
    assert_eq!(result.package.name, "@scope/pkg");
    assert_eq!(result.package.version, "1.2.3");
    assert_eq!(result.source.integrity, None);
    assert!(!migrate_entry(&mut entry), "migration is idempotent");
}

/// Verifies migration leaves not-applicable entries alone.
#[test]
fn migration_ignores_not_applicable() {
    let mut entry = CacheEntry::NotApplicable;
    assert!(!migrate_entry(&mut entry));
}

/// Verifies an absent rebuilt digest serializes as null.
#[test]
fn absent_rebuilt_digest_is_null() {
    let mut entry: CacheEntry = serde_json::from_value(legacy_record()).unwrap();
    migrate_entry(&mut entry);
    let encoded = serde_json::to_value(&entry).unwrap();
    assert_eq!(encoded["source"]["integrity"], Value::Null);
}
