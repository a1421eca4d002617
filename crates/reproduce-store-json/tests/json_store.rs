// crates/reproduce-store-json/tests/json_store.rs
// ============================================================================
// Module: JSON Cache Store Tests
// Description: Load, flush, merge, and migration behavior of the file store.
// Purpose: Ensure verdicts persist without loss across writers.
// Dependencies: reproduce-store-json, reproduce-core, tempfile
// ============================================================================
//! ## Overview
//! Exercises [`JsonCacheStore`] against real temporary directories.

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

use std::fs;
use std::path::Path;
use std::thread;

use reproduce_core::CacheEntry;
use reproduce_core::CacheStore;
use reproduce_core::PackageRecord;
use reproduce_core::ReproductionResult;
use reproduce_core::SourceRecord;
use reproduce_store_json::JsonCacheStore;
use reproduce_store_json::JsonStoreError;
use serde_json::Value;
use tempfile::TempDir;
use time::OffsetDateTime;

fn record(spec: &str, reproduced: bool) -> CacheEntry {
    CacheEntry::Recorded(Box::new(ReproductionResult {
        reproduce_version: "0.1.0".to_string(),
        timestamp: OffsetDateTime::UNIX_EPOCH,
        os: "linux".to_string(),
        arch: "x64".to_string(),
        strategy: "npm:10.0.0".to_string(),
        reproduced,
        attested: false,
        package: PackageRecord {
            spec: spec.to_string(),
            name: "pkg".to_string(),
            version: "1.0.0".to_string(),
            location: "https://registry.npmjs.org/pkg/-/pkg-1.0.0.tgz".to_string(),
            integrity: Some("sha512-a".to_string()),
        },
        source: SourceRecord {
            spec: "github:org/pkg#abc".to_string(),
            location: "https://github.com/org/pkg.git".to_string(),
            integrity: reproduced.then(|| "sha512-a".to_string()),
        },
    }))
}

/// Verifies a missing file loads as an empty store.
#[test]
fn missing_file_is_empty() {
    let dir = TempDir::new().unwrap();
    let store = JsonCacheStore::load(dir.path().join("cache.json")).unwrap();
    assert!(store.is_empty().unwrap());
}

/// Verifies a corrupt file loads as an empty store and is replaced on flush.
#[test]
fn corrupt_file_is_empty_and_recovered() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cache.json");
    fs::write(&path, b"{ not json").unwrap();

    let store = JsonCacheStore::load(&path).unwrap();
    assert!(store.is_empty().unwrap());

    store.put("pkg@1.0.0", CacheEntry::NotApplicable).unwrap();
    store.flush().unwrap();
    let reloaded = JsonCacheStore::load(&path).unwrap();
    assert_eq!(reloaded.get("pkg@1.0.0").unwrap(), Some(CacheEntry::NotApplicable));
}

/// Verifies entries survive a flush and reload unchanged.
#[test]
fn flush_and_reload_round_trips() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("cache.json");
    let store = JsonCacheStore::load(&path).unwrap();
    store.put("pkg@1.0.0", record("pkg@1.0.0", true)).unwrap();
    store.put("bad", CacheEntry::NotApplicable).unwrap();
    store.flush().unwrap();

    let reloaded = JsonCacheStore::load(&path).unwrap();
    assert_eq!(reloaded.get("pkg@1.0.0").unwrap(), Some(record("pkg@1.0.0", true)));
    assert_eq!(reloaded.get("bad").unwrap(), Some(CacheEntry::NotApplicable));

    let raw: Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
    assert_eq!(raw["bad"], Value::Bool(false));
    assert_eq!(raw["pkg@1.0.0"]["reproduced"], Value::Bool(true));
}

/// Verifies two stores sharing a file never drop each other's entries.
#[test]
fn independent_writers_merge() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cache.json");
    let first = JsonCacheStore::load(&path).unwrap();
    let second = JsonCacheStore::load(&path).unwrap();

    first.put("a@1.0.0", record("a@1.0.0", true)).unwrap();
    first.flush().unwrap();
    second.put("b@1.0.0", record("b@1.0.0", false)).unwrap();
    second.flush().unwrap();

    let reloaded = JsonCacheStore::load(&path).unwrap();
    assert!(reloaded.contains("a@1.0.0").unwrap());
    assert!(reloaded.contains("b@1.0.0").unwrap());
    assert!(second.contains("a@1.0.0").unwrap(), "flush refreshes the in-memory view");
}

/// Verifies concurrent flushes from many threads keep every entry.
#[test]
fn concurrent_flushes_keep_every_entry() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cache.json");
    let handles: Vec<_> = (0 .. 8)
        .map(|index| {
            let path = path.clone();
            thread::spawn(move || {
                let store = JsonCacheStore::load(&path).unwrap();
                let spec = format!("pkg-{index}@1.0.0");
                store.put(&spec, record(&spec, index % 2 == 0)).unwrap();
                store.flush().unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let reloaded = JsonCacheStore::load(&path).unwrap();
    assert_eq!(reloaded.len().unwrap(), 8);
}

/// Legacy cache file with one entry lacking the derived package fields.
fn write_legacy_cache(path: &Path) {
    fs::write(
        path,
        serde_json::json!({
            "left-pad@1.3.0": {
                "reproduceVersion": "1.0.0",
                "timestamp": "2024-05-01T12:00:00Z",
                "os": "linux",
                "arch": "x64",
                "strategy": "npm:10.2.4",
                "reproduced": false,
                "attested": false,
                "package": {
                    "spec": "left-pad@1.3.0",
                    "location": "https://registry.npmjs.org/left-pad/-/left-pad-1.3.0.tgz",
                    "integrity": "sha512-x"
                },
                "source": {
                    "spec": "github:stevemao/left-pad#HEAD",
                    "location": "https://github.com/stevemao/left-pad.git",
                    "integrity": "null"
                }
            },
            "broken": 42
        })
        .to_string(),
    )
    .unwrap();
}

/// Verifies legacy entries are migrated at load and persisted by the next flush.
#[test]
fn legacy_entries_are_migrated_at_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cache.json");
    write_legacy_cache(&path);

    let store = JsonCacheStore::load(&path).unwrap();
    let entry = store.get("left-pad@1.3.0").unwrap().unwrap();
    let result = entry.as_result().unwrap();
    assert_eq!(result.package.name, "left-pad");
    assert_eq!(result.package.version, "1.3.0");
    assert_eq!(result.source.integrity, None);
    assert_eq!(store.get("broken").unwrap(), None);

    store.put("other@2.0.0", CacheEntry::NotApplicable).unwrap();
    store.flush().unwrap();
    let raw: Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
    assert_eq!(raw["left-pad@1.3.0"]["package"]["name"], "left-pad");
    assert_eq!(raw["left-pad@1.3.0"]["source"]["integrity"], Value::Null);
    assert_eq!(raw["other@2.0.0"], Value::Bool(false));
}

/// Verifies a flush without local writes leaves the file untouched.
#[test]
fn flush_without_writes_is_a_no_op() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cache.json");
    write_legacy_cache(&path);
    let before = fs::read(&path).unwrap();

    let store = JsonCacheStore::load(&path).unwrap();
    store.flush().unwrap();
    assert_eq!(fs::read(&path).unwrap(), before);
}

/// Verifies a migrated copy held in memory never replaces a newer verdict on disk.
#[test]
fn migrated_entry_does_not_overwrite_newer_writer() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cache.json");
    write_legacy_cache(&path);
    let first = JsonCacheStore::load(&path).unwrap();
    let second = JsonCacheStore::load(&path).unwrap();

    second.put("left-pad@1.3.0", record("left-pad@1.3.0", true)).unwrap();
    second.flush().unwrap();
    first.put("other@2.0.0", record("other@2.0.0", false)).unwrap();
    first.flush().unwrap();

    let reloaded = JsonCacheStore::load(&path).unwrap();
    let entry = reloaded.get("left-pad@1.3.0").unwrap().unwrap();
    assert!(entry.as_result().unwrap().reproduced);
    assert!(reloaded.contains("other@2.0.0").unwrap());
    assert!(first.get("left-pad@1.3.0").unwrap().unwrap().as_result().unwrap().reproduced);
}

/// Verifies a directory path is rejected.
#[test]
fn directory_path_is_rejected() {
    let dir = TempDir::new().unwrap();
    assert!(matches!(JsonCacheStore::load(dir.path()), Err(JsonStoreError::Invalid(_))));
}

/// Verifies the materialized source check consults the store.
#[test]
fn materialized_source_uses_source_key() {
    let dir = TempDir::new().unwrap();
    let store = JsonCacheStore::load(dir.path().join("cache.json")).unwrap();
    let work_dir = dir.path().join("pkg");
    assert!(!store.has_materialized_source("pkg@github:org/pkg#abc", &work_dir).unwrap());

    store.put("pkg@github:org/pkg#abc", CacheEntry::NotApplicable).unwrap();
    assert!(store.has_materialized_source("pkg@github:org/pkg#abc", &work_dir).unwrap());

    fs::create_dir_all(&work_dir).unwrap();
    assert!(store.has_materialized_source("other", &work_dir).unwrap());
}
