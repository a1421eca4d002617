// crates/reproduce-core/src/core/result.rs
// ============================================================================
// Module: Reproduction Results
// Description: Persisted verdict records and cache entries.
// Purpose: Define the durable record shape and its load-time migration.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! A [`ReproductionResult`] is the verdict for one spec. Cache entries are
//! either a recorded verdict or the literal `false` for specs outside the
//! reproducible domain. Records are serialized in camelCase so files written
//! by earlier releases stay readable; [`migrate_entry`] backfills fields those
//! releases did not record.
//!
//! ## Invariants
//! - `reproduced` is true only when both integrity values are present,
//!   non-empty, and byte-equal.
//! - An absent rebuilt digest is `None`, never the string `"null"`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env::consts;

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;
use serde::de;
use time::OffsetDateTime;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Placeholder earlier releases wrote for an absent rebuilt digest.
const LEGACY_NULL_DIGEST: &str = "null";
/// Path segment separating package metadata from tarball files.
const TARBALL_SEGMENT: &str = "-";
/// Tarball file extension.
const TARBALL_EXTENSION: &str = ".tgz";

// ============================================================================
// SECTION: Types
// ============================================================================

/// Persisted verdict for one package spec.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReproductionResult {
    /// Tool version that produced this record.
    pub reproduce_version: String,
    /// Time the verdict was computed.
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    /// Operating system name.
    pub os: String,
    /// CPU architecture name.
    pub arch: String,
    /// Strategy used, rendered as `<name>:<tool-version>`.
    pub strategy: String,
    /// Whether the rebuilt digest equals the published digest.
    pub reproduced: bool,
    /// Whether the registry reports provenance attestations.
    #[serde(default)]
    pub attested: bool,
    /// Published package side.
    pub package: PackageRecord,
    /// Rebuilt source side.
    pub source: SourceRecord,
}

/// Published package side of a verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageRecord {
    /// Spec string as requested.
    pub spec: String,
    /// Resolved package name.
    #[serde(default)]
    pub name: String,
    /// Resolved package version.
    #[serde(default)]
    pub version: String,
    /// Tarball URL.
    pub location: String,
    /// Published integrity digest.
    #[serde(default)]
    pub integrity: Option<String>,
}

/// Rebuilt source side of a verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRecord {
    /// Source locator rendered as `github:<owner>/<repo>#<ref>`, with a
    /// `::path:<dir>` suffix for packages in a subdirectory.
    pub spec: String,
    /// Repository URL as published in the manifest.
    pub location: String,
    /// Rebuilt integrity digest; absent when the rebuild failed.
    #[serde(default)]
    pub integrity: Option<String>,
}

/// Cache entry for one spec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEntry {
    /// A recorded verdict.
    Recorded(Box<ReproductionResult>),
    /// The spec is outside the reproducible domain; serialized as `false`.
    NotApplicable,
}

impl CacheEntry {
    /// Returns the recorded verdict, if any.
    #[must_use]
    pub fn as_result(&self) -> Option<&ReproductionResult> {
        match self {
            Self::Recorded(result) => Some(result),
            Self::NotApplicable => None,
        }
    }
}

impl Serialize for CacheEntry {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Recorded(result) => result.serialize(serializer),
            Self::NotApplicable => serializer.serialize_bool(false),
        }
    }
}

impl<'de> Deserialize<'de> for CacheEntry {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match CacheEntryWire::deserialize(deserializer)? {
            CacheEntryWire::Flag(false) => Ok(Self::NotApplicable),
            CacheEntryWire::Flag(true) => {
                Err(de::Error::custom("cache entry must be a record or false"))
            }
            CacheEntryWire::Record(result) => Ok(Self::Recorded(result)),
        }
    }
}

/// Wire forms accepted for a cache entry.
#[derive(Deserialize)]
#[serde(untagged)]
enum CacheEntryWire {
    /// Boolean sentinel.
    Flag(bool),
    /// Recorded verdict.
    Record(Box<ReproductionResult>),
}

// ============================================================================
// SECTION: Migration
// ============================================================================

/// Upgrades a cache entry written by an earlier release.
///
/// Backfills `package.name` and `package.version` from the tarball URL and
/// replaces the legacy `"null"` rebuilt digest with an absent value. Returns
/// true when the entry changed.
pub fn migrate_entry(entry: &mut CacheEntry) -> bool {
    let CacheEntry::Recorded(result) = entry else {
        return false;
    };
    let mut changed = false;

    if (result.package.name.is_empty() || result.package.version.is_empty())
        && let Some((name, version)) = parse_tarball_url(&result.package.location)
    {
        if result.package.name.is_empty() {
            result.package.name = name;
        }
        if result.package.version.is_empty() {
            result.package.version = version;
        }
        changed = true;
    }

    if result
        .source
        .integrity
        .as_deref()
        .is_some_and(|digest| digest.is_empty() || digest == LEGACY_NULL_DIGEST)
    {
        result.source.integrity = None;
        changed = true;
    }
    if result.package.integrity.as_deref().is_some_and(str::is_empty) {
        result.package.integrity = None;
        changed = true;
    }

    changed
}

/// Infers `(name, version)` from a registry tarball URL.
///
/// Understands `.../<name>/-/<name>-<version>.tgz` and
/// `.../@scope/<name>/-/<name>-<version>.tgz`, falling back to splitting the
/// file name at its last `-`.
#[must_use]
pub fn parse_tarball_url(location: &str) -> Option<(String, String)> {
    let path = location.split(['?', '#']).next().unwrap_or_default();
    let segments: Vec<&str> = path.split('/').collect();
    let file = segments.last()?;
    let base = file.strip_suffix(TARBALL_EXTENSION)?;

    let marker = segments.iter().rposition(|segment| *segment == TARBALL_SEGMENT);
    if let Some(marker) = marker.filter(|index| *index > 0) {
        let package_segment = segments[marker - 1].replace("%2f", "/").replace("%2F", "/");
        let unscoped = package_segment.rsplit('/').next().unwrap_or_default();
        if let Some(version) = base.strip_prefix(unscoped).and_then(|rest| rest.strip_prefix('-'))
            && !unscoped.is_empty()
            && !version.is_empty()
        {
            let name = if package_segment.starts_with('@') {
                package_segment.clone()
            } else if marker >= 2 && segments[marker - 2].starts_with('@') {
                format!("{}/{unscoped}", segments[marker - 2])
            } else {
                unscoped.to_string()
            };
            return Some((name, version.to_string()));
        }
    }

    let (name, version) = base.rsplit_once('-')?;
    if name.is_empty() || version.is_empty() {
        return None;
    }
    Some((name.to_string(), version.to_string()))
}

// ============================================================================
// SECTION: Platform Names
// ============================================================================

/// Returns the operating system name in registry ecosystem vocabulary.
#[must_use]
pub fn platform_os() -> &'static str {
    match consts::OS {
        "macos" => "darwin",
        "windows" => "win32",
        other => other,
    }
}

/// Returns the CPU architecture name in registry ecosystem vocabulary.
#[must_use]
pub fn platform_arch() -> &'static str {
    match consts::ARCH {
        "x86_64" => "x64",
        "aarch64" => "arm64",
        "x86" => "ia32",
        "powerpc64" => "ppc64",
        "loongarch64" => "loong64",
        other => other,
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test fixtures use explicit asserts and unwraps for clarity."
    )]

    use super::*;

    #[test]
    fn parses_unscoped_tarball_url() {
        assert_eq!(
            parse_tarball_url("https://registry.npmjs.org/left-pad/-/left-pad-1.3.0.tgz"),
            Some(("left-pad".to_string(), "1.3.0".to_string()))
        );
    }

    #[test]
    fn parses_scoped_tarball_url_with_prerelease() {
        assert_eq!(
            parse_tarball_url("https://registry.npmjs.org/@scope/pkg/-/pkg-2.0.0-beta.1.tgz"),
            Some(("@scope/pkg".to_string(), "2.0.0-beta.1".to_string()))
        );
    }

    #[test]
    fn rejects_non_tarball_url() {
        assert_eq!(parse_tarball_url("https://registry.npmjs.org/pkg"), None);
    }

    #[test]
    fn platform_names_use_registry_vocabulary() {
        assert_ne!(platform_os(), "macos");
        assert_ne!(platform_arch(), "x86_64");
    }
}
