// crates/reproduce-core/src/core/spec.rs
// ============================================================================
// Module: Package Spec Validation
// Description: Policy gate constraining input specs to the supported registry.
// Purpose: Accept only registry specs bound to the single supported registry.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! The validator is a policy gate, not a general package-spec parser. It
//! recognizes `name`, `name@version`, `name@range`, `name@tag`, scoped names,
//! the `npm:` default-registry prefix, and the explicit
//! `registry:<url>#name@selector` form. Anything else (git URLs, hosted
//! shorthands, local paths, tarballs, aliases) is rejected so the engine can
//! report the package as not applicable.
//!
//! ## Invariants
//! - A [`RegistrySpec`] always carries a name that satisfies
//!   [`validate_package_name`] and is therefore safe as a relative path.
//! - The raw input string is preserved verbatim; it is the cache key.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// The one registry instance whose packages can be reproduced.
pub const SUPPORTED_REGISTRY: &str = "https://registry.npmjs.org/";
/// Maximum package name length accepted by the registry.
const MAX_PACKAGE_NAME_LENGTH: usize = 214;
/// Maximum accepted selector length.
const MAX_SELECTOR_LENGTH: usize = 256;
/// Default dist-tag used when a spec carries no selector.
const DEFAULT_TAG: &str = "latest";
/// Prefixes that identify non-registry spec forms.
const NON_REGISTRY_PREFIXES: &[&str] = &[
    "git+", "git@", "git:", "github:", "gitlab:", "bitbucket:", "gist:", "file:", "link:",
    "workspace:", "http:", "https:", "./", "../", "/", "~",
];

// ============================================================================
// SECTION: Types
// ============================================================================

/// Version selector carried by a registry spec.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum VersionSelector {
    /// Exact semantic version (`1.2.3`).
    Version(String),
    /// Dist-tag (`latest`, `next`).
    Tag(String),
    /// Semver range (`^1.2.0`, `>=2 <3`).
    Range(String),
}

impl VersionSelector {
    /// Returns the raw selector text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Version(value) | Self::Tag(value) | Self::Range(value) => value,
        }
    }
}

/// A validated spec bound to the supported registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrySpec {
    /// Original spec string, used as the cache key.
    raw: String,
    /// Package name, optionally scoped.
    name: String,
    /// Version selector.
    selector: VersionSelector,
}

impl RegistrySpec {
    /// Returns the original spec string.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Returns the package name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the version selector.
    #[must_use]
    pub const fn selector(&self) -> &VersionSelector {
        &self.selector
    }
}

impl fmt::Display for RegistrySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Reasons a spec is outside the reproducible domain.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpecRejection {
    /// The spec is empty or whitespace.
    #[error("package spec is empty")]
    Empty,
    /// The spec is not a registry spec (git, path, tarball, alias).
    #[error("not a registry spec: {0}")]
    NotRegistry(String),
    /// The spec names a registry other than the supported one.
    #[error("unsupported registry: {0}")]
    UnsupportedRegistry(String),
    /// The package name violates registry naming rules.
    #[error("invalid package name: {0}")]
    InvalidName(String),
    /// The version selector cannot be classified.
    #[error("invalid version selector: {0}")]
    InvalidSelector(String),
}

// ============================================================================
// SECTION: Validation
// ============================================================================

/// Validates a package spec against the supported registry policy.
///
/// # Errors
///
/// Returns [`SpecRejection`] when the spec is empty, unparsable, not a
/// registry spec, or bound to another registry.
pub fn validate_spec(spec: &str) -> Result<RegistrySpec, SpecRejection> {
    let trimmed = spec.trim();
    if trimmed.is_empty() {
        return Err(SpecRejection::Empty);
    }

    let body = if let Some(rest) = trimmed.strip_prefix("registry:") {
        let (registry, rest) = rest
            .split_once('#')
            .ok_or_else(|| SpecRejection::NotRegistry(trimmed.to_string()))?;
        if normalize_registry(registry) != SUPPORTED_REGISTRY {
            return Err(SpecRejection::UnsupportedRegistry(registry.to_string()));
        }
        rest
    } else if let Some(rest) = trimmed.strip_prefix("npm:") {
        rest
    } else {
        trimmed
    };

    if is_non_registry_form(body) {
        return Err(SpecRejection::NotRegistry(trimmed.to_string()));
    }

    let (name, selector) = split_name_selector(body);
    if name.contains(':') {
        return Err(SpecRejection::NotRegistry(trimmed.to_string()));
    }
    if !name.starts_with('@') && name.contains('/') {
        // `owner/repo` is a hosted git shorthand, not a registry name.
        return Err(SpecRejection::NotRegistry(trimmed.to_string()));
    }
    validate_package_name(name)?;
    let selector = classify_selector(selector)?;

    Ok(RegistrySpec {
        raw: spec.to_string(),
        name: name.to_string(),
        selector,
    })
}

/// Validates a package name against registry naming rules.
///
/// # Errors
///
/// Returns [`SpecRejection::InvalidName`] when the name is empty, too long,
/// malformed, or contains characters outside the URL-safe set.
pub fn validate_package_name(name: &str) -> Result<(), SpecRejection> {
    let invalid = || SpecRejection::InvalidName(name.to_string());
    if name.is_empty() || name.len() > MAX_PACKAGE_NAME_LENGTH {
        return Err(invalid());
    }
    let unscoped = if let Some(scoped) = name.strip_prefix('@') {
        let (scope, rest) = scoped.split_once('/').ok_or_else(invalid)?;
        if !is_name_segment(scope) {
            return Err(invalid());
        }
        rest
    } else {
        name
    };
    if !is_name_segment(unscoped) {
        return Err(invalid());
    }
    Ok(())
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Normalizes a registry URL to carry exactly one trailing slash.
fn normalize_registry(registry: &str) -> String {
    format!("{}/", registry.trim().trim_end_matches('/'))
}

/// Returns true when the spec body uses a non-registry form.
fn is_non_registry_form(body: &str) -> bool {
    let lower = body.to_ascii_lowercase();
    NON_REGISTRY_PREFIXES.iter().any(|prefix| lower.starts_with(prefix))
        || lower.contains("://")
        || lower.contains('\\')
        || lower.ends_with(".tgz")
        || lower.ends_with(".tar.gz")
        || lower.ends_with(".tar")
}

/// Splits `name@selector`, honouring the leading `@` of scoped names.
fn split_name_selector(body: &str) -> (&str, &str) {
    let search_from = usize::from(body.starts_with('@'));
    match body[search_from ..].find('@') {
        Some(offset) => {
            let index = search_from + offset;
            (&body[.. index], &body[index + 1 ..])
        }
        None => (body, ""),
    }
}

/// Returns true when a name segment satisfies registry rules.
fn is_name_segment(segment: &str) -> bool {
    !segment.is_empty()
        && !segment.starts_with('.')
        && !segment.starts_with('_')
        && segment.chars().all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '.' | '_' | '~'))
}

/// Classifies the selector as an exact version, dist-tag, or range.
fn classify_selector(selector: &str) -> Result<VersionSelector, SpecRejection> {
    let trimmed = selector.trim();
    if trimmed.is_empty() {
        return Ok(VersionSelector::Tag(DEFAULT_TAG.to_string()));
    }
    if trimmed.len() > MAX_SELECTOR_LENGTH {
        return Err(SpecRejection::InvalidSelector(trimmed.to_string()));
    }
    let exact = trimmed.strip_prefix('v').or_else(|| trimmed.strip_prefix('=')).unwrap_or(trimmed);
    if is_exact_version(exact) {
        return Ok(VersionSelector::Version(exact.to_string()));
    }
    if is_tag(trimmed) {
        return Ok(VersionSelector::Tag(trimmed.to_string()));
    }
    if trimmed.chars().all(|ch| {
        ch.is_ascii_alphanumeric() || matches!(ch, '.' | '*' | '^' | '~' | '<' | '>' | '=' | '|' | ' ' | '-' | '+')
    }) {
        return Ok(VersionSelector::Range(trimmed.to_string()));
    }
    Err(SpecRejection::InvalidSelector(trimmed.to_string()))
}

/// Returns true for `MAJOR.MINOR.PATCH[-pre][+build]`.
fn is_exact_version(value: &str) -> bool {
    let (core, build) = match value.split_once('+') {
        Some((core, build)) => (core, Some(build)),
        None => (value, None),
    };
    let (triple, pre) = match core.split_once('-') {
        Some((triple, pre)) => (triple, Some(pre)),
        None => (core, None),
    };
    let mut parts = triple.split('.');
    let numeric = (0 .. 3).all(|_| {
        parts.next().is_some_and(|part| {
            !part.is_empty()
                && part.chars().all(|ch| ch.is_ascii_digit())
                && (part == "0" || !part.starts_with('0'))
        })
    });
    let identifiers_ok = |text: Option<&str>| {
        text.is_none_or(|text| {
            text.split('.').all(|id| {
                !id.is_empty() && id.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '-')
            })
        })
    };
    numeric && parts.next().is_none() && identifiers_ok(pre) && identifiers_ok(build)
}

/// Returns true for dist-tag shaped selectors.
fn is_tag(value: &str) -> bool {
    let mut chars = value.chars();
    let starts_alpha = chars.next().is_some_and(|ch| ch.is_ascii_alphabetic());
    let looks_like_version =
        value.len() > 1 && value.starts_with(['v', 'V']) && value[1 ..].starts_with(|ch: char| ch.is_ascii_digit());
    starts_alpha
        && !looks_like_version
        && !matches!(value, "x" | "X")
        && value.chars().all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '.' | '_'))
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
    fn bare_name_defaults_to_latest_tag() {
        let spec = validate_spec("lodash").unwrap();
        assert_eq!(spec.name(), "lodash");
        assert_eq!(spec.selector(), &VersionSelector::Tag("latest".to_string()));
    }

    #[test]
    fn scoped_name_with_version() {
        let spec = validate_spec("@scope/pkg@1.0.0-beta.1").unwrap();
        assert_eq!(spec.name(), "@scope/pkg");
        assert_eq!(spec.selector(), &VersionSelector::Version("1.0.0-beta.1".to_string()));
    }

    #[test]
    fn leading_v_is_normalized_to_exact_version() {
        let spec = validate_spec("pkg@v2.3.4").unwrap();
        assert_eq!(spec.selector(), &VersionSelector::Version("2.3.4".to_string()));
    }

    #[test]
    fn ranges_are_classified() {
        for range in ["^1.2.0", "~1.2", ">=1 <2", "1.x", "*", "x", "1.0.0 - 2.0.0", "^1 || ^2"] {
            let spec = validate_spec(&format!("pkg@{range}")).unwrap();
            assert_eq!(spec.selector(), &VersionSelector::Range(range.to_string()), "{range}");
        }
    }

    #[test]
    fn tags_are_classified() {
        let spec = validate_spec("pkg@next").unwrap();
        assert_eq!(spec.selector(), &VersionSelector::Tag("next".to_string()));
    }

    #[test]
    fn npm_prefix_is_accepted() {
        let spec = validate_spec("npm:pkg@1.0.0").unwrap();
        assert_eq!(spec.name(), "pkg");
        assert_eq!(spec.raw(), "npm:pkg@1.0.0");
    }

    #[test]
    fn explicit_supported_registry_is_accepted() {
        let spec = validate_spec("registry:https://registry.npmjs.org#pkg@1.0.0").unwrap();
        assert_eq!(spec.name(), "pkg");
    }

    #[test]
    fn other_registry_is_rejected() {
        assert_eq!(
            validate_spec("registry:https://npm.example.com/#pkg@1.0.0"),
            Err(SpecRejection::UnsupportedRegistry("https://npm.example.com/".to_string()))
        );
    }

    #[test]
    fn non_registry_forms_are_rejected() {
        for spec in [
            "github:org/pkg",
            "org/pkg",
            "git+https://github.com/org/pkg.git",
            "https://example.com/pkg.tgz",
            "./local",
            "file:../pkg",
            "pkg.tgz",
            "workspace:*",
            "alias@npm:pkg@1",
        ] {
            assert!(
                matches!(
                    validate_spec(spec),
                    Err(SpecRejection::NotRegistry(_) | SpecRejection::InvalidSelector(_))
                ),
                "{spec} should be rejected"
            );
        }
    }

    #[test]
    fn empty_spec_is_rejected() {
        assert_eq!(validate_spec("  "), Err(SpecRejection::Empty));
    }

    #[test]
    fn invalid_names_are_rejected() {
        for name in ["_private", ".hidden", "@scope", "@/pkg", "bad name"] {
            assert!(validate_package_name(name).is_err(), "{name}");
        }
        assert!(validate_package_name(&"a".repeat(215)).is_err());
    }
}
