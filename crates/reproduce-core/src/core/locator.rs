// crates/reproduce-core/src/core/locator.rs
// ============================================================================
// Module: Source Locator Resolver
// Description: Derives a canonical source repository reference from manifests.
// Purpose: Map manifest repository metadata to a validated clone target.
// Dependencies: crate::core::manifest, thiserror, url
// ============================================================================

//! ## Overview
//! The resolver normalizes the repository URL shapes found in published
//! manifests (hosted shorthands, scp-style SSH, `git+` prefixes), parses the
//! result with [`url::Url`], and gates on the single supported source host.
//! The ref is chosen as: URL fragment, then `gitHead`, then `HEAD`.
//!
//! ## Invariants
//! - Owner, name, ref, and subdirectory are validated before a
//!   [`SourceLocator`] exists, so they are safe to pass as process arguments
//!   and to join onto filesystem paths.
//! - Any host other than [`SourceHost::GitHub`] is rejected as
//!   [`LocatorRejection::UnsupportedHost`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::path::Path;
use std::path::PathBuf;

use thiserror::Error;
use url::Url;

use crate::core::manifest::Manifest;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Ref used when neither the URL nor the manifest pins one.
const DEFAULT_REF: &str = "HEAD";
/// Maximum accepted ref length.
const MAX_REF_LENGTH: usize = 256;
/// Maximum accepted owner or repository name length.
const MAX_SEGMENT_LENGTH: usize = 100;
/// Maximum accepted subdirectory length.
const MAX_DIRECTORY_LENGTH: usize = 1024;
/// Marker that separates the ref from a monorepo subdirectory.
const DIRECTORY_MARKER: &str = "::path:";

// ============================================================================
// SECTION: Types
// ============================================================================

/// Supported source-hosting services.
///
/// Exactly one host is supported; new hosts are added here together with
/// their clone URL shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceHost {
    /// github.com
    GitHub,
}

impl SourceHost {
    /// Resolves a parsed URL host name to a supported host.
    #[must_use]
    pub fn from_domain(domain: &str) -> Option<Self> {
        match domain.to_ascii_lowercase().as_str() {
            "github.com" | "www.github.com" => Some(Self::GitHub),
            _ => None,
        }
    }

    /// Returns the canonical domain.
    #[must_use]
    pub const fn domain(self) -> &'static str {
        match self {
            Self::GitHub => "github.com",
        }
    }

    /// Returns the locator scheme prefix.
    #[must_use]
    pub const fn scheme(self) -> &'static str {
        match self {
            Self::GitHub => "github",
        }
    }
}

/// Canonical reference to a source repository at a specific ref.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocator {
    /// Hosting service.
    host: SourceHost,
    /// Repository owner.
    owner: String,
    /// Repository name without `.git`.
    name: String,
    /// Commit, tag, or branch to check out.
    git_ref: String,
    /// Package directory inside the repository.
    subdirectory: Option<String>,
}

impl SourceLocator {
    /// Returns the hosting service.
    #[must_use]
    pub const fn host(&self) -> SourceHost {
        self.host
    }

    /// Returns the repository owner.
    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Returns the repository name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the ref to check out.
    #[must_use]
    pub fn git_ref(&self) -> &str {
        &self.git_ref
    }

    /// Returns the monorepo subdirectory, if any.
    #[must_use]
    pub fn subdirectory(&self) -> Option<&str> {
        self.subdirectory.as_deref()
    }

    /// Returns the HTTPS clone URL.
    #[must_use]
    pub fn clone_url(&self) -> String {
        format!("https://{}/{}/{}.git", self.host.domain(), self.owner, self.name)
    }

    /// Returns the source spec `<package>@<locator>` used as a cache key.
    #[must_use]
    pub fn source_spec(&self, package_name: &str) -> String {
        format!("{package_name}@{self}")
    }

    /// Returns the directory containing the package inside a checkout.
    #[must_use]
    pub fn package_dir(&self, work_dir: &Path) -> PathBuf {
        match &self.subdirectory {
            Some(directory) => directory.split('/').fold(work_dir.to_path_buf(), |path, part| path.join(part)),
            None => work_dir.to_path_buf(),
        }
    }
}

impl fmt::Display for SourceLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}/{}#{}", self.host.scheme(), self.owner, self.name, self.git_ref)?;
        if let Some(directory) = &self.subdirectory {
            write!(f, "{DIRECTORY_MARKER}{directory}")?;
        }
        Ok(())
    }
}

/// Reasons a manifest has no reproducible source location.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocatorRejection {
    /// The manifest declares no repository URL.
    #[error("manifest has no repository url")]
    MissingRepository,
    /// The repository URL cannot be parsed.
    #[error("invalid repository url: {0}")]
    InvalidUrl(String),
    /// The URL path lacks an owner or repository name.
    #[error("repository url lacks owner or name: {0}")]
    MissingOwnerOrName(String),
    /// The repository is hosted somewhere other than the supported host.
    #[error("unsupported source host: {0}")]
    UnsupportedHost(String),
    /// The resolved ref is unsafe or malformed.
    #[error("invalid git ref: {0}")]
    InvalidRef(String),
    /// The repository directory is unsafe or malformed.
    #[error("invalid repository directory: {0}")]
    InvalidDirectory(String),
}

// ============================================================================
// SECTION: Resolution
// ============================================================================

/// Resolves the source locator for a manifest.
///
/// # Errors
///
/// Returns [`LocatorRejection`] when the manifest has no usable repository
/// metadata or the repository is not on the supported host.
pub fn resolve_source(manifest: &Manifest) -> Result<SourceLocator, LocatorRejection> {
    let raw = manifest.repository_url().ok_or(LocatorRejection::MissingRepository)?;
    let normalized = normalize_repository_url(raw);
    let url = Url::parse(&normalized).map_err(|_| LocatorRejection::InvalidUrl(raw.to_string()))?;

    let domain = url.host_str().ok_or_else(|| LocatorRejection::InvalidUrl(raw.to_string()))?;
    let host = SourceHost::from_domain(domain)
        .ok_or_else(|| LocatorRejection::UnsupportedHost(domain.to_string()))?;

    let mut segments = url
        .path_segments()
        .ok_or_else(|| LocatorRejection::MissingOwnerOrName(raw.to_string()))?
        .filter(|segment| !segment.is_empty());
    let owner = segments.next().unwrap_or_default();
    let name = segments.next().unwrap_or_default();
    let name = name.strip_suffix(".git").unwrap_or(name);
    if !is_repository_segment(owner) || !is_repository_segment(name) {
        return Err(LocatorRejection::MissingOwnerOrName(raw.to_string()));
    }

    let git_ref = url
        .fragment()
        .map(str::trim)
        .filter(|fragment| !fragment.is_empty())
        .or_else(|| manifest.git_head.as_deref().map(str::trim).filter(|head| !head.is_empty()))
        .unwrap_or(DEFAULT_REF);
    validate_ref(git_ref)?;

    let subdirectory = manifest
        .repository
        .as_ref()
        .and_then(|repository| repository.directory.as_deref())
        .map(normalize_directory)
        .transpose()?
        .flatten();

    Ok(SourceLocator {
        host,
        owner: owner.to_string(),
        name: name.to_string(),
        git_ref: git_ref.to_string(),
        subdirectory,
    })
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Rewrites shorthand and scp-style repository URLs into parseable URLs.
fn normalize_repository_url(raw: &str) -> String {
    let raw = raw.trim();
    let raw = raw.strip_prefix("git+").unwrap_or(raw);
    for (prefix, domain) in [
        ("github:", "github.com"),
        ("gitlab:", "gitlab.com"),
        ("bitbucket:", "bitbucket.org"),
        ("gist:", "gist.github.com"),
    ] {
        if let Some(rest) = raw.strip_prefix(prefix) {
            return format!("https://{domain}/{}", rest.trim_start_matches('/'));
        }
    }
    if raw.contains("://") {
        return raw.to_string();
    }
    if let Some((user_host, path)) = raw.split_once(':')
        && user_host.contains('@')
        && !user_host.contains('/')
    {
        return format!("ssh://{user_host}/{}", path.trim_start_matches('/'));
    }
    if !raw.contains(':') && raw.split('/').filter(|part| !part.is_empty()).count() == 2 {
        return format!("https://github.com/{raw}");
    }
    raw.to_string()
}

/// Returns true for a safe owner or repository name segment.
fn is_repository_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment.len() <= MAX_SEGMENT_LENGTH
        && !segment.starts_with(['-', '.'])
        && segment.chars().all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '.' | '_'))
}

/// Validates a git ref for use as a process argument.
fn validate_ref(git_ref: &str) -> Result<(), LocatorRejection> {
    let valid = git_ref.len() <= MAX_REF_LENGTH
        && !git_ref.starts_with(['-', '/'])
        && !git_ref.ends_with('/')
        && !git_ref.ends_with(".lock")
        && !git_ref.contains("..")
        && !git_ref.contains("//")
        && git_ref.chars().all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '.' | '_' | '/'));
    if valid { Ok(()) } else { Err(LocatorRejection::InvalidRef(git_ref.to_string())) }
}

/// Normalizes a repository directory; empty means the repository root.
fn normalize_directory(directory: &str) -> Result<Option<String>, LocatorRejection> {
    let invalid = || LocatorRejection::InvalidDirectory(directory.to_string());
    let trimmed = directory.trim();
    if trimmed.len() > MAX_DIRECTORY_LENGTH
        || trimmed.starts_with('/')
        || trimmed.contains('\\')
        || trimmed.contains(':')
    {
        return Err(invalid());
    }
    let mut trimmed = trimmed.trim_end_matches('/');
    while let Some(rest) = trimmed.strip_prefix("./") {
        trimmed = rest;
    }
    if trimmed.is_empty() || trimmed == "." {
        return Ok(None);
    }
    for component in trimmed.split('/') {
        if component.is_empty() || component == "." || component == ".." || component.starts_with('-') {
            return Err(invalid());
        }
    }
    Ok(Some(trimmed.to_string()))
}

// ============================================================================
// SECTION: Tests
// ============================================================================
