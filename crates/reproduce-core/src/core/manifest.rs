// crates/reproduce-core/src/core/manifest.rs
// ============================================================================
// Module: Registry Manifest
// Description: Version manifest fields consumed by the reproduction engine.
// Purpose: Deserialize the subset of registry metadata needed to locate source.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Only the fields the engine reads are modelled. Unknown fields are ignored
//! so the registry can evolve its document shape freely. `repository` is
//! accepted either as a bare URL string or as an object.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Version manifest returned by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    /// Package name.
    pub name: String,
    /// Resolved version.
    pub version: String,
    /// Declared source repository.
    #[serde(default, deserialize_with = "deserialize_repository", skip_serializing_if = "Option::is_none")]
    pub repository: Option<Repository>,
    /// Commit the package was published from, when the publisher recorded it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_head: Option<String>,
    /// Distribution metadata.
    pub dist: Dist,
}

impl Manifest {
    /// Returns the declared repository URL, if any.
    #[must_use]
    pub fn repository_url(&self) -> Option<&str> {
        self.repository
            .as_ref()
            .and_then(|repository| repository.url.as_deref())
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }

    /// Returns true when the registry reports provenance attestations.
    #[must_use]
    pub fn is_attested(&self) -> bool {
        self.dist
            .attestations
            .as_ref()
            .and_then(|attestations| attestations.url.as_deref())
            .is_some_and(|url| !url.trim().is_empty())
    }
}

/// Repository declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    /// Repository URL in any of the common npm forms.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Repository kind, typically `git`.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Package directory inside a monorepo.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<String>,
}

/// Distribution metadata for a published version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dist {
    /// Tarball download URL.
    pub tarball: String,
    /// Subresource-integrity digest of the published tarball.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integrity: Option<String>,
    /// Provenance attestation pointer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attestations: Option<Attestations>,
}

/// Provenance attestation pointer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attestations {
    /// Attestation bundle URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Wire forms accepted for `repository`.
#[derive(Deserialize)]
#[serde(untagged)]
enum RepositoryField {
    /// Shorthand string form.
    Url(String),
    /// Object form.
    Object(Repository),
}

/// Accepts `repository` as a string, an object, or null.
fn deserialize_repository<'de, D>(deserializer: D) -> Result<Option<Repository>, D::Error>
where
    D: Deserializer<'de>,
{
    let field = Option::<RepositoryField>::deserialize(deserializer)?;
    Ok(field.map(|field| match field {
        RepositoryField::Url(url) => Repository {
            url: Some(url),
            kind: None,
            directory: None,
        },
        RepositoryField::Object(repository) => repository,
    }))
}

// ============================================================================
// SECTION: Tests
// ============================================================================
