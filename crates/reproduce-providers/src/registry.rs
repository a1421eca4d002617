// crates/reproduce-providers/src/registry.rs
// ============================================================================
// Module: Registry Manifest Provider
// Description: ManifestProvider backed by the registry HTTP API.
// Purpose: Resolve validated specs to version manifests with strict limits.
// Dependencies: reproduce-core, reqwest, serde, serde_json, tracing
// ============================================================================

//! ## Overview
//! Exact versions and dist-tags are fetched directly from
//! `<registry>/<name>/<selector>`. Ranges fetch the packument at
//! `<registry>/<name>` and select the `latest` tag when it satisfies the
//! range, otherwise the highest satisfying version. A 404 means the package
//! or version does not exist. Redirects are not followed and bodies larger
//! than the configured limit fail closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::io::Read;
use std::time::Duration;

use reproduce_core::Manifest;
use reproduce_core::ManifestError;
use reproduce_core::ManifestProvider;
use reproduce_core::RegistrySpec;
use reproduce_core::SUPPORTED_REGISTRY;
use reproduce_core::VersionSelector;
use reqwest::StatusCode;
use reqwest::Url;
use reqwest::blocking::Client;
use reqwest::blocking::Response;
use reqwest::header::ACCEPT;
use reqwest::redirect::Policy;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::semver::Range;
use crate::semver::Version;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Configuration for the registry provider.
///
/// # Invariants
/// - `allow_http = false` blocks cleartext `http://` registries.
/// - `max_response_bytes` is a hard upper bound on response bodies.
/// - `timeout_ms` applies to the full request lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryProviderConfig {
    /// Registry base URL.
    pub registry_url: String,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Maximum response size allowed, in bytes.
    pub max_response_bytes: usize,
    /// Allow cleartext HTTP.
    pub allow_http: bool,
    /// User agent string for outbound requests.
    pub user_agent: String,
}

impl Default for RegistryProviderConfig {
    fn default() -> Self {
        Self {
            registry_url: SUPPORTED_REGISTRY.to_string(),
            timeout_ms: 30_000,
            max_response_bytes: 64 * 1024 * 1024,
            allow_http: false,
            user_agent: format!("reproduce/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

// ============================================================================
// SECTION: Provider Implementation
// ============================================================================

/// Manifest provider for the package registry.
pub struct RegistryManifestProvider {
    /// Parsed registry base URL, always ending in `/`.
    base: Url,
    /// Provider configuration.
    config: RegistryProviderConfig,
    /// HTTP client used for outbound requests.
    client: Client,
}

impl RegistryManifestProvider {
    /// Creates a provider with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Invalid`] when the registry URL is unusable or
    /// the HTTP client cannot be created.
    pub fn new(config: RegistryProviderConfig) -> Result<Self, ManifestError> {
        let base = parse_base_url(&config)?;
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(config.user_agent.clone())
            .redirect(Policy::none())
            .build()
            .map_err(|err| ManifestError::Invalid(format!("http client build failed: {err}")))?;
        Ok(Self {
            base,
            config,
            client,
        })
    }

    /// Returns the registry base URL.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base
    }

    /// Builds `<registry>/<name>[/<selector>]`.
    fn endpoint(&self, name: &str, selector: Option<&str>) -> Result<Url, ManifestError> {
        let mut url = self.base.clone();
        {
            let mut segments =
                url.path_segments_mut().map_err(|()| ManifestError::Invalid("registry url cannot be a base".to_string()))?;
            segments.pop_if_empty();
            segments.extend(name.split('/'));
            if let Some(selector) = selector {
                segments.push(selector);
            }
        }
        Ok(url)
    }

    /// Issues a GET and returns the parsed body, or `None` on 404.
    fn get_json(&self, url: &Url) -> Result<Option<Value>, ManifestError> {
        debug!(url = %url, "fetching registry document");
        let mut response = self
            .client
            .get(url.as_str())
            .header(ACCEPT, "application/json")
            .send()
            .map_err(|err| ManifestError::Transport(err.to_string()))?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(ManifestError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        let body = read_response_limited(&mut response, self.config.max_response_bytes)?;
        serde_json::from_slice(&body).map(Some).map_err(|err| ManifestError::Parse(err.to_string()))
    }

    /// Resolves a range against the packument.
    fn resolve_range(&self, spec: &RegistrySpec, range: &str) -> Result<Option<Manifest>, ManifestError> {
        let range = Range::parse(range).map_err(|err| ManifestError::Invalid(err.to_string()))?;
        let Some(document) = self.get_json(&self.endpoint(spec.name(), None)?)? else {
            return Ok(None);
        };
        let mut packument: Packument =
            serde_json::from_value(document).map_err(|err| ManifestError::Parse(err.to_string()))?;
        let Some(selected) = select_version(&packument, &range) else {
            return Ok(None);
        };
        let Some(document) = packument.versions.remove(&selected) else {
            return Ok(None);
        };
        serde_json::from_value(document).map(Some).map_err(|err| ManifestError::Parse(err.to_string()))
    }
}

impl ManifestProvider for RegistryManifestProvider {
    fn fetch_manifest(&self, spec: &RegistrySpec) -> Result<Option<Manifest>, ManifestError> {
        match spec.selector() {
            VersionSelector::Version(version) | VersionSelector::Tag(version) => {
                let Some(document) = self.get_json(&self.endpoint(spec.name(), Some(version))?)? else {
                    return Ok(None);
                };
                serde_json::from_value(document).map(Some).map_err(|err| ManifestError::Parse(err.to_string()))
            }
            VersionSelector::Range(range) => self.resolve_range(spec, range),
        }
    }
}

// ============================================================================
// SECTION: Packument
// ============================================================================

/// Full package document listing every published version.
#[derive(Debug, Deserialize)]
struct Packument {
    /// Dist-tag to version mapping.
    #[serde(default, rename = "dist-tags")]
    dist_tags: BTreeMap<String, String>,
    /// Version manifests keyed by version string.
    #[serde(default)]
    versions: BTreeMap<String, Value>,
}

/// Picks the `latest` tag when it satisfies the range, else the highest match.
fn select_version(packument: &Packument, range: &Range) -> Option<String> {
    if let Some(latest) = packument.dist_tags.get("latest")
        && packument.versions.contains_key(latest)
        && Version::parse(latest).is_ok_and(|version| range.satisfies(&version))
    {
        return Some(latest.clone());
    }
    let candidates: Vec<(Version, &String)> = packument
        .versions
        .keys()
        .filter_map(|key| Version::parse(key).ok().map(|version| (version, key)))
        .collect();
    let best = range.max_satisfying(candidates.iter().map(|(version, _)| version))?;
    candidates.iter().find(|(version, _)| version == best).map(|(_, key)| (*key).clone())
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Validates the registry URL scheme and normalizes the trailing slash.
fn parse_base_url(config: &RegistryProviderConfig) -> Result<Url, ManifestError> {
    let mut url = Url::parse(config.registry_url.trim())
        .map_err(|_| ManifestError::Invalid(format!("invalid registry url: {}", config.registry_url)))?;
    match url.scheme() {
        "https" => {}
        "http" if config.allow_http => {}
        _ => return Err(ManifestError::Invalid("unsupported registry url scheme".to_string())),
    }
    if !url.username().is_empty() || url.password().is_some() {
        return Err(ManifestError::Invalid("registry url credentials are not allowed".to_string()));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(ManifestError::Invalid("registry url must not carry a query or fragment".to_string()));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Reads the response body while enforcing a byte limit.
fn read_response_limited(response: &mut Response, max_bytes: usize) -> Result<Vec<u8>, ManifestError> {
    let max_bytes_u64 =
        u64::try_from(max_bytes).map_err(|_| ManifestError::Invalid("response size limit exceeds u64".to_string()))?;
    if let Some(expected) = response.content_length()
        && expected > max_bytes_u64
    {
        return Err(ManifestError::TooLarge {
            actual_bytes: expected,
            max_bytes: max_bytes_u64,
        });
    }
    let mut buf = Vec::new();
    let mut handle = response.take(max_bytes_u64.saturating_add(1));
    handle.read_to_end(&mut buf).map_err(|err| ManifestError::Transport(format!("failed to read response: {err}")))?;
    if buf.len() > max_bytes {
        return Err(ManifestError::TooLarge {
            actual_bytes: u64::try_from(buf.len()).unwrap_or(u64::MAX),
            max_bytes: max_bytes_u64,
        });
    }
    Ok(buf)
}
