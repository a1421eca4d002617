// crates/reproduce-config/src/config.rs
// ============================================================================
// Module: Reproduce Configuration
// Description: Configuration loading and validation for reproduce.
// Purpose: Provide strict config parsing with hard limits.
// Dependencies: dirs, serde, thiserror, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! The path comes from the caller, then the `REPRODUCE_CONFIG` environment
//! variable, then `reproduce.toml` in the working directory. Only the last
//! of these may be absent; an absent default file yields built-in defaults.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
pub const DEFAULT_CONFIG_NAME: &str = "reproduce.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "REPRODUCE_CONFIG";
/// Default cache file name inside the cache directory.
pub const DEFAULT_CACHE_FILE_NAME: &str = "cache.json";
/// Default registry base URL.
pub const DEFAULT_REGISTRY_URL: &str = "https://registry.npmjs.org/";
/// Default build strategy name.
pub const DEFAULT_STRATEGY_NAME: &str = "npm";
/// Application directory name under the platform cache directory.
const CACHE_DIR_NAME: &str = "reproduce";
/// Maximum configuration file size in bytes.
const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum strategy name length.
const MAX_STRATEGY_NAME_LENGTH: usize = 64;
/// Maximum user agent length.
const MAX_USER_AGENT_LENGTH: usize = 256;
/// Minimum registry request timeout in milliseconds.
const MIN_REGISTRY_TIMEOUT_MS: u64 = 1_000;
/// Maximum registry request timeout in milliseconds.
const MAX_REGISTRY_TIMEOUT_MS: u64 = 300_000;
/// Minimum registry response limit in bytes.
const MIN_RESPONSE_BYTES: usize = 1024;
/// Maximum registry response limit in bytes.
const MAX_RESPONSE_BYTES: usize = 256 * 1024 * 1024;
/// Minimum stage timeout in milliseconds.
const MIN_STAGE_TIMEOUT_MS: u64 = 1_000;
/// Maximum stage timeout in milliseconds.
const MAX_STAGE_TIMEOUT_MS: u64 = 86_400_000;
/// Maximum batch concurrency.
pub const MAX_JOBS: usize = 256;

// ============================================================================
// SECTION: Configuration Model
// ============================================================================

/// Top-level `reproduce.toml` model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReproduceConfig {
    /// Cache location.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Build strategy selection.
    #[serde(default)]
    pub build: BuildConfig,
    /// Registry client limits.
    #[serde(default)]
    pub registry: RegistryConfig,
    /// Per-stage process timeouts.
    #[serde(default)]
    pub timeouts: TimeoutsConfig,
    /// Batch runner settings.
    #[serde(default)]
    pub batch: BatchConfig,
}

impl ReproduceConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (resolved, explicit) = resolve_path(path, env::var(CONFIG_ENV_VAR).ok())?;
        validate_path(&resolved)?;
        let bytes = match fs::read(&resolved) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound && !explicit => return Ok(Self::default()),
            Err(err) => return Err(ConfigError::Io(format!("{}: {err}", resolved.display()))),
        };
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content =
            std::str::from_utf8(&bytes).map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml_str(content)
    }

    /// Parses and validates configuration text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.cache.validate()?;
        self.build.validate()?;
        self.registry.validate()?;
        self.timeouts.validate()?;
        self.batch.validate()?;
        Ok(())
    }
}

/// Cache location configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    /// Cache directory; defaults to the platform cache directory.
    #[serde(default)]
    pub dir: Option<PathBuf>,
    /// Cache file name inside the cache directory.
    #[serde(default = "default_cache_file")]
    pub file: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: None,
            file: default_cache_file(),
        }
    }
}

impl CacheConfig {
    /// Returns the effective cache directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when no directory is configured and
    /// the platform has no cache directory.
    pub fn resolved_dir(&self) -> Result<PathBuf, ConfigError> {
        if let Some(dir) = &self.dir {
            return Ok(dir.clone());
        }
        default_cache_dir()
            .ok_or_else(|| ConfigError::Invalid("no platform cache directory; set cache.dir".to_string()))
    }

    /// Returns the effective cache file path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the cache directory is unknown.
    pub fn cache_path(&self) -> Result<PathBuf, ConfigError> {
        Ok(self.resolved_dir()?.join(&self.file))
    }

    /// Validates cache settings.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(dir) = &self.dir {
            validate_path_string("cache.dir", &dir.to_string_lossy())?;
        }
        validate_file_name("cache.file", &self.file)
    }
}

/// Build strategy configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildConfig {
    /// Strategy name; must name a registered strategy.
    #[serde(default = "default_strategy")]
    pub strategy: String,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            strategy: default_strategy(),
        }
    }
}

impl BuildConfig {
    /// Validates strategy name syntax. Registration is checked by the host.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_strategy_name(&self.strategy)
    }
}

/// Registry client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegistryConfig {
    /// Registry base URL.
    #[serde(default = "default_registry_url")]
    pub url: String,
    /// Request timeout in milliseconds.
    #[serde(default = "default_registry_timeout_ms")]
    pub timeout_ms: u64,
    /// Maximum response size in bytes.
    #[serde(default = "default_max_response_bytes")]
    pub max_response_bytes: usize,
    /// Allow cleartext HTTP registries.
    #[serde(default)]
    pub allow_http: bool,
    /// User agent for outbound requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            url: default_registry_url(),
            timeout_ms: default_registry_timeout_ms(),
            max_response_bytes: default_max_response_bytes(),
            allow_http: false,
            user_agent: default_user_agent(),
        }
    }
}

impl RegistryConfig {
    /// Validates registry settings.
    fn validate(&self) -> Result<(), ConfigError> {
        let url = self.url.trim();
        let scheme_ok = url.starts_with("https://") || (self.allow_http && url.starts_with("http://"));
        if !scheme_ok {
            return Err(ConfigError::Invalid(
                "registry.url must use https (or http with registry.allow_http)".to_string(),
            ));
        }
        validate_timeout_range("registry.timeout_ms", self.timeout_ms, MIN_REGISTRY_TIMEOUT_MS, MAX_REGISTRY_TIMEOUT_MS)?;
        if !(MIN_RESPONSE_BYTES ..= MAX_RESPONSE_BYTES).contains(&self.max_response_bytes) {
            return Err(ConfigError::Invalid(format!(
                "registry.max_response_bytes must be between {MIN_RESPONSE_BYTES} and {MAX_RESPONSE_BYTES}"
            )));
        }
        let agent = self.user_agent.trim();
        if agent.is_empty() || agent.len() > MAX_USER_AGENT_LENGTH || agent.chars().any(char::is_control) {
            return Err(ConfigError::Invalid("registry.user_agent is invalid".to_string()));
        }
        Ok(())
    }
}

/// Per-stage process timeouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimeoutsConfig {
    /// Tool version query timeout in milliseconds.
    #[serde(default = "default_version_ms")]
    pub version_ms: u64,
    /// Source checkout timeout in milliseconds.
    #[serde(default = "default_clone_ms")]
    pub clone_ms: u64,
    /// Dependency installation timeout in milliseconds.
    #[serde(default = "default_install_ms")]
    pub install_ms: u64,
    /// Pack timeout in milliseconds.
    #[serde(default = "default_pack_ms")]
    pub pack_ms: u64,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            version_ms: default_version_ms(),
            clone_ms: default_clone_ms(),
            install_ms: default_install_ms(),
            pack_ms: default_pack_ms(),
        }
    }
}

impl TimeoutsConfig {
    /// Validates every stage timeout.
    fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("timeouts.version_ms", self.version_ms),
            ("timeouts.clone_ms", self.clone_ms),
            ("timeouts.install_ms", self.install_ms),
            ("timeouts.pack_ms", self.pack_ms),
        ] {
            validate_timeout_range(field, value, MIN_STAGE_TIMEOUT_MS, MAX_STAGE_TIMEOUT_MS)?;
        }
        Ok(())
    }
}

/// Batch runner configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BatchConfig {
    /// Concurrent specs; defaults to available cores minus one.
    #[serde(default)]
    pub jobs: Option<usize>,
}

impl BatchConfig {
    /// Validates the job count.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_jobs(self.jobs)
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Default cache file name.
fn default_cache_file() -> String {
    DEFAULT_CACHE_FILE_NAME.to_string()
}

/// Default strategy name.
fn default_strategy() -> String {
    DEFAULT_STRATEGY_NAME.to_string()
}

/// Default registry URL.
fn default_registry_url() -> String {
    DEFAULT_REGISTRY_URL.to_string()
}

/// Default registry timeout.
const fn default_registry_timeout_ms() -> u64 {
    30_000
}

/// Default registry response limit.
const fn default_max_response_bytes() -> usize {
    64 * 1024 * 1024
}

/// Default user agent.
fn default_user_agent() -> String {
    format!("reproduce/{}", env!("CARGO_PKG_VERSION"))
}

/// Default version query timeout.
const fn default_version_ms() -> u64 {
    30_000
}

/// Default checkout timeout.
const fn default_clone_ms() -> u64 {
    600_000
}

/// Default install timeout.
const fn default_install_ms() -> u64 {
    1_800_000
}

/// Default pack timeout.
const fn default_pack_ms() -> u64 {
    600_000
}

/// Platform cache directory joined with the application directory.
fn default_cache_dir() -> Option<PathBuf> {
    let base = dirs::cache_dir()?.join(CACHE_DIR_NAME);
    if cfg!(windows) { Some(base.join("Cache")) } else { Some(base) }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from the caller or environment defaults.
///
/// Returns the path and whether it was requested explicitly.
fn resolve_path(path: Option<&Path>, env_path: Option<String>) -> Result<(PathBuf, bool), ConfigError> {
    if let Some(path) = path {
        return Ok((path.to_path_buf(), true));
    }
    if let Some(env_path) = env_path.filter(|value| !value.trim().is_empty()) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok((PathBuf::from(env_path), true));
    }
    Ok((PathBuf::from(DEFAULT_CONFIG_NAME), false))
}

/// Validates the resolved path against length limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        if component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Validates a plain file name with no directory parts.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] for empty names, separators, or dot names.
pub fn validate_file_name(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.is_empty() || value.len() > MAX_PATH_COMPONENT_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} must be 1 to {MAX_PATH_COMPONENT_LENGTH} bytes")));
    }
    if value.contains(['/', '\\']) || value == "." || value == ".." || value.chars().any(char::is_control) {
        return Err(ConfigError::Invalid(format!("{field} must be a plain file name")));
    }
    Ok(())
}

/// Validates strategy name syntax.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] unless the name is lowercase alphanumeric
/// with dashes.
pub fn validate_strategy_name(value: &str) -> Result<(), ConfigError> {
    let valid = !value.is_empty()
        && value.len() <= MAX_STRATEGY_NAME_LENGTH
        && value.bytes().all(|byte| byte.is_ascii_lowercase() || byte.is_ascii_digit() || byte == b'-');
    if !valid {
        return Err(ConfigError::Invalid(format!("build.strategy is not a valid strategy name: {value}")));
    }
    Ok(())
}

/// Validates an optional batch job count.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] when the count is outside `1..=MAX_JOBS`.
pub fn validate_jobs(jobs: Option<usize>) -> Result<(), ConfigError> {
    if let Some(jobs) = jobs
        && !(1 ..= MAX_JOBS).contains(&jobs)
    {
        return Err(ConfigError::Invalid(format!("batch.jobs must be between 1 and {MAX_JOBS}")));
    }
    Ok(())
}

/// Validates a millisecond value against an inclusive range.
fn validate_timeout_range(field: &str, value_ms: u64, min_ms: u64, max_ms: u64) -> Result<(), ConfigError> {
    if value_ms < min_ms || value_ms > max_ms {
        return Err(ConfigError::Invalid(format!("{field} must be between {min_ms} and {max_ms} milliseconds")));
    }
    Ok(())
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
    fn resolve_prefers_explicit_then_env_then_default() {
        let explicit = resolve_path(Some(Path::new("a.toml")), Some("b.toml".to_string())).unwrap();
        assert_eq!(explicit, (PathBuf::from("a.toml"), true));

        let from_env = resolve_path(None, Some("b.toml".to_string())).unwrap();
        assert_eq!(from_env, (PathBuf::from("b.toml"), true));

        let fallback = resolve_path(None, Some("  ".to_string())).unwrap();
        assert_eq!(fallback, (PathBuf::from(DEFAULT_CONFIG_NAME), false));
    }

    #[test]
    fn resolve_rejects_overlong_env_path() {
        let result = resolve_path(None, Some("a".repeat(MAX_TOTAL_PATH_LENGTH + 1)));
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn validate_timeout_range_bounds() {
        assert!(validate_timeout_range("t", MIN_STAGE_TIMEOUT_MS, MIN_STAGE_TIMEOUT_MS, MAX_STAGE_TIMEOUT_MS).is_ok());
        assert!(validate_timeout_range("t", MAX_STAGE_TIMEOUT_MS, MIN_STAGE_TIMEOUT_MS, MAX_STAGE_TIMEOUT_MS).is_ok());
        assert!(validate_timeout_range("t", 999, MIN_STAGE_TIMEOUT_MS, MAX_STAGE_TIMEOUT_MS).is_err());
    }

    #[test]
    fn default_cache_dir_ends_with_app_name() {
        if let Some(dir) = default_cache_dir() {
            assert!(dir.components().any(|component| component.as_os_str() == CACHE_DIR_NAME));
        }
    }
}
