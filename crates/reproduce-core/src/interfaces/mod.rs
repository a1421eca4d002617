// crates/reproduce-core/src/interfaces/mod.rs
// ============================================================================
// Module: Reproduce Interfaces
// Description: Collaborator contracts for manifests, processes, builds, caches.
// Purpose: Define the seams the reproduction engine composes.
// Dependencies: crate::core, thiserror
// ============================================================================

//! ## Overview
//! The engine never talks to the network, spawns processes, or touches the
//! cache file directly. Each concern sits behind a trait here so hosts can
//! swap implementations and tests can substitute deterministic fakes.
//!
//! Security posture: commands are described as argument arrays with explicit
//! working directories; implementations must never route them through a
//! shell.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::path::Path;
use std::path::PathBuf;

use thiserror::Error;

use crate::core::CacheEntry;
use crate::core::Manifest;
use crate::core::RegistrySpec;

// ============================================================================
// SECTION: Manifest Provider
// ============================================================================

/// Manifest provider errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// Transport failed before a response arrived.
    #[error("manifest transport error: {0}")]
    Transport(String),
    /// Registry returned an unexpected status.
    #[error("manifest request failed with status {status}: {url}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Requested URL.
        url: String,
    },
    /// Response body exceeded the configured limit.
    #[error("manifest response too large ({actual_bytes} > {max_bytes})")]
    TooLarge {
        /// Observed size.
        actual_bytes: u64,
        /// Configured maximum.
        max_bytes: u64,
    },
    /// Response body is not a valid manifest.
    #[error("manifest parse error: {0}")]
    Parse(String),
    /// Provider configuration or request is invalid.
    #[error("manifest provider invalid: {0}")]
    Invalid(String),
}

/// Source of registry version manifests.
pub trait ManifestProvider {
    /// Fetches the manifest for a validated spec.
    ///
    /// Returns `Ok(None)` when the registry has no matching version.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError`] when the registry cannot be queried.
    fn fetch_manifest(&self, spec: &RegistrySpec) -> Result<Option<Manifest>, ManifestError>;
}

// ============================================================================
// SECTION: Process Runner
// ============================================================================

/// Pipeline stage a command belongs to; selects its timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ProcessStage {
    /// Build tool version query.
    Version,
    /// Source checkout.
    Clone,
    /// Dependency installation.
    Install,
    /// Artifact packing.
    Pack,
}

impl ProcessStage {
    /// Returns the stable lowercase label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Version => "version",
            Self::Clone => "clone",
            Self::Install => "install",
            Self::Pack => "pack",
        }
    }
}

impl fmt::Display for ProcessStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Deferred external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Program name or path.
    pub program: String,
    /// Argument array passed verbatim.
    pub args: Vec<String>,
    /// Working directory, if any.
    pub cwd: Option<PathBuf>,
    /// Pipeline stage.
    pub stage: ProcessStage,
}

impl CommandSpec {
    /// Creates a command for a stage.
    #[must_use]
    pub fn new<I, S>(program: &str, args: I, stage: ProcessStage) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.to_string(),
            args: args.into_iter().map(Into::into).collect(),
            cwd: None,
            stage,
        }
    }

    /// Sets the working directory.
    #[must_use]
    pub fn in_dir(mut self, dir: &Path) -> Self {
        self.cwd = Some(dir.to_path_buf());
        self
    }

    /// Renders the command line for diagnostics.
    #[must_use]
    pub fn display_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Process execution errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// The program could not be started.
    #[error("failed to spawn {program}: {message}")]
    Spawn {
        /// Program name.
        program: String,
        /// OS error text.
        message: String,
    },
    /// The program exited unsuccessfully.
    #[error("{stage} command exited with {code:?}: {stderr}")]
    Exit {
        /// Stage that failed.
        stage: ProcessStage,
        /// Exit code, absent when killed by a signal.
        code: Option<i32>,
        /// Captured standard error tail.
        stderr: String,
    },
    /// The stage timeout elapsed.
    #[error("{stage} command timed out after {timeout_ms}ms")]
    Timeout {
        /// Stage that timed out.
        stage: ProcessStage,
        /// Configured timeout.
        timeout_ms: u64,
    },
    /// Execution was cancelled.
    #[error("{0} command cancelled")]
    Cancelled(ProcessStage),
    /// Standard output exceeded the capture limit.
    #[error("{stage} command output exceeded {max_bytes} bytes")]
    OutputTooLarge {
        /// Stage whose output overflowed.
        stage: ProcessStage,
        /// Capture limit in bytes.
        max_bytes: u64,
    },
    /// Output capture failed.
    #[error("process io error: {0}")]
    Io(String),
}

impl ProcessError {
    /// Returns the stable error kind label.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Spawn { .. } => "spawn",
            Self::Exit { .. } => "exit",
            Self::Timeout { .. } => "timeout",
            Self::Cancelled(_) => "cancelled",
            Self::OutputTooLarge { .. } => "output_too_large",
            Self::Io(_) => "io",
        }
    }

    /// Returns true when the failure was caused by cancellation.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }
}

/// Executes external commands synchronously.
pub trait ProcessRunner {
    /// Runs a command and returns its captured standard output.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError`] on spawn failure, non-zero exit, timeout,
    /// cancellation, or oversized output.
    fn run(&self, command: &CommandSpec) -> Result<String, ProcessError>;
}

// ============================================================================
// SECTION: Build Strategy
// ============================================================================

/// Packed artifact description produced by a strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackedArtifact {
    /// Integrity digest of the packed tarball, when available.
    pub integrity: Option<String>,
}

/// Build strategy errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum StrategyError {
    /// No strategy is registered under the requested name.
    #[error("unknown build strategy: {0}")]
    Unknown(String),
    /// A strategy is already registered under the name.
    #[error("build strategy already registered: {0}")]
    Duplicate(String),
    /// Tool output could not be interpreted.
    #[error("build strategy output parse error: {0}")]
    Parse(String),
    /// Filesystem access failed.
    #[error("build strategy io error: {0}")]
    Io(String),
}

/// Build tool variant able to install and pack a package.
///
/// Methods return deferred commands; the engine runs them through its
/// [`ProcessRunner`].
pub trait BuildStrategy: Send + Sync {
    /// Returns the registered strategy name.
    fn name(&self) -> &str;

    /// Returns the command that prints the tool version.
    fn tool_version_command(&self) -> CommandSpec;

    /// Extracts the version string from the version command output.
    fn parse_tool_version(&self, output: &str) -> String {
        output.lines().map(str::trim).find(|line| !line.is_empty()).unwrap_or_default().to_string()
    }

    /// Returns the dependency installation command for a package directory.
    fn install(&self, dir: &Path) -> CommandSpec;

    /// Prepares the package directory before packing.
    ///
    /// # Errors
    ///
    /// Returns [`StrategyError`] when preparation fails.
    fn prepare_pack(&self, _dir: &Path) -> Result<(), StrategyError> {
        Ok(())
    }

    /// Returns the pack command for a package directory.
    fn pack(&self, dir: &Path) -> CommandSpec;

    /// Interprets the pack command output.
    ///
    /// # Errors
    ///
    /// Returns [`StrategyError`] when the output cannot be interpreted.
    fn parse_pack(&self, dir: &Path, output: &str) -> Result<PackedArtifact, StrategyError>;
}

// ============================================================================
// SECTION: Cache Store
// ============================================================================

/// Cache store errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Store I/O error.
    #[error("cache store io error: {0}")]
    Io(String),
    /// Store data is corrupted.
    #[error("cache store corruption: {0}")]
    Corrupt(String),
    /// Store data is invalid.
    #[error("cache store invalid data: {0}")]
    Invalid(String),
    /// Store reported an error.
    #[error("cache store error: {0}")]
    Store(String),
}

/// Mapping from spec strings to cache entries.
pub trait CacheStore {
    /// Returns the entry for a spec, if any.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store cannot be read.
    fn get(&self, spec: &str) -> Result<Option<CacheEntry>, StoreError>;

    /// Returns true when an entry exists for a spec.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store cannot be read.
    fn contains(&self, spec: &str) -> Result<bool, StoreError> {
        Ok(self.get(spec)?.is_some())
    }

    /// Inserts or replaces the entry for a spec.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store cannot be updated.
    fn put(&self, spec: &str, entry: CacheEntry) -> Result<(), StoreError>;

    /// Persists pending entries.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when persistence fails.
    fn flush(&self) -> Result<(), StoreError> {
        Ok(())
    }

    /// Returns true when a source checkout can be reused.
    ///
    /// A checkout is reused when the work directory already exists or the
    /// store holds an entry keyed by the source spec. A stale checkout of a
    /// different version may therefore be packed; callers that need a clean
    /// tree bypass this check.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store cannot be read.
    fn has_materialized_source(&self, source_spec: &str, work_dir: &Path) -> Result<bool, StoreError> {
        if work_dir.is_dir() {
            return Ok(true);
        }
        self.contains(source_spec)
    }
}
