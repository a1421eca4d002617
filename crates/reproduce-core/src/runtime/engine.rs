// crates/reproduce-core/src/runtime/engine.rs
// ============================================================================
// Module: Reproduction Engine
// Description: Per-spec pipeline from validation to recorded verdict.
// Purpose: Decide whether a published package rebuilds to the same digest.
// Dependencies: crate::{core, interfaces, runtime}, time, tracing
// ============================================================================

//! ## Overview
//! The engine runs one spec through validation, cache lookup, manifest
//! resolution, source checkout, install, pack, and digest comparison. The
//! outcome is always a value: build failures downgrade to
//! `reproduced = false`, out-of-domain specs and unexpected failures become a
//! cached not-applicable entry, and cancellation returns without touching the
//! cache.
//!
//! ## Invariants
//! - A cached spec is answered without invoking any external process unless
//!   the request forces a rebuild.
//! - Two specs sharing a package name never build in the same work directory
//!   at the same time.
//! - The build tool version is queried at most once per engine.
//! - Checkouts live under `<cache_dir>/sources/<package name>`, never directly
//!   beside the cache file.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::OnceLock;
use std::sync::PoisonError;

use thiserror::Error;
use time::OffsetDateTime;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::core::CacheEntry;
use crate::core::Manifest;
use crate::core::PackageRecord;
use crate::core::RegistrySpec;
use crate::core::ReproductionResult;
use crate::core::SourceLocator;
use crate::core::SourceRecord;
use crate::core::SpecRejection;
use crate::core::digests_match;
use crate::core::platform_arch;
use crate::core::platform_os;
use crate::core::resolve_source;
use crate::core::validate_package_name;
use crate::core::validate_spec;
use crate::interfaces::BuildStrategy;
use crate::interfaces::CacheStore;
use crate::interfaces::CommandSpec;
use crate::interfaces::ManifestError;
use crate::interfaces::ManifestProvider;
use crate::interfaces::ProcessRunner;
use crate::interfaces::StoreError;
use crate::runtime::SharedCacheStore;
use crate::runtime::checkout::checkout_plan;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Tool version recorded when the version query fails.
const UNKNOWN_TOOL_VERSION: &str = "unknown";
/// Subdirectory of the cache directory holding per-package checkouts.
pub const SOURCES_DIR_NAME: &str = "sources";

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Directory holding the cache file and the checkout tree.
    pub cache_dir: PathBuf,
    /// Version recorded as `reproduceVersion`.
    pub reproduce_version: String,
}

impl EngineConfig {
    /// Creates a configuration rooted at `cache_dir`.
    #[must_use]
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            reproduce_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Returns the directory holding per-package checkouts.
    #[must_use]
    pub fn sources_dir(&self) -> PathBuf {
        self.cache_dir.join(SOURCES_DIR_NAME)
    }

    /// Overrides the recorded tool version.
    #[must_use]
    pub fn with_reproduce_version(mut self, version: impl Into<String>) -> Self {
        self.reproduce_version = version.into();
        self
    }
}

// ============================================================================
// SECTION: Requests and Outcomes
// ============================================================================

/// Request to reproduce one spec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReproduceRequest {
    /// Package spec as supplied by the caller.
    pub spec: String,
    /// Ignore any cached entry and rebuild.
    pub force: bool,
    /// Discard an existing checkout instead of reusing it.
    pub fresh: bool,
}

impl ReproduceRequest {
    /// Creates a request with default flags.
    #[must_use]
    pub fn new(spec: impl Into<String>) -> Self {
        Self {
            spec: spec.into(),
            force: false,
            fresh: false,
        }
    }

    /// Sets the cache bypass flag.
    #[must_use]
    pub const fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Sets the checkout refresh flag.
    #[must_use]
    pub const fn fresh(mut self, fresh: bool) -> Self {
        self.fresh = fresh;
        self
    }
}

/// Terminal outcome of one reproduction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReproduceOutcome {
    /// A verdict was recorded (or returned from cache).
    Recorded(Box<ReproductionResult>),
    /// The spec is outside the reproducible domain.
    NotApplicable,
    /// Execution was cancelled before a verdict was reached.
    Cancelled,
}

impl ReproduceOutcome {
    /// Returns the recorded verdict, if any.
    #[must_use]
    pub fn as_result(&self) -> Option<&ReproductionResult> {
        match self {
            Self::Recorded(result) => Some(result),
            Self::NotApplicable | Self::Cancelled => None,
        }
    }

    /// Returns true when a verdict was recorded and the package reproduced.
    #[must_use]
    pub fn is_reproduced(&self) -> bool {
        self.as_result().is_some_and(|result| result.reproduced)
    }
}

impl From<CacheEntry> for ReproduceOutcome {
    fn from(entry: CacheEntry) -> Self {
        match entry {
            CacheEntry::Recorded(result) => Self::Recorded(result),
            CacheEntry::NotApplicable => Self::NotApplicable,
        }
    }
}

// ============================================================================
// SECTION: Pipeline Errors
// ============================================================================

/// Failures that end the pipeline without a rebuilt digest.
#[derive(Debug, Error)]
enum PipelineError {
    /// An external step observed cancellation.
    #[error("cancelled")]
    Cancelled,
    /// The registry could not be queried.
    #[error(transparent)]
    Manifest(#[from] ManifestError),
    /// The work directory could not be prepared.
    #[error("work directory error: {0}")]
    WorkDir(String),
}

/// Result of the resolution phase.
enum Resolution {
    /// The package can be rebuilt from this source.
    Buildable(Box<Manifest>, SourceLocator),
    /// The package is outside the reproducible domain.
    NotApplicable,
}

// ============================================================================
// SECTION: Engine
// ============================================================================

/// Reproduction engine composing the pipeline collaborators.
pub struct ReproductionEngine<M, R> {
    /// Registry manifest source.
    manifests: M,
    /// External command runner.
    runner: R,
    /// Selected build strategy.
    strategy: Arc<dyn BuildStrategy>,
    /// Verdict cache.
    store: SharedCacheStore,
    /// Engine configuration.
    config: EngineConfig,
    /// Memoized build tool version.
    tool_version: OnceLock<String>,
    /// Per-work-directory build locks.
    work_dir_locks: Mutex<BTreeMap<PathBuf, Arc<Mutex<()>>>>,
}

impl<M, R> ReproductionEngine<M, R>
where
    M: ManifestProvider,
    R: ProcessRunner,
{
    /// Creates an engine from its collaborators.
    #[must_use]
    pub fn new(
        manifests: M,
        runner: R,
        strategy: Arc<dyn BuildStrategy>,
        store: SharedCacheStore,
        config: EngineConfig,
    ) -> Self {
        Self {
            manifests,
            runner,
            strategy,
            store,
            config,
            tool_version: OnceLock::new(),
            work_dir_locks: Mutex::new(BTreeMap::new()),
        }
    }

    /// Reproduces one spec.
    ///
    /// Never fails: every failure mode maps onto a [`ReproduceOutcome`].
    pub fn reproduce(&self, request: &ReproduceRequest) -> ReproduceOutcome {
        let spec = match validate_spec(&request.spec) {
            Ok(spec) => spec,
            Err(SpecRejection::Empty) => return ReproduceOutcome::NotApplicable,
            Err(rejection) => {
                debug!(spec = %request.spec, reason = %rejection, "spec is not reproducible");
                self.record(&request.spec, CacheEntry::NotApplicable);
                return ReproduceOutcome::NotApplicable;
            }
        };

        if !request.force {
            match self.store.get(spec.raw()) {
                Ok(Some(entry)) => {
                    debug!(spec = %spec, "cache hit");
                    return entry.into();
                }
                Ok(None) => {}
                Err(err) => warn!(spec = %spec, error = %err, "cache lookup failed"),
            }
        }

        match self.run_pipeline(&spec, request.fresh) {
            Ok(Some(result)) => {
                info!(
                    spec = %spec,
                    reproduced = result.reproduced,
                    attested = result.attested,
                    "verdict recorded"
                );
                self.record(spec.raw(), CacheEntry::Recorded(Box::new(result.clone())));
                ReproduceOutcome::Recorded(Box::new(result))
            }
            Ok(None) => {
                self.record(spec.raw(), CacheEntry::NotApplicable);
                ReproduceOutcome::NotApplicable
            }
            Err(PipelineError::Cancelled) => {
                warn!(spec = %spec, "reproduction cancelled");
                ReproduceOutcome::Cancelled
            }
            Err(err) => {
                warn!(spec = %spec, error = %err, "reproduction failed");
                self.record(spec.raw(), CacheEntry::NotApplicable);
                ReproduceOutcome::NotApplicable
            }
        }
    }

    /// Resolves, builds, and compares one validated spec.
    fn run_pipeline(
        &self,
        spec: &RegistrySpec,
        fresh: bool,
    ) -> Result<Option<ReproductionResult>, PipelineError> {
        let (manifest, locator) = match self.resolve(spec)? {
            Resolution::Buildable(manifest, locator) => (manifest, locator),
            Resolution::NotApplicable => return Ok(None),
        };

        let work_dir = self.work_dir(&manifest.name);
        let source_spec = locator.source_spec(&manifest.name);
        let rebuilt = self.build(spec, &locator, &work_dir, &source_spec, fresh)?;
        let tool_version = self.tool_version()?;

        Ok(Some(self.assemble(spec, &manifest, &locator, rebuilt, &tool_version)))
    }

    /// Fetches the manifest and resolves its source locator.
    fn resolve(&self, spec: &RegistrySpec) -> Result<Resolution, PipelineError> {
        let Some(manifest) = self.manifests.fetch_manifest(spec)? else {
            debug!(spec = %spec, "no manifest for spec");
            return Ok(Resolution::NotApplicable);
        };
        if let Err(rejection) = validate_package_name(&manifest.name) {
            debug!(spec = %spec, reason = %rejection, "manifest name is unusable");
            return Ok(Resolution::NotApplicable);
        }
        match resolve_source(&manifest) {
            Ok(locator) => Ok(Resolution::Buildable(Box::new(manifest), locator)),
            Err(rejection) => {
                debug!(spec = %spec, reason = %rejection, "source is not reproducible");
                Ok(Resolution::NotApplicable)
            }
        }
    }

    /// Prepares the checkout when needed and packs it.
    ///
    /// Returns the rebuilt digest, or `None` when any build step failed.
    fn build(
        &self,
        spec: &RegistrySpec,
        locator: &SourceLocator,
        work_dir: &Path,
        source_spec: &str,
        fresh: bool,
    ) -> Result<Option<String>, PipelineError> {
        let lock = self.work_dir_lock(work_dir);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let materialized = !fresh
            && self.store.has_materialized_source(source_spec, work_dir).unwrap_or_else(|err: StoreError| {
                warn!(spec = %spec, error = %err, "materialized source check failed");
                false
            });
        let package_dir = locator.package_dir(work_dir);

        if materialized {
            debug!(spec = %spec, work_dir = %work_dir.display(), "reusing materialized source");
        } else {
            match self.setup(spec, locator, work_dir, &package_dir) {
                Ok(true) => {}
                Ok(false) => {
                    discard_work_dir(work_dir);
                    return Ok(None);
                }
                Err(err) => {
                    discard_work_dir(work_dir);
                    return Err(err);
                }
            }
        }

        self.pack(spec, &package_dir)
    }

    /// Checks out the locator and installs dependencies.
    ///
    /// Returns false when a step failed.
    fn setup(
        &self,
        spec: &RegistrySpec,
        locator: &SourceLocator,
        work_dir: &Path,
        package_dir: &Path,
    ) -> Result<bool, PipelineError> {
        if work_dir.exists() {
            fs::remove_dir_all(work_dir).map_err(|err| PipelineError::WorkDir(err.to_string()))?;
        }
        fs::create_dir_all(work_dir).map_err(|err| PipelineError::WorkDir(err.to_string()))?;

        for command in checkout_plan(locator, work_dir) {
            if self.run_step(spec, &command)?.is_none() {
                return Ok(false);
            }
        }
        let install = self.strategy.install(package_dir);
        Ok(self.run_step(spec, &install)?.is_some())
    }

    /// Packs the package directory and extracts the rebuilt digest.
    fn pack(&self, spec: &RegistrySpec, package_dir: &Path) -> Result<Option<String>, PipelineError> {
        if let Err(err) = self.strategy.prepare_pack(package_dir) {
            warn!(spec = %spec, stage = "pack", error = %err, "pack preparation failed");
            return Ok(None);
        }
        let command = self.strategy.pack(package_dir);
        let Some(output) = self.run_step(spec, &command)? else {
            return Ok(None);
        };
        match self.strategy.parse_pack(package_dir, &output) {
            Ok(artifact) => Ok(artifact.integrity.filter(|digest| !digest.is_empty())),
            Err(err) => {
                warn!(spec = %spec, stage = "pack", error = %err, "pack output unreadable");
                Ok(None)
            }
        }
    }

    /// Runs one build step, logging failures.
    ///
    /// Returns `None` when the step failed for any reason but cancellation.
    fn run_step(&self, spec: &RegistrySpec, command: &CommandSpec) -> Result<Option<String>, PipelineError> {
        match self.runner.run(command) {
            Ok(output) => Ok(Some(output)),
            Err(err) if err.is_cancelled() => Err(PipelineError::Cancelled),
            Err(err) => {
                warn!(
                    spec = %spec,
                    stage = %command.stage,
                    kind = err.kind(),
                    command = %command.display_line(),
                    error = %err,
                    "build step failed"
                );
                Ok(None)
            }
        }
    }

    /// Returns the memoized build tool version, querying it on first use.
    fn tool_version(&self) -> Result<String, PipelineError> {
        if let Some(version) = self.tool_version.get() {
            return Ok(version.clone());
        }
        let command = self.strategy.tool_version_command();
        let queried = match self.runner.run(&command) {
            Ok(output) => {
                let version = self.strategy.parse_tool_version(&output);
                if version.is_empty() { UNKNOWN_TOOL_VERSION.to_string() } else { version }
            }
            Err(err) if err.is_cancelled() => return Err(PipelineError::Cancelled),
            Err(err) => {
                warn!(strategy = self.strategy.name(), error = %err, "tool version query failed");
                UNKNOWN_TOOL_VERSION.to_string()
            }
        };
        Ok(self.tool_version.get_or_init(|| queried).clone())
    }

    /// Builds the verdict record.
    fn assemble(
        &self,
        spec: &RegistrySpec,
        manifest: &Manifest,
        locator: &SourceLocator,
        rebuilt: Option<String>,
        tool_version: &str,
    ) -> ReproductionResult {
        ReproductionResult {
            reproduce_version: self.config.reproduce_version.clone(),
            timestamp: OffsetDateTime::now_utc(),
            os: platform_os().to_string(),
            arch: platform_arch().to_string(),
            strategy: format!("{}:{tool_version}", self.strategy.name()),
            reproduced: digests_match(manifest.dist.integrity.as_deref(), rebuilt.as_deref()),
            attested: manifest.is_attested(),
            package: PackageRecord {
                spec: spec.raw().to_string(),
                name: manifest.name.clone(),
                version: manifest.version.clone(),
                location: manifest.dist.tarball.clone(),
                integrity: manifest.dist.integrity.clone(),
            },
            source: SourceRecord {
                spec: locator.to_string(),
                location: manifest.repository_url().unwrap_or_default().to_string(),
                integrity: rebuilt,
            },
        }
    }

    /// Writes an entry through to the cache.
    fn record(&self, spec: &str, entry: CacheEntry) {
        if let Err(err) = self.store.put(spec, entry) {
            warn!(spec = %spec, error = %err, "cache write failed");
            return;
        }
        if let Err(err) = self.store.flush() {
            warn!(spec = %spec, error = %err, "cache flush failed");
        }
    }

    /// Returns the work directory for a validated package name.
    fn work_dir(&self, package_name: &str) -> PathBuf {
        package_name.split('/').fold(self.config.sources_dir(), |path, part| path.join(part))
    }

    /// Returns the lock guarding a work directory.
    fn work_dir_lock(&self, work_dir: &Path) -> Arc<Mutex<()>> {
        let mut locks = self.work_dir_locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(work_dir.to_path_buf()).or_default())
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Removes a partially prepared work directory so the next run starts clean.
fn discard_work_dir(work_dir: &Path) {
    if work_dir.exists()
        && let Err(err) = fs::remove_dir_all(work_dir)
    {
        warn!(work_dir = %work_dir.display(), error = %err, "failed to remove incomplete checkout");
    }
}
