// crates/reproduce-core/tests/common/mod.rs
// ============================================================================
// Module: Reproduce Core Test Fixtures
// Description: Deterministic fakes for the engine's external collaborators.
// Purpose: Drive the engine without network access or real build tools.
// Dependencies: reproduce-core
// ============================================================================
//! ## Overview
//! Provides a fake manifest provider, a recording process runner with
//! scripted failures, and a minimal build strategy whose pack step echoes a
//! configured digest.

#![allow(dead_code, reason = "Shared test helpers may be unused in some cases.")]

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;

use reproduce_core::BuildStrategy;
use reproduce_core::CommandSpec;
use reproduce_core::Dist;
use reproduce_core::Manifest;
use reproduce_core::ManifestError;
use reproduce_core::ManifestProvider;
use reproduce_core::PackedArtifact;
use reproduce_core::ProcessError;
use reproduce_core::ProcessRunner;
use reproduce_core::ProcessStage;
use reproduce_core::RegistrySpec;
use reproduce_core::Repository;
use reproduce_core::StrategyError;

// ============================================================================
// SECTION: Manifests
// ============================================================================

/// Published digest used by fixtures.
pub const PUBLISHED_INTEGRITY: &str = "sha512-published";

/// Builds a manifest for `name@version` with the given repository URL.
pub fn manifest(name: &str, version: &str, repository_url: Option<&str>) -> Manifest {
    Manifest {
        name: name.to_string(),
        version: version.to_string(),
        repository: repository_url.map(|url| Repository {
            url: Some(url.to_string()),
            kind: Some("git".to_string()),
            directory: None,
        }),
        git_head: None,
        dist: Dist {
            tarball: format!("https://registry.npmjs.org/{name}/-/{name}-{version}.tgz"),
            integrity: Some(PUBLISHED_INTEGRITY.to_string()),
            attestations: None,
        },
    }
}

/// Manifest provider backed by a fixed map keyed by package name.
#[derive(Clone, Default)]
pub struct FakeManifestProvider {
    /// Manifests by package name.
    manifests: BTreeMap<String, Manifest>,
    /// Fail every request with a transport error.
    fail: bool,
    /// Request log.
    requests: Arc<Mutex<Vec<String>>>,
}

impl FakeManifestProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, manifest: Manifest) -> Self {
        self.manifests.insert(manifest.name.clone(), manifest);
        self
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

impl ManifestProvider for FakeManifestProvider {
    fn fetch_manifest(&self, spec: &RegistrySpec) -> Result<Option<Manifest>, ManifestError> {
        self.requests.lock().unwrap().push(spec.raw().to_string());
        if self.fail {
            return Err(ManifestError::Transport("connection refused".to_string()));
        }
        Ok(self.manifests.get(spec.name()).cloned())
    }
}

// ============================================================================
// SECTION: Process Runner
// ============================================================================

/// Process runner that records commands and returns scripted output.
#[derive(Clone)]
pub struct RecordingProcessRunner {
    /// Commands in execution order.
    commands: Arc<Mutex<Vec<CommandSpec>>>,
    /// Output of the pack stage.
    pack_output: Arc<Mutex<String>>,
    /// Stage that fails with a non-zero exit.
    fail_stage: Option<ProcessStage>,
    /// Stage that reports cancellation.
    cancel_stage: Option<ProcessStage>,
}

impl RecordingProcessRunner {
    pub fn packing(integrity: &str) -> Self {
        Self {
            commands: Arc::new(Mutex::new(Vec::new())),
            pack_output: Arc::new(Mutex::new(integrity.to_string())),
            fail_stage: None,
            cancel_stage: None,
        }
    }

    pub fn failing_at(mut self, stage: ProcessStage) -> Self {
        self.fail_stage = Some(stage);
        self
    }

    pub fn cancelling_at(mut self, stage: ProcessStage) -> Self {
        self.cancel_stage = Some(stage);
        self
    }

    pub fn set_pack_output(&self, output: &str) {
        *self.pack_output.lock().unwrap() = output.to_string();
    }

    pub fn commands(&self) -> Vec<CommandSpec> {
        self.commands.lock().unwrap().clone()
    }

    pub fn stages(&self) -> Vec<ProcessStage> {
        self.commands().iter().map(|command| command.stage).collect()
    }

    pub fn count(&self, stage: ProcessStage) -> usize {
        self.stages().into_iter().filter(|recorded| *recorded == stage).count()
    }
}

impl ProcessRunner for RecordingProcessRunner {
    fn run(&self, command: &CommandSpec) -> Result<String, ProcessError> {
        self.commands.lock().unwrap().push(command.clone());
        if self.cancel_stage == Some(command.stage) {
            return Err(ProcessError::Cancelled(command.stage));
        }
        if self.fail_stage == Some(command.stage) {
            return Err(ProcessError::Exit {
                stage: command.stage,
                code: Some(1),
                stderr: "scripted failure".to_string(),
            });
        }
        match command.stage {
            ProcessStage::Version => Ok("9.8.7\n".to_string()),
            ProcessStage::Pack => Ok(self.pack_output.lock().unwrap().clone()),
            ProcessStage::Clone | ProcessStage::Install => Ok(String::new()),
        }
    }
}

// ============================================================================
// SECTION: Build Strategy
// ============================================================================

/// Strategy whose pack output is the digest itself.
pub struct EchoStrategy;

impl BuildStrategy for EchoStrategy {
    fn name(&self) -> &str {
        "echo"
    }

    fn tool_version_command(&self) -> CommandSpec {
        CommandSpec::new("echo-tool", ["--version"], ProcessStage::Version)
    }

    fn install(&self, dir: &Path) -> CommandSpec {
        CommandSpec::new("echo-tool", ["install"], ProcessStage::Install).in_dir(dir)
    }

    fn pack(&self, dir: &Path) -> CommandSpec {
        CommandSpec::new("echo-tool", ["pack"], ProcessStage::Pack).in_dir(dir)
    }

    fn parse_pack(&self, _dir: &Path, output: &str) -> Result<PackedArtifact, StrategyError> {
        let trimmed = output.trim();
        if trimmed == "garbage" {
            return Err(StrategyError::Parse("unexpected pack output".to_string()));
        }
        Ok(PackedArtifact {
            integrity: Some(trimmed.to_string()).filter(|digest| !digest.is_empty()),
        })
    }
}
