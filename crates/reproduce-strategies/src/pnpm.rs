// crates/reproduce-strategies/src/pnpm.rs
// ============================================================================
// Module: pnpm Strategy
// Description: Build strategy driving the pnpm CLI.
// Purpose: Install with pnpm and hash the tarball it packs.
// Dependencies: reproduce-core, tracing
// ============================================================================

//! ## Overview
//! pnpm does not report an integrity digest, so the strategy packs into a
//! private destination directory inside the package, hashes the tarball it
//! finds there, and removes the directory again.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::fs::File;
use std::io::ErrorKind;
use std::path::Path;
use std::path::PathBuf;

use reproduce_core::BuildStrategy;
use reproduce_core::CommandSpec;
use reproduce_core::PackedArtifact;
use reproduce_core::ProcessStage;
use reproduce_core::StrategyError;
use reproduce_core::integrity_for_reader;
use tracing::warn;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// pnpm executable name.
const PNPM_PROGRAM: &str = "pnpm";
/// Pack destination directory inside the package directory.
const PACK_DESTINATION: &str = ".reproduce-pack";
/// Tarball extension.
const TARBALL_EXTENSION: &str = "tgz";

// ============================================================================
// SECTION: Strategy
// ============================================================================

/// Build strategy for pnpm.
#[derive(Debug, Default, Clone, Copy)]
pub struct PnpmStrategy;

impl PnpmStrategy {
    /// Creates the pnpm strategy.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl BuildStrategy for PnpmStrategy {
    fn name(&self) -> &str {
        "pnpm"
    }

    fn tool_version_command(&self) -> CommandSpec {
        CommandSpec::new(PNPM_PROGRAM, ["--version"], ProcessStage::Version)
    }

    fn install(&self, dir: &Path) -> CommandSpec {
        CommandSpec::new(PNPM_PROGRAM, ["install", "--silent"], ProcessStage::Install).in_dir(dir)
    }

    fn prepare_pack(&self, dir: &Path) -> Result<(), StrategyError> {
        let destination = dir.join(PACK_DESTINATION);
        remove_destination(&destination)?;
        fs::create_dir_all(&destination).map_err(|err| StrategyError::Io(err.to_string()))
    }

    fn pack(&self, dir: &Path) -> CommandSpec {
        let destination = dir.join(PACK_DESTINATION);
        CommandSpec::new(
            PNPM_PROGRAM,
            ["pack".to_string(), "--pack-destination".to_string(), destination.display().to_string()],
            ProcessStage::Pack,
        )
        .in_dir(dir)
    }

    fn parse_pack(&self, dir: &Path, output: &str) -> Result<PackedArtifact, StrategyError> {
        let destination = dir.join(PACK_DESTINATION);
        let digest = locate_tarball(&destination, output).and_then(|tarball| {
            let file = File::open(&tarball).map_err(|err| StrategyError::Io(format!("{}: {err}", tarball.display())))?;
            integrity_for_reader(file).map_err(|err| StrategyError::Io(err.to_string()))
        });
        if let Err(err) = remove_destination(&destination) {
            warn!(path = %destination.display(), error = %err, "failed to remove pack destination");
        }
        Ok(PackedArtifact {
            integrity: Some(digest?),
        })
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Finds the tarball pnpm wrote.
///
/// pnpm prints the tarball path as its last output line; when that path does
/// not resolve, the single tarball in the destination directory is used.
fn locate_tarball(destination: &Path, output: &str) -> Result<PathBuf, StrategyError> {
    if let Some(line) = output.lines().map(str::trim).rev().find(|line| !line.is_empty()) {
        let reported = Path::new(line);
        let candidate = if reported.is_absolute() { reported.to_path_buf() } else { destination.join(reported) };
        if candidate.starts_with(destination) && candidate.is_file() {
            return Ok(candidate);
        }
    }

    let entries = fs::read_dir(destination).map_err(|err| StrategyError::Io(err.to_string()))?;
    let mut tarballs = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|extension| extension == TARBALL_EXTENSION));
    match (tarballs.next(), tarballs.next()) {
        (Some(tarball), None) => Ok(tarball),
        (None, _) => Err(StrategyError::Parse("pnpm pack produced no tarball".to_string())),
        (Some(_), Some(_)) => Err(StrategyError::Parse("pnpm pack produced multiple tarballs".to_string())),
    }
}

/// Removes the pack destination if present.
fn remove_destination(destination: &Path) -> Result<(), StrategyError> {
    match fs::remove_dir_all(destination) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(StrategyError::Io(err.to_string())),
    }
}
