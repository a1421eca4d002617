// crates/reproduce-providers/src/process.rs
// ============================================================================
// Module: System Process Runner
// Description: ProcessRunner that spawns real child processes.
// Purpose: Run build commands without a shell under timeouts and cancellation.
// Dependencies: reproduce-core, nix (unix), tokio-util, tracing
// ============================================================================

//! ## Overview
//! Commands are spawned directly from their argument arrays with stdin
//! closed. Output pipes are drained on helper threads so a chatty child cannot
//! block on a full pipe while the runner polls for exit. The runner polls the
//! child until it exits, its stage timeout elapses, or the shared
//! cancellation token fires; in the latter two cases the child is killed and
//! reaped before returning.
//!
//! On unix each command leads its own process group, and a timeout or
//! cancellation signals the whole group. Lifecycle scripts started by the
//! package manager therefore die with it instead of writing into a work
//! directory that is about to be removed.
//!
//! Standard output beyond the capture limit fails the step with
//! [`ProcessError::OutputTooLarge`] rather than returning a truncated report.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io;
use std::io::Read;
#[cfg(unix)]
use std::os::unix::process::CommandExt;
use std::process::Child;
use std::process::Command;
use std::process::ExitStatus;
use std::process::Stdio;
use std::thread;
use std::thread::JoinHandle;
use std::time::Duration;
use std::time::Instant;

use reproduce_core::CommandSpec;
use reproduce_core::ProcessError;
use reproduce_core::ProcessRunner;
use reproduce_core::ProcessStage;
#[cfg(unix)]
use nix::sys::signal::Signal;
#[cfg(unix)]
use nix::sys::signal::killpg;
#[cfg(unix)]
use nix::unistd::Pid;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::warn;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Interval between child status polls.
const POLL_INTERVAL: Duration = Duration::from_millis(20);
/// Upper bound on captured bytes per pipe; the rest is drained and dropped.
const MAX_CAPTURE_BYTES: u64 = 16 * 1024 * 1024;
/// Bytes of standard error kept for diagnostics.
const STDERR_TAIL_BYTES: usize = 4 * 1024;
/// Time allowed for output readers to finish after the child exits.
const READER_JOIN_TIMEOUT: Duration = Duration::from_secs(5);
/// Time allowed to reap a killed child.
const REAP_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// SECTION: Timeouts
// ============================================================================

/// Per-stage process timeouts in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessTimeouts {
    /// Tool version query.
    pub version_ms: u64,
    /// Source checkout commands.
    pub clone_ms: u64,
    /// Dependency installation.
    pub install_ms: u64,
    /// Packing.
    pub pack_ms: u64,
}

impl ProcessTimeouts {
    /// Returns the timeout for a stage in milliseconds.
    #[must_use]
    pub const fn for_stage(&self, stage: ProcessStage) -> u64 {
        match stage {
            ProcessStage::Version => self.version_ms,
            ProcessStage::Clone => self.clone_ms,
            ProcessStage::Install => self.install_ms,
            ProcessStage::Pack => self.pack_ms,
        }
    }
}

impl Default for ProcessTimeouts {
    fn default() -> Self {
        Self {
            version_ms: 30_000,
            clone_ms: 600_000,
            install_ms: 1_800_000,
            pack_ms: 600_000,
        }
    }
}

// ============================================================================
// SECTION: Runner
// ============================================================================

/// Process runner backed by [`std::process::Command`].
#[derive(Debug, Clone)]
pub struct SystemProcessRunner {
    /// Stage timeouts.
    timeouts: ProcessTimeouts,
    /// Cancellation shared with the caller.
    cancel: CancellationToken,
}

impl SystemProcessRunner {
    /// Creates a runner with the given timeouts and cancellation token.
    #[must_use]
    pub const fn new(timeouts: ProcessTimeouts, cancel: CancellationToken) -> Self {
        Self {
            timeouts,
            cancel,
        }
    }

    /// Polls the child until exit, timeout, or cancellation.
    fn wait_for_exit(&self, child: &mut Child, command: &CommandSpec) -> Result<ExitStatus, ProcessError> {
        let timeout_ms = self.timeouts.for_stage(command.stage);
        let deadline = Instant::now() + Duration::from_millis(timeout_ms);
        loop {
            match child.try_wait() {
                Ok(Some(status)) => return Ok(status),
                Ok(None) => {}
                Err(err) => {
                    kill_and_reap(child, &command.program);
                    return Err(ProcessError::Io(err.to_string()));
                }
            }
            if self.cancel.is_cancelled() {
                kill_and_reap(child, &command.program);
                return Err(ProcessError::Cancelled(command.stage));
            }
            if Instant::now() >= deadline {
                kill_and_reap(child, &command.program);
                return Err(ProcessError::Timeout {
                    stage: command.stage,
                    timeout_ms,
                });
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

impl ProcessRunner for SystemProcessRunner {
    fn run(&self, command: &CommandSpec) -> Result<String, ProcessError> {
        if self.cancel.is_cancelled() {
            return Err(ProcessError::Cancelled(command.stage));
        }
        debug!(stage = %command.stage, command = %command.display_line(), "running command");

        let mut process = Command::new(&command.program);
        process.args(&command.args).stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped());
        if let Some(cwd) = &command.cwd {
            process.current_dir(cwd);
        }
        #[cfg(unix)]
        process.process_group(0);
        let mut child = process.spawn().map_err(|err| ProcessError::Spawn {
            program: command.program.clone(),
            message: err.to_string(),
        })?;

        let stdout = child.stdout.take().map(spawn_reader);
        let stderr = child.stderr.take().map(spawn_reader);

        let status = self.wait_for_exit(&mut child, command);
        drop(child);
        let stdout = join_reader(stdout);
        let stderr = join_reader(stderr);
        let status = status?;

        if !status.success() {
            return Err(ProcessError::Exit {
                stage: command.stage,
                code: status.code(),
                stderr: stderr_tail(&stderr.map(|captured| captured.bytes).unwrap_or_default()),
            });
        }
        let stdout = stdout.ok_or_else(|| ProcessError::Io("standard output was not captured".to_string()))?;
        if stdout.truncated {
            warn!(
                stage = %command.stage,
                command = %command.display_line(),
                max_bytes = MAX_CAPTURE_BYTES,
                "standard output exceeded capture limit"
            );
            return Err(ProcessError::OutputTooLarge {
                stage: command.stage,
                max_bytes: MAX_CAPTURE_BYTES,
            });
        }
        Ok(String::from_utf8_lossy(&stdout.bytes).into_owned())
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Output captured from one pipe.
struct Captured {
    /// Bytes up to the capture limit.
    bytes: Vec<u8>,
    /// True when the pipe carried more than the capture limit.
    truncated: bool,
}

/// Drains a pipe on a helper thread.
fn spawn_reader<R>(mut pipe: R) -> JoinHandle<Option<Captured>>
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut bytes = Vec::new();
        pipe.by_ref().take(MAX_CAPTURE_BYTES).read_to_end(&mut bytes).ok()?;
        let overflow = io::copy(&mut pipe, &mut io::sink()).ok()?;
        Some(Captured {
            bytes,
            truncated: overflow > 0,
        })
    })
}

/// Joins a reader thread with a bounded wait.
///
/// A descendant that inherited the pipe can hold it open after the child
/// exits; such readers are detached.
fn join_reader(handle: Option<JoinHandle<Option<Captured>>>) -> Option<Captured> {
    let handle = handle?;
    let deadline = Instant::now() + READER_JOIN_TIMEOUT;
    while !handle.is_finished() {
        if Instant::now() >= deadline {
            warn!("output pipe still open after child exit; detaching reader");
            return None;
        }
        thread::sleep(POLL_INTERVAL);
    }
    handle.join().ok().flatten()
}

/// Kills the child and waits a bounded time for it to be reaped.
///
/// Must run before the child is reaped so its process group id is still ours.
fn kill_and_reap(child: &mut Child, program: &str) {
    terminate(child, program);
    let deadline = Instant::now() + REAP_TIMEOUT;
    loop {
        match child.try_wait() {
            Ok(Some(_)) | Err(_) => return,
            Ok(None) => {}
        }
        if Instant::now() >= deadline {
            warn!(program = %program, "child did not exit after kill");
            return;
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Kills the child's whole process group.
#[cfg(unix)]
fn terminate(child: &mut Child, program: &str) {
    let Ok(raw) = i32::try_from(child.id()) else {
        kill_child(child, program);
        return;
    };
    if let Err(err) = killpg(Pid::from_raw(raw), Signal::SIGKILL) {
        debug!(program = %program, error = %err, "process group kill failed; killing child only");
        kill_child(child, program);
    }
}

/// Kills the child.
#[cfg(not(unix))]
fn terminate(child: &mut Child, program: &str) {
    kill_child(child, program);
}

/// Kills the direct child only.
fn kill_child(child: &mut Child, program: &str) {
    if let Err(err) = child.kill() {
        debug!(program = %program, error = %err, "kill failed; child may have exited");
    }
}

/// Returns the trailing portion of standard error as text.
fn stderr_tail(bytes: &[u8]) -> String {
    let start = bytes.len().saturating_sub(STDERR_TAIL_BYTES);
    String::from_utf8_lossy(&bytes[start ..]).trim().to_string()
}
