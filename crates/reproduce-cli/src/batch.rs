// crates/reproduce-cli/src/batch.rs
// ============================================================================
// Module: Batch Runner
// Description: Bounded concurrent reproduction of many specs.
// Purpose: Fan specs out to blocking workers and collect outcomes in order.
// Dependencies: reproduce-core, tokio, tokio-util, tracing
// ============================================================================

//! ## Overview
//! Each unique spec runs on the blocking pool, at most `jobs` at a time.
//! Specs still waiting for a slot when the cancellation token fires are
//! reported as cancelled without starting; running ones observe the same
//! token through the process runner. Outcomes come back in first-seen input
//! order.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::thread;

use reproduce_core::ManifestProvider;
use reproduce_core::ProcessRunner;
use reproduce_core::ReproduceOutcome;
use reproduce_core::ReproduceRequest;
use reproduce_core::ReproductionEngine;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::error;

// ============================================================================
// SECTION: Reproducer Seam
// ============================================================================

/// Anything that can turn a request into an outcome on a blocking thread.
pub trait Reproducer: Send + Sync + 'static {
    /// Reproduces one spec.
    fn reproduce(&self, request: &ReproduceRequest) -> ReproduceOutcome;
}

impl<M, R> Reproducer for ReproductionEngine<M, R>
where
    M: ManifestProvider + Send + Sync + 'static,
    R: ProcessRunner + Send + Sync + 'static,
{
    fn reproduce(&self, request: &ReproduceRequest) -> ReproduceOutcome {
        Self::reproduce(self, request)
    }
}

// ============================================================================
// SECTION: Options
// ============================================================================

/// Per-run batch options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOptions {
    /// Maximum specs in flight.
    pub jobs: usize,
    /// Ignore cached verdicts.
    pub force: bool,
    /// Discard existing work directories.
    pub fresh: bool,
}

/// Default concurrency: one less than the available parallelism, at least one.
#[must_use]
pub fn default_jobs() -> usize {
    thread::available_parallelism().map_or(1, NonZeroUsize::get).saturating_sub(1).max(1)
}

/// Removes repeated specs while keeping first-seen order.
#[must_use]
pub fn unique_specs(specs: &[String]) -> Vec<String> {
    let mut seen = BTreeSet::new();
    specs.iter().filter(|spec| seen.insert(spec.as_str())).cloned().collect()
}

// ============================================================================
// SECTION: Runner
// ============================================================================

/// Reproduces every unique spec with bounded concurrency.
pub async fn run_batch<E: Reproducer>(
    engine: Arc<E>,
    specs: &[String],
    options: BatchOptions,
    cancel: CancellationToken,
) -> Vec<(String, ReproduceOutcome)> {
    let semaphore = Arc::new(Semaphore::new(options.jobs.max(1)));
    let specs = unique_specs(specs);
    let handles: Vec<JoinHandle<ReproduceOutcome>> = specs
        .iter()
        .map(|spec| {
            let request = ReproduceRequest::new(spec.clone()).force(options.force).fresh(options.fresh);
            tokio::spawn(run_one(Arc::clone(&engine), request, Arc::clone(&semaphore), cancel.clone()))
        })
        .collect();

    let mut results = Vec::with_capacity(specs.len());
    for (spec, handle) in specs.into_iter().zip(handles) {
        let outcome = handle.await.unwrap_or_else(|err| {
            error!(spec = %spec, error = %err, "batch task failed");
            ReproduceOutcome::NotApplicable
        });
        results.push((spec, outcome));
    }
    results
}

/// Waits for a slot, then runs one request on the blocking pool.
async fn run_one<E: Reproducer>(
    engine: Arc<E>,
    request: ReproduceRequest,
    semaphore: Arc<Semaphore>,
    cancel: CancellationToken,
) -> ReproduceOutcome {
    let permit = tokio::select! {
        () = cancel.cancelled() => return ReproduceOutcome::Cancelled,
        permit = semaphore.acquire_owned() => permit,
    };
    let Ok(permit) = permit else {
        return ReproduceOutcome::Cancelled;
    };
    if cancel.is_cancelled() {
        return ReproduceOutcome::Cancelled;
    }
    let spec = request.spec.clone();
    let outcome = tokio::task::spawn_blocking(move || engine.reproduce(&request)).await;
    drop(permit);
    outcome.unwrap_or_else(|err| {
        error!(spec = %spec, error = %err, "reproduction worker failed");
        ReproduceOutcome::NotApplicable
    })
}
