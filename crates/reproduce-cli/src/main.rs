// crates/reproduce-cli/src/main.rs
// ============================================================================
// Module: Reproduce CLI Entry Point
// Description: Command-line front end for package reproducibility checks.
// Purpose: Wire configuration, providers, and the engine, then report verdicts.
// Dependencies: clap, reproduce-*, serde_json, thiserror, tokio, tokio-util
// ============================================================================

//! ## Overview
//! `reproduce [OPTIONS] <SPEC>...` checks whether each package spec can be
//! rebuilt from source into the published artifact. Setup happens on the main
//! thread before the async runtime starts, because the blocking registry
//! client must not be created or dropped inside it. Specs then run through the
//! bounded batch runner while Ctrl-C cancels in-flight builds.
//!
//! Exit codes: `0` reproduced, `1` not reproduced, `2` not applicable,
//! cancelled, or setup failure. Batches exit with the worst code.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::ArgAction;
use clap::Parser;
use reproduce_cli::batch::BatchOptions;
use reproduce_cli::batch::default_jobs;
use reproduce_cli::batch::run_batch;
use reproduce_cli::logging::init_logging;
use reproduce_cli::report::EXIT_NOT_APPLICABLE;
use reproduce_cli::report::render_human;
use reproduce_cli::report::render_json;
use reproduce_cli::report::worst_exit_code;
use reproduce_cli::t;
use reproduce_config::ReproduceConfig;
use reproduce_config::validate_file_name;
use reproduce_config::validate_jobs;
use reproduce_core::EngineConfig;
use reproduce_core::ReproduceOutcome;
use reproduce_core::ReproductionEngine;
use reproduce_core::SharedCacheStore;
use reproduce_providers::ProcessTimeouts;
use reproduce_providers::RegistryManifestProvider;
use reproduce_providers::RegistryProviderConfig;
use reproduce_providers::SystemProcessRunner;
use reproduce_store_json::JsonCacheStore;
use reproduce_strategies::StrategyRegistry;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::warn;

// ============================================================================
// SECTION: CLI Definitions
// ============================================================================

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(
    name = "reproduce",
    about = "Check whether published packages can be rebuilt from source.",
    disable_version_flag = true
)]
struct Cli {
    /// Package specs to check, for example `left-pad@1.3.0`.
    #[arg(value_name = "SPEC", required_unless_present = "show_version")]
    specs: Vec<String>,
    /// Build strategy name.
    #[arg(short = 's', long, value_name = "NAME")]
    strategy: Option<String>,
    /// Ignore cached verdicts and rebuild.
    #[arg(short = 'f', long, action = ArgAction::SetTrue)]
    force: bool,
    /// Print verdicts as JSON.
    #[arg(short = 'j', long, action = ArgAction::SetTrue)]
    json: bool,
    /// Print the version and exit.
    #[arg(short = 'v', long = "version", action = ArgAction::SetTrue)]
    show_version: bool,
    /// Configuration file path.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Cache directory override.
    #[arg(long, value_name = "DIR")]
    cache_dir: Option<PathBuf>,
    /// Cache file name override.
    #[arg(long, value_name = "FILE")]
    cache_file: Option<String>,
    /// Maximum specs checked concurrently.
    #[arg(long, value_name = "N")]
    jobs: Option<usize>,
    /// Discard existing source checkouts before building.
    #[arg(long, action = ArgAction::SetTrue)]
    fresh: bool,
    /// Log filter directive written to stderr, for example `debug`.
    #[arg(long, value_name = "FILTER")]
    log_level: Option<String>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for user-facing failures.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Localized message.
    message: String,
}

impl CliError {
    /// Creates a new CLI error.
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// Result alias for CLI operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// Runs the CLI and maps failures to the setup error exit code.
fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Parses arguments, wires the engine, and reports verdicts.
fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    if cli.show_version {
        write_stdout_line(&t!("main.version", version = env!("CARGO_PKG_VERSION")))
            .map_err(|err| CliError::new(output_error("stdout", &err)))?;
        return Ok(ExitCode::SUCCESS);
    }

    init_logging(cli.log_level.as_deref())
        .map_err(|err| CliError::new(t!("logging.invalid_filter", filter = err.filter, error = err.message)))?;

    let config = load_config(&cli)?;
    let strategy = StrategyRegistry::with_builtin_strategies().resolve(&config.build.strategy).map_err(|_| {
        let available = StrategyRegistry::with_builtin_strategies().names().join(", ");
        CliError::new(t!("config.strategy_unknown", name = config.build.strategy, available = available))
    })?;

    let cache_dir =
        config.cache.resolved_dir().map_err(|err| CliError::new(t!("config.load_failed", error = err)))?;
    let cache_path = cache_dir.join(&config.cache.file);
    let store = JsonCacheStore::load(&cache_path)
        .map_err(|err| CliError::new(t!("cache.open_failed", path = cache_path.display(), error = err)))?;

    let cancel = CancellationToken::new();
    let manifests = RegistryManifestProvider::new(RegistryProviderConfig {
        registry_url: config.registry.url.clone(),
        timeout_ms: config.registry.timeout_ms,
        max_response_bytes: config.registry.max_response_bytes,
        allow_http: config.registry.allow_http,
        user_agent: config.registry.user_agent.clone(),
    })
    .map_err(|err| CliError::new(t!("registry.client_failed", error = err)))?;
    let runner = SystemProcessRunner::new(
        ProcessTimeouts {
            version_ms: config.timeouts.version_ms,
            clone_ms: config.timeouts.clone_ms,
            install_ms: config.timeouts.install_ms,
            pack_ms: config.timeouts.pack_ms,
        },
        cancel.clone(),
    );
    let engine = Arc::new(ReproductionEngine::new(
        manifests,
        runner,
        strategy,
        SharedCacheStore::from_store(store),
        EngineConfig::new(cache_dir),
    ));

    let batch = cli.specs.len() > 1 || cli.jobs.is_some();
    let options = BatchOptions {
        jobs: config.batch.jobs.unwrap_or_else(default_jobs),
        force: cli.force,
        fresh: cli.fresh,
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| CliError::new(t!("runtime.start_failed", error = err)))?;
    let results = runtime.block_on(async {
        let interrupt = tokio::spawn(cancel_on_interrupt(cancel.clone()));
        let results = run_batch(Arc::clone(&engine), &cli.specs, options, cancel).await;
        interrupt.abort();
        results
    });
    drop(runtime);

    report(&results, cli.json, batch)?;
    Ok(ExitCode::from(worst_exit_code(results.iter().map(|(_, outcome)| outcome))))
}

/// Loads configuration and applies command-line overrides.
fn load_config(cli: &Cli) -> CliResult<ReproduceConfig> {
    let mut config = ReproduceConfig::load(cli.config.as_deref())
        .map_err(|err| CliError::new(t!("config.load_failed", error = err)))?;
    if let Some(strategy) = &cli.strategy {
        config.build.strategy.clone_from(strategy);
    }
    if let Some(dir) = &cli.cache_dir {
        config.cache.dir = Some(dir.clone());
    }
    if let Some(file) = &cli.cache_file {
        validate_file_name("--cache-file", file)
            .map_err(|err| CliError::new(t!("config.invalid_override", flag = "--cache-file", error = err)))?;
        config.cache.file.clone_from(file);
    }
    if cli.jobs.is_some() {
        validate_jobs(cli.jobs)
            .map_err(|err| CliError::new(t!("config.invalid_override", flag = "--jobs", error = err)))?;
        config.batch.jobs = cli.jobs;
    }
    config.validate().map_err(|err| CliError::new(t!("config.load_failed", error = err)))?;
    Ok(config)
}

/// Cancels the run on the first Ctrl-C.
async fn cancel_on_interrupt(cancel: CancellationToken) {
    if tokio::signal::ctrl_c().await.is_ok() {
        warn!("interrupt received; cancelling builds");
        let _ = write_stderr_line(&t!("batch.interrupted"));
        cancel.cancel();
    }
}

// ============================================================================
// SECTION: Output
// ============================================================================

/// Writes verdicts in the requested format.
fn report(results: &[(String, ReproduceOutcome)], json: bool, batch: bool) -> CliResult<()> {
    if json {
        let rendered =
            render_json(results, batch).map_err(|err| CliError::new(t!("output.json_failed", error = err)))?;
        return write_stdout_line(&rendered).map_err(|err| CliError::new(output_error("stdout", &err)));
    }
    for (spec, outcome) in results {
        write_stdout_line(&render_human(spec, outcome)).map_err(|err| CliError::new(output_error("stdout", &err)))?;
    }
    Ok(())
}

/// Writes a line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats a localized output error message.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    let stream_label = match stream {
        "stdout" => t!("output.stream.stdout"),
        "stderr" => t!("output.stream.stderr"),
        _ => t!("output.stream.unknown"),
    };
    t!("output.write_failed", stream = stream_label, error = error)
}

/// Emits an error message to stderr and returns the setup failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::from(EXIT_NOT_APPLICABLE)
}
