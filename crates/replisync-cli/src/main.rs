//! replisync - periodic one-way directory mirroring
//!
//! Keeps a replica directory identical to a source directory: files missing
//! from the replica are copied in, files whose content differs are
//! overwritten, and files no longer in the source are removed. A pass runs
//! at startup and then once per interval until interrupted.

mod display;
mod logging;

use anyhow::{Context, Result};
use clap::Parser;
use replisync_config::{Config, ConfigLoader, SyncRoots};
use replisync_sync::{Scheduler, SyncEngine};
use replisync_types::HashAlgorithm;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// replisync - periodic one-way directory mirroring
#[derive(Parser, Debug)]
#[command(
    name = "replisync",
    version = env!("CARGO_PKG_VERSION"),
    about = "Keep a replica directory identical to a source directory",
    long_about = "replisync mirrors SOURCE into REPLICA once at startup and then every\n\
                  INTERVAL_MINUTES minutes. Files are compared by content digest; every\n\
                  create, update, delete and failure is logged to LOG_FILE and the console."
)]
struct Cli {
    /// Directory to mirror from
    source: PathBuf,

    /// Directory kept identical to the source (created when missing)
    replica: PathBuf,

    /// File receiving a copy of every log line
    log_file: PathBuf,

    /// Minutes between the end of one pass and the start of the next
    interval_minutes: u64,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Content hash algorithm (md5, sha256, blake3, xxh3)
    #[arg(long, value_name = "ALGO")]
    hash: Option<HashAlgorithm>,

    /// Run a single pass and exit; the exit status is 1 if it reported errors
    #[arg(long)]
    once: bool,

    /// Log the planned actions without touching the replica
    #[arg(long)]
    dry_run: bool,

    /// Verbose mode - log every file operation
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Quiet mode - only warnings and errors on the console
    #[arg(short, long)]
    quiet: bool,
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut builder = ConfigLoader::builder(cli.config.as_deref())?
        .set_override(
            "schedule.interval_minutes",
            i64::try_from(cli.interval_minutes).unwrap_or(i64::MAX),
        )
        .set_override(
            "logging.log_file",
            cli.log_file.to_string_lossy().into_owned(),
        );

    if let Some(algorithm) = cli.hash {
        builder = builder.set_override("sync.hash_algorithm", algorithm.name());
    }
    if cli.dry_run {
        builder = builder.set_override("sync.dry_run", true);
    }

    Ok(builder.build()?)
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let config = load_config(&cli).context("Invalid configuration")?;
    let log_file = config
        .logging
        .log_file
        .clone()
        .context("No log file configured")?;
    let _log_guard = logging::init(&config.logging, &log_file, cli.verbose, cli.quiet)?;

    info!("replisync v{} starting", env!("CARGO_PKG_VERSION"));

    let roots = SyncRoots::prepare(&cli.source, &cli.replica).map_err(|e| {
        error!("Startup failed: {}", e);
        e
    })?;
    info!(
        "Mirroring '{}' -> '{}' with {}, log file '{}'",
        roots.source.display(),
        roots.replica.display(),
        config.sync.hash_algorithm,
        log_file.display()
    );

    if !cli.quiet {
        display::print_banner(&roots, &config, cli.once);
    }

    let engine = Arc::new(SyncEngine::from_config(&config.sync));

    if cli.once {
        let report = engine.reconcile(&roots.source, &roots.replica).await?;
        if !cli.quiet {
            display::print_pass_summary(&report);
        }
        return Ok(if report.is_clean() {
            ExitCode::SUCCESS
        } else {
            ExitCode::from(1)
        });
    }

    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Interrupt received, stopping after the current pass");
                signal_token.cancel();
            }
            Err(e) => warn!("Unable to listen for Ctrl-C: {}", e),
        }
    });

    let scheduler = Scheduler::new(config.schedule.interval());
    let passes = scheduler
        .run(
            |_| {
                let engine = engine.clone();
                let roots = roots.clone();
                async move { engine.reconcile(&roots.source, &roots.replica).await }
            },
            cancel,
        )
        .await;

    info!("replisync stopped after {} passes", passes);
    Ok(ExitCode::SUCCESS)
}
