// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Hodler Node
//!
//! Entry point for the `hodler-node` binary. Parses CLI arguments,
//! initializes logging and dispatches to a subcommand:
//!
//! - `check-config` — parse and validate a ledger configuration
//! - `replay`       — run an operation script against an in-memory ledger
//! - `version`      — print build version information
//!
//! Reports go to stdout as JSON; logs and metrics go to stderr.

mod cli;
mod logging;
mod metrics;
mod script;

use anyhow::{Context, Result};
use clap::Parser;

use cli::{Commands, HodlerNodeCli};
use metrics::LedgerMetrics;
use script::Replay;

fn main() -> Result<()> {
    let cli = HodlerNodeCli::parse();

    logging::init_logging(cli.log_format, cli.verbose)
        .context("failed to initialize logging")?;

    match cli.command {
        Commands::CheckConfig(args) => check_config(args),
        Commands::Replay(args) => replay(args),
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Validates a config file and echoes the normalized form.
fn check_config(args: cli::CheckConfigArgs) -> Result<()> {
    let config = script::load_config(&args.config)?;
    tracing::info!(
        path = %args.config.display(),
        controller = %config.controller,
        lock_size = %config.params.lock_size,
        "config is valid"
    );
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

/// Replays a script and prints the report.
fn replay(args: cli::ReplayArgs) -> Result<()> {
    let config = script::load_config(&args.config)?;
    let script = script::load_script(&args.script)?;

    let metrics = if args.metrics {
        Some(LedgerMetrics::new().context("failed to register metrics")?)
    } else {
        None
    };

    tracing::info!(
        script = %args.script.display(),
        steps = script.steps.len(),
        start_time = args.start_time,
        "starting replay"
    );

    let replay = Replay::new(config, &script, args.start_time, metrics.clone())?;
    let snapshot_handle = replay.ledger().clone();
    let report = replay.run(&script.steps, args.fail_fast)?;

    tracing::info!(
        succeeded = report.succeeded,
        failed = report.failed,
        events = report.events.len(),
        "replay finished"
    );

    if let Some(path) = &args.snapshot_out {
        let snapshot = serde_json::to_string_pretty(&snapshot_handle.snapshot())?;
        std::fs::write(path, snapshot)
            .with_context(|| format!("failed to write snapshot {}", path.display()))?;
        tracing::info!(path = %path.display(), "snapshot written");
    }

    println!("{}", serde_json::to_string_pretty(&report)?);

    if let Some(metrics) = &metrics {
        eprint!("{}", metrics.encode()?);
    }
    Ok(())
}

/// Prints version information to stdout.
fn print_version() {
    println!("hodler-node {}", env!("CARGO_PKG_VERSION"));
    println!("ledger      {}", hodler_ledger::config::LEDGER_VERSION);
    println!("rustc       {}", rustc_version());
}

/// Returns the Rust compiler version used to build this binary.
fn rustc_version() -> &'static str {
    option_env!("RUSTC_VERSION").unwrap_or("unknown")
}
