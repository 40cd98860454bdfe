//! # CLI Interface
//!
//! Defines the command-line argument structure for `hodler-node` using
//! `clap` derive. Supports three subcommands: `check-config`, `replay`
//! and `version`.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

use crate::logging::LogFormat;

/// Hodler ledger operator tool.
///
/// Validates ledger configurations and replays scripted operation
/// sequences against an in-memory ledger, printing the resulting event
/// log and account balances as JSON.
#[derive(Parser, Debug)]
#[command(
    name = "hodler-node",
    about = "Hodler ledger operator tool",
    version,
    propagate_version = true
)]
pub struct HodlerNodeCli {
    /// Log output format.
    #[arg(
        long,
        global = true,
        env = "HODLER_LOG_FORMAT",
        value_enum,
        default_value_t = LogFormat::Pretty
    )]
    pub log_format: LogFormat,

    /// Raise ledger log verbosity (-v debug, -vv trace).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Parse and validate a ledger configuration file.
    CheckConfig(CheckConfigArgs),
    /// Replay an operation script against a fresh in-memory ledger.
    Replay(ReplayArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `check-config` subcommand.
#[derive(Parser, Debug)]
pub struct CheckConfigArgs {
    /// Path to the ledger configuration (JSON).
    #[arg(long, short = 'c', env = "HODLER_CONFIG")]
    pub config: PathBuf,
}

/// Arguments for the `replay` subcommand.
#[derive(Parser, Debug)]
pub struct ReplayArgs {
    /// Path to the ledger configuration (JSON).
    #[arg(long, short = 'c', env = "HODLER_CONFIG")]
    pub config: PathBuf,

    /// Path to the operation script (JSON).
    #[arg(long, short = 's')]
    pub script: PathBuf,

    /// Unix time the replay clock starts at.
    #[arg(long, default_value_t = 1_700_000_000)]
    pub start_time: u64,

    /// Stop at the first failing step instead of recording it and moving on.
    #[arg(long)]
    pub fail_fast: bool,

    /// Write the final ledger snapshot to this file.
    #[arg(long)]
    pub snapshot_out: Option<PathBuf>,

    /// Print Prometheus metrics to stderr after the replay.
    #[arg(long)]
    pub metrics: bool,
}
