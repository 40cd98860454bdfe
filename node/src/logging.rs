//! # Structured Logging
//!
//! Installs the `tracing` subscriber for `hodler-node`. Output always goes
//! to stderr; stdout is reserved for the JSON reports.
//!
//! The ledger logs at three levels that matter to an operator:
//!
//! - `info`  — one line per committed event
//! - `warn`  — declined transfers, denied capabilities, reentrancy, overflow
//! - `debug` — validation rejections (zero amounts, short durations, ...)
//!
//! `-v` lowers the ledger's threshold to `debug`, `-vv` to `trace`.
//! `RUST_LOG` overrides both when set.

use clap::ValueEnum;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when neither `RUST_LOG` nor `-v` is given.
pub const DEFAULT_FILTER: &str = "hodler_node=info,hodler_ledger=info";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable, colored output.
    Pretty,
    /// One JSON object per line, with the event's fields flattened.
    Json,
}

/// Filter directives for a `-v` count.
pub fn directives(verbosity: u8) -> &'static str {
    match verbosity {
        0 => DEFAULT_FILTER,
        1 => "hodler_node=debug,hodler_ledger=debug",
        _ => "hodler_node=trace,hodler_ledger=trace",
    }
}

/// Installs the global subscriber.
///
/// Fails if a subscriber is already installed or `RUST_LOG` is malformed.
pub fn init_logging(format: LogFormat, verbosity: u8) -> anyhow::Result<()> {
    let env_filter = match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(value) if !value.trim().is_empty() => EnvFilter::try_new(value)?,
        _ => EnvFilter::new(directives(verbosity)),
    };

    let registry = tracing_subscriber::registry().with(env_filter);
    match format {
        LogFormat::Pretty => registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_file(verbosity > 0)
                    .with_line_number(verbosity > 0),
            )
            .try_init()?,
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .flatten_event(true)
                    .with_writer(std::io::stderr)
                    .with_target(true),
            )
            .try_init()?,
    }

    tracing::debug!(?format, verbosity, "logging initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_selects_ledger_level() {
        assert_eq!(directives(0), DEFAULT_FILTER);
        assert!(directives(1).contains("hodler_ledger=debug"));
        assert!(directives(5).contains("hodler_ledger=trace"));
    }

    #[test]
    fn directives_parse_as_filters() {
        for verbosity in 0..3 {
            assert!(EnvFilter::try_new(directives(verbosity)).is_ok());
        }
    }

    #[test]
    fn format_names() {
        assert_eq!(LogFormat::from_str("json", true), Ok(LogFormat::Json));
        assert_eq!(LogFormat::from_str("PRETTY", true), Ok(LogFormat::Pretty));
        assert!(LogFormat::from_str("xml", true).is_err());
    }
}
