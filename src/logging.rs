//! Logging setup using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the log filter:
//! 1. `--log-level` CLI flag (or `--verbose`, meaning `debug`)
//! 2. `CUESHEET_LOG` environment variable (a level or a full filter
//!    directive such as `cuesheet::engine=debug`)
//! 3. default to `warn`
//!
//! Logs go to STDERR; stdout carries command output only.

use anyhow::{anyhow, Result};
use clap::ValueEnum;
use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable consulted when no flag is given
pub const LOG_ENV: &str = "CUESHEET_LOG";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn as_directive(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Picks the filter from the flag, then the environment, then `warn`
fn resolve_filter(cli_level: Option<LogLevel>, verbose: bool) -> EnvFilter {
    let flag = cli_level.or(if verbose { Some(LogLevel::Debug) } else { None });

    match flag {
        Some(level) => EnvFilter::new(level.as_directive()),
        None => EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn")),
    }
}

/// Installs the global subscriber. Call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>, verbose: bool) -> Result<()> {
    fmt()
        .with_env_filter(resolve_filter(cli_level, verbose))
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!("Failed to initialise logging: {}", e))
}
