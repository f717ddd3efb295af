//! Main CLI application structure

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use tracing::debug;

use super::config_cmd::{self, ConfigCommands};
use super::output::{Output, OutputFormat};
use super::{report, watch};
use crate::domain::{Event, Minutes};
use crate::engine::{Clock, Engine, FixedClock, RunOfShowWindows, SystemClock};
use crate::logging::{init_logging, LogLevel};
use crate::storage::{load_snapshot, Config};

#[derive(Parser)]
#[command(name = "cuesheet")]
#[command(author, version, about = "Production scheduling for live events")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format (defaults to the configured one)
    #[arg(long, short = 'f', global = true)]
    pub format: Option<OutputFormat>,

    /// Shorthand for --log-level debug
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Log level for stderr diagnostics
    #[arg(long, global = true, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Config file to use instead of the default lookup
    #[arg(long, global = true, env = "CUESHEET_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Where the snapshot comes from and what "now" is
#[derive(Args, Debug, Clone)]
pub struct SnapshotArgs {
    /// Event snapshot (.json, .yaml or .yml)
    pub snapshot: PathBuf,

    /// Extra tasks, one JSON object per line
    #[arg(long)]
    pub tasks: Option<PathBuf>,

    /// Evaluate as of this instant (RFC 3339) instead of the wall clock
    #[arg(long, value_parser = parse_instant)]
    pub now: Option<DateTime<Utc>>,
}

impl SnapshotArgs {
    pub fn load(&self) -> Result<Event> {
        load_snapshot(&self.snapshot, self.tasks.as_deref())
    }

    pub fn clock(&self) -> Box<dyn Clock> {
        match self.now {
            Some(instant) => Box::new(FixedClock(instant)),
            None => Box::new(SystemClock),
        }
    }
}

fn parse_instant(value: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("expected an RFC 3339 timestamp: {}", e))
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check the task graph for duplicates, dangling references and cycles
    Validate {
        #[command(flatten)]
        snapshot: SnapshotArgs,
    },

    /// Show earliest/latest start and finish plus slack per task
    Schedule {
        #[command(flatten)]
        snapshot: SnapshotArgs,
    },

    /// Classify the event as on track, at risk or critical
    Status {
        #[command(flatten)]
        snapshot: SnapshotArgs,
    },

    /// List tasks holding up downstream work
    Blockers {
        #[command(flatten)]
        snapshot: SnapshotArgs,

        /// Show at most this many
        #[arg(long, short = 'n')]
        limit: Option<usize>,
    },

    /// Suggest what to work on next
    Next {
        #[command(flatten)]
        snapshot: SnapshotArgs,

        /// Show at most this many
        #[arg(long, short = 'n')]
        limit: Option<usize>,
    },

    /// Lay out the day-of agenda
    RunOfShow {
        #[command(flatten)]
        snapshot: SnapshotArgs,

        /// Setup window length in hours
        #[arg(long)]
        setup: Option<f64>,

        /// Show window length in hours
        #[arg(long)]
        show: Option<f64>,

        /// Teardown window length in hours
        #[arg(long)]
        teardown: Option<f64>,
    },

    /// Run every stage and print the combined result
    Analyze {
        #[command(flatten)]
        snapshot: SnapshotArgs,
    },

    /// Re-run status whenever the snapshot changes
    Watch {
        #[command(flatten)]
        snapshot: SnapshotArgs,
    },

    /// Inspect or create configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

/// Applies command-line window overrides on top of the configured ones
fn override_windows(
    base: &RunOfShowWindows,
    setup: Option<f64>,
    show: Option<f64>,
    teardown: Option<f64>,
) -> Result<RunOfShowWindows> {
    let pick = |hours: Option<f64>, fallback: Minutes, name: &str| -> Result<Minutes> {
        match hours {
            Some(h) => Minutes::from_hours(h).with_context(|| format!("Invalid --{} window", name)),
            None => Ok(fallback),
        }
    };

    Ok(RunOfShowWindows {
        setup: pick(setup, base.setup, "setup")?,
        show: pick(show, base.show, "show")?,
        teardown: pick(teardown, base.teardown, "teardown")?,
    })
}

/// Main entry point for the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level, cli.verbose)?;

    let config = Config::load(cli.config.as_deref())?;
    debug!(source = ?config.source, "Loaded configuration");

    let format = cli
        .format
        .unwrap_or(config.settings.output.default_format);
    let output = Output::new(format);
    let engine = Engine::new(config.settings.engine_config());

    match cli.command {
        Commands::Validate { snapshot } => {
            let event = snapshot.load()?;
            report::validate(&engine, &event, &output)?
        }
        Commands::Schedule { snapshot } => {
            let event = snapshot.load()?;
            report::schedule(&engine, &event, snapshot.clock().as_ref(), &output)?
        }
        Commands::Status { snapshot } => {
            let event = snapshot.load()?;
            report::status(&engine, &event, snapshot.clock().as_ref(), &output)?
        }
        Commands::Blockers { snapshot, limit } => {
            let event = snapshot.load()?;
            report::blockers(&engine, &event, snapshot.clock().as_ref(), limit, &output)?
        }
        Commands::Next { snapshot, limit } => {
            let event = snapshot.load()?;
            report::next(&engine, &event, snapshot.clock().as_ref(), limit, &output)?
        }
        Commands::RunOfShow {
            snapshot,
            setup,
            show,
            teardown,
        } => {
            let windows =
                override_windows(&engine.config().run_of_show, setup, show, teardown)?;
            let event = snapshot.load()?;
            report::run_of_show(
                &engine,
                &event,
                snapshot.clock().as_ref(),
                &windows,
                &output,
            )?
        }
        Commands::Analyze { snapshot } => {
            let event = snapshot.load()?;
            report::analyze(&engine, &event, snapshot.clock().as_ref(), &output)?
        }
        Commands::Watch { snapshot } => {
            watch::run(&engine, &snapshot, config.settings.watch.debounce_ms, &output)?
        }
        Commands::Config(cmd) => config_cmd::run(cmd, &config, &output)?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_snapshot_flags() {
        let cli = Cli::try_parse_from([
            "cuesheet",
            "--format",
            "json",
            "next",
            "event.json",
            "--tasks",
            "tasks.jsonl",
            "--now",
            "2026-06-01T08:00:00+02:00",
            "-n",
            "3",
        ])
        .unwrap();

        assert_eq!(cli.format, Some(OutputFormat::Json));
        match cli.command {
            Commands::Next { snapshot, limit } => {
                assert_eq!(snapshot.snapshot, PathBuf::from("event.json"));
                assert_eq!(snapshot.tasks, Some(PathBuf::from("tasks.jsonl")));
                assert_eq!(snapshot.now.unwrap().to_rfc3339(), "2026-06-01T06:00:00+00:00");
                assert_eq!(limit, Some(3));
            }
            _ => panic!("expected next"),
        }
    }

    #[test]
    fn rejects_bad_instant() {
        let result = Cli::try_parse_from(["cuesheet", "status", "e.json", "--now", "tomorrow"]);
        assert!(result.is_err());
    }

    #[test]
    fn window_overrides_replace_only_given_values() {
        let base = RunOfShowWindows::default();
        let windows = override_windows(&base, None, Some(1.5), None).unwrap();

        assert_eq!(windows.setup, base.setup);
        assert_eq!(windows.show, Minutes::new(90));
        assert_eq!(windows.teardown, base.teardown);

        assert!(override_windows(&base, Some(-1.0), None, None).is_err());
    }
}
