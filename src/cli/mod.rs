//! # Command-Line Interface
//!
//! Every analysis command reads one event snapshot and prints a view of
//! the engine's output.
//!
//! | Command | Output |
//! |---------|--------|
//! | `validate` | task count and topological order, or the validation error |
//! | `schedule` | ES/EF/LS/LF/slack per task, critical path |
//! | `status` | risk level with reason and event float |
//! | `blockers` | ranked blockers |
//! | `next` | ranked next actions |
//! | `run-of-show` | day-of agenda by window |
//! | `analyze` | all of the above |
//! | `watch` | `status`, again on every change |
//! | `config show`, `config init` | configuration |
//!
//! ## Output Formats
//!
//! All commands support the `--format` flag:
//! - `text` - Human-readable tables
//! - `json` - One JSON document on stdout
//!
//! Diagnostics go to stderr through `tracing`; raise them with
//! `--verbose` or `--log-level`.
//!
//! ## Entry Point
//!
//! Call [`run()`] to parse arguments and execute the appropriate command.

mod app;
mod config_cmd;
mod output;
mod report;
mod watch;

pub use app::{run, Cli, Commands, SnapshotArgs};
pub use output::{Output, OutputFormat};
