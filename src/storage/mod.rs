//! # Storage Layer
//!
//! Read-only access to event snapshots plus configuration files.
//!
//! | Data | Format | Location |
//! |------|--------|----------|
//! | Event snapshot | JSON or YAML | any path |
//! | Extra tasks | JSONL (one task per line) | `--tasks` path |
//! | Config | TOML | `cuesheet.toml` or the platform config dir |
//!
//! Nothing here writes task data; the engine only ever sees a copy taken
//! at load time.

mod config;
mod jsonl;
mod snapshot;

pub use config::{
    Config, ConfigError, OutputConfig, OutputFormat, Settings, WatchConfig, PROJECT_CONFIG_FILE,
};
pub use jsonl::TaskFile;
pub use snapshot::{load_event, load_snapshot, parse_event, SnapshotError, SnapshotFormat};
