//! Event snapshot loading
//!
//! Snapshots are JSON or YAML, picked by file extension. Tasks may also
//! arrive separately as a JSONL file, in which case they are appended to
//! whatever the snapshot itself lists.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use thiserror::Error;
use tracing::debug;

use super::jsonl::TaskFile;
use crate::domain::Event;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("Invalid snapshot {path}: {message}")]
    Parse { path: String, message: String },

    #[error("Event budget must be non-negative, got {0}")]
    NegativeBudget(f64),
}

/// Encodings a snapshot file may use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotFormat {
    Json,
    Yaml,
}

impl SnapshotFormat {
    /// Picks the format from the extension; anything unrecognized is JSON
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("yaml") | Some("yml") => SnapshotFormat::Yaml,
            _ => SnapshotFormat::Json,
        }
    }
}

/// Parses snapshot text in the given format
pub fn parse_event(content: &str, format: SnapshotFormat, origin: &str) -> Result<Event> {
    let event: Event = match format {
        SnapshotFormat::Json => serde_json::from_str(content).map_err(|e| SnapshotError::Parse {
            path: origin.to_string(),
            message: e.to_string(),
        })?,
        SnapshotFormat::Yaml => serde_yaml::from_str(content).map_err(|e| SnapshotError::Parse {
            path: origin.to_string(),
            message: e.to_string(),
        })?,
    };

    if let Some(budget) = event.budget {
        if budget < 0.0 {
            return Err(SnapshotError::NegativeBudget(budget).into());
        }
    }

    Ok(event)
}

/// Reads one snapshot file
pub fn load_event(path: &Path) -> Result<Event> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read snapshot: {}", path.display()))?;
    parse_event(
        &content,
        SnapshotFormat::from_path(path),
        &path.display().to_string(),
    )
}

/// Reads a snapshot and appends any tasks from a JSONL file
pub fn load_snapshot(path: &Path, tasks: Option<&Path>) -> Result<Event> {
    let mut event = load_event(path)?;

    if let Some(tasks_path) = tasks {
        let extra = TaskFile::new(tasks_path).read_all()?;
        debug!(
            file = %tasks_path.display(),
            count = extra.len(),
            "Appending tasks from JSONL"
        );
        event.tasks.extend(extra);
    }

    debug!(event = %event.id, tasks = event.tasks.len(), "Loaded snapshot");
    Ok(event)
}
