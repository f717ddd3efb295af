//! Watch mode: re-run `status` whenever the snapshot changes
//!
//! The snapshot's directory (and the tasks file's, if any) is watched
//! rather than the files themselves, so editors that save by renaming a
//! temp file over the original are still picked up.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;

use anyhow::{Context, Result};
use notify::RecursiveMode;
use notify_debouncer_mini::new_debouncer;
use tracing::{debug, info, warn};

use super::app::SnapshotArgs;
use super::output::Output;
use super::report;
use crate::engine::Engine;

/// Files whose changes trigger a re-run
fn watched_files(args: &SnapshotArgs) -> Result<Vec<PathBuf>> {
    std::iter::once(args.snapshot.as_path())
        .chain(args.tasks.as_deref())
        .map(|path| {
            path.canonicalize()
                .with_context(|| format!("Failed to resolve {}", path.display()))
        })
        .collect()
}

fn is_target(path: &Path, targets: &[PathBuf]) -> bool {
    targets.iter().any(|target| {
        if path == target {
            return true;
        }
        path.file_name() == target.file_name()
            && path.parent().and_then(|p| p.canonicalize().ok()).as_deref() == target.parent()
    })
}

/// Loads the snapshot and prints its status; failures are printed, not fatal
fn check(engine: &Engine, args: &SnapshotArgs, output: &Output) {
    let result = args.load().and_then(|event| {
        let clock = args.clock();
        let status = report::event_status(engine, &event, clock.as_ref())?;
        report::print_status(&event, &status, output);
        Ok(())
    });

    if let Err(e) = result {
        output.error(&format!("{:#}", e));
    }
}

pub fn run(engine: &Engine, args: &SnapshotArgs, debounce_ms: u64, output: &Output) -> Result<()> {
    let targets = watched_files(args)?;
    let dirs: BTreeSet<&Path> = targets.iter().filter_map(|t| t.parent()).collect();

    check(engine, args, output);

    let (tx, rx) = mpsc::channel();
    let mut debouncer = new_debouncer(Duration::from_millis(debounce_ms), tx)?;
    for dir in &dirs {
        debouncer
            .watcher()
            .watch(dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch {}", dir.display()))?;
    }

    info!(
        snapshot = %args.snapshot.display(),
        debounce_ms,
        "Watching for changes"
    );

    loop {
        match rx.recv() {
            Ok(Ok(events)) => {
                let relevant = events.iter().filter(|e| is_target(&e.path, &targets)).count();
                if relevant == 0 {
                    continue;
                }

                debug!(changes = relevant, "Snapshot changed");
                check(engine, args, output);
            }
            Ok(Err(error)) => {
                warn!(?error, "Watch error");
            }
            Err(e) => {
                warn!(%e, "Watch channel closed");
                break;
            }
        }
    }

    Ok(())
}
