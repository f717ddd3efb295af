//! JSONL task files
//!
//! A task file holds one JSON task per line. It is read under a shared
//! lock so a writer holding the exclusive lock never hands us half a file.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fs2::FileExt;

use crate::domain::Task;

/// Read-only view of a JSONL task file
pub struct TaskFile {
    path: PathBuf,
}

impl TaskFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads every task in file order
    ///
    /// Duplicate ids are kept so graph validation can report them.
    pub fn read_all(&self) -> Result<Vec<Task>> {
        let file = File::open(&self.path)
            .with_context(|| format!("Failed to open task file: {}", self.path.display()))?;

        file.lock_shared()
            .context("Failed to acquire read lock on task file")?;

        let reader = BufReader::new(&file);
        let mut tasks = Vec::new();

        for (line_num, line) in reader.lines().enumerate() {
            let line = line.with_context(|| format!("Failed to read line {}", line_num + 1))?;

            if line.trim().is_empty() {
                continue;
            }

            let task: Task = serde_json::from_str(&line)
                .with_context(|| format!("Failed to parse task at line {}", line_num + 1))?;
            tasks.push(task);
        }

        // Lock is released when file is dropped
        Ok(tasks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Minutes, Priority, TaskStatus};
    use std::fs::{self, OpenOptions};
    use tempfile::TempDir;

    #[test]
    fn reads_tasks_in_file_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tasks.jsonl");
        fs::write(
            &path,
            concat!(
                r#"{"id":"venue","title":"Book venue","estimated_hours":4,"status":"completed"}"#,
                "\n\n",
                r#"{"id":"catering","title":"Catering","estimated_hours":1.5,"priority":2,"depends_on":["venue"]}"#,
                "\n",
            ),
        )
        .unwrap();

        let tasks = TaskFile::new(&path).read_all().unwrap();

        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].id.as_str(), "venue");
        assert_eq!(tasks[0].status, TaskStatus::Done);
        assert_eq!(tasks[1].estimated_duration, Minutes::new(90));
        assert_eq!(tasks[1].priority, Priority::High);
        assert_eq!(tasks[1].dependencies[0].as_str(), "venue");
    }

    #[test]
    fn parse_errors_name_the_line() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tasks.jsonl");
        fs::write(&path, "{\"id\":\"a\",\"title\":\"A\"}\nnot json\n").unwrap();

        let err = TaskFile::new(&path).read_all().unwrap_err();
        assert!(format!("{:#}", err).contains("line 2"));
    }

    #[test]
    fn duplicates_are_preserved() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tasks.jsonl");
        fs::write(
            &path,
            "{\"id\":\"a\",\"title\":\"A\"}\n{\"id\":\"a\",\"title\":\"Again\"}\n",
        )
        .unwrap();

        assert_eq!(TaskFile::new(&path).read_all().unwrap().len(), 2);
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let file = TaskFile::new(dir.path().join("absent.jsonl"));
        assert!(file.read_all().is_err());
    }

    #[test]
    fn read_coexists_with_other_readers() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tasks.jsonl");
        fs::write(&path, "{\"id\":\"a\",\"title\":\"A\"}\n").unwrap();

        let other = OpenOptions::new().read(true).open(&path).unwrap();
        other.lock_shared().unwrap();

        assert_eq!(TaskFile::new(&path).read_all().unwrap().len(), 1);
        other.unlock().unwrap();
    }
}
