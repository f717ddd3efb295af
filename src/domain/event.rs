//! Event aggregate
//!
//! An event is the read-only snapshot handed to the engine: show metadata
//! plus every production task. The engine uses `date` as the hard deadline
//! for the whole task set; the remaining metadata rides along for whatever
//! renders the results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{EventId, TaskId};
use super::task::Task;

/// A production event and its tasks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,

    pub name: String,

    /// Show date; the terminal deadline for every task
    pub date: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub venue: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attendee_target: Option<u32>,

    #[serde(default)]
    pub tasks: Vec<Task>,
}

impl Event {
    /// Creates an event with no tasks
    pub fn new(id: EventId, name: impl Into<String>, date: DateTime<Utc>) -> Self {
        Self {
            id,
            name: name.into(),
            date,
            venue: None,
            budget: None,
            attendee_target: None,
            tasks: Vec::new(),
        }
    }

    pub fn with_task(mut self, task: Task) -> Self {
        self.tasks.push(task);
        self
    }

    pub fn task(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| &t.id == id)
    }
}
