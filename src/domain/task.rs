//! Task domain model
//!
//! Tasks are the units of production work for an event. They carry an
//! estimate, an optional deadline and the set of tasks that must be done
//! before they can start. Day-of tasks additionally name the earliest
//! run-of-show window they may be placed in.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

use super::duration::{hours, Minutes};
use super::id::TaskId;

/// Status of a task
///
/// The dashboard mocks use several spellings; they are folded into this enum
/// at ingestion and never propagated as strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    #[serde(alias = "to_do", alias = "pending")]
    Todo,
    #[serde(alias = "in-progress")]
    InProgress,
    Blocked,
    #[serde(alias = "completed")]
    Done,
}

impl TaskStatus {
    /// Returns true if this status represents completion
    pub fn is_complete(&self) -> bool {
        matches!(self, TaskStatus::Done)
    }

    pub fn label(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Blocked => "blocked",
            TaskStatus::Done => "done",
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum PriorityError {
    #[error("Priority ordinal starts at 1, got {0}")]
    ZeroOrdinal(u64),

    #[error("Unknown priority tier: '{0}' (expected critical, high, medium or low)")]
    UnknownTier(String),
}

/// Task priority
///
/// Totally ordered with the most urgent tier first: `Critical < High <
/// Medium < Low`. Accepted on the wire either as the ordinal (1-based, values
/// past 4 collapse to `Low`) or as the tier name.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case", try_from = "PriorityRepr")]
pub enum Priority {
    Critical,
    High,
    #[default]
    Medium,
    Low,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PriorityRepr {
    Ordinal(u64),
    Tier(String),
}

impl TryFrom<PriorityRepr> for Priority {
    type Error = PriorityError;

    fn try_from(repr: PriorityRepr) -> Result<Self, Self::Error> {
        match repr {
            PriorityRepr::Ordinal(n) => Priority::from_ordinal(n),
            PriorityRepr::Tier(name) => name.parse(),
        }
    }
}

impl Priority {
    pub fn from_ordinal(ordinal: u64) -> Result<Self, PriorityError> {
        match ordinal {
            0 => Err(PriorityError::ZeroOrdinal(ordinal)),
            1 => Ok(Priority::Critical),
            2 => Ok(Priority::High),
            3 => Ok(Priority::Medium),
            _ => Ok(Priority::Low),
        }
    }

    /// 1 for critical through 4 for low
    pub fn ordinal(&self) -> u8 {
        match self {
            Priority::Critical => 1,
            Priority::High => 2,
            Priority::Medium => 3,
            Priority::Low => 4,
        }
    }

    /// Returns true if this priority is at least as urgent as `band`
    pub fn within(&self, band: Priority) -> bool {
        *self <= band
    }

    pub fn label(&self) -> &'static str {
        match self {
            Priority::Critical => "critical",
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }
}

impl std::str::FromStr for Priority {
    type Err = PriorityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "critical" | "urgent" => Ok(Priority::Critical),
            "high" => Ok(Priority::High),
            "medium" | "normal" => Ok(Priority::Medium),
            "low" => Ok(Priority::Low),
            other => match other.parse::<u64>() {
                Ok(n) => Priority::from_ordinal(n),
                Err(_) => Err(PriorityError::UnknownTier(s.to_string())),
            },
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A run-of-show window, in day-of order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Segment {
    Setup,
    Show,
    Teardown,
}

impl Segment {
    pub const ALL: [Segment; 3] = [Segment::Setup, Segment::Show, Segment::Teardown];

    pub fn index(&self) -> usize {
        match self {
            Segment::Setup => 0,
            Segment::Show => 1,
            Segment::Teardown => 2,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Segment::Setup => "setup",
            Segment::Show => "show",
            Segment::Teardown => "teardown",
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A production task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier
    pub id: TaskId,

    /// Human-readable title (never interpreted)
    pub title: String,

    /// Current status as reported by the task store
    #[serde(default)]
    pub status: TaskStatus,

    #[serde(default)]
    pub priority: Priority,

    /// Estimated effort; hours on the wire, zero marks a milestone
    #[serde(
        rename = "estimated_hours",
        alias = "estimated_duration",
        with = "hours",
        default
    )]
    pub estimated_duration: Minutes,

    /// Latest acceptable finish, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<DateTime<Utc>>,

    /// Tasks that must be done before this one can start
    #[serde(default, alias = "depends_on", skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<TaskId>,

    /// Marks a day-of task and the earliest window it may run in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day_of: Option<Segment>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Task {
    /// Creates a todo task with medium priority and no estimate
    pub fn new(id: TaskId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            status: TaskStatus::Todo,
            priority: Priority::default(),
            estimated_duration: Minutes::ZERO,
            deadline: None,
            dependencies: Vec::new(),
            day_of: None,
            description: None,
        }
    }

    pub fn with_duration(mut self, duration: Minutes) -> Self {
        self.estimated_duration = duration;
        self
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_day_of(mut self, segment: Segment) -> Self {
        self.day_of = Some(segment);
        self
    }

    pub fn depends_on(mut self, task_id: TaskId) -> Self {
        self.add_dependency(task_id);
        self
    }

    /// Adds a dependency on another task, ignoring repeats
    pub fn add_dependency(&mut self, task_id: TaskId) {
        if !self.dependencies.contains(&task_id) {
            self.dependencies.push(task_id);
        }
    }

    pub fn is_done(&self) -> bool {
        self.status.is_complete()
    }

    pub fn is_day_of(&self) -> bool {
        self.day_of.is_some()
    }

    /// Duration still to be worked; completed tasks contribute nothing
    pub fn remaining_duration(&self) -> Minutes {
        if self.is_done() {
            Minutes::ZERO
        } else {
            self.estimated_duration
        }
    }

    /// Returns true if every dependency is done
    pub fn dependencies_met(&self, task_statuses: &HashMap<TaskId, TaskStatus>) -> bool {
        self.dependencies.iter().all(|dep_id| {
            task_statuses
                .get(dep_id)
                .map(|s| s.is_complete())
                .unwrap_or(false)
        })
    }

    /// Status after recomputing the advisory `blocked` state
    ///
    /// `done` and `in_progress` are reported as given. A pending task is
    /// `blocked` exactly when one of its dependencies is not done.
    pub fn effective_status(&self, task_statuses: &HashMap<TaskId, TaskStatus>) -> TaskStatus {
        match self.status {
            TaskStatus::Done | TaskStatus::InProgress => self.status,
            TaskStatus::Todo | TaskStatus::Blocked => {
                if self.dependencies_met(task_statuses) {
                    TaskStatus::Todo
                } else {
                    TaskStatus::Blocked
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_task(id: &str) -> Task {
        Task::new(TaskId::new(id).unwrap(), format!("Task {}", id))
    }

    fn tid(id: &str) -> TaskId {
        TaskId::new(id).unwrap()
    }

    #[test]
    fn new_task_defaults() {
        let task = make_task("a");
        assert_eq!(task.status, TaskStatus::Todo);
        assert_eq!(task.priority, Priority::Medium);
        assert_eq!(task.estimated_duration, Minutes::ZERO);
        assert!(!task.is_day_of());
    }

    #[test]
    fn status_aliases_fold_into_canonical_enum() {
        let cases = [
            ("\"todo\"", TaskStatus::Todo),
            ("\"to_do\"", TaskStatus::Todo),
            ("\"pending\"", TaskStatus::Todo),
            ("\"in_progress\"", TaskStatus::InProgress),
            ("\"in-progress\"", TaskStatus::InProgress),
            ("\"blocked\"", TaskStatus::Blocked),
            ("\"done\"", TaskStatus::Done),
            ("\"completed\"", TaskStatus::Done),
        ];
        for (raw, expected) in cases {
            let parsed: TaskStatus = serde_json::from_str(raw).unwrap();
            assert_eq!(parsed, expected, "parsing {}", raw);
        }
        assert_eq!(
            serde_json::to_string(&TaskStatus::InProgress).unwrap(),
            "\"in_progress\""
        );
    }

    #[test]
    fn priority_accepts_ordinals_and_names() {
        let p: Priority = serde_json::from_str("1").unwrap();
        assert_eq!(p, Priority::Critical);
        let p: Priority = serde_json::from_str("\"high\"").unwrap();
        assert_eq!(p, Priority::High);
        let p: Priority = serde_json::from_str("9").unwrap();
        assert_eq!(p, Priority::Low);
        assert!(serde_json::from_str::<Priority>("0").is_err());
        assert!(serde_json::from_str::<Priority>("\"someday\"").is_err());

        assert_eq!(serde_json::to_string(&Priority::Critical).unwrap(), "\"critical\"");
    }

    #[test]
    fn priority_order_puts_most_urgent_first() {
        assert!(Priority::Critical < Priority::High);
        assert!(Priority::High < Priority::Medium);
        assert!(Priority::Medium < Priority::Low);
        assert!(Priority::High.within(Priority::High));
        assert!(Priority::Critical.within(Priority::High));
        assert!(!Priority::Medium.within(Priority::High));
    }

    #[test]
    fn effective_status_recomputes_blocked() {
        let a = make_task("a");
        let b = make_task("b").depends_on(tid("a"));
        let c = make_task("c")
            .depends_on(tid("a"))
            .with_status(TaskStatus::Blocked);

        let mut statuses = HashMap::new();
        statuses.insert(a.id.clone(), TaskStatus::Todo);

        assert_eq!(a.effective_status(&statuses), TaskStatus::Todo);
        assert_eq!(b.effective_status(&statuses), TaskStatus::Blocked);

        statuses.insert(a.id.clone(), TaskStatus::Done);
        assert_eq!(b.effective_status(&statuses), TaskStatus::Todo);
        // A caller-marked block is lifted once its dependencies are done
        assert_eq!(c.effective_status(&statuses), TaskStatus::Todo);
    }

    #[test]
    fn done_and_active_statuses_are_never_rewritten() {
        let statuses = HashMap::new();
        let done = make_task("a")
            .depends_on(tid("missing"))
            .with_status(TaskStatus::Done);
        let active = make_task("b")
            .depends_on(tid("missing"))
            .with_status(TaskStatus::InProgress);

        assert_eq!(done.effective_status(&statuses), TaskStatus::Done);
        assert_eq!(active.effective_status(&statuses), TaskStatus::InProgress);
    }

    #[test]
    fn done_tasks_have_no_remaining_duration() {
        let task = make_task("a")
            .with_duration(Minutes::new(120))
            .with_status(TaskStatus::Done);
        assert_eq!(task.remaining_duration(), Minutes::ZERO);
    }

    #[test]
    fn add_dependency_ignores_repeats() {
        let mut task = make_task("b");
        task.add_dependency(tid("a"));
        task.add_dependency(tid("a"));
        assert_eq!(task.dependencies.len(), 1);
    }

    #[test]
    fn deserializes_dashboard_shape() {
        let json = r#"{
            "id": "sound-check",
            "title": "Sound check",
            "status": "in-progress",
            "priority": 2,
            "estimated_hours": 1.5,
            "deadline": "2026-06-01T17:00:00Z",
            "depends_on": ["rig-pa"],
            "day_of": "setup"
        }"#;

        let task: Task = serde_json::from_str(json).unwrap();
        assert_eq!(task.status, TaskStatus::InProgress);
        assert_eq!(task.priority, Priority::High);
        assert_eq!(task.estimated_duration, Minutes::new(90));
        assert_eq!(task.dependencies, vec![tid("rig-pa")]);
        assert_eq!(task.day_of, Some(Segment::Setup));
    }

    #[test]
    fn negative_estimate_is_rejected() {
        let json = r#"{"id": "a", "title": "A", "estimated_hours": -2}"#;
        assert!(serde_json::from_str::<Task>(json).is_err());
    }
}
