//! Next-action ranking
//!
//! Actionable tasks are the ones nobody has picked up yet and nothing is
//! waiting on: effective status `todo`. They are ordered to unblock the
//! critical path first, then by explicit priority, then by the task's own
//! deadline (undated last), then by how much downstream work they release.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use super::blockers::pending_dependents;
use super::schedule::Schedule;
use crate::domain::{hours, Minutes, Priority, Task, TaskGraph, TaskId, TaskStatus};

/// Why a task was put forward
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    CriticalPath,
    HighPriority,
    DeadlineSoon,
    UnblocksWork,
    Ready,
}

impl ReasonCode {
    pub fn label(&self) -> &'static str {
        match self {
            ReasonCode::CriticalPath => "critical_path",
            ReasonCode::HighPriority => "high_priority",
            ReasonCode::DeadlineSoon => "deadline_soon",
            ReasonCode::UnblocksWork => "unblocks_work",
            ReasonCode::Ready => "ready",
        }
    }
}

/// A ranked suggestion
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NextAction {
    pub task_id: TaskId,

    /// 1-based position
    pub rank: usize,

    pub reason_code: ReasonCode,
}

/// Tuning for the ranker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionPolicy {
    /// A deadline closer than this counts as `deadline_soon`
    #[serde(rename = "deadline_soon_hours", with = "hours")]
    pub deadline_soon: Minutes,
}

impl Default for ActionPolicy {
    fn default() -> Self {
        Self {
            deadline_soon: Minutes::from_hours_whole(48),
        }
    }
}

struct Candidate<'a> {
    task: &'a Task,
    critical: bool,
    blocking_count: usize,
}

impl Candidate<'_> {
    fn cmp_urgency(&self, other: &Self) -> Ordering {
        other
            .critical
            .cmp(&self.critical)
            .then_with(|| self.task.priority.cmp(&other.task.priority))
            .then_with(|| match (self.task.deadline, other.task.deadline) {
                (Some(a), Some(b)) => a.cmp(&b),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            })
            .then_with(|| other.blocking_count.cmp(&self.blocking_count))
            .then_with(|| self.task.id.cmp(&other.task.id))
    }

    fn reason(&self, now: DateTime<Utc>, top_band: Priority, policy: &ActionPolicy) -> ReasonCode {
        if self.critical {
            return ReasonCode::CriticalPath;
        }
        let priority = self.task.priority;
        if priority.within(Priority::High) || priority.within(top_band) {
            return ReasonCode::HighPriority;
        }
        if let Some(deadline) = self.task.deadline {
            if Minutes::between(now, deadline) <= policy.deadline_soon {
                return ReasonCode::DeadlineSoon;
            }
        }
        if self.blocking_count > 0 {
            return ReasonCode::UnblocksWork;
        }
        ReasonCode::Ready
    }
}

/// Orders the currently actionable tasks
pub fn rank_actions(
    graph: &TaskGraph,
    schedule: &Schedule,
    now: DateTime<Utc>,
    top_band: Priority,
    policy: &ActionPolicy,
) -> Vec<NextAction> {
    let mut candidates: Vec<Candidate> = graph
        .order()
        .iter()
        .filter_map(|&idx| {
            let entry = schedule.entry_at(idx);
            if entry.status != TaskStatus::Todo {
                return None;
            }
            Some(Candidate {
                task: graph.task_at(idx),
                critical: entry.on_critical_path,
                blocking_count: pending_dependents(graph, idx).len(),
            })
        })
        .collect();

    candidates.sort_by(|a, b| a.cmp_urgency(b));

    candidates
        .iter()
        .enumerate()
        .map(|(i, c)| NextAction {
            task_id: c.task.id.clone(),
            rank: i + 1,
            reason_code: c.reason(now, top_band, policy),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, 8, 0, 0).unwrap()
    }

    fn tid(id: &str) -> TaskId {
        TaskId::new(id).unwrap()
    }

    fn task(id: &str, hours: i64, deps: &[&str]) -> Task {
        let mut t = Task::new(tid(id), id).with_duration(Minutes::from_hours_whole(hours));
        for d in deps {
            t.add_dependency(tid(d));
        }
        t
    }

    fn rank(tasks: &[Task]) -> Vec<NextAction> {
        let graph = TaskGraph::build(tasks).unwrap();
        let schedule = Schedule::compute(&graph, now() + Duration::days(30), now());
        rank_actions(
            &graph,
            &schedule,
            now(),
            Priority::Critical,
            &ActionPolicy::default(),
        )
    }

    fn ids(actions: &[NextAction]) -> Vec<&str> {
        actions.iter().map(|a| a.task_id.as_str()).collect()
    }

    #[test]
    fn only_todo_tasks_with_met_dependencies_are_actionable() {
        let tasks = [
            task("a", 1, &[]).with_status(TaskStatus::Done),
            task("b", 1, &["a"]),
            task("c", 1, &["b"]),
            task("d", 1, &[]).with_status(TaskStatus::InProgress),
        ];
        let actions = rank(&tasks);
        assert_eq!(ids(&actions), vec!["b"]);
        assert_eq!(actions[0].rank, 1);
    }

    #[test]
    fn caller_marked_blocked_task_is_actionable_once_unblocked() {
        let tasks = [
            task("a", 1, &[]).with_status(TaskStatus::Done),
            task("b", 1, &["a"]).with_status(TaskStatus::Blocked),
        ];
        assert_eq!(ids(&rank(&tasks)), vec!["b"]);
    }

    #[test]
    fn critical_path_comes_first() {
        // "long" drives the finish; "short" has float
        let tasks = [
            task("long", 5, &[]),
            task("short", 1, &[]).with_priority(Priority::Critical),
        ];
        let actions = rank(&tasks);
        assert_eq!(ids(&actions), vec!["long", "short"]);
        assert_eq!(actions[0].reason_code, ReasonCode::CriticalPath);
        assert_eq!(actions[1].reason_code, ReasonCode::HighPriority);
    }

    #[test]
    fn priority_then_deadline_then_leverage() {
        let tasks = [
            task("gate", 10, &[]),
            task("p-low", 1, &[]).with_priority(Priority::Low),
            task("p-high", 1, &[]).with_priority(Priority::High),
            task("dated", 1, &[]).with_deadline(now() + Duration::hours(24)),
            task("undated", 1, &[]),
            task("lever", 1, &[]),
            task("lever-child", 1, &["lever"]),
        ];
        let actions = rank(&tasks);

        assert_eq!(
            ids(&actions),
            vec!["gate", "p-high", "dated", "lever", "undated", "p-low"]
        );
        assert_eq!(actions[2].reason_code, ReasonCode::DeadlineSoon);
        assert_eq!(actions[3].reason_code, ReasonCode::UnblocksWork);
        assert_eq!(actions[4].reason_code, ReasonCode::Ready);
    }

    #[test]
    fn ranks_are_dense_and_one_based() {
        let tasks = [task("a", 1, &[]), task("b", 2, &[]), task("c", 3, &[])];
        let ranks: Vec<usize> = rank(&tasks).iter().map(|a| a.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3]);
    }
}
