//! Critical path method over a validated task graph
//!
//! All times are minutes relative to "now". The forward pass walks the
//! topological order computing earliest start/finish; the backward pass
//! walks it in reverse computing latest start/finish against a horizon of
//! `min(project finish, event date)`, tightened further by task deadlines.
//!
//! Done tasks count as zero-duration work anchored at now, so the schedule
//! reflects remaining work only. Their own deadlines are ignored: completed
//! work cannot be late.

use chrono::{DateTime, Utc};
use petgraph::graph::NodeIndex;
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

use crate::domain::{Minutes, TaskGraph, TaskId, TaskStatus};

/// Timing of one task
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduleEntry {
    pub task_id: TaskId,

    /// Status after recomputing `blocked`
    pub status: TaskStatus,

    pub earliest_start: Minutes,
    pub earliest_finish: Minutes,
    pub latest_start: Minutes,
    pub latest_finish: Minutes,

    /// `latest_start - earliest_start`; negative when a deadline is already
    /// out of reach
    pub slack: Minutes,

    /// Not done and without slack
    pub on_critical_path: bool,
}

/// CPM results for a whole graph
#[derive(Debug, Clone)]
pub struct Schedule {
    /// Indexed by graph node index (id order)
    entries: Vec<ScheduleEntry>,
    positions: HashMap<TaskId, usize>,
    project_finish: Minutes,
    deadline: Minutes,
    critical_path: Vec<TaskId>,
}

impl Schedule {
    /// Runs the forward and backward passes
    pub fn compute(graph: &TaskGraph, event_date: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        let n = graph.len();
        let statuses = graph.statuses();
        let duration = |idx: NodeIndex| graph.task_at(idx).remaining_duration();

        let mut earliest_start = vec![Minutes::ZERO; n];
        let mut earliest_finish = vec![Minutes::ZERO; n];

        for &idx in graph.order() {
            let es = graph
                .dependency_indices(idx)
                .map(|d| earliest_finish[d.index()])
                .max()
                .unwrap_or(Minutes::ZERO);

            let ef = if graph.task_at(idx).is_done() {
                es.max(Minutes::ZERO)
            } else {
                es + duration(idx)
            };

            earliest_start[idx.index()] = es;
            earliest_finish[idx.index()] = ef;
        }

        let project_finish = earliest_finish.iter().copied().max().unwrap_or(Minutes::ZERO);
        let deadline = Minutes::between(now, event_date);
        let horizon = project_finish.min(deadline);

        let mut latest_start = vec![Minutes::ZERO; n];
        let mut latest_finish = vec![Minutes::ZERO; n];

        for &idx in graph.order().iter().rev() {
            let task = graph.task_at(idx);
            let mut lf = graph
                .dependent_indices(idx)
                .map(|s| latest_start[s.index()])
                .min()
                .unwrap_or(horizon);

            if let Some(task_deadline) = task.deadline.filter(|_| !task.is_done()) {
                lf = lf.min(Minutes::between(now, task_deadline));
            }

            latest_finish[idx.index()] = lf;
            latest_start[idx.index()] = lf - duration(idx);
        }

        let entries: Vec<ScheduleEntry> = graph
            .tasks()
            .enumerate()
            .map(|(i, task)| {
                let slack = latest_start[i] - earliest_start[i];
                ScheduleEntry {
                    task_id: task.id.clone(),
                    status: task.effective_status(&statuses),
                    earliest_start: earliest_start[i],
                    earliest_finish: earliest_finish[i],
                    latest_start: latest_start[i],
                    latest_finish: latest_finish[i],
                    slack,
                    on_critical_path: !task.is_done() && slack <= Minutes::ZERO,
                }
            })
            .collect();

        let critical_path: Vec<TaskId> = graph
            .order()
            .iter()
            .map(|idx| &entries[idx.index()])
            .filter(|e| e.on_critical_path)
            .map(|e| e.task_id.clone())
            .collect();

        let positions = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.task_id.clone(), i))
            .collect();

        debug!(
            tasks = n,
            project_finish = %project_finish,
            deadline = %deadline,
            critical = critical_path.len(),
            "Computed schedule"
        );

        Self {
            entries,
            positions,
            project_finish,
            deadline,
            critical_path,
        }
    }

    /// Entries in task id order
    pub fn entries(&self) -> &[ScheduleEntry] {
        &self.entries
    }

    pub fn entry(&self, task_id: &TaskId) -> Option<&ScheduleEntry> {
        self.positions.get(task_id).map(|i| &self.entries[*i])
    }

    pub(crate) fn entry_at(&self, idx: NodeIndex) -> &ScheduleEntry {
        &self.entries[idx.index()]
    }

    /// Earliest time all remaining work can be finished
    pub fn project_finish(&self) -> Minutes {
        self.project_finish
    }

    /// Offset of the event date from now
    pub fn deadline(&self) -> Minutes {
        self.deadline
    }

    /// How far the whole project can slip before missing the event date
    pub fn event_float(&self) -> Minutes {
        self.deadline - self.project_finish
    }

    /// Critical tasks in topological order
    pub fn critical_path(&self) -> &[TaskId] {
        &self.critical_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Task;
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

    fn schedule(tasks: &[Task], event_in_hours: i64) -> Schedule {
        let graph = TaskGraph::build(tasks).unwrap();
        Schedule::compute(&graph, now() + Duration::hours(event_in_hours), now())
    }

    fn h(hours: i64) -> Minutes {
        Minutes::from_hours_whole(hours)
    }

    #[test]
    fn fork_scenario() {
        let tasks = [task("a", 2, &[]), task("b", 3, &["a"]), task("c", 1, &["a"])];
        let s = schedule(&tasks, 5);

        let a = s.entry(&tid("a")).unwrap();
        let b = s.entry(&tid("b")).unwrap();
        let c = s.entry(&tid("c")).unwrap();

        assert_eq!((a.earliest_start, a.earliest_finish), (h(0), h(2)));
        assert_eq!((b.earliest_start, b.earliest_finish), (h(2), h(5)));
        assert_eq!((c.earliest_start, c.earliest_finish), (h(2), h(3)));

        assert_eq!(b.latest_finish, h(5));
        assert_eq!(b.slack, Minutes::ZERO);
        assert!(b.on_critical_path);
        assert_eq!(c.latest_finish, h(5));
        assert_eq!(c.slack, h(2));
        assert!(!c.on_critical_path);

        assert_eq!(s.project_finish(), h(5));
        assert_eq!(s.event_float(), Minutes::ZERO);
        assert_eq!(s.critical_path(), &[tid("a"), tid("b")]);
    }

    #[test]
    fn later_event_date_does_not_loosen_horizon() {
        let tasks = [task("a", 2, &[]), task("b", 3, &["a"])];
        let s = schedule(&tasks, 48);

        assert_eq!(s.entry(&tid("b")).unwrap().latest_finish, h(5));
        assert_eq!(s.entry(&tid("b")).unwrap().slack, Minutes::ZERO);
        assert_eq!(s.event_float(), h(43));
    }

    #[test]
    fn earlier_event_date_produces_negative_slack() {
        let tasks = [task("a", 2, &[]), task("b", 3, &["a"])];
        let s = schedule(&tasks, 4);

        let b = s.entry(&tid("b")).unwrap();
        assert_eq!(b.latest_finish, h(4));
        assert_eq!(b.slack, h(-1));
        assert!(b.on_critical_path);
        assert_eq!(s.event_float(), h(-1));
    }

    #[test]
    fn task_deadline_tightens_backward_bound() {
        let tasks = [
            task("a", 2, &[]),
            task("b", 3, &["a"]),
            task("c", 1, &["a"]).with_deadline(now() + Duration::hours(3)),
        ];
        let s = schedule(&tasks, 24);

        let c = s.entry(&tid("c")).unwrap();
        assert_eq!(c.latest_finish, h(3));
        assert_eq!(c.slack, Minutes::ZERO);
        assert!(c.on_critical_path);
    }

    #[test]
    fn done_tasks_take_no_time() {
        let tasks = [
            task("a", 2, &[]).with_status(TaskStatus::Done),
            task("b", 3, &["a"]),
        ];
        let s = schedule(&tasks, 24);

        let a = s.entry(&tid("a")).unwrap();
        let b = s.entry(&tid("b")).unwrap();
        assert_eq!(a.earliest_finish, Minutes::ZERO);
        assert_eq!(b.earliest_start, Minutes::ZERO);
        assert_eq!(s.project_finish(), h(3));
        assert!(!a.on_critical_path);
        assert!(b.on_critical_path);
    }

    #[test]
    fn done_task_deadline_in_the_past_is_ignored() {
        let tasks = [task("a", 2, &[])
            .with_status(TaskStatus::Done)
            .with_deadline(now() - Duration::hours(10))];
        let s = schedule(&tasks, 24);

        assert_eq!(s.entry(&tid("a")).unwrap().slack, Minutes::ZERO);
    }

    #[test]
    fn effective_status_is_reported() {
        let tasks = [task("a", 1, &[]), task("b", 1, &["a"])];
        let s = schedule(&tasks, 24);
        assert_eq!(s.entry(&tid("b")).unwrap().status, TaskStatus::Blocked);
    }

    #[test]
    fn empty_graph_schedules_nothing() {
        let s = schedule(&[], 24);
        assert!(s.entries().is_empty());
        assert_eq!(s.project_finish(), Minutes::ZERO);
        assert!(s.critical_path().is_empty());
    }

    #[test]
    fn milestones_have_zero_duration() {
        let tasks = [
            task("a", 2, &[]),
            task("gate", 0, &["a"]),
            task("b", 1, &["gate"]),
        ];
        let s = schedule(&tasks, 3);

        let gate = s.entry(&tid("gate")).unwrap();
        assert_eq!(gate.earliest_start, gate.earliest_finish);
        assert!(gate.on_critical_path);
    }
}
