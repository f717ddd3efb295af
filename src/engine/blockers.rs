//! Blocker detection
//!
//! A blocker is any unfinished task that still gates unfinished work
//! downstream. Blockers are scored so the most damaging ones surface first;
//! how many to show is up to the caller.

use chrono::{DateTime, Utc};
use petgraph::graph::NodeIndex;
use serde::{Deserialize, Serialize};

use crate::domain::{Minutes, TaskGraph, TaskId, TaskStatus};

/// A task holding up downstream work
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Blocker {
    pub task_id: TaskId,
    pub status: TaskStatus,

    /// Unfinished tasks that directly or transitively depend on this one
    pub blocking_count: usize,

    /// Time until the nearest deadline this task gates
    pub deadline_in: Minutes,

    pub severity: u32,
}

/// Weights for the blocker severity score
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeverityWeights {
    pub priority_weight: u32,
    pub deadline_weight: u32,
    pub blocking_weight: u32,
}

impl SeverityWeights {
    /// Largest weight a config file may set
    pub const MAX_WEIGHT: u32 = 10_000;
}

impl Default for SeverityWeights {
    fn default() -> Self {
        Self {
            priority_weight: 10,
            deadline_weight: 6,
            blocking_weight: 3,
        }
    }
}

const DAY: i64 = 24 * 60;

/// 0 (far away) to 5 (already overdue)
fn deadline_proximity(deadline_in: Minutes) -> u32 {
    match deadline_in.get() {
        m if m < 0 => 5,
        m if m <= DAY => 4,
        m if m <= 3 * DAY => 3,
        m if m <= 7 * DAY => 2,
        m if m <= 30 * DAY => 1,
        _ => 0,
    }
}

/// Unfinished descendants of a node
pub(crate) fn pending_dependents(graph: &TaskGraph, idx: NodeIndex) -> Vec<NodeIndex> {
    graph
        .descendants(idx)
        .into_iter()
        .filter(|n| !graph.task_at(*n).is_done())
        .collect()
}

/// Finds and ranks blockers, most severe first
///
/// Ties on severity fall back to task id so the order is stable across runs.
pub fn detect_blockers(
    graph: &TaskGraph,
    event_date: DateTime<Utc>,
    now: DateTime<Utc>,
    weights: &SeverityWeights,
) -> Vec<Blocker> {
    let statuses = graph.statuses();

    let mut blockers: Vec<Blocker> = graph
        .order()
        .iter()
        .filter(|idx| !graph.task_at(**idx).is_done())
        .filter_map(|&idx| {
            let task = graph.task_at(idx);
            let downstream = pending_dependents(graph, idx);
            if downstream.is_empty() {
                return None;
            }

            let nearest = std::iter::once(task)
                .chain(downstream.iter().map(|n| graph.task_at(*n)))
                .filter_map(|t| t.deadline)
                .chain(std::iter::once(event_date))
                .min()
                .unwrap_or(event_date);
            let deadline_in = Minutes::between(now, nearest);

            let urgency = 5 - u32::from(task.priority.ordinal());
            let blocking = u32::try_from(downstream.len()).unwrap_or(u32::MAX);
            let proximity = deadline_proximity(deadline_in);
            let severity = weights
                .priority_weight
                .saturating_mul(urgency)
                .saturating_add(weights.deadline_weight.saturating_mul(proximity))
                .saturating_add(weights.blocking_weight.saturating_mul(blocking));

            Some(Blocker {
                task_id: task.id.clone(),
                status: task.effective_status(&statuses),
                blocking_count: downstream.len(),
                deadline_in,
                severity,
            })
        })
        .collect();

    blockers.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then_with(|| a.task_id.cmp(&b.task_id))
    });
    blockers
}
