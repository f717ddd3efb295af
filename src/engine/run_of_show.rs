//! Day-of agenda generation
//!
//! Lays the unfinished day-of tasks into three back-to-back windows (setup,
//! show, teardown). This is a feasibility check, not an optimizer: tasks are
//! taken greedily in dependency-ready order and each window runs its tasks
//! one after another.
//!
//! Dependencies on preparation tasks (anything not tagged day-of) are not
//! placement constraints; that work happens before the day.

use petgraph::graph::NodeIndex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use thiserror::Error;

use super::schedule::Schedule;
use crate::domain::{hours, Minutes, Priority, Segment, TaskGraph, TaskId};

/// Maximum length of each window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunOfShowWindows {
    #[serde(rename = "setup_hours", with = "hours")]
    pub setup: Minutes,

    #[serde(rename = "show_hours", with = "hours")]
    pub show: Minutes,

    #[serde(rename = "teardown_hours", with = "hours")]
    pub teardown: Minutes,
}

impl Default for RunOfShowWindows {
    fn default() -> Self {
        Self {
            setup: Minutes::from_hours_whole(4),
            show: Minutes::from_hours_whole(3),
            teardown: Minutes::from_hours_whole(2),
        }
    }
}

impl RunOfShowWindows {
    pub fn length(&self, segment: Segment) -> Minutes {
        match segment {
            Segment::Setup => self.setup,
            Segment::Show => self.show,
            Segment::Teardown => self.teardown,
        }
    }

    pub fn capacity(&self) -> Minutes {
        self.setup + self.show + self.teardown
    }

    /// `[start, end)` of a window, in minutes from the start of setup
    pub fn bounds(&self, segment: Segment) -> (Minutes, Minutes) {
        let start: Minutes = Segment::ALL
            .iter()
            .take(segment.index())
            .map(|s| self.length(*s))
            .sum();
        (start, start + self.length(segment))
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum RunOfShowError {
    #[error("Day-of tasks need {required} but the windows only hold {capacity}")]
    CapacityExceeded { required: Minutes, capacity: Minutes },

    #[error("No window from {earliest} onwards has room for task {task_id}")]
    NoWindowFits { task_id: TaskId, earliest: Segment },
}

/// One window of the agenda
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShowSegment {
    pub segment: Segment,
    pub start_offset: Minutes,
    pub end_offset: Minutes,

    /// In running order
    pub task_ids: Vec<TaskId>,
}

/// Placement of one task
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Slot {
    pub task_id: TaskId,
    pub segment: Segment,
    pub start_offset: Minutes,
    pub end_offset: Minutes,
}

/// A feasible day-of agenda
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunOfShow {
    pub segments: Vec<ShowSegment>,
    pub slots: Vec<Slot>,
    pub required: Minutes,
    pub capacity: Minutes,
}

impl RunOfShow {
    pub fn slot(&self, task_id: &TaskId) -> Option<&Slot> {
        self.slots.iter().find(|s| &s.task_id == task_id)
    }
}

/// Ready-queue key: critical first, then priority, then id
type ReadyKey = (bool, Priority, TaskId);

/// Places every unfinished day-of task, or explains why it cannot
pub fn generate(
    graph: &TaskGraph,
    schedule: &Schedule,
    windows: &RunOfShowWindows,
) -> Result<RunOfShow, RunOfShowError> {
    let day_of: Vec<NodeIndex> = graph
        .order()
        .iter()
        .copied()
        .filter(|idx| {
            let task = graph.task_at(*idx);
            task.is_day_of() && !task.is_done()
        })
        .collect();

    let required: Minutes = day_of
        .iter()
        .map(|idx| graph.task_at(*idx).estimated_duration)
        .sum();
    let capacity = windows.capacity();
    if required > capacity {
        return Err(RunOfShowError::CapacityExceeded { required, capacity });
    }

    let in_plan = |idx: NodeIndex| day_of.contains(&idx);
    let ready_key = |idx: NodeIndex| -> ReadyKey {
        let task = graph.task_at(idx);
        (
            !schedule.entry_at(idx).on_critical_path,
            task.priority,
            task.id.clone(),
        )
    };

    let mut waiting: HashMap<NodeIndex, usize> = day_of
        .iter()
        .map(|&idx| (idx, graph.dependency_indices(idx).filter(|d| in_plan(*d)).count()))
        .collect();

    let mut ready: BTreeSet<ReadyKey> = day_of
        .iter()
        .filter(|idx| waiting[*idx] == 0)
        .map(|idx| ready_key(*idx))
        .collect();

    let mut cursors: Vec<Minutes> = Segment::ALL.iter().map(|s| windows.bounds(*s).0).collect();
    let mut placed: HashMap<NodeIndex, Slot> = HashMap::new();
    let mut slots: Vec<Slot> = Vec::with_capacity(day_of.len());

    while let Some(key) = ready.pop_first() {
        let task_id = key.2;
        let Some(idx) = graph.index_of(&task_id) else {
            continue;
        };
        let task = graph.task_at(idx);

        let mut earliest = task.day_of.unwrap_or(Segment::Setup);
        let mut not_before = Minutes::ZERO;
        for dep in graph.dependency_indices(idx) {
            if let Some(slot) = placed.get(&dep) {
                earliest = earliest.max(slot.segment);
                not_before = not_before.max(slot.end_offset);
            }
        }

        let slot = Segment::ALL[earliest.index()..]
            .iter()
            .find_map(|segment| {
                let (_, end) = windows.bounds(*segment);
                let start = cursors[segment.index()].max(not_before);
                let finish = start + task.estimated_duration;
                (finish <= end).then(|| Slot {
                    task_id: task_id.clone(),
                    segment: *segment,
                    start_offset: start,
                    end_offset: finish,
                })
            })
            .ok_or_else(|| RunOfShowError::NoWindowFits {
                task_id: task_id.clone(),
                earliest,
            })?;

        cursors[slot.segment.index()] = slot.end_offset;
        placed.insert(idx, slot.clone());
        slots.push(slot);

        for next in graph.dependent_indices(idx) {
            if let Some(count) = waiting.get_mut(&next) {
                *count -= 1;
                if *count == 0 {
                    ready.insert(ready_key(next));
                }
            }
        }
    }

    let segments = Segment::ALL
        .iter()
        .map(|segment| {
            let (start_offset, end_offset) = windows.bounds(*segment);
            ShowSegment {
                segment: *segment,
                start_offset,
                end_offset,
                task_ids: slots
                    .iter()
                    .filter(|s| s.segment == *segment)
                    .map(|s| s.task_id.clone())
                    .collect(),
            }
        })
        .collect();

    Ok(RunOfShow {
        segments,
        slots,
        required,
        capacity,
    })
}
