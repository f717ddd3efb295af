//! Event-level risk classification
//!
//! Reduces a schedule to one of three levels. The signal is the event float
//! (how far the whole project can slip before the show date) plus whether a
//! top-priority task sits on the critical path with nothing to absorb a slip.
//!
//! Completing work can only shrink the project finish, which only grows the
//! float, so marking a task done never raises the level.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::schedule::Schedule;
use crate::domain::{hours, Minutes, Priority, TaskGraph, TaskId};

/// Overall classification, ordered from best to worst
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    OnTrack,
    AtRisk,
    Critical,
}

impl RiskLevel {
    pub fn label(&self) -> &'static str {
        match self {
            RiskLevel::OnTrack => "on_track",
            RiskLevel::AtRisk => "at_risk",
            RiskLevel::Critical => "critical",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Why the event got its level; renderers turn this into prose
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageCode {
    OnSchedule,
    NoRemainingWork,
    LowFloat,
    DeadlineLeadTime,
    BottleneckWithoutBuffer,
    DeadlineInfeasible,
}

impl MessageCode {
    pub fn label(&self) -> &'static str {
        match self {
            MessageCode::OnSchedule => "on_schedule",
            MessageCode::NoRemainingWork => "no_remaining_work",
            MessageCode::LowFloat => "low_float",
            MessageCode::DeadlineLeadTime => "deadline_lead_time",
            MessageCode::BottleneckWithoutBuffer => "bottleneck_without_buffer",
            MessageCode::DeadlineInfeasible => "deadline_infeasible",
        }
    }
}

/// Risk classification for one event
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventStatus {
    pub status: RiskLevel,
    pub message_code: MessageCode,
    pub contributing_tasks: Vec<TaskId>,
    pub event_float: Minutes,
}

/// Thresholds for the at-risk and critical levels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskPolicy {
    /// Event float below this share of the remaining duration is at risk
    pub float_threshold_ratio: f64,

    /// Event float below this lead time is at risk
    #[serde(rename = "lead_time_hours", with = "hours")]
    pub lead_time: Minutes,

    /// Least urgent priority that counts as a bottleneck on the critical path
    pub top_priority_band: Priority,
}

impl Default for RiskPolicy {
    fn default() -> Self {
        Self {
            float_threshold_ratio: 0.10,
            lead_time: Minutes::ZERO,
            top_priority_band: Priority::Critical,
        }
    }
}

/// Classifies the event described by `schedule`
pub fn classify(graph: &TaskGraph, schedule: &Schedule, policy: &RiskPolicy) -> EventStatus {
    let float = schedule.event_float();
    let critical: Vec<TaskId> = schedule.critical_path().to_vec();

    let status = |level, code, tasks| EventStatus {
        status: level,
        message_code: code,
        contributing_tasks: tasks,
        event_float: float,
    };

    if graph.tasks().all(|t| t.is_done()) {
        return status(RiskLevel::OnTrack, MessageCode::NoRemainingWork, vec![]);
    }

    if float < Minutes::ZERO {
        return status(RiskLevel::Critical, MessageCode::DeadlineInfeasible, critical);
    }

    if float <= Minutes::ZERO {
        let bottlenecks: Vec<TaskId> = critical
            .iter()
            .filter(|id| {
                graph
                    .task(id)
                    .map(|t| t.priority.within(policy.top_priority_band))
                    .unwrap_or(false)
            })
            .cloned()
            .collect();

        if !bottlenecks.is_empty() {
            return status(
                RiskLevel::Critical,
                MessageCode::BottleneckWithoutBuffer,
                bottlenecks,
            );
        }
    }

    let threshold = schedule.project_finish().scale(policy.float_threshold_ratio);
    if float < threshold {
        return status(RiskLevel::AtRisk, MessageCode::LowFloat, critical);
    }

    if float < policy.lead_time {
        return status(RiskLevel::AtRisk, MessageCode::DeadlineLeadTime, critical);
    }

    status(RiskLevel::OnTrack, MessageCode::OnSchedule, vec![])
}
