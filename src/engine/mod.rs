//! # Scheduling Engine
//!
//! Pure computations over one event snapshot. Data flows one way:
//!
//! | Stage | Module | Output |
//! |-------|--------|--------|
//! | Graph | [`crate::domain::TaskGraph`] | validated DAG |
//! | Schedule | [`schedule`] | [`ScheduleEntry`] per task |
//! | Risk | [`risk`] | [`EventStatus`] |
//! | Blockers | [`blockers`] | ranked [`Blocker`]s |
//! | Actions | [`actions`] | ranked [`NextAction`]s |
//! | Run of show | [`run_of_show`] | [`RunOfShow`] |
//!
//! Only graph validation can fail the whole analysis. A run-of-show that
//! does not fit is reported alongside the other results.
//!
//! [`Engine`] holds nothing but policy, so one instance can analyze any
//! number of snapshots, from any number of threads.

pub mod actions;
pub mod blockers;
pub mod clock;
pub mod risk;
pub mod run_of_show;
pub mod schedule;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub use actions::{rank_actions, ActionPolicy, NextAction, ReasonCode};
pub use blockers::{detect_blockers, Blocker, SeverityWeights};
pub use clock::{Clock, FixedClock, SystemClock};
pub use risk::{classify, EventStatus, MessageCode, RiskLevel, RiskPolicy};
pub use run_of_show::{RunOfShow, RunOfShowError, RunOfShowWindows, ShowSegment, Slot};
pub use schedule::{Schedule, ScheduleEntry};

use crate::domain::{Event, EventId, Minutes, TaskGraph, TaskId, ValidationError};

/// Policy knobs for every stage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub risk: RiskPolicy,
    pub severity: SeverityWeights,
    pub actions: ActionPolicy,
    pub run_of_show: RunOfShowWindows,
}

/// Run-of-show outcome; a rejection leaves the rest of the analysis valid
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunOfShowReport {
    Planned(RunOfShow),
    Rejected { error: RunOfShowError },
}

impl RunOfShowReport {
    pub fn planned(&self) -> Option<&RunOfShow> {
        match self {
            RunOfShowReport::Planned(ros) => Some(ros),
            RunOfShowReport::Rejected { .. } => None,
        }
    }
}

impl From<Result<RunOfShow, RunOfShowError>> for RunOfShowReport {
    fn from(result: Result<RunOfShow, RunOfShowError>) -> Self {
        match result {
            Ok(ros) => RunOfShowReport::Planned(ros),
            Err(error) => RunOfShowReport::Rejected { error },
        }
    }
}

/// Everything the engine knows about one snapshot
#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    pub event_id: EventId,
    pub generated_at: DateTime<Utc>,

    /// Changes whenever the snapshot or "now" changes
    pub snapshot_digest: String,

    pub project_finish: Minutes,
    pub schedule: Vec<ScheduleEntry>,
    pub critical_path: Vec<TaskId>,
    pub status: EventStatus,
    pub blockers: Vec<Blocker>,
    pub next_actions: Vec<NextAction>,
    pub run_of_show: RunOfShowReport,
}

/// The scheduling engine
#[derive(Debug, Clone, Default)]
pub struct Engine {
    config: EngineConfig,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Validates the event's tasks into a graph
    pub fn validate(&self, event: &Event) -> Result<TaskGraph, ValidationError> {
        TaskGraph::build(&event.tasks)
    }

    /// Runs every stage against one snapshot
    pub fn analyze(&self, event: &Event, clock: &dyn Clock) -> Result<Analysis, ValidationError> {
        let now = clock.now();
        let graph = self.validate(event)?;
        let schedule = Schedule::compute(&graph, event.date, now);

        let status = classify(&graph, &schedule, &self.config.risk);
        let blockers = detect_blockers(&graph, event.date, now, &self.config.severity);
        let next_actions = rank_actions(
            &graph,
            &schedule,
            now,
            self.config.risk.top_priority_band,
            &self.config.actions,
        );

        let run_of_show: RunOfShowReport =
            run_of_show::generate(&graph, &schedule, &self.config.run_of_show).into();
        if let RunOfShowReport::Rejected { error } = &run_of_show {
            warn!(event = %event.id, %error, "Run of show rejected");
        }

        info!(
            event = %event.id,
            tasks = graph.len(),
            status = %status.status,
            blockers = blockers.len(),
            actions = next_actions.len(),
            "Analyzed event"
        );

        Ok(Analysis {
            event_id: event.id.clone(),
            generated_at: now,
            snapshot_digest: snapshot_digest(event, now),
            project_finish: schedule.project_finish(),
            schedule: schedule.entries().to_vec(),
            critical_path: schedule.critical_path().to_vec(),
            status,
            blockers,
            next_actions,
            run_of_show,
        })
    }
}

/// Short blake3 fingerprint of a snapshot at an instant
///
/// Fields are fed one by one, each length-prefixed, so every snapshot the
/// library can build hashes to its own value.
pub fn snapshot_digest(event: &Event, now: DateTime<Utc>) -> String {
    let mut hasher = blake3::Hasher::new();

    feed(&mut hasher, event.id.as_str().as_bytes());
    feed(&mut hasher, event.name.as_bytes());
    feed(&mut hasher, event.date.to_rfc3339().as_bytes());
    feed_opt(&mut hasher, event.venue.as_ref().map(|v| v.as_bytes().to_vec()));
    feed_opt(&mut hasher, event.budget.map(|b| b.to_bits().to_le_bytes().to_vec()));
    feed_opt(&mut hasher, event.attendee_target.map(|n| n.to_le_bytes().to_vec()));

    feed(&mut hasher, &(event.tasks.len() as u64).to_le_bytes());
    for task in &event.tasks {
        feed(&mut hasher, task.id.as_str().as_bytes());
        feed(&mut hasher, task.title.as_bytes());
        feed(&mut hasher, task.status.label().as_bytes());
        feed(&mut hasher, task.priority.label().as_bytes());
        feed(&mut hasher, &task.estimated_duration.get().to_le_bytes());
        feed_opt(&mut hasher, task.deadline.map(|d| d.to_rfc3339().into_bytes()));
        feed(&mut hasher, &(task.dependencies.len() as u64).to_le_bytes());
        for dep in &task.dependencies {
            feed(&mut hasher, dep.as_str().as_bytes());
        }
        feed_opt(&mut hasher, task.day_of.map(|s| s.label().as_bytes().to_vec()));
        feed_opt(&mut hasher, task.description.as_ref().map(|d| d.as_bytes().to_vec()));
    }

    feed(&mut hasher, now.to_rfc3339().as_bytes());
    let hex = hasher.finalize().to_hex();
    hex[..16].to_string()
}

fn feed(hasher: &mut blake3::Hasher, bytes: &[u8]) {
    hasher.update(&(bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}

fn feed_opt(hasher: &mut blake3::Hasher, value: Option<Vec<u8>>) {
    match value {
        Some(bytes) => {
            hasher.update(&[1]);
            feed(hasher, &bytes);
        }
        None => {
            hasher.update(&[0]);
        }
    }
}
