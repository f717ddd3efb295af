//! Analysis commands (validate, schedule, status, blockers, next,
//! run-of-show, analyze)
//!
//! Each command runs only the stages it needs and prints either a text
//! table or one JSON document on stdout.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use super::output::Output;
use crate::domain::{Event, EventId, Minutes, TaskGraph, TaskId};
use crate::engine::{
    classify, detect_blockers, rank_actions, run_of_show, Clock, Engine, EventStatus,
    RunOfShowReport, RunOfShowWindows, Schedule, ScheduleEntry,
};

/// Graph and schedule shared by most commands
struct Prepared {
    graph: TaskGraph,
    schedule: Schedule,
    now: DateTime<Utc>,
}

fn prepare(engine: &Engine, event: &Event, clock: &dyn Clock) -> Result<Prepared> {
    let now = clock.now();
    let graph = engine.validate(event).context("Snapshot is invalid")?;
    let schedule = Schedule::compute(&graph, event.date, now);
    debug!(
        tasks = graph.len(),
        finish = %schedule.project_finish(),
        "Computed schedule"
    );
    Ok(Prepared {
        graph,
        schedule,
        now,
    })
}

fn truncate<T>(mut items: Vec<T>, limit: Option<usize>) -> Vec<T> {
    if let Some(limit) = limit {
        items.truncate(limit);
    }
    items
}

fn join_ids(ids: &[TaskId]) -> String {
    ids.iter().map(|id| id.as_str()).collect::<Vec<_>>().join(" -> ")
}

#[derive(Serialize)]
struct ValidationReport<'a> {
    valid: bool,
    event_id: &'a EventId,
    task_count: usize,
    order: Vec<&'a TaskId>,
}

/// Builds the task graph and reports its topological order
pub fn validate(engine: &Engine, event: &Event, output: &Output) -> Result<()> {
    let graph = match engine.validate(event) {
        Ok(graph) => graph,
        Err(err) => {
            if output.is_json() {
                output.data(&serde_json::json!({
                    "valid": false,
                    "event_id": event.id,
                    "error": err,
                }));
            }
            return Err(err).context("Snapshot is invalid");
        }
    };

    let report = ValidationReport {
        valid: true,
        event_id: &event.id,
        task_count: graph.len(),
        order: graph.topological_order().map(|t| &t.id).collect(),
    };

    if output.is_json() {
        output.data(&report);
    } else {
        println!("Snapshot {} is valid: {} tasks", event.id, report.task_count);
        if !report.order.is_empty() {
            let order: Vec<&str> = report.order.iter().map(|id| id.as_str()).collect();
            println!("Order: {}", order.join(", "));
        }
    }

    Ok(())
}

#[derive(Serialize)]
struct ScheduleReport<'a> {
    event_id: &'a EventId,
    generated_at: DateTime<Utc>,
    project_finish: Minutes,
    event_float: Minutes,
    critical_path: &'a [TaskId],
    entries: &'a [ScheduleEntry],
}

/// Per-task CPM values
pub fn schedule(engine: &Engine, event: &Event, clock: &dyn Clock, output: &Output) -> Result<()> {
    let prepared = prepare(engine, event, clock)?;
    let schedule = &prepared.schedule;

    if output.is_json() {
        output.data(&ScheduleReport {
            event_id: &event.id,
            generated_at: prepared.now,
            project_finish: schedule.project_finish(),
            event_float: schedule.event_float(),
            critical_path: schedule.critical_path(),
            entries: schedule.entries(),
        });
        return Ok(());
    }

    println!(
        "Schedule for {} (finish in {}, float {})",
        event.id,
        schedule.project_finish(),
        schedule.event_float()
    );
    println!(
        "{:<20} {:<12} {:>9} {:>9} {:>9} {:>9} {:>9}",
        "ID", "STATUS", "ES", "EF", "LS", "LF", "SLACK"
    );
    println!("{}", "-".repeat(84));
    for entry in schedule.entries() {
        let marker = if entry.on_critical_path { " *" } else { "" };
        println!(
            "{:<20} {:<12} {:>9} {:>9} {:>9} {:>9} {:>9}{}",
            entry.task_id.as_str(),
            entry.status.label(),
            entry.earliest_start.to_string(),
            entry.earliest_finish.to_string(),
            entry.latest_start.to_string(),
            entry.latest_finish.to_string(),
            entry.slack.to_string(),
            marker
        );
    }

    if !schedule.critical_path().is_empty() {
        println!();
        println!("Critical path: {}", join_ids(schedule.critical_path()));
    }

    Ok(())
}

#[derive(Serialize)]
struct StatusReport<'a> {
    event_id: &'a EventId,
    #[serde(flatten)]
    status: &'a EventStatus,
}

/// Computes the event's risk level
pub fn event_status(engine: &Engine, event: &Event, clock: &dyn Clock) -> Result<EventStatus> {
    let prepared = prepare(engine, event, clock)?;
    Ok(classify(
        &prepared.graph,
        &prepared.schedule,
        &engine.config().risk,
    ))
}

/// Prints an already computed status
pub fn print_status(event: &Event, status: &EventStatus, output: &Output) {
    if output.is_json() {
        output.data(&StatusReport {
            event_id: &event.id,
            status,
        });
        return;
    }

    println!("{}: {} ({})", event.id, status.status, status.message_code.label());
    println!("Event float: {}", status.event_float);
    if !status.contributing_tasks.is_empty() {
        println!("Contributing: {}", join_ids(&status.contributing_tasks));
    }
}

/// Risk classification
pub fn status(engine: &Engine, event: &Event, clock: &dyn Clock, output: &Output) -> Result<()> {
    let status = event_status(engine, event, clock)?;
    print_status(event, &status, output);
    Ok(())
}

/// Ranked blockers
pub fn blockers(
    engine: &Engine,
    event: &Event,
    clock: &dyn Clock,
    limit: Option<usize>,
    output: &Output,
) -> Result<()> {
    let prepared = prepare(engine, event, clock)?;
    let blockers = truncate(
        detect_blockers(
            &prepared.graph,
            event.date,
            prepared.now,
            &engine.config().severity,
        ),
        limit,
    );

    if output.is_json() {
        output.data(&blockers);
    } else if blockers.is_empty() {
        println!("No blockers.");
    } else {
        println!("Blockers ({}):", blockers.len());
        println!(
            "{:<20} {:<12} {:>8} {:>9} {:>10}",
            "ID", "STATUS", "BLOCKING", "SEVERITY", "DEADLINE"
        );
        println!("{}", "-".repeat(63));
        for blocker in &blockers {
            println!(
                "{:<20} {:<12} {:>8} {:>9} {:>10}",
                blocker.task_id.as_str(),
                blocker.status.label(),
                blocker.blocking_count,
                blocker.severity,
                blocker.deadline_in.to_string()
            );
        }
    }

    Ok(())
}

/// Ranked next actions
pub fn next(
    engine: &Engine,
    event: &Event,
    clock: &dyn Clock,
    limit: Option<usize>,
    output: &Output,
) -> Result<()> {
    let prepared = prepare(engine, event, clock)?;
    let config = engine.config();
    let actions = truncate(
        rank_actions(
            &prepared.graph,
            &prepared.schedule,
            prepared.now,
            config.risk.top_priority_band,
            &config.actions,
        ),
        limit,
    );

    if output.is_json() {
        output.data(&actions);
    } else if actions.is_empty() {
        println!("Nothing is ready to start.");
    } else {
        println!("Next actions ({}):", actions.len());
        println!("{:<5} {:<20} {:<16} TITLE", "RANK", "ID", "REASON");
        println!("{}", "-".repeat(60));
        for action in &actions {
            let title = event
                .task(&action.task_id)
                .map(|t| t.title.as_str())
                .unwrap_or_default();
            println!(
                "{:<5} {:<20} {:<16} {}",
                action.rank,
                action.task_id.as_str(),
                action.reason_code.label(),
                title
            );
        }
    }

    Ok(())
}

/// Day-of agenda
///
/// A rejected plan is printed and then reported as an error.
pub fn run_of_show(
    engine: &Engine,
    event: &Event,
    clock: &dyn Clock,
    windows: &RunOfShowWindows,
    output: &Output,
) -> Result<()> {
    let prepared = prepare(engine, event, clock)?;
    let report: RunOfShowReport =
        run_of_show::generate(&prepared.graph, &prepared.schedule, windows).into();

    if output.is_json() {
        output.data(&report);
    }

    match report {
        RunOfShowReport::Rejected { error } => {
            Err(error).context("Run of show does not fit the day-of windows")
        }
        RunOfShowReport::Planned(plan) => {
            if !output.is_json() {
                println!(
                    "Run of show for {} ({} of {} used)",
                    event.id, plan.required, plan.capacity
                );
                for segment in &plan.segments {
                    println!();
                    println!(
                        "{} [{} - {}]",
                        segment.segment.label().to_uppercase(),
                        segment.start_offset,
                        segment.end_offset
                    );
                    for task_id in &segment.task_ids {
                        if let Some(slot) = plan.slot(task_id) {
                            println!(
                                "  {:>7} - {:<7} {}",
                                slot.start_offset.to_string(),
                                slot.end_offset.to_string(),
                                task_id
                            );
                        }
                    }
                }
            }
            Ok(())
        }
    }
}

/// Every stage at once
pub fn analyze(engine: &Engine, event: &Event, clock: &dyn Clock, output: &Output) -> Result<()> {
    let analysis = engine
        .analyze(event, clock)
        .context("Snapshot is invalid")?;

    if output.is_json() {
        output.data(&analysis);
        return Ok(());
    }

    println!(
        "{}: {} ({})",
        analysis.event_id,
        analysis.status.status,
        analysis.status.message_code.label()
    );
    println!(
        "Finish in {}, float {}",
        analysis.project_finish, analysis.status.event_float
    );
    if !analysis.critical_path.is_empty() {
        println!("Critical path: {}", join_ids(&analysis.critical_path));
    }
    println!("Blockers: {}", analysis.blockers.len());
    if let Some(top) = analysis.next_actions.first() {
        println!("Next: {} ({})", top.task_id, top.reason_code.label());
    }
    match &analysis.run_of_show {
        RunOfShowReport::Planned(plan) => println!("Run of show: {} slots", plan.slots.len()),
        RunOfShowReport::Rejected { error } => println!("Run of show: {}", error),
    }
    println!("Digest: {}", analysis.snapshot_digest);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::FixedClock;
    use chrono::{Duration, TimeZone};

    fn event() -> Event {
        let now = Utc.with_ymd_and_hms(2026, 6, 1, 8, 0, 0).unwrap();
        let json = format!(
            r#"{{"id": "e", "name": "E", "date": "{}", "tasks": [
                {{"id": "a", "title": "A", "estimated_hours": 2}},
                {{"id": "b", "title": "B", "estimated_hours": 1, "depends_on": ["a"]}}
            ]}}"#,
            (now + Duration::days(2)).to_rfc3339()
        );
        serde_json::from_str(&json).unwrap()
    }

    fn clock() -> FixedClock {
        FixedClock(Utc.with_ymd_and_hms(2026, 6, 1, 8, 0, 0).unwrap())
    }

    #[test]
    fn prepare_rejects_invalid_snapshots() {
        let mut ev = event();
        ev.tasks[0].add_dependency(TaskId::new("b").unwrap());

        let err = prepare(&Engine::default(), &ev, &clock()).err().unwrap();
        assert!(format!("{:#}", err).contains("Dependency cycle"));
    }

    #[test]
    fn event_status_uses_engine_policy() {
        let status = event_status(&Engine::default(), &event(), &clock()).unwrap();
        assert_eq!(status.event_float, Minutes::from_hours_whole(45));
    }

    #[test]
    fn truncate_respects_limit() {
        assert_eq!(truncate(vec![1, 2, 3], Some(2)), vec![1, 2]);
        assert_eq!(truncate(vec![1, 2, 3], None), vec![1, 2, 3]);
    }

    #[test]
    fn status_report_flattens_fields() {
        let ev = event();
        let status = event_status(&Engine::default(), &ev, &clock()).unwrap();
        let json = serde_json::to_value(StatusReport {
            event_id: &ev.id,
            status: &status,
        })
        .unwrap();

        assert_eq!(json["event_id"], "e");
        assert_eq!(json["status"], "on_track");
        assert_eq!(json["event_float"], 45 * 60);
    }
}
