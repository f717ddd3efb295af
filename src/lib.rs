//! cuesheet - production scheduling for live events
//!
//! Takes a snapshot of an event and its production tasks and works out the
//! critical path, how much float the show date leaves, which tasks are
//! holding others up, what to start next and how the day-of work fits
//! into setup, show and teardown.

pub mod cli;
pub mod domain;
pub mod engine;
pub mod logging;
pub mod storage;

pub use domain::{Event, EventId, Minutes, Priority, Segment, Task, TaskGraph, TaskId, TaskStatus};
pub use engine::{Analysis, Engine, EngineConfig};
