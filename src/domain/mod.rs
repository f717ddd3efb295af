//! Domain models for cuesheet
//!
//! Contains the event snapshot types and the validated task graph, without
//! any I/O concerns.

mod id;
mod duration;
mod task;
mod event;
mod graph;

pub use id::{EventId, IdError, TaskId};
pub use duration::{hours, DurationError, Minutes, MAX_HOURS};
pub use task::{Priority, PriorityError, Segment, Task, TaskStatus};
pub use event::Event;
pub use graph::{TaskGraph, ValidationError};
