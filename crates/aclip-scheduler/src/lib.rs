//! Task scheduling for pipeline runs.
//!
//! Admits at most `max_concurrent_processing` projects into stage execution,
//! rejecting the rest immediately with `SystemBusy`. Admitted tasks run to a
//! terminal state (completed, failed or cancelled) and report progress into
//! a shared status board the API polls.

mod error;
mod scheduler;
mod status;

pub use error::{SchedulerError, SchedulerResult};
pub use scheduler::{SchedulerConfig, TaskKind, TaskScheduler};
pub use status::{SchedulerStats, StatusBoard, TaskState, TaskStatus};
