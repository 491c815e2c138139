//! Error types for the scheduler.

use thiserror::Error;

/// Result type for scheduler operations.
pub type SchedulerResult<T> = Result<T, SchedulerError>;

/// Errors surfaced by the task scheduler.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The concurrency cap is reached; the submission is rejected with no
    /// state change.
    #[error("system busy: {running} of {cap} processing slots in use")]
    SystemBusy { running: usize, cap: usize },

    /// The project already has an in-flight task.
    #[error("project {0} is already processing")]
    AlreadyProcessing(String),

    /// Cancellation was requested for a project with no in-flight task.
    #[error("project {0} has no running task")]
    NotRunning(String),
}
