//! The shared status board polled by the API.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use aclip_models::{ProjectId, TOTAL_STAGES};
use aclip_pipeline::ProgressEvent;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Execution state of a tracked task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TaskState::Running)
    }
}

/// Snapshot of one project's pipeline progress.
#[derive(Debug, Clone, Serialize)]
pub struct TaskStatus {
    pub state: TaskState,
    /// 1-based stage index
    pub stage_index: u8,
    pub total_stages: u8,
    pub step_name: String,
    /// Whole-pipeline progress percent
    pub progress: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl TaskStatus {
    fn running(stage_index: u8, step_name: String, progress: u8) -> Self {
        Self {
            state: TaskState::Running,
            stage_index,
            total_stages: TOTAL_STAGES,
            step_name,
            progress,
            error_message: None,
            updated_at: Utc::now(),
        }
    }
}

/// Aggregate scheduler statistics for `/api/system/status`.
#[derive(Debug, Clone, Serialize)]
pub struct SchedulerStats {
    pub running: usize,
    pub capacity: usize,
    pub completed_total: u64,
    pub failed_total: u64,
    pub cancelled_total: u64,
}

/// Single-writer-per-project, many-reader map of task progress.
#[derive(Debug, Default)]
pub struct StatusBoard {
    statuses: RwLock<HashMap<ProjectId, TaskStatus>>,
    completed: AtomicU64,
    failed: AtomicU64,
    cancelled: AtomicU64,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a progress event from a running pipeline.
    pub fn record_progress(&self, event: ProgressEvent) {
        let mut statuses = self.statuses.write().expect("status board poisoned");
        statuses.insert(
            event.project_id.clone(),
            TaskStatus::running(event.stage_index, event.step_name, event.percent),
        );
    }

    /// Mark a task's terminal state.
    pub fn record_terminal(
        &self,
        project_id: &ProjectId,
        state: TaskState,
        error_message: Option<String>,
    ) {
        match state {
            TaskState::Completed => self.completed.fetch_add(1, Ordering::Relaxed),
            TaskState::Failed => self.failed.fetch_add(1, Ordering::Relaxed),
            TaskState::Cancelled => self.cancelled.fetch_add(1, Ordering::Relaxed),
            TaskState::Running => 0,
        };

        let mut statuses = self.statuses.write().expect("status board poisoned");
        let entry = statuses
            .entry(project_id.clone())
            .or_insert_with(|| TaskStatus::running(1, String::new(), 0));
        entry.state = state;
        entry.error_message = error_message;
        entry.updated_at = Utc::now();
        if state == TaskState::Completed {
            entry.progress = 100;
            entry.step_name = "Completed".to_string();
        }
    }

    /// Current status of a project's task, if tracked.
    pub fn get(&self, project_id: &ProjectId) -> Option<TaskStatus> {
        self.statuses
            .read()
            .expect("status board poisoned")
            .get(project_id)
            .cloned()
    }

    /// Drop a project's status (called on project deletion).
    pub fn remove(&self, project_id: &ProjectId) {
        self.statuses
            .write()
            .expect("status board poisoned")
            .remove(project_id);
    }

    /// Whether a project currently has a running task.
    pub fn is_running(&self, project_id: &ProjectId) -> bool {
        matches!(
            self.get(project_id),
            Some(TaskStatus {
                state: TaskState::Running,
                ..
            })
        )
    }

    /// Aggregate statistics.
    pub fn stats(&self, capacity: usize) -> SchedulerStats {
        let running = self
            .statuses
            .read()
            .expect("status board poisoned")
            .values()
            .filter(|s| s.state == TaskState::Running)
            .count();
        SchedulerStats {
            running,
            capacity,
            completed_total: self.completed.load(Ordering::Relaxed),
            failed_total: self.failed.load(Ordering::Relaxed),
            cancelled_total: self.cancelled.load(Ordering::Relaxed),
        }
    }
}
