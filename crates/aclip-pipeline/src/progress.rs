//! Progress events emitted at stage boundaries.

use std::sync::Arc;

use aclip_models::{ProjectId, StageId, TOTAL_STAGES};

/// One progress report, pushed to the scheduler's status board.
#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub project_id: ProjectId,
    /// 1-based index of the stage being entered
    pub stage_index: u8,
    /// Human-readable step name
    pub step_name: String,
    /// Whole-pipeline progress in percent
    pub percent: u8,
}

impl ProgressEvent {
    /// Event for entering a stage.
    pub fn entering(project_id: ProjectId, stage: StageId) -> Self {
        // Entering stage k means k-1 of 6 stages are done.
        let percent = ((stage.index() as u32 - 1) * 100 / TOTAL_STAGES as u32) as u8;
        Self {
            project_id,
            stage_index: stage.index(),
            step_name: stage.display_name().to_string(),
            percent,
        }
    }

    /// Terminal event for a finished pipeline.
    pub fn finished(project_id: ProjectId) -> Self {
        Self {
            project_id,
            stage_index: TOTAL_STAGES,
            step_name: "Completed".to_string(),
            percent: 100,
        }
    }
}

/// Callback receiving progress events.
pub type ProgressSink = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// A sink that drops every event, for callers that do not track progress.
pub fn null_sink() -> ProgressSink {
    Arc::new(|_| {})
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_at_boundaries() {
        let id = ProjectId::from_string("p");
        assert_eq!(ProgressEvent::entering(id.clone(), StageId::Outline).percent, 0);
        assert_eq!(ProgressEvent::entering(id.clone(), StageId::Title).percent, 50);
        assert_eq!(ProgressEvent::entering(id.clone(), StageId::Video).percent, 83);
        assert_eq!(ProgressEvent::finished(id).percent, 100);
    }
}
