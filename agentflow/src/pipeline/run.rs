//! The state of a single pipeline run.

use crate::core::{InvalidTransition, RunStatus, StageName, StageResult, Task};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// One execution of the pipeline over a task.
///
/// Only the driver mutates a run; callers see it read-only through
/// [`PipelineOutput`](super::PipelineOutput) or
/// [`PipelineFailure`](super::PipelineFailure).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRun {
    id: Uuid,
    task: Arc<Task>,
    status: RunStatus,
    results: Vec<StageResult>,
    created_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
}

impl PipelineRun {
    pub(crate) fn new(task: Arc<Task>) -> Self {
        Self {
            id: Uuid::new_v4(),
            task,
            status: RunStatus::Pending,
            results: Vec::with_capacity(StageName::ALL.len()),
            created_at: Utc::now(),
            finished_at: None,
        }
    }

    /// The run id.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The task being processed.
    #[must_use]
    pub fn task(&self) -> &Task {
        &self.task
    }

    /// The current status.
    #[must_use]
    pub fn status(&self) -> &RunStatus {
        &self.status
    }

    /// Stage results in execution order. A failed run ends with the failed
    /// stage's result.
    #[must_use]
    pub fn results(&self) -> &[StageResult] {
        &self.results
    }

    /// The result for a stage, if it ran.
    #[must_use]
    pub fn result(&self, stage: StageName) -> Option<&StageResult> {
        self.results.iter().find(|r| r.stage == stage)
    }

    /// The most recent result.
    #[must_use]
    pub fn last_result(&self) -> Option<&StageResult> {
        self.results.last()
    }

    /// When the run was created.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// When the run reached a terminal state.
    #[must_use]
    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    /// Total run time in milliseconds, once finished.
    #[must_use]
    pub fn duration_ms(&self) -> Option<i64> {
        self.finished_at
            .map(|end| (end - self.created_at).num_milliseconds())
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("run_id".to_string(), serde_json::json!(self.id.to_string()));
        map.insert("status".to_string(), serde_json::json!(self.status));
        map.insert(
            "stages".to_string(),
            serde_json::json!(self.results.iter().map(|r| r.stage).collect::<Vec<_>>()),
        );
        map.insert(
            "created_at".to_string(),
            serde_json::json!(crate::utils::iso_timestamp(self.created_at)),
        );
        if let Some(ms) = self.duration_ms() {
            map.insert("duration_ms".to_string(), serde_json::json!(ms));
        }
        map
    }

    /// Moves the run to `next`, rejecting illegal transitions.
    pub(crate) fn transition(&mut self, next: RunStatus) -> Result<(), InvalidTransition> {
        if !self.status.can_transition_to(&next) {
            return Err(InvalidTransition {
                from: self.status.clone(),
                to: next,
            });
        }
        self.status = next;
        if self.status.is_terminal() {
            self.finished_at = Some(Utc::now());
        }
        Ok(())
    }

    pub(crate) fn push_result(&mut self, result: StageResult) {
        self.results.push(result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;

    fn run() -> PipelineRun {
        PipelineRun::new(Arc::new(Task::new("topic")))
    }

    #[test]
    fn test_new_run_is_pending() {
        let run = run();
        assert_eq!(run.status(), &RunStatus::Pending);
        assert!(run.results().is_empty());
        assert!(run.finished_at().is_none());
        assert_eq!(run.id().get_version_num(), 4);
    }

    #[test]
    fn test_transition_sets_finished_at_on_terminal() {
        let mut run = run();
        run.transition(RunStatus::Researching).unwrap();
        assert!(run.finished_at().is_none());

        run.transition(RunStatus::Failed {
            stage: StageName::Research,
            kind: ErrorKind::Generation,
            message: "boom".into(),
        })
        .unwrap();
        assert!(run.finished_at().is_some());
        assert!(run.duration_ms().is_some());
    }

    #[test]
    fn test_invalid_transition_leaves_status() {
        let mut run = run();
        let err = run.transition(RunStatus::Reviewing).unwrap_err();

        assert_eq!(err.from, RunStatus::Pending);
        assert_eq!(run.status(), &RunStatus::Pending);
        assert_eq!(err.to_string(), "invalid run transition from pending to reviewing");
    }

    #[test]
    fn test_result_lookup() {
        let mut run = run();
        run.push_result(StageResult::completed(StageName::Research, Utc::now(), "BRIEF"));

        assert_eq!(run.result(StageName::Research).map(|r| r.content.as_str()), Some("BRIEF"));
        assert!(run.result(StageName::Writer).is_none());
        assert_eq!(run.last_result().map(|r| r.stage), Some(StageName::Research));
    }

    #[test]
    fn test_to_dict() {
        let run = run();
        let dict = run.to_dict();
        assert_eq!(dict.get("status").unwrap()["state"], "pending");
        assert!(dict.contains_key("run_id"));
        assert!(!dict.contains_key("duration_ms"));
    }
}
