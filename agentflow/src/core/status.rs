//! Stage names, stage status and the run status state machine.

use crate::errors::ErrorKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// The three stages of the pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageName {
    /// Turns the task into a research brief.
    Research,
    /// Turns the research brief into long-form content.
    Writer,
    /// Assesses the written content and proposes an improved version.
    Reviewer,
}

impl StageName {
    /// All stages in execution order.
    pub const ALL: [Self; 3] = [Self::Research, Self::Writer, Self::Reviewer];

    /// Position of the stage in the pipeline.
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Self::Research => 0,
            Self::Writer => 1,
            Self::Reviewer => 2,
        }
    }

    /// The stage whose result this stage consumes.
    #[must_use]
    pub fn predecessor(self) -> Option<Self> {
        match self {
            Self::Research => None,
            Self::Writer => Some(Self::Research),
            Self::Reviewer => Some(Self::Writer),
        }
    }

    /// The run status while this stage is in progress.
    #[must_use]
    pub fn running_status(self) -> RunStatus {
        match self {
            Self::Research => RunStatus::Researching,
            Self::Writer => RunStatus::Writing,
            Self::Reviewer => RunStatus::Reviewing,
        }
    }

    /// Human readable label used in rendered reports.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Research => "Research Agent",
            Self::Writer => "Writer Agent",
            Self::Reviewer => "Reviewer Agent",
        }
    }
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Research => write!(f, "research"),
            Self::Writer => write!(f, "writer"),
            Self::Reviewer => write!(f, "reviewer"),
        }
    }
}

/// Outcome flag carried by a stage result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    /// Stage completed successfully.
    Completed,
    /// Stage failed.
    Failed,
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Status of a pipeline run.
///
/// `Pending → Researching → Writing → Reviewing → Complete`, with a side
/// transition to `Failed` from any non-terminal state.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RunStatus {
    /// Submitted, no stage started yet.
    #[default]
    Pending,
    /// The research stage is in progress.
    Researching,
    /// The writer stage is in progress.
    Writing,
    /// The reviewer stage is in progress.
    Reviewing,
    /// All three stages completed successfully.
    Complete,
    /// The run halted at `stage`.
    Failed {
        /// The stage that failed.
        stage: StageName,
        /// The failure kind.
        kind: ErrorKind,
        /// The failure message.
        message: String,
    },
}

impl RunStatus {
    /// Returns true if no further transition is possible.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Failed { .. })
    }

    /// Returns true if the run failed.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// The stage in progress, if any.
    #[must_use]
    pub fn active_stage(&self) -> Option<StageName> {
        match self {
            Self::Researching => Some(StageName::Research),
            Self::Writing => Some(StageName::Writer),
            Self::Reviewing => Some(StageName::Reviewer),
            Self::Pending | Self::Complete | Self::Failed { .. } => None,
        }
    }

    /// The stage a failed run halted at.
    #[must_use]
    pub fn failed_stage(&self) -> Option<StageName> {
        match self {
            Self::Failed { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Returns true if moving from `self` to `next` is a legal transition.
    ///
    /// A failure must be attributed to the stage in progress; a run that
    /// fails before starting is attributed to the research stage.
    #[must_use]
    pub fn can_transition_to(&self, next: &Self) -> bool {
        match (self, next) {
            (Self::Pending, Self::Researching)
            | (Self::Researching, Self::Writing)
            | (Self::Writing, Self::Reviewing)
            | (Self::Reviewing, Self::Complete) => true,
            (Self::Pending, Self::Failed { stage, .. }) => *stage == StageName::Research,
            (current, Self::Failed { stage, .. }) => current.active_stage() == Some(*stage),
            _ => false,
        }
    }

    /// Short name of the state without failure details.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Researching => "researching",
            Self::Writing => "writing",
            Self::Reviewing => "reviewing",
            Self::Complete => "complete",
            Self::Failed { .. } => "failed",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed {
                stage,
                kind,
                message,
            } => write!(f, "failed at {stage} ({kind}): {message}"),
            other => write!(f, "{}", other.as_str()),
        }
    }
}

/// Error returned when a run status transition is not allowed.
#[derive(Debug, Clone, Error)]
#[error("invalid run transition from {} to {}", from.as_str(), to.as_str())]
pub struct InvalidTransition {
    /// The current status.
    pub from: RunStatus,
    /// The rejected target status.
    pub to: RunStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failed(stage: StageName) -> RunStatus {
        RunStatus::Failed {
            stage,
            kind: ErrorKind::Generation,
            message: "boom".to_string(),
        }
    }

    #[test]
    fn test_stage_name_order() {
        assert_eq!(StageName::ALL.map(StageName::index), [0, 1, 2]);
        assert_eq!(StageName::Research.predecessor(), None);
        assert_eq!(StageName::Writer.predecessor(), Some(StageName::Research));
        assert_eq!(StageName::Reviewer.predecessor(), Some(StageName::Writer));
    }

    #[test]
    fn test_stage_name_display() {
        assert_eq!(StageName::Research.to_string(), "research");
        assert_eq!(StageName::Writer.to_string(), "writer");
        assert_eq!(StageName::Reviewer.to_string(), "reviewer");
    }

    #[test]
    fn test_happy_path_transitions() {
        let path = [
            RunStatus::Pending,
            RunStatus::Researching,
            RunStatus::Writing,
            RunStatus::Reviewing,
            RunStatus::Complete,
        ];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(&pair[1]), "{:?} -> {:?}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_failure_must_match_active_stage() {
        assert!(RunStatus::Writing.can_transition_to(&failed(StageName::Writer)));
        assert!(!RunStatus::Writing.can_transition_to(&failed(StageName::Reviewer)));
        assert!(RunStatus::Pending.can_transition_to(&failed(StageName::Research)));
        assert!(!RunStatus::Pending.can_transition_to(&failed(StageName::Writer)));
    }

    #[test]
    fn test_terminal_states_reject_transitions() {
        assert!(RunStatus::Complete.is_terminal());
        assert!(failed(StageName::Research).is_terminal());
        assert!(!RunStatus::Complete.can_transition_to(&failed(StageName::Reviewer)));
        assert!(!failed(StageName::Research).can_transition_to(&RunStatus::Researching));
    }

    #[test]
    fn test_no_skipping_stages() {
        assert!(!RunStatus::Pending.can_transition_to(&RunStatus::Writing));
        assert!(!RunStatus::Researching.can_transition_to(&RunStatus::Complete));
        assert!(!RunStatus::Reviewing.can_transition_to(&RunStatus::Researching));
    }

    #[test]
    fn test_run_status_serialize() {
        let json = serde_json::to_value(failed(StageName::Writer)).unwrap();
        assert_eq!(json["state"], "failed");
        assert_eq!(json["stage"], "writer");
        assert_eq!(json["kind"], "generation");

        let json = serde_json::to_string(&RunStatus::Reviewing).unwrap();
        assert_eq!(json, r#"{"state":"reviewing"}"#);
    }

    #[test]
    fn test_run_status_display() {
        assert_eq!(RunStatus::Writing.to_string(), "writing");
        assert_eq!(
            failed(StageName::Reviewer).to_string(),
            "failed at reviewer (generation): boom"
        );
    }
}
