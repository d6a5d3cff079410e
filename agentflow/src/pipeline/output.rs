//! What a pipeline run hands back to the caller.

use super::PipelineRun;
use crate::core::{StageName, StageResult};
use crate::errors::{ErrorKind, StageError};
use crate::stages::ReviewAssessment;
use crate::utils::display_timestamp;
use std::collections::HashMap;
use std::fmt::Write as _;
use thiserror::Error;

/// The aggregated output of a completed run.
///
/// Only constructed by the driver once all three stages succeeded.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    run: PipelineRun,
}

impl PipelineOutput {
    pub(crate) fn new(run: PipelineRun) -> Self {
        Self { run }
    }

    /// The completed run.
    #[must_use]
    pub fn run(&self) -> &PipelineRun {
        &self.run
    }

    /// Consumes the output, returning the run.
    #[must_use]
    pub fn into_run(self) -> PipelineRun {
        self.run
    }

    fn stage(&self, stage: StageName) -> &str {
        self.run
            .result(stage)
            .map_or("", |result| result.content.as_str())
    }

    /// The research brief.
    #[must_use]
    pub fn research(&self) -> &str {
        self.stage(StageName::Research)
    }

    /// The draft.
    #[must_use]
    pub fn draft(&self) -> &str {
        self.stage(StageName::Writer)
    }

    /// The review.
    #[must_use]
    pub fn review(&self) -> &str {
        self.stage(StageName::Reviewer)
    }

    /// The three stage contents, in execution order.
    #[must_use]
    pub fn contents(&self) -> Vec<&str> {
        self.run.results().iter().map(|r| r.content.as_str()).collect()
    }

    /// The parsed review assessment.
    #[must_use]
    pub fn assessment(&self) -> ReviewAssessment {
        self.run
            .result(StageName::Reviewer)
            .and_then(|r| r.metadata_value("assessment"))
            .and_then(|value| serde_json::from_value(value.clone()).ok())
            .unwrap_or_else(|| ReviewAssessment::parse(self.review()))
    }

    /// Renders the three stages as one markdown report.
    #[must_use]
    pub fn to_markdown(&self) -> String {
        let task = self.run.task();
        let mut out = format!("# {}\n\n", task.description.trim());
        if let Some(requirements) = task.requirements() {
            let _ = writeln!(out, "*Requirements: {requirements}*\n");
        }

        for result in self.run.results() {
            render_section(&mut out, result, task);
        }

        if let Some(ms) = self.run.duration_ms() {
            let _ = writeln!(out, "---\n*Run {} completed in {ms} ms*", self.run.id());
        }
        out
    }
}

fn render_section(out: &mut String, result: &StageResult, task: &crate::core::Task) {
    let _ = writeln!(out, "## {}\n", result.stage.label());
    let detail = match result.stage {
        StageName::Research => format!("Depth: {}/10", task.research.depth),
        StageName::Writer => format!("Style: {}", task.writer.style),
        StageName::Reviewer => format!(
            "Criteria: {} | Strictness: {}/10",
            task.reviewer.criteria, task.reviewer.strictness
        ),
    };
    let _ = writeln!(
        out,
        "*Generated {} | {detail} | {} words*\n",
        display_timestamp(result.ended_at),
        result.word_count()
    );
    let _ = writeln!(out, "{}\n", result.content.trim_end());
}

/// A run that stopped at a failed stage.
#[derive(Debug, Error)]
#[error("pipeline failed at {stage}: {error}")]
pub struct PipelineFailure {
    /// The stage that failed.
    pub stage: StageName,
    /// The stage error.
    #[source]
    pub error: StageError,
    /// The failed run, including results of the stages that completed.
    pub run: PipelineRun,
}

impl PipelineFailure {
    /// The failure kind.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }

    /// The failure message.
    #[must_use]
    pub fn message(&self) -> String {
        self.error.to_string()
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = self.error.to_dict();
        map.insert("run_id".to_string(), serde_json::json!(self.run.id().to_string()));
        map.insert(
            "completed_stages".to_string(),
            serde_json::json!(self
                .run
                .results()
                .iter()
                .filter(|r| r.is_success())
                .map(|r| r.stage)
                .collect::<Vec<_>>()),
        );
        map
    }
}
