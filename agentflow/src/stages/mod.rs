//! Stage trait and the three pipeline stages.
//!
//! Each stage turns its input into exactly one generation call. Prompt
//! construction is a pure function of the [`StageContext`]; configuration is
//! validated there, so invalid input never reaches the generator.

mod assessment;
mod research;
mod reviewer;
mod writer;

pub use assessment::{ReviewAssessment, Verdict};
pub use research::ResearchStage;
pub use reviewer::ReviewerStage;
pub use writer::WriterStage;

use crate::core::{StageName, StageResult, Task};
use crate::errors::{GenerationError, StageError};
use crate::llm::{GenerationRequest, TextGenerator};
use async_trait::async_trait;
use chrono::Utc;
use std::fmt::Debug;
use std::time::Instant;
use tracing::{debug, info};

/// A system instruction and user prompt pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    /// System instruction describing the stage's role.
    pub system: String,
    /// The user prompt.
    pub user: String,
}

impl Prompt {
    /// Creates a prompt.
    #[must_use]
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
        }
    }
}

/// Input handed to a stage: the task and the predecessor's result.
#[derive(Debug, Clone, Copy)]
pub struct StageContext<'a> {
    /// The task being processed.
    pub task: &'a Task,
    /// The result of the previous stage, if any.
    pub previous: Option<&'a StageResult>,
}

impl<'a> StageContext<'a> {
    /// Creates a context without a predecessor result.
    #[must_use]
    pub fn new(task: &'a Task) -> Self {
        Self {
            task,
            previous: None,
        }
    }

    /// Attaches the predecessor result.
    #[must_use]
    pub fn with_previous(mut self, previous: &'a StageResult) -> Self {
        self.previous = Some(previous);
        self
    }

    /// Returns the predecessor result, checking that it exists, succeeded
    /// and came from `expected`.
    pub fn require_previous(
        &self,
        stage: StageName,
        expected: StageName,
    ) -> Result<&'a StageResult, StageError> {
        let previous = self.previous.ok_or_else(|| {
            StageError::precondition(stage, format!("no {expected} result available"))
        })?;
        if previous.stage != expected {
            return Err(StageError::precondition(
                stage,
                format!("expected a {expected} result, got {}", previous.stage),
            ));
        }
        if !previous.is_success() {
            return Err(StageError::precondition(
                stage,
                format!("{expected} did not complete successfully"),
            ));
        }
        Ok(previous)
    }
}

/// A pipeline stage.
///
/// Stages are stateless with respect to runs; all per-run input arrives in
/// the context.
#[async_trait]
pub trait Stage: Send + Sync + Debug {
    /// Returns the stage name.
    fn name(&self) -> StageName;

    /// Builds the prompt for this stage, validating configuration and the
    /// predecessor result.
    fn build_prompt(&self, ctx: &StageContext<'_>) -> Result<Prompt, StageError>;

    /// Executes the stage: one generation call.
    async fn execute(&self, ctx: &StageContext<'_>) -> Result<StageResult, StageError>;
}

/// Runs a generation call and wraps the response in a completed result.
///
/// Whitespace-only output is an [`GenerationError::EmptyResponse`]; any
/// other text is stored verbatim.
pub(crate) async fn run_generation(
    stage: StageName,
    generator: &dyn TextGenerator,
    request: &GenerationRequest,
) -> Result<StageResult, StageError> {
    let started_at = Utc::now();
    let start = Instant::now();
    debug!(stage = %stage, model = %request.model, max_tokens = request.max_tokens, "Calling generator");

    let response = generator
        .generate(request)
        .await
        .map_err(|e| StageError::generation(stage, e))?;

    if response.text.trim().is_empty() {
        return Err(StageError::generation(stage, GenerationError::EmptyResponse));
    }

    let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
    info!(
        stage = %stage,
        duration_ms,
        input_tokens = response.usage.map(|u| u.input_tokens),
        output_tokens = response.usage.map(|u| u.output_tokens),
        "Stage generated content"
    );

    let model = response.model.unwrap_or_else(|| request.model.clone());
    Ok(StageResult::completed(stage, started_at, response.text)
        .with_model(model)
        .with_usage(response.usage)
        .add_metadata("latency_ms", serde_json::json!(response.latency_ms)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GenerationParams;
    use crate::llm::{GenerationResponse, MockTextGenerator};

    fn request() -> GenerationRequest {
        GenerationRequest::new(Prompt::new("s", "u"), &GenerationParams::default())
    }

    #[test]
    fn test_require_previous_missing() {
        let task = Task::new("topic");
        let ctx = StageContext::new(&task);
        let err = ctx
            .require_previous(StageName::Writer, StageName::Research)
            .unwrap_err();

        assert!(matches!(err, StageError::Precondition { stage: StageName::Writer, .. }));
    }

    #[test]
    fn test_require_previous_wrong_stage_or_failed() {
        let task = Task::new("topic");

        let draft = StageResult::completed(StageName::Writer, Utc::now(), "DRAFT");
        let ctx = StageContext::new(&task).with_previous(&draft);
        assert!(ctx.require_previous(StageName::Writer, StageName::Research).is_err());

        let failed = StageResult::failed(StageName::Research, Utc::now(), "boom");
        let ctx = StageContext::new(&task).with_previous(&failed);
        assert!(ctx.require_previous(StageName::Writer, StageName::Research).is_err());

        let brief = StageResult::completed(StageName::Research, Utc::now(), "BRIEF");
        let ctx = StageContext::new(&task).with_previous(&brief);
        assert_eq!(
            ctx.require_previous(StageName::Writer, StageName::Research)
                .unwrap()
                .content,
            "BRIEF"
        );
    }

    #[tokio::test]
    async fn test_run_generation_keeps_content_verbatim() {
        let mut mock = MockTextGenerator::new();
        mock.expect_generate()
            .times(1)
            .returning(|_| Ok(GenerationResponse::text("  REVIEW: OK\n")));

        let result = run_generation(StageName::Reviewer, &mock, &request()).await.unwrap();

        assert_eq!(result.content, "  REVIEW: OK\n");
        assert_eq!(result.model.as_deref(), Some("gpt-4o-mini"));
        assert!(result.is_success());
    }

    #[tokio::test]
    async fn test_run_generation_rejects_blank_output() {
        let mut mock = MockTextGenerator::new();
        mock.expect_generate()
            .returning(|_| Ok(GenerationResponse::text(" \n\t")));

        let err = run_generation(StageName::Research, &mock, &request()).await.unwrap_err();

        assert!(matches!(
            err,
            StageError::Generation {
                stage: StageName::Research,
                source: GenerationError::EmptyResponse
            }
        ));
    }

    #[tokio::test]
    async fn test_run_generation_wraps_generator_errors() {
        let mut mock = MockTextGenerator::new();
        mock.expect_generate()
            .returning(|_| Err(GenerationError::Request("connection reset".into())));

        let err = run_generation(StageName::Writer, &mock, &request()).await.unwrap_err();

        assert_eq!(err.stage(), StageName::Writer);
        assert!(err.to_string().contains("connection reset"));
    }
}
