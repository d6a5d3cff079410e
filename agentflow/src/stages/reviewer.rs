//! Reviewer stage: draft to assessment and improved version.

use super::{run_generation, Prompt, ReviewAssessment, Stage, StageContext};
use crate::config::GenerationParams;
use crate::core::{StageName, StageResult};
use crate::errors::StageError;
use crate::llm::{GenerationRequest, TextGenerator};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

const SYSTEM_PROMPT: &str = "You are an expert content reviewer and quality assurance \
specialist. Your role is to:

1. Analyze content for accuracy, clarity and effectiveness
2. Identify improvements in structure, flow and readability
3. Check factual accuracy and logical consistency
4. Give constructive feedback with specific suggestions
5. Make sure the content meets professional standards

Be thorough, constructive and specific. Cover both strengths and areas for improvement.";

/// Reviews the draft and proposes an improved version.
pub struct ReviewerStage {
    generator: Arc<dyn TextGenerator>,
    params: GenerationParams,
}

impl ReviewerStage {
    /// Creates a reviewer stage with default generation parameters.
    #[must_use]
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            generator,
            params: GenerationParams::reviewer(),
        }
    }

    /// Sets the generation parameters.
    #[must_use]
    pub fn with_params(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }
}

impl std::fmt::Debug for ReviewerStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReviewerStage")
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Stage for ReviewerStage {
    fn name(&self) -> StageName {
        StageName::Reviewer
    }

    fn build_prompt(&self, ctx: &StageContext<'_>) -> Result<Prompt, StageError> {
        let config = &ctx.task.reviewer;
        config
            .validate()
            .map_err(|e| StageError::config(self.name(), e))?;
        let draft = ctx.require_previous(self.name(), StageName::Writer)?;

        let user = format!(
            "Review the following content.\n\n\
             CONTENT TO REVIEW:\n{content}\n\n\
             REVIEW CRITERIA: {criteria}\n{guide}\n\n\
             STRICTNESS LEVEL: {strictness}/10\n{guidance}\n\n\
             Structure the review as follows:\n\
             1. **Overall Assessment** (Score: X/10)\n\
             2. **Strengths** - what works well\n\
             3. **Areas for Improvement** - specific issues and suggestions\n\
             4. **Specific Recommendations** - actionable improvements\n\
             5. **Final Verdict** - ready for publication, needs minor revisions, or needs major revisions\n\
             6. **Improved Version** - the full content with your recommendations applied\n\n\
             Be specific and constructive, and give examples where helpful.",
            content = draft.content,
            criteria = config.criteria,
            guide = config.criteria.guide(),
            strictness = config.strictness,
            guidance = config.strictness_guidance(),
        );

        Ok(Prompt::new(SYSTEM_PROMPT, user))
    }

    async fn execute(&self, ctx: &StageContext<'_>) -> Result<StageResult, StageError> {
        let prompt = self.build_prompt(ctx)?;
        let config = &ctx.task.reviewer;
        let request = GenerationRequest::new(prompt, &self.params);

        let result = run_generation(self.name(), self.generator.as_ref(), &request).await?;
        let assessment = ReviewAssessment::parse(&result.content);
        debug!(
            score = assessment.score,
            verdict = %assessment.verdict,
            has_improved_version = assessment.improved_version.is_some(),
            "Parsed review"
        );

        Ok(result
            .add_metadata("criteria", serde_json::json!(config.criteria))
            .add_metadata("strictness", serde_json::json!(config.strictness))
            .add_metadata("assessment", serde_json::json!(assessment)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ReviewCriteria, ReviewerConfig};
    use crate::core::Task;
    use crate::llm::{GenerationResponse, MockTextGenerator};
    use crate::stages::Verdict;
    use chrono::Utc;

    fn draft() -> StageResult {
        StageResult::completed(StageName::Writer, Utc::now(), "DRAFT")
    }

    #[test]
    fn test_prompt_includes_criteria_and_strictness() {
        let task = Task::new("topic").with_reviewer(
            ReviewerConfig::new()
                .with_criteria(ReviewCriteria::Accuracy)
                .with_strictness(9),
        );
        let writer = draft();
        let prompt = ReviewerStage::new(Arc::new(MockTextGenerator::new()))
            .build_prompt(&StageContext::new(&task).with_previous(&writer))
            .unwrap();

        assert!(prompt.user.contains("CONTENT TO REVIEW:\nDRAFT"));
        assert!(prompt.user.contains("REVIEW CRITERIA: accuracy"));
        assert!(prompt.user.contains(ReviewCriteria::Accuracy.guide()));
        assert!(prompt.user.contains("STRICTNESS LEVEL: 9/10"));
        assert!(prompt.user.contains("extremely thorough"));
        assert!(prompt.user.contains("Score: X/10"));
    }

    #[test]
    fn test_rejects_research_result_as_input() {
        let task = Task::new("topic");
        let research = StageResult::completed(StageName::Research, Utc::now(), "BRIEF");
        let err = ReviewerStage::new(Arc::new(MockTextGenerator::new()))
            .build_prompt(&StageContext::new(&task).with_previous(&research))
            .unwrap_err();

        assert!(matches!(err, StageError::Precondition { stage: StageName::Reviewer, .. }));
    }

    #[test]
    fn test_strictness_out_of_range() {
        let task = Task::new("topic").with_reviewer(ReviewerConfig::new().with_strictness(0));
        let writer = draft();
        let err = ReviewerStage::new(Arc::new(MockTextGenerator::new()))
            .build_prompt(&StageContext::new(&task).with_previous(&writer))
            .unwrap_err();

        assert!(matches!(err, StageError::Config { stage: StageName::Reviewer, .. }));
    }

    #[tokio::test]
    async fn test_execute_stores_assessment() {
        let mut mock = MockTextGenerator::new();
        mock.expect_generate().times(1).returning(|_| {
            Ok(GenerationResponse::text(
                "Overall Assessment (Score: 9/10)\n\nFinal Verdict: Ready for publication.",
            ))
        });

        let task = Task::new("topic");
        let writer = draft();
        let result = ReviewerStage::new(Arc::new(mock))
            .execute(&StageContext::new(&task).with_previous(&writer))
            .await
            .unwrap();

        let assessment: ReviewAssessment =
            serde_json::from_value(result.metadata_value("assessment").cloned().unwrap()).unwrap();
        assert_eq!(assessment.score, Some(9.0));
        assert_eq!(assessment.verdict, Verdict::ReadyToPublish);
        assert_eq!(result.metadata_value("strictness"), Some(&serde_json::json!(7)));
    }
}
