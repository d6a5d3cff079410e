//! Writer stage: research brief to long-form draft.

use super::{run_generation, Prompt, Stage, StageContext};
use crate::config::GenerationParams;
use crate::core::{StageName, StageResult};
use crate::errors::StageError;
use crate::llm::{GenerationRequest, TextGenerator};
use async_trait::async_trait;
use std::sync::Arc;

const SYSTEM_PROMPT: &str = "You are an expert content writer specialized in creating \
high-quality, engaging and informative content. Your role is to:

1. Turn research data into compelling, well-structured content
2. Adapt the writing style to the target audience and requirements
3. Keep the content accurate, engaging and actionable
4. Create a clear, logical flow with proper structure and formatting
5. Optimize the content for readability and comprehension

Prioritize clarity, accuracy and engagement. Use the research data to support your points.";

const DEFAULT_REQUIREMENTS: &str = "Create comprehensive, informative content";

/// Drafts content from the research brief.
pub struct WriterStage {
    generator: Arc<dyn TextGenerator>,
    params: GenerationParams,
}

impl WriterStage {
    /// Creates a writer stage with default generation parameters.
    #[must_use]
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            generator,
            params: GenerationParams::writer(),
        }
    }

    /// Sets the generation parameters.
    #[must_use]
    pub fn with_params(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }
}

impl std::fmt::Debug for WriterStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriterStage")
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Stage for WriterStage {
    fn name(&self) -> StageName {
        StageName::Writer
    }

    fn build_prompt(&self, ctx: &StageContext<'_>) -> Result<Prompt, StageError> {
        let config = &ctx.task.writer;
        config
            .validate()
            .map_err(|e| StageError::config(self.name(), e))?;
        let research = ctx.require_previous(self.name(), StageName::Research)?;

        let user = format!(
            "Create high-quality content based on the following research data.\n\n\
             RESEARCH DATA:\n{research}\n\n\
             REQUIREMENTS:\n{requirements}\n\n\
             WRITING STYLE: {style}\n{guide}\n\n\
             TARGET LENGTH: about {words} words\n\n\
             Create well-structured content that:\n\
             1. Uses the research data effectively\n\
             2. Follows the specified writing style\n\
             3. Meets the stated requirements\n\
             4. Is engaging and informative\n\
             5. Has clear headings and organization\n\
             6. Includes actionable insights where appropriate\n\n\
             Format the content in markdown with headings, bullet points and emphasis.",
            research = research.content,
            requirements = ctx.task.requirements().unwrap_or(DEFAULT_REQUIREMENTS),
            style = config.style,
            guide = config.style.guide(),
            words = config.target_words,
        );

        Ok(Prompt::new(SYSTEM_PROMPT, user))
    }

    async fn execute(&self, ctx: &StageContext<'_>) -> Result<StageResult, StageError> {
        let prompt = self.build_prompt(ctx)?;
        let config = &ctx.task.writer;
        let request = GenerationRequest::new(prompt, &self.params);

        let result = run_generation(self.name(), self.generator.as_ref(), &request).await?;
        let words = result.word_count();
        Ok(result
            .add_metadata("style", serde_json::json!(config.style))
            .add_metadata("target_words", serde_json::json!(config.target_words))
            .add_metadata("word_count", serde_json::json!(words)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{WriterConfig, WritingStyle};
    use crate::core::Task;
    use crate::llm::{GenerationResponse, MockTextGenerator};
    use chrono::Utc;

    fn brief() -> StageResult {
        StageResult::completed(StageName::Research, Utc::now(), "BRIEF")
    }

    #[test]
    fn test_prompt_includes_brief_and_style_guide() {
        let task = Task::new("topic")
            .with_requirements("under 200 words")
            .with_writer(WriterConfig::new().with_style(WritingStyle::Casual).with_target_words(200));
        let research = brief();
        let ctx = StageContext::new(&task).with_previous(&research);

        let prompt = WriterStage::new(Arc::new(MockTextGenerator::new()))
            .build_prompt(&ctx)
            .unwrap();

        assert!(prompt.user.contains("RESEARCH DATA:\nBRIEF"));
        assert!(prompt.user.contains("under 200 words"));
        assert!(prompt.user.contains("WRITING STYLE: Casual"));
        assert!(prompt.user.contains(WritingStyle::Casual.guide()));
        assert!(prompt.user.contains("about 200 words"));
    }

    #[test]
    fn test_default_requirements_line() {
        let task = Task::new("topic");
        let research = brief();
        let prompt = WriterStage::new(Arc::new(MockTextGenerator::new()))
            .build_prompt(&StageContext::new(&task).with_previous(&research))
            .unwrap();

        assert!(prompt.user.contains(DEFAULT_REQUIREMENTS));
    }

    #[tokio::test]
    async fn test_requires_research_result() {
        let mut mock = MockTextGenerator::new();
        mock.expect_generate().times(0);

        let task = Task::new("topic");
        let err = WriterStage::new(Arc::new(mock))
            .execute(&StageContext::new(&task))
            .await
            .unwrap_err();

        assert!(matches!(err, StageError::Precondition { stage: StageName::Writer, .. }));
    }

    #[tokio::test]
    async fn test_zero_target_words_is_config_error() {
        let task = Task::new("topic").with_writer(WriterConfig::new().with_target_words(0));
        let research = brief();
        let err = WriterStage::new(Arc::new(MockTextGenerator::new()))
            .execute(&StageContext::new(&task).with_previous(&research))
            .await
            .unwrap_err();

        assert!(matches!(err, StageError::Config { stage: StageName::Writer, .. }));
    }

    #[tokio::test]
    async fn test_execute_records_word_count() {
        let mut mock = MockTextGenerator::new();
        mock.expect_generate()
            .times(1)
            .returning(|_| Ok(GenerationResponse::text("one two three")));

        let task = Task::new("topic");
        let research = brief();
        let result = WriterStage::new(Arc::new(mock))
            .execute(&StageContext::new(&task).with_previous(&research))
            .await
            .unwrap();

        assert_eq!(result.content, "one two three");
        assert_eq!(result.metadata_value("word_count"), Some(&serde_json::json!(3)));
        assert_eq!(result.metadata_value("style"), Some(&serde_json::json!("professional")));
    }
}
