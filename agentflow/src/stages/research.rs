//! Research stage: task description to research brief.

use super::{run_generation, Prompt, Stage, StageContext};
use crate::config::{GenerationParams, ResearchConfig};
use crate::core::{StageName, StageResult};
use crate::errors::{ConfigError, StageError};
use crate::llm::{GenerationRequest, TextGenerator};
use async_trait::async_trait;
use std::fmt::Write as _;
use std::sync::Arc;

const SYSTEM_PROMPT: &str = "You are an expert research agent specialized in gathering, analyzing \
and synthesizing information. Your role is to:

1. Research the given topic thoroughly
2. Analyze and cross-check information from multiple angles
3. Synthesize findings into a comprehensive, well-structured report
4. Identify key trends, statistics and insights
5. Provide actionable recommendations based on the research

Be thorough and accurate, and explain your reasoning. Focus on current, relevant information and \
emerging trends.";

const DEFAULT_REQUIREMENTS: &str = "No additional requirements";

/// Produces a research brief for the task.
pub struct ResearchStage {
    generator: Arc<dyn TextGenerator>,
    params: GenerationParams,
}

impl ResearchStage {
    /// Creates a research stage with default generation parameters.
    #[must_use]
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            generator,
            params: GenerationParams::research(),
        }
    }

    /// Sets the generation parameters.
    #[must_use]
    pub fn with_params(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }

    /// Generation parameters for a given depth: `max_tokens` scales from
    /// 60% of the configured value at depth 1 to 150% at depth 10.
    #[must_use]
    pub fn params_for(&self, config: &ResearchConfig) -> GenerationParams {
        let scale = 50 + 10 * u64::from(config.depth.min(10));
        let scaled = u64::from(self.params.max_tokens) * scale / 100;
        self.params
            .clone()
            .with_max_tokens(u32::try_from(scaled).unwrap_or(u32::MAX).max(1))
    }
}

impl std::fmt::Debug for ResearchStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResearchStage")
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Stage for ResearchStage {
    fn name(&self) -> StageName {
        StageName::Research
    }

    fn build_prompt(&self, ctx: &StageContext<'_>) -> Result<Prompt, StageError> {
        let task = ctx.task;
        let config = &task.research;
        let topic = task.description.trim();
        if topic.is_empty() {
            return Err(StageError::config(
                self.name(),
                ConfigError::invalid("description", "must not be blank"),
            ));
        }
        config
            .validate()
            .map_err(|e| StageError::config(self.name(), e))?;

        let mut user = format!(
            "Research the following topic and write a comprehensive research report.\n\n\
             TOPIC: {topic}\n\n\
             REQUIREMENTS:\n{}\n\n\
             RESEARCH DEPTH: {}/10\n",
            task.requirements().unwrap_or(DEFAULT_REQUIREMENTS),
            config.depth,
        );

        if !config.focus_areas.is_empty() {
            user.push_str("\nFOCUS AREAS:\n");
            for area in &config.focus_areas {
                let _ = writeln!(user, "- {area}");
            }
        }

        user.push_str(
            "\nStructure the report with these sections:\n\
             1. Executive Summary\n\
             2. Key Findings\n\
             3. Statistical Insights\n\
             4. Current Trends and Patterns\n\
             5. Challenges and Opportunities\n\
             6. Actionable Recommendations\n\
             7. Sources and Methodology\n\n\
             Format the report in clear markdown with headings and bullet points.",
        );

        Ok(Prompt::new(SYSTEM_PROMPT, user))
    }

    async fn execute(&self, ctx: &StageContext<'_>) -> Result<StageResult, StageError> {
        let prompt = self.build_prompt(ctx)?;
        let config = &ctx.task.research;
        let request = GenerationRequest::new(prompt, &self.params_for(config));

        let result = run_generation(self.name(), self.generator.as_ref(), &request).await?;
        Ok(result
            .add_metadata("depth", serde_json::json!(config.depth))
            .add_metadata("focus_areas", serde_json::json!(config.focus_areas)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Task;
    use crate::llm::{GenerationResponse, MockTextGenerator};

    fn stage_with(mock: MockTextGenerator) -> ResearchStage {
        ResearchStage::new(Arc::new(mock))
    }

    #[test]
    fn test_prompt_contents() {
        let task = Task::new("Summarize benefits of solar energy")
            .with_requirements("under 200 words")
            .with_research(ResearchConfig::new().with_depth(8).with_focus_area("costs"));
        let prompt = stage_with(MockTextGenerator::new())
            .build_prompt(&StageContext::new(&task))
            .unwrap();

        assert!(prompt.system.contains("research agent"));
        assert!(prompt.user.contains("TOPIC: Summarize benefits of solar energy"));
        assert!(prompt.user.contains("under 200 words"));
        assert!(prompt.user.contains("RESEARCH DEPTH: 8/10"));
        assert!(prompt.user.contains("- costs"));
        assert!(prompt.user.contains("Executive Summary"));
    }

    #[test]
    fn test_prompt_default_requirements() {
        let task = Task::new("topic");
        let prompt = stage_with(MockTextGenerator::new())
            .build_prompt(&StageContext::new(&task))
            .unwrap();

        assert!(prompt.user.contains(DEFAULT_REQUIREMENTS));
        assert!(!prompt.user.contains("FOCUS AREAS"));
    }

    #[test]
    fn test_blank_description_is_config_error() {
        let task = Task::new("   ");
        let err = stage_with(MockTextGenerator::new())
            .build_prompt(&StageContext::new(&task))
            .unwrap_err();

        assert!(matches!(err, StageError::Config { stage: StageName::Research, .. }));
    }

    #[test]
    fn test_depth_scales_max_tokens() {
        let stage = stage_with(MockTextGenerator::new());
        let tokens = |depth| stage.params_for(&ResearchConfig::new().with_depth(depth)).max_tokens;

        assert_eq!(tokens(5), 1500);
        assert_eq!(tokens(1), 900);
        assert_eq!(tokens(10), 2250);
    }

    #[tokio::test]
    async fn test_invalid_depth_never_calls_generator() {
        let mut mock = MockTextGenerator::new();
        mock.expect_generate().times(0);

        let task = Task::new("topic").with_research(ResearchConfig::new().with_depth(11));
        let err = stage_with(mock)
            .execute(&StageContext::new(&task))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            StageError::Config {
                stage: StageName::Research,
                source: ConfigError::OutOfRange { field: "depth", .. }
            }
        ));
    }

    #[tokio::test]
    async fn test_execute_records_metadata() {
        let mut mock = MockTextGenerator::new();
        mock.expect_generate()
            .withf(|req| req.max_tokens == 1500 && req.prompt.contains("TOPIC: topic"))
            .times(1)
            .returning(|_| Ok(GenerationResponse::text("BRIEF")));

        let task = Task::new("topic");
        let result = stage_with(mock)
            .execute(&StageContext::new(&task))
            .await
            .unwrap();

        assert_eq!(result.stage, StageName::Research);
        assert_eq!(result.content, "BRIEF");
        assert_eq!(result.metadata_value("depth"), Some(&serde_json::json!(5)));
    }
}
