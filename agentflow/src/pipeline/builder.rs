//! Pipeline builder with validation.

use super::Pipeline;
use crate::config::PipelineConfig;
use crate::core::StageName;
use crate::errors::ConfigError;
use crate::events::{NoOpObserver, RunObserver};
use crate::llm::{RetryingGenerator, TextGenerator};
use crate::stages::{ResearchStage, ReviewerStage, Stage, WriterStage};
use std::sync::Arc;
use std::time::Duration;

/// Builder for a [`Pipeline`].
///
/// Either supply a generator, from which the three default stages are built,
/// or supply each stage explicitly. Explicit stages take precedence.
#[derive(Default)]
pub struct PipelineBuilder {
    generator: Option<Arc<dyn TextGenerator>>,
    research: Option<Arc<dyn Stage>>,
    writer: Option<Arc<dyn Stage>>,
    reviewer: Option<Arc<dyn Stage>>,
    observer: Option<Arc<dyn RunObserver>>,
    config: PipelineConfig,
}

impl std::fmt::Debug for PipelineBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineBuilder")
            .field("has_generator", &self.generator.is_some())
            .field("research", &self.research)
            .field("writer", &self.writer)
            .field("reviewer", &self.reviewer)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl PipelineBuilder {
    /// Creates a new pipeline builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the generator shared by the default stages.
    #[must_use]
    pub fn generator(mut self, generator: Arc<dyn TextGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Overrides the research stage.
    #[must_use]
    pub fn research_stage(mut self, stage: Arc<dyn Stage>) -> Self {
        self.research = Some(stage);
        self
    }

    /// Overrides the writer stage.
    #[must_use]
    pub fn writer_stage(mut self, stage: Arc<dyn Stage>) -> Self {
        self.writer = Some(stage);
        self
    }

    /// Overrides the reviewer stage.
    #[must_use]
    pub fn reviewer_stage(mut self, stage: Arc<dyn Stage>) -> Self {
        self.reviewer = Some(stage);
        self
    }

    /// Sets the observer.
    #[must_use]
    pub fn observer(mut self, observer: Arc<dyn RunObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Sets the per-stage timeout; `None` waits indefinitely.
    #[must_use]
    pub fn stage_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config = self.config.with_stage_timeout(timeout);
        self
    }

    /// Applies a full configuration: generation parameters for the default
    /// stages, the stage timeout and the retry policy.
    #[must_use]
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Validates the configuration and builds the pipeline.
    pub fn build(self) -> Result<Pipeline, ConfigError> {
        self.config.validate()?;

        let generator = self.generator.map(|generator| match &self.config.retry {
            Some(retry) => {
                Arc::new(RetryingGenerator::new(generator, retry.clone())) as Arc<dyn TextGenerator>
            }
            None => generator,
        });

        let research = resolve(self.research, StageName::Research, generator.as_ref(), |g| {
            Arc::new(ResearchStage::new(g).with_params(self.config.research.clone())) as Arc<dyn Stage>
        })?;
        let writer = resolve(self.writer, StageName::Writer, generator.as_ref(), |g| {
            Arc::new(WriterStage::new(g).with_params(self.config.writer.clone())) as Arc<dyn Stage>
        })?;
        let reviewer = resolve(self.reviewer, StageName::Reviewer, generator.as_ref(), |g| {
            Arc::new(ReviewerStage::new(g).with_params(self.config.reviewer.clone())) as Arc<dyn Stage>
        })?;

        Ok(Pipeline {
            research,
            writer,
            reviewer,
            observer: self.observer.unwrap_or_else(|| Arc::new(NoOpObserver)),
            stage_timeout: self.config.stage_timeout(),
        })
    }
}

fn resolve<F>(
    explicit: Option<Arc<dyn Stage>>,
    slot: StageName,
    generator: Option<&Arc<dyn TextGenerator>>,
    default: F,
) -> Result<Arc<dyn Stage>, ConfigError>
where
    F: FnOnce(Arc<dyn TextGenerator>) -> Arc<dyn Stage>,
{
    let stage = match (explicit, generator) {
        (Some(stage), _) => stage,
        (None, Some(generator)) => default(Arc::clone(generator)),
        (None, None) => {
            return Err(ConfigError::invalid(
                "generator",
                format!("no generator or explicit {slot} stage supplied"),
            ))
        }
    };
    if stage.name() != slot {
        return Err(ConfigError::invalid(
            "stages",
            format!("{} stage supplied for the {slot} slot", stage.name()),
        ));
    }
    Ok(stage)
}
