//! The task submitted to a pipeline run.

use crate::config::{ResearchConfig, ReviewerConfig, WriterConfig};
use serde::{Deserialize, Serialize};

/// A unit of work for the pipeline: what to research and write about, plus
/// the configuration each stage reads.
///
/// Tasks are immutable once submitted; the driver holds them behind the run.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Task {
    /// What to research and write about.
    pub description: String,
    /// Additional requirements for the content; may be empty.
    #[serde(default)]
    pub requirements: String,
    /// Research stage configuration.
    #[serde(default)]
    pub research: ResearchConfig,
    /// Writer stage configuration.
    #[serde(default)]
    pub writer: WriterConfig,
    /// Reviewer stage configuration.
    #[serde(default)]
    pub reviewer: ReviewerConfig,
}

impl Task {
    /// Creates a task with default stage configuration.
    #[must_use]
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..Default::default()
        }
    }

    /// Sets the requirements.
    #[must_use]
    pub fn with_requirements(mut self, requirements: impl Into<String>) -> Self {
        self.requirements = requirements.into();
        self
    }

    /// Sets the research configuration.
    #[must_use]
    pub fn with_research(mut self, research: ResearchConfig) -> Self {
        self.research = research;
        self
    }

    /// Sets the writer configuration.
    #[must_use]
    pub fn with_writer(mut self, writer: WriterConfig) -> Self {
        self.writer = writer;
        self
    }

    /// Sets the reviewer configuration.
    #[must_use]
    pub fn with_reviewer(mut self, reviewer: ReviewerConfig) -> Self {
        self.reviewer = reviewer;
        self
    }

    /// Returns the requirements, or `None` if blank.
    #[must_use]
    pub fn requirements(&self) -> Option<&str> {
        let trimmed = self.requirements.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WritingStyle;

    #[test]
    fn test_task_builder() {
        let task = Task::new("Summarize benefits of solar energy")
            .with_requirements("under 200 words")
            .with_writer(WriterConfig::new().with_style(WritingStyle::Casual));

        assert_eq!(task.description, "Summarize benefits of solar energy");
        assert_eq!(task.requirements(), Some("under 200 words"));
        assert_eq!(task.writer.style, WritingStyle::Casual);
        assert_eq!(task.research, ResearchConfig::default());
    }

    #[test]
    fn test_blank_requirements() {
        let task = Task::new("topic").with_requirements("   ");
        assert_eq!(task.requirements(), None);
    }

    #[test]
    fn test_task_deserialize_defaults() {
        let task: Task = serde_json::from_str(r#"{"description": "topic"}"#).unwrap();
        assert_eq!(task.description, "topic");
        assert!(task.requirements.is_empty());
        assert_eq!(task.reviewer, ReviewerConfig::default());
    }
}
