//! The result a stage produces.

use super::{StageName, StageStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Token usage reported by the generation capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Prompt tokens.
    pub input_tokens: u32,
    /// Completion tokens.
    pub output_tokens: u32,
}

impl TokenUsage {
    /// Returns total tokens.
    #[must_use]
    pub fn total(&self) -> u32 {
        self.input_tokens.saturating_add(self.output_tokens)
    }
}

/// Result produced by one stage of a pipeline run.
///
/// `content` holds the generated text exactly as the generation capability
/// returned it; everything else is metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageResult {
    /// The stage that produced the result.
    pub stage: StageName,
    /// Success or failure flag.
    pub status: StageStatus,
    /// Generated text (empty for failed results).
    pub content: String,
    /// When the stage started.
    pub started_at: DateTime<Utc>,
    /// When the stage ended.
    pub ended_at: DateTime<Utc>,
    /// Model that produced the content, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Token usage, when reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
    /// Stage specific metadata.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
    /// Error message if failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StageResult {
    /// Creates a completed stage result.
    #[must_use]
    pub fn completed(stage: StageName, started_at: DateTime<Utc>, content: impl Into<String>) -> Self {
        Self {
            stage,
            status: StageStatus::Completed,
            content: content.into(),
            started_at,
            ended_at: Utc::now(),
            model: None,
            usage: None,
            metadata: HashMap::new(),
            error: None,
        }
    }

    /// Creates a failed stage result.
    #[must_use]
    pub fn failed(stage: StageName, started_at: DateTime<Utc>, error: impl Into<String>) -> Self {
        Self {
            stage,
            status: StageStatus::Failed,
            content: String::new(),
            started_at,
            ended_at: Utc::now(),
            model: None,
            usage: None,
            metadata: HashMap::new(),
            error: Some(error.into()),
        }
    }

    /// Sets the model.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the token usage.
    #[must_use]
    pub fn with_usage(mut self, usage: Option<TokenUsage>) -> Self {
        self.usage = usage;
        self
    }

    /// Adds a single metadata entry.
    #[must_use]
    pub fn add_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Returns the duration in milliseconds.
    #[must_use]
    pub fn duration_ms(&self) -> i64 {
        (self.ended_at - self.started_at).num_milliseconds()
    }

    /// Returns true if the stage succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self.status, StageStatus::Completed)
    }

    /// Returns true if the stage failed.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self.status, StageStatus::Failed)
    }

    /// Number of whitespace separated words in the content.
    #[must_use]
    pub fn word_count(&self) -> usize {
        crate::utils::word_count(&self.content)
    }

    /// Gets a metadata value.
    #[must_use]
    pub fn metadata_value(&self, key: &str) -> Option<&serde_json::Value> {
        self.metadata.get(key)
    }
}
