//! Driver level configuration, loadable from a JSON file.

use super::GenerationParams;
use crate::errors::ConfigError;
use crate::llm::RetryConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Configuration for a pipeline: per-stage generation parameters and the
/// driver's timeout and retry policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Research stage generation parameters.
    #[serde(default = "GenerationParams::research")]
    pub research: GenerationParams,
    /// Writer stage generation parameters.
    #[serde(default = "GenerationParams::writer")]
    pub writer: GenerationParams,
    /// Reviewer stage generation parameters.
    #[serde(default = "GenerationParams::reviewer")]
    pub reviewer: GenerationParams,
    /// Maximum wait for a single stage; `None` waits indefinitely.
    #[serde(default = "default_stage_timeout")]
    pub stage_timeout_seconds: Option<f64>,
    /// Retry policy for transient generation failures; `None` disables retries.
    #[serde(default)]
    pub retry: Option<RetryConfig>,
}

#[allow(clippy::unnecessary_wraps)]
fn default_stage_timeout() -> Option<f64> {
    Some(120.0)
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            research: GenerationParams::research(),
            writer: GenerationParams::writer(),
            reviewer: GenerationParams::reviewer(),
            stage_timeout_seconds: default_stage_timeout(),
            retry: None,
        }
    }
}

impl PipelineConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads and validates a configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Sets the model for all three stages.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        let model = model.into();
        self.research.model.clone_from(&model);
        self.writer.model.clone_from(&model);
        self.reviewer.model = model;
        self
    }

    /// Sets the stage timeout.
    #[must_use]
    pub fn with_stage_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.stage_timeout_seconds = timeout.map(|t| t.as_secs_f64());
        self
    }

    /// Sets the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = Some(retry);
        self
    }

    /// Returns the stage timeout as a duration.
    #[must_use]
    pub fn stage_timeout(&self) -> Option<Duration> {
        self.stage_timeout_seconds
            .filter(|secs| secs.is_finite() && *secs > 0.0)
            .map(Duration::from_secs_f64)
    }

    /// Validates all parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.research.validate()?;
        self.writer.validate()?;
        self.reviewer.validate()?;

        if let Some(secs) = self.stage_timeout_seconds {
            if !secs.is_finite() || secs <= 0.0 {
                return Err(ConfigError::invalid(
                    "stage_timeout_seconds",
                    format!("must be a positive number of seconds, got {secs}"),
                ));
            }
        }
        if let Some(retry) = &self.retry {
            retry.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_pipeline_config_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.stage_timeout(), Some(Duration::from_secs(120)));
        assert!(config.retry.is_none());
        assert_eq!(config.research.max_tokens, 1500);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_with_model_applies_to_all_stages() {
        let config = PipelineConfig::new().with_model("local-model");
        assert_eq!(config.research.model, "local-model");
        assert_eq!(config.writer.model, "local-model");
        assert_eq!(config.reviewer.model, "local-model");
    }

    #[test]
    fn test_disable_timeout() {
        let config = PipelineConfig::new().with_stage_timeout(None);
        assert_eq!(config.stage_timeout(), None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_negative_timeout_rejected() {
        let mut config = PipelineConfig::new();
        config.stage_timeout_seconds = Some(-1.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"writer": {{"model": "m", "temperature": 0.9, "max_tokens": 500}}, "stage_timeout_seconds": 30}}"#
        )
        .unwrap();

        let config = PipelineConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.writer.model, "m");
        assert_eq!(config.writer.max_tokens, 500);
        assert_eq!(config.research, GenerationParams::research());
        assert_eq!(config.stage_timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_from_json_file_missing() {
        let err = PipelineConfig::from_json_file("/nonexistent/agentflow.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_from_json_file_rejects_invalid_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"reviewer": {{"max_tokens": 0}}}}"#).unwrap();

        let err = PipelineConfig::from_json_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "max_tokens", .. }));
    }
}
