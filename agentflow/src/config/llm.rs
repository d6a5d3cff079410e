//! Generation parameters and provider settings.

use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};

/// Default chat model.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Default provider base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Default embedding model.
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// Parameters for one generation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    /// Model identifier.
    #[serde(default = "default_model")]
    pub model: String,
    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Upper bound on generated tokens.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    2000
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

impl GenerationParams {
    /// Parameters tuned for the research stage.
    #[must_use]
    pub fn research() -> Self {
        Self {
            temperature: 0.3,
            max_tokens: 1500,
            ..Self::default()
        }
    }

    /// Parameters tuned for the writer stage.
    #[must_use]
    pub fn writer() -> Self {
        Self::default()
    }

    /// Parameters tuned for the reviewer stage.
    #[must_use]
    pub fn reviewer() -> Self {
        Self {
            temperature: 0.3,
            ..Self::default()
        }
    }

    /// Sets the model.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Sets the token limit.
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Validates the parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.model.trim().is_empty() {
            return Err(ConfigError::invalid("model", "must not be empty"));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::invalid(
                "temperature",
                format!("must be between 0.0 and 2.0, got {}", self.temperature),
            ));
        }
        if self.max_tokens == 0 {
            return Err(ConfigError::invalid("max_tokens", "must be positive"));
        }
        Ok(())
    }
}

/// Settings for an OpenAI compatible provider.
#[derive(Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Bearer token.
    pub api_key: String,
    /// Base URL of the API, without a trailing slash.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    /// Model used for embeddings.
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    /// Chat model override applied to every stage, when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_request_timeout() -> u64 {
    60
}

fn default_embedding_model() -> String {
    DEFAULT_EMBEDDING_MODEL.to_string()
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("request_timeout_seconds", &self.request_timeout_seconds)
            .field("embedding_model", &self.embedding_model)
            .field("model", &self.model)
            .finish()
    }
}

impl LlmConfig {
    /// Environment variable holding the API key.
    pub const API_KEY_ENV: &'static str = "OPENAI_API_KEY";
    /// Environment variable overriding the base URL.
    pub const BASE_URL_ENV: &'static str = "OPENAI_BASE_URL";
    /// Environment variable overriding the chat model.
    pub const MODEL_ENV: &'static str = "AGENTFLOW_MODEL";

    /// Creates a configuration with the given key and defaults.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: default_base_url(),
            request_timeout_seconds: default_request_timeout(),
            embedding_model: default_embedding_model(),
            model: None,
        }
    }

    /// Reads the configuration from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key =
            non_blank_env(Self::API_KEY_ENV).ok_or(ConfigError::MissingEnv(Self::API_KEY_ENV))?;

        let mut config = Self::new(api_key);
        if let Some(base_url) = non_blank_env(Self::BASE_URL_ENV) {
            config = config.with_base_url(base_url);
        }
        config.model = non_blank_env(Self::MODEL_ENV);
        Ok(config)
    }

    /// Sets the base URL. A trailing slash is removed.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn with_request_timeout(mut self, seconds: u64) -> Self {
        self.request_timeout_seconds = seconds;
        self
    }

    /// Sets the embedding model.
    #[must_use]
    pub fn with_embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = model.into();
        self
    }

    /// Sets the chat model override.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Joins the base URL with an endpoint path.
    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

fn non_blank_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_param_defaults() {
        let research = GenerationParams::research();
        assert_eq!(research.model, DEFAULT_MODEL);
        assert!((research.temperature - 0.3).abs() < f32::EPSILON);
        assert_eq!(research.max_tokens, 1500);

        let writer = GenerationParams::writer();
        assert!((writer.temperature - 0.7).abs() < f32::EPSILON);
        assert_eq!(writer.max_tokens, 2000);

        let reviewer = GenerationParams::reviewer();
        assert!((reviewer.temperature - 0.3).abs() < f32::EPSILON);
    }

    #[test]
    fn test_params_validate() {
        assert!(GenerationParams::default().validate().is_ok());
        assert!(GenerationParams::default().with_model(" ").validate().is_err());
        assert!(GenerationParams::default().with_temperature(2.5).validate().is_err());
        assert!(GenerationParams::default().with_max_tokens(0).validate().is_err());
    }

    #[test]
    fn test_endpoint_join() {
        let config = LlmConfig::new("key").with_base_url("http://localhost:8080/v1/");
        assert_eq!(config.base_url, "http://localhost:8080/v1");
        assert_eq!(
            config.endpoint("/chat/completions"),
            "http://localhost:8080/v1/chat/completions"
        );
    }

    #[test]
    fn test_debug_redacts_key() {
        let config = LlmConfig::new("sk-secret");
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("redacted"));
    }

    #[test]
    fn test_llm_config_deserialize_defaults() {
        let config: LlmConfig = serde_json::from_str(r#"{"api_key": "k"}"#).unwrap();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.request_timeout_seconds, 60);
        assert_eq!(config.embedding_model, DEFAULT_EMBEDDING_MODEL);
        assert!(config.model.is_none());
    }
}
