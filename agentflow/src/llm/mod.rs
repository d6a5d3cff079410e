//! The text-generation capability.
//!
//! Stages talk to a model through the [`TextGenerator`] trait: one prompt
//! in, one completion out. The OpenAI compatible HTTP client lives behind
//! the `openai` feature; tests substitute scripted generators.

#[cfg(feature = "openai")]
mod openai;
mod retry;

#[cfg(feature = "openai")]
pub use openai::OpenAiGenerator;
pub use retry::{
    should_retry, with_retry, BackoffStrategy, JitterStrategy, RetryConfig, RetryDecision,
    RetryState, RetryingGenerator,
};

use crate::config::GenerationParams;
use crate::core::TokenUsage;
use crate::errors::GenerationError;
use crate::stages::Prompt;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A single generation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// System instruction.
    pub system_prompt: String,
    /// User prompt.
    pub prompt: String,
    /// Model identifier.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Upper bound on generated tokens.
    pub max_tokens: u32,
}

impl GenerationRequest {
    /// Builds a request from a prompt and generation parameters.
    #[must_use]
    pub fn new(prompt: Prompt, params: &GenerationParams) -> Self {
        Self {
            system_prompt: prompt.system,
            prompt: prompt.user,
            model: params.model.clone(),
            temperature: params.temperature,
            max_tokens: params.max_tokens,
        }
    }
}

/// The generated completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResponse {
    /// Generated text, unmodified.
    pub text: String,
    /// Model that served the request, when reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Token usage, when reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
    /// Wall clock latency of the call.
    #[serde(default)]
    pub latency_ms: u64,
    /// Provider finish reason, when reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

impl GenerationResponse {
    /// Creates a response carrying only text.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            model: None,
            usage: None,
            latency_ms: 0,
            finish_reason: None,
        }
    }

    /// Sets the model.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the usage.
    #[must_use]
    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = Some(usage);
        self
    }
}

/// Produces text for a prompt.
///
/// Implementations must be safe to share between stages and runs.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generates a completion for the request.
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, GenerationError>;
}

#[async_trait]
impl<T: TextGenerator + ?Sized> TextGenerator for Arc<T> {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, GenerationError> {
        (**self).generate(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_from_prompt() {
        let params = GenerationParams::default().with_max_tokens(42);
        let request = GenerationRequest::new(Prompt::new("sys", "user"), &params);

        assert_eq!(request.system_prompt, "sys");
        assert_eq!(request.prompt, "user");
        assert_eq!(request.model, params.model);
        assert_eq!(request.max_tokens, 42);
    }

    #[tokio::test]
    async fn test_arc_generator_delegates() {
        let mut mock = MockTextGenerator::new();
        mock.expect_generate()
            .returning(|req| Ok(GenerationResponse::text(req.prompt.to_uppercase())));
        let generator: Arc<dyn TextGenerator> = Arc::new(mock);

        let request = GenerationRequest::new(Prompt::new("", "hello"), &GenerationParams::default());
        let response = Arc::clone(&generator).generate(&request).await.unwrap();

        assert_eq!(response.text, "HELLO");
    }
}
