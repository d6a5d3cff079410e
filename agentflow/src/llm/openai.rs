//! `OpenAI` compatible chat completion client.

use super::{GenerationRequest, GenerationResponse, TextGenerator};
use crate::config::LlmConfig;
use crate::core::TokenUsage;
use crate::errors::{ConfigError, GenerationError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

/// Generator backed by the `/chat/completions` endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiGenerator {
    client: Client,
    config: LlmConfig,
}

impl OpenAiGenerator {
    /// Creates a generator from provider settings.
    pub fn new(config: LlmConfig) -> Result<Self, ConfigError> {
        if config.api_key.trim().is_empty() {
            return Err(ConfigError::invalid("api_key", "must not be empty"));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| ConfigError::invalid("http_client", e.to_string()))?;
        Ok(Self { client, config })
    }

    /// Returns the provider settings.
    #[must_use]
    pub fn config(&self) -> &LlmConfig {
        &self.config
    }
}

#[async_trait]
impl TextGenerator for OpenAiGenerator {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, GenerationError> {
        let mut messages = Vec::with_capacity(2);
        if !request.system_prompt.is_empty() {
            messages.push(Message {
                role: "system",
                content: &request.system_prompt,
            });
        }
        messages.push(Message {
            role: "user",
            content: &request.prompt,
        });

        let body = ChatRequest {
            model: &request.model,
            messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let start = Instant::now();
        let response = self
            .client
            .post(self.config.endpoint("chat/completions"))
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GenerationError::Timeout {
                        seconds: Duration::from_secs(self.config.request_timeout_seconds)
                            .as_secs_f64(),
                    }
                } else {
                    GenerationError::Request(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::Decode(e.to_string()))?;
        let latency_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or(GenerationError::EmptyResponse)?;
        let text = choice
            .message
            .content
            .filter(|text| !text.trim().is_empty())
            .ok_or(GenerationError::EmptyResponse)?;

        tracing::debug!(
            model = %request.model,
            latency_ms,
            chars = text.len(),
            "Chat completion received"
        );

        Ok(GenerationResponse {
            text,
            model: parsed.model,
            usage: parsed.usage.map(|u| TokenUsage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            }),
            latency_ms,
            finish_reason: choice.finish_reason,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_empty_key() {
        assert!(OpenAiGenerator::new(LlmConfig::new("  ")).is_err());
        assert!(OpenAiGenerator::new(LlmConfig::new("sk-test")).is_ok());
    }

    #[test]
    fn test_chat_request_shape() {
        let body = ChatRequest {
            model: "gpt-4o-mini",
            messages: vec![
                Message { role: "system", content: "be brief" },
                Message { role: "user", content: "hi" },
            ],
            temperature: 0.5,
            max_tokens: 10,
        };
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["model"], "gpt-4o-mini");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "hi");
        assert_eq!(json["max_tokens"], 10);
    }

    #[test]
    fn test_chat_response_tolerates_missing_content() {
        let parsed: ChatResponse = serde_json::from_str(
            r#"{"choices": [{"message": {"content": null}, "finish_reason": "length"}]}"#,
        )
        .unwrap();

        assert!(parsed.choices[0].message.content.is_none());
        assert!(parsed.usage.is_none());
    }
}
