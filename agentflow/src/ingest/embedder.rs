//! Text embedding capability.

use crate::errors::{ConfigError, IngestError};
use async_trait::async_trait;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::sync::LazyLock;

static TOKEN_RE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\w+").ok());

/// Turns texts into fixed-length vectors.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embeds each text, returning one vector per input in the same order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, IngestError>;

    /// Length of every vector this embedder returns.
    fn dimensions(&self) -> usize;
}

/// Deterministic bag-of-words embedder using signed feature hashing.
///
/// Needs no network access, which makes it suitable for tests and offline
/// indexing. Similar vocabulary gives similar vectors; meaning does not.
#[derive(Debug, Clone, Copy)]
pub struct HashingEmbedder {
    dimensions: usize,
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self { dimensions: 256 }
    }
}

impl HashingEmbedder {
    /// Creates an embedder producing `dimensions`-length vectors.
    pub fn new(dimensions: usize) -> Result<Self, ConfigError> {
        if dimensions == 0 {
            return Err(ConfigError::invalid("dimensions", "must be greater than 0"));
        }
        Ok(Self { dimensions })
    }

    /// Embeds one text.
    #[must_use]
    pub fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        let lowered = text.to_lowercase();
        let tokens: Box<dyn Iterator<Item = &str>> = match TOKEN_RE.as_ref() {
            Some(re) => Box::new(re.find_iter(&lowered).map(|m| m.as_str())),
            None => Box::new(lowered.split_whitespace()),
        };

        for token in tokens {
            let digest = Sha256::digest(token.as_bytes());
            let mut bucket_bytes = [0u8; 8];
            bucket_bytes.copy_from_slice(&digest[..8]);
            let bucket = (u64::from_le_bytes(bucket_bytes) % self.dimensions as u64) as usize;
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }
        normalize(&mut vector);
        vector
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, IngestError> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

/// Scales `vector` to unit length. Zero vectors are left unchanged.
pub fn normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in vector.iter_mut() {
            *v /= norm;
        }
    }
}

#[cfg(feature = "openai")]
pub use self::openai::OpenAiEmbedder;

#[cfg(feature = "openai")]
mod openai {
    use super::Embedder;
    use crate::config::LlmConfig;
    use crate::errors::{ConfigError, IngestError};
    use async_trait::async_trait;
    use reqwest::Client;
    use serde::{Deserialize, Serialize};
    use std::time::Duration;

    /// Dimensions of `text-embedding-3-small`.
    pub const DEFAULT_DIMENSIONS: usize = 1536;

    #[derive(Debug, Serialize)]
    struct EmbeddingRequest<'a> {
        model: &'a str,
        input: &'a [String],
    }

    #[derive(Debug, Deserialize)]
    struct EmbeddingResponse {
        data: Vec<EmbeddingData>,
    }

    #[derive(Debug, Deserialize)]
    struct EmbeddingData {
        index: usize,
        embedding: Vec<f32>,
    }

    /// Embedder backed by the `/embeddings` endpoint.
    #[derive(Debug, Clone)]
    pub struct OpenAiEmbedder {
        client: Client,
        config: LlmConfig,
        dimensions: usize,
    }

    impl OpenAiEmbedder {
        /// Creates an embedder from provider settings.
        pub fn new(config: LlmConfig) -> Result<Self, ConfigError> {
            if config.api_key.trim().is_empty() {
                return Err(ConfigError::invalid("api_key", "must not be empty"));
            }
            let client = Client::builder()
                .timeout(Duration::from_secs(config.request_timeout_seconds))
                .build()
                .map_err(|e| ConfigError::invalid("http_client", e.to_string()))?;
            Ok(Self {
                client,
                config,
                dimensions: DEFAULT_DIMENSIONS,
            })
        }

        /// Sets the vector length the configured model returns.
        #[must_use]
        pub fn with_dimensions(mut self, dimensions: usize) -> Self {
            self.dimensions = dimensions;
            self
        }
    }

    #[async_trait]
    impl Embedder for OpenAiEmbedder {
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, IngestError> {
            if texts.is_empty() {
                return Ok(Vec::new());
            }
            let body = EmbeddingRequest {
                model: &self.config.embedding_model,
                input: texts,
            };
            let response = self
                .client
                .post(self.config.endpoint("embeddings"))
                .bearer_auth(&self.config.api_key)
                .json(&body)
                .send()
                .await
                .map_err(|e| IngestError::Embedding(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(IngestError::Embedding(format!(
                    "provider returned status {}: {body}",
                    status.as_u16()
                )));
            }

            let mut parsed: EmbeddingResponse = response
                .json()
                .await
                .map_err(|e| IngestError::Embedding(e.to_string()))?;
            if parsed.data.len() != texts.len() {
                return Err(IngestError::Embedding(format!(
                    "expected {} embeddings, got {}",
                    texts.len(),
                    parsed.data.len()
                )));
            }
            parsed.data.sort_by_key(|d| d.index);

            let mut vectors = Vec::with_capacity(parsed.data.len());
            for data in parsed.data {
                if data.embedding.len() != self.dimensions {
                    return Err(IngestError::DimensionMismatch {
                        expected: self.dimensions,
                        actual: data.embedding.len(),
                    });
                }
                vectors.push(data.embedding);
            }
            Ok(vectors)
        }

        fn dimensions(&self) -> usize {
            self.dimensions
        }
    }

}
