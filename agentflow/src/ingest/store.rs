//! Vector storage and cosine similarity search.

use crate::errors::IngestError;
use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::path::Path;
use tracing::{debug, info};

/// A chunk and its embedding, as held by a store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredChunk {
    /// Unique id; upserting the same id replaces the chunk.
    pub id: String,
    /// Id of the document the chunk came from.
    pub document_id: String,
    /// Where the document was loaded from.
    pub source: String,
    /// Chunk text.
    pub content: String,
    /// Embedding vector.
    pub embedding: Vec<f32>,
}

impl StoredChunk {
    /// Builds the id for chunk `index` of a document.
    #[must_use]
    pub fn chunk_id(document_id: &str, index: usize) -> String {
        format!("{document_id}:{index}")
    }
}

/// A stored chunk with its similarity to a query.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    /// The matching chunk.
    pub chunk: StoredChunk,
    /// Cosine similarity to the query.
    pub score: f32,
}

/// Storage for embedded chunks.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Inserts or replaces chunks, returning how many were written.
    async fn upsert(&self, chunks: Vec<StoredChunk>) -> Result<usize, IngestError>;

    /// Returns up to `k` chunks ordered by descending similarity.
    async fn query(&self, embedding: &[f32], k: usize) -> Result<Vec<ScoredChunk>, IngestError>;

    /// Deletes every chunk of a document, returning how many were removed.
    async fn remove_document(&self, document_id: &str) -> Result<usize, IngestError>;

    /// Number of stored chunks.
    async fn len(&self) -> usize;

    /// Returns true if the store holds no chunks.
    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Cosine similarity of two equal-length vectors; zero if either is zero.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[derive(Serialize, Deserialize)]
struct PersistedStore {
    dimensions: usize,
    chunks: Vec<StoredChunk>,
}

/// In-process store with brute-force search and JSON persistence.
#[derive(Debug)]
pub struct InMemoryVectorStore {
    dimensions: usize,
    chunks: DashMap<String, StoredChunk>,
}

impl InMemoryVectorStore {
    /// Creates an empty store for vectors of length `dimensions`.
    #[must_use]
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            chunks: DashMap::new(),
        }
    }

    /// The vector length this store accepts.
    #[must_use]
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn check_dimensions(&self, actual: usize) -> Result<(), IngestError> {
        if actual == self.dimensions {
            Ok(())
        } else {
            Err(IngestError::DimensionMismatch {
                expected: self.dimensions,
                actual,
            })
        }
    }

    fn snapshot(&self) -> PersistedStore {
        let mut chunks: Vec<StoredChunk> = self.chunks.iter().map(|e| e.value().clone()).collect();
        chunks.sort_by(|a, b| a.id.cmp(&b.id));
        PersistedStore {
            dimensions: self.dimensions,
            chunks,
        }
    }

    /// Writes the store to `path` as JSON.
    pub async fn save(&self, path: &Path) -> Result<(), IngestError> {
        let snapshot = self.snapshot();
        let json = serde_json::to_vec_pretty(&snapshot)?;
        tokio::fs::write(path, json)
            .await
            .map_err(|e| IngestError::io(path, e))?;
        info!(path = %path.display(), chunks = snapshot.chunks.len(), "Saved vector store");
        Ok(())
    }

    /// Reads a store previously written by [`save`](Self::save).
    pub async fn load(path: &Path) -> Result<Self, IngestError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| IngestError::io(path, e))?;
        let persisted: PersistedStore = serde_json::from_slice(&bytes)?;

        let store = Self::new(persisted.dimensions);
        for chunk in persisted.chunks {
            store.check_dimensions(chunk.embedding.len())?;
            store.chunks.insert(chunk.id.clone(), chunk);
        }
        info!(path = %path.display(), chunks = store.chunks.len(), "Loaded vector store");
        Ok(store)
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn upsert(&self, chunks: Vec<StoredChunk>) -> Result<usize, IngestError> {
        for chunk in &chunks {
            self.check_dimensions(chunk.embedding.len())?;
        }
        let count = chunks.len();
        for chunk in chunks {
            self.chunks.insert(chunk.id.clone(), chunk);
        }
        debug!(count, total = self.chunks.len(), "Upserted chunks");
        Ok(count)
    }

    async fn query(&self, embedding: &[f32], k: usize) -> Result<Vec<ScoredChunk>, IngestError> {
        self.check_dimensions(embedding.len())?;
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut scored: Vec<ScoredChunk> = self
            .chunks
            .iter()
            .map(|entry| ScoredChunk {
                score: cosine_similarity(embedding, &entry.value().embedding),
                chunk: entry.value().clone(),
            })
            .collect();
        scored.sort_by(|a, b| match b.score.total_cmp(&a.score) {
            Ordering::Equal => a.chunk.id.cmp(&b.chunk.id),
            other => other,
        });
        scored.truncate(k);
        Ok(scored)
    }

    async fn remove_document(&self, document_id: &str) -> Result<usize, IngestError> {
        let before = self.chunks.len();
        self.chunks.retain(|_, chunk| chunk.document_id != document_id);
        let removed = before.saturating_sub(self.chunks.len());
        if removed > 0 {
            debug!(document_id, removed, "Removed document chunks");
        }
        Ok(removed)
    }

    async fn len(&self) -> usize {
        self.chunks.len()
    }
}
