//! Split, embed, store and search.

use super::{Document, Embedder, StoredChunk, TextSplitter, VectorStore};
use crate::errors::{ConfigError, IngestError};
use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// Summary of an indexing pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IndexReport {
    /// Documents received.
    pub documents: usize,
    /// Chunks embedded and stored.
    pub chunks: usize,
    /// Documents that produced no chunks.
    pub skipped: usize,
}

/// One search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Matching chunk text.
    pub content: String,
    /// Cosine similarity to the query.
    pub score: f32,
    /// Where the chunk's document was loaded from.
    pub source: String,
}

/// Indexes documents and answers similarity queries.
#[async_trait]
pub trait SimilarityIndex: Send + Sync {
    /// Splits, embeds and stores `documents`.
    ///
    /// Chunks already stored for a document are replaced, so re-indexing an
    /// edited file leaves none of its old text behind.
    async fn index(&self, documents: &[Document]) -> Result<IndexReport, IngestError>;

    /// Returns up to `k` hits ordered by descending score.
    async fn search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>, IngestError>;
}

/// Default number of chunks sent per embedding call.
pub const DEFAULT_BATCH_SIZE: usize = 64;

/// Default number of embedding calls in flight.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// A [`SimilarityIndex`] built from a splitter, an embedder and a store.
pub struct IngestionPipeline {
    splitter: TextSplitter,
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    batch_size: usize,
    concurrency: usize,
}

impl std::fmt::Debug for IngestionPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestionPipeline")
            .field("splitter", &self.splitter)
            .field("dimensions", &self.embedder.dimensions())
            .field("batch_size", &self.batch_size)
            .field("concurrency", &self.concurrency)
            .finish_non_exhaustive()
    }
}

impl IngestionPipeline {
    /// Creates a pipeline with the default batch size and concurrency.
    #[must_use]
    pub fn new(
        splitter: TextSplitter,
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
    ) -> Self {
        Self {
            splitter,
            embedder,
            store,
            batch_size: DEFAULT_BATCH_SIZE,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    /// Sets how many chunks are embedded per call.
    pub fn with_batch_size(mut self, batch_size: usize) -> Result<Self, ConfigError> {
        if batch_size == 0 {
            return Err(ConfigError::invalid("batch_size", "must be greater than 0"));
        }
        self.batch_size = batch_size;
        Ok(self)
    }

    /// Sets how many embedding calls may run at once.
    pub fn with_concurrency(mut self, concurrency: usize) -> Result<Self, ConfigError> {
        if concurrency == 0 {
            return Err(ConfigError::invalid("concurrency", "must be greater than 0"));
        }
        self.concurrency = concurrency;
        Ok(self)
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }

    async fn embed_batch(&self, batch: Vec<StoredChunk>) -> Result<Vec<StoredChunk>, IngestError> {
        let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
        let vectors = self.embedder.embed(&texts).await?;
        if vectors.len() != batch.len() {
            return Err(IngestError::Embedding(format!(
                "expected {} embeddings, got {}",
                batch.len(),
                vectors.len()
            )));
        }
        debug!(count = batch.len(), "Embedded batch");
        Ok(batch
            .into_iter()
            .zip(vectors)
            .map(|(chunk, embedding)| StoredChunk { embedding, ..chunk })
            .collect())
    }
}

#[async_trait]
impl SimilarityIndex for IngestionPipeline {
    async fn index(&self, documents: &[Document]) -> Result<IndexReport, IngestError> {
        let mut report = IndexReport {
            documents: documents.len(),
            ..IndexReport::default()
        };

        let mut pending = Vec::new();
        for document in documents {
            let chunks = self.splitter.split(&document.content);
            if chunks.is_empty() {
                report.skipped += 1;
                continue;
            }
            pending.extend(chunks.into_iter().map(|chunk| StoredChunk {
                id: StoredChunk::chunk_id(&document.id, chunk.index),
                document_id: document.id.clone(),
                source: document.source.clone(),
                content: chunk.content,
                embedding: Vec::new(),
            }));
        }

        let mut batches = Vec::new();
        let mut remaining = pending.into_iter().peekable();
        while remaining.peek().is_some() {
            batches.push(remaining.by_ref().take(self.batch_size).collect::<Vec<_>>());
        }

        let embedded: Vec<Vec<StoredChunk>> = stream::iter(batches)
            .map(|batch| self.embed_batch(batch))
            .buffered(self.concurrency)
            .try_collect()
            .await?;

        for document in documents {
            self.store.remove_document(&document.id).await?;
        }
        for batch in embedded {
            report.chunks += self.store.upsert(batch).await?;
        }
        info!(
            documents = report.documents,
            chunks = report.chunks,
            skipped = report.skipped,
            "Indexed documents"
        );
        Ok(report)
    }

    async fn search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>, IngestError> {
        if query.trim().is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        let mut vectors = self.embedder.embed(&[query.to_string()]).await?;
        let embedding = vectors
            .pop()
            .ok_or_else(|| IngestError::Embedding("no embedding returned for query".to_string()))?;

        let hits = self
            .store
            .query(&embedding, k)
            .await?
            .into_iter()
            .map(|scored| SearchHit {
                content: scored.chunk.content,
                score: scored.score,
                source: scored.chunk.source,
            })
            .collect::<Vec<_>>();
        debug!(query, k, hits = hits.len(), "Search complete");
        Ok(hits)
    }
}
