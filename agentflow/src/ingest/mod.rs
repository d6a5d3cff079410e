//! Document ingestion and similarity search.
//!
//! Files are loaded, split into overlapping windows, embedded in batches and
//! upserted into a vector store that answers top-k cosine queries.

mod embedder;
mod index;
mod loader;
mod splitter;
mod store;

#[cfg(feature = "openai")]
pub use embedder::OpenAiEmbedder;
pub use embedder::{normalize, Embedder, HashingEmbedder};
pub use index::{
    IndexReport, IngestionPipeline, SearchHit, SimilarityIndex, DEFAULT_BATCH_SIZE,
    DEFAULT_CONCURRENCY,
};
pub use loader::{Document, DocumentLoader, DEFAULT_EXTENSIONS};
pub use splitter::{SplitterConfig, TextChunk, TextSplitter};
pub use store::{cosine_similarity, InMemoryVectorStore, ScoredChunk, StoredChunk, VectorStore};
