//! # Agentflow
//!
//! A sequential research → write → review pipeline driven by a pluggable
//! text-generation capability, plus a document ingestion flow that chunks,
//! embeds and indexes files for similarity search.
//!
//! Agentflow provides:
//!
//! - **Stage-based execution**: three stages, each a single generation call
//!   behind a pure prompt builder
//! - **Explicit run state**: a `PipelineRun` state machine owned by the driver
//! - **Observability**: status transitions published to a `RunObserver`
//! - **Cancellation and timeouts**: cooperative cancellation and a bounded
//!   wait per stage
//! - **Similarity search**: load, split, embed, upsert and query documents
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use agentflow::prelude::*;
//!
//! let generator = Arc::new(OpenAiGenerator::new(LlmConfig::from_env()?)?);
//! let pipeline = Pipeline::builder().generator(generator).build()?;
//!
//! let task = Task::new("Summarize benefits of solar energy")
//!     .with_requirements("under 200 words");
//! let output = pipeline.run(task).await?;
//! println!("{}", output.to_markdown());
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cancellation;
pub mod config;
pub mod core;
pub mod errors;
pub mod events;
pub mod ingest;
pub mod llm;
pub mod observability;
pub mod pipeline;
pub mod stages;
pub mod testing;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use std::sync::Arc;

    pub use crate::cancellation::CancellationToken;
    pub use crate::config::{
        GenerationParams, LlmConfig, PipelineConfig, ResearchConfig, ReviewCriteria,
        ReviewerConfig, WriterConfig, WritingStyle,
    };
    pub use crate::core::{RunStatus, StageName, StageResult, StageStatus, Task};
    pub use crate::errors::{ConfigError, ErrorKind, GenerationError, IngestError, StageError};
    pub use crate::events::{
        CollectingObserver, FanoutObserver, LoggingObserver, NoOpObserver, RunObserver,
        RunStatistics, StatsObserver,
    };
    pub use crate::ingest::{
        DocumentLoader, Embedder, HashingEmbedder, InMemoryVectorStore, IngestionPipeline,
        SearchHit, SimilarityIndex, SplitterConfig, TextSplitter, VectorStore,
    };
    #[cfg(feature = "openai")]
    pub use crate::ingest::OpenAiEmbedder;
    #[cfg(feature = "openai")]
    pub use crate::llm::OpenAiGenerator;
    pub use crate::llm::{
        GenerationRequest, GenerationResponse, RetryConfig, RetryingGenerator, TextGenerator,
    };
    pub use crate::pipeline::{
        Pipeline, PipelineBuilder, PipelineFailure, PipelineOutput, PipelineRun,
    };
    pub use crate::stages::{
        Prompt, ResearchStage, ReviewAssessment, ReviewerStage, Stage, StageContext,
        WriterStage,
    };
}
