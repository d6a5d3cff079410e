//! Configuration types.
//!
//! Stage configuration travels with the [`Task`](crate::core::Task) and is
//! read-only input to a stage. Generation parameters, provider settings and
//! driver policy live in [`PipelineConfig`] and [`LlmConfig`].

mod llm;
mod pipeline;
mod stage;

pub use llm::{GenerationParams, LlmConfig};
pub use pipeline::PipelineConfig;
pub use stage::{
    ResearchConfig, ReviewCriteria, ReviewerConfig, WriterConfig, WritingStyle, DEPTH_RANGE,
    STRICTNESS_RANGE,
};
