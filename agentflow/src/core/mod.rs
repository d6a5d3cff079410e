//! Core domain model types for agentflow.
//!
//! This module contains the fundamental types used throughout the crate:
//! - Stage names, stage status and the pipeline run status state machine
//! - The result a stage produces
//! - The task submitted to a pipeline run

mod result;
mod status;
mod task;

pub use result::{StageResult, TokenUsage};
pub use status::{InvalidTransition, RunStatus, StageName, StageStatus};
pub use task::Task;
