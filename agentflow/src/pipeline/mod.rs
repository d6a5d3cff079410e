//! Pipeline building and execution.
//!
//! This module provides:
//! - The run record and its status machine
//! - The builder with validation
//! - The sequential driver with cancellation and per-stage timeouts

mod builder;
mod driver;
mod output;
mod run;

#[cfg(test)]
mod integration_tests;

pub use builder::PipelineBuilder;
pub use driver::Pipeline;
pub use output::{PipelineFailure, PipelineOutput};
pub use run::PipelineRun;
