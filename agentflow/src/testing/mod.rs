//! Testing utilities for agentflow pipelines.
//!
//! Deterministic stand-ins for the text-generation capability, usable from
//! downstream crates' tests as well as this crate's own.

mod mocks;

pub use mocks::{FailingGenerator, ScriptedGenerator, StallingGenerator};
