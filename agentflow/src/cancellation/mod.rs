//! Cooperative cancellation.
//!
//! A [`CancellationToken`] is passed to a pipeline run; cancelling it fails
//! the stage in progress and stops the run.

mod token;

pub use token::CancellationToken;
