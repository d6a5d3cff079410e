//! Utility functions for timestamps and text.

mod text;
mod timestamps;

pub use text::{preview, word_count};
pub use timestamps::{display_timestamp, iso_timestamp};
