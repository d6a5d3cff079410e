//! Overlapping character windows over a document.
//!
//! Windows hold at most `chunk_size` characters. Within each window the
//! splitter prefers to end at a paragraph break, then a sentence end, then
//! whitespace, and only cuts mid-word when none is available. Up to
//! `chunk_overlap` characters from the end of a window are carried into the
//! next one. When the overlap starts mid-word it is moved to the next word,
//! unless that would leave only whitespace to share.

use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};

/// Splitter settings, in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitterConfig {
    /// Maximum characters per chunk.
    pub chunk_size: usize,
    /// Maximum characters shared by consecutive chunks.
    pub chunk_overlap: usize,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

impl SplitterConfig {
    /// Creates a config.
    #[must_use]
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
        }
    }

    /// Checks that the size is positive and the overlap smaller than it.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::invalid("chunk_size", "must be greater than 0"));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(ConfigError::invalid(
                "chunk_overlap",
                format!(
                    "must be smaller than chunk_size ({} >= {})",
                    self.chunk_overlap, self.chunk_size
                ),
            ));
        }
        Ok(())
    }
}

/// One window of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextChunk {
    /// Position of the chunk within its document.
    pub index: usize,
    /// The chunk text, trimmed of surrounding whitespace.
    pub content: String,
    /// Start offset in characters.
    pub start: usize,
    /// End offset in characters (exclusive).
    pub end: usize,
}

/// Splits text into overlapping chunks.
#[derive(Debug, Clone, Default)]
pub struct TextSplitter {
    config: SplitterConfig,
}

impl TextSplitter {
    /// Creates a splitter after validating `config`.
    pub fn new(config: SplitterConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The splitter settings.
    #[must_use]
    pub fn config(&self) -> SplitterConfig {
        self.config
    }

    /// Splits `text`. Whitespace-only windows are dropped, so empty text
    /// yields no chunks.
    #[must_use]
    pub fn split(&self, text: &str) -> Vec<TextChunk> {
        let chars: Vec<char> = text.chars().collect();
        let total = chars.len();
        let SplitterConfig {
            chunk_size: size,
            chunk_overlap: overlap,
        } = self.config;

        let mut chunks = Vec::new();
        let mut start = 0;
        while start < total {
            let hard_end = (start + size).min(total);
            let end = if hard_end == total {
                total
            } else {
                find_break(&chars, start + overlap + 1, hard_end).unwrap_or(hard_end)
            };

            let content: String = chars[start..end].iter().collect();
            let trimmed = content.trim();
            if !trimmed.is_empty() {
                chunks.push(TextChunk {
                    index: chunks.len(),
                    content: trimmed.to_string(),
                    start,
                    end,
                });
            }
            if end == total {
                break;
            }

            // end - start > overlap, so the next window always advances.
            start = overlap_start(&chars, end - overlap, end);
        }
        chunks
    }
}

/// Where the next window starts, given the raw overlap `from..end`.
fn overlap_start(chars: &[char], from: usize, end: usize) -> usize {
    if from == 0 || chars[from - 1].is_whitespace() {
        return from;
    }
    let region = &chars[from..end];
    match region.iter().position(|c| c.is_whitespace()) {
        Some(offset) if region[offset + 1..].iter().any(|c| !c.is_whitespace()) => {
            from + offset + 1
        }
        _ => from,
    }
}

/// Finds the best end position in `min_end..=max_end`, scanning backwards.
fn find_break(chars: &[char], min_end: usize, max_end: usize) -> Option<usize> {
    if min_end > max_end {
        return None;
    }
    let candidates = || (min_end..=max_end).rev();

    let paragraph = candidates().find(|&end| end >= 2 && chars[end - 1] == '\n' && chars[end - 2] == '\n');
    let sentence = || {
        candidates().find(|&end| {
            matches!(chars[end - 1], '.' | '!' | '?' | '\n')
                && chars.get(end).map_or(true, |c| c.is_whitespace())
        })
    };
    let word = || candidates().find(|&end| chars.get(end).is_some_and(|c| c.is_whitespace()));

    paragraph.or_else(sentence).or_else(word)
}
