//! Error types for the agentflow crate.
//!
//! Stage failures fall into four kinds: invalid configuration (detected
//! before any external call), a missing or failed predecessor, a failed
//! generation call, and caller cancellation. The ingestion flow has its own
//! error type.

use crate::core::StageName;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Coarse classification of a stage failure, surfaced to observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Invalid stage configuration or task input.
    Config,
    /// The required predecessor result was missing or not successful.
    Precondition,
    /// The external generation call failed or returned unusable output.
    Generation,
    /// The caller aborted the run.
    Cancelled,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config => write!(f, "config"),
            Self::Precondition => write!(f, "precondition"),
            Self::Generation => write!(f, "generation"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Errors raised while validating or loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A numeric field is outside its declared bounds.
    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        /// The offending field.
        field: &'static str,
        /// The rejected value.
        value: i64,
        /// Inclusive lower bound.
        min: i64,
        /// Inclusive upper bound.
        max: i64,
    },

    /// A field holds an invalid value.
    #[error("invalid {field}: {message}")]
    Invalid {
        /// The offending field.
        field: &'static str,
        /// What is wrong with it.
        message: String,
    },

    /// A required environment variable is not set.
    #[error("environment variable {0} is not set")]
    MissingEnv(&'static str),

    /// A configuration file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Io {
        /// The file path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// A configuration file could not be parsed.
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ConfigError {
    /// Creates an out-of-range error.
    #[must_use]
    pub fn out_of_range(field: &'static str, value: impl Into<i64>, min: i64, max: i64) -> Self {
        Self::OutOfRange {
            field,
            value: value.into(),
            min,
            max,
        }
    }

    /// Creates an invalid-value error.
    #[must_use]
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            message: message.into(),
        }
    }
}

/// Errors returned by a text-generation capability.
#[derive(Debug, Clone, Error)]
pub enum GenerationError {
    /// The request could not be sent or the connection failed.
    #[error("request failed: {0}")]
    Request(String),

    /// The provider answered with a non-success status.
    #[error("provider returned status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, as returned.
        body: String,
    },

    /// The response could not be decoded.
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// The provider returned no usable text.
    #[error("provider returned empty content")]
    EmptyResponse,

    /// The call did not finish within the allotted time.
    #[error("generation timed out after {seconds}s")]
    Timeout {
        /// The limit that was exceeded.
        seconds: f64,
    },
}

impl GenerationError {
    /// Returns true if repeating the same request may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Request(_) | Self::Timeout { .. } => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Decode(_) | Self::EmptyResponse => false,
        }
    }
}

/// Error raised by a pipeline stage.
#[derive(Debug, Error)]
pub enum StageError {
    /// Stage configuration or task input is invalid.
    #[error("{stage} configuration invalid: {source}")]
    Config {
        /// The failing stage.
        stage: StageName,
        /// What was invalid.
        #[source]
        source: ConfigError,
    },

    /// The stage's input result is missing, failed, or from the wrong stage.
    #[error("{stage} cannot start: {message}")]
    Precondition {
        /// The failing stage.
        stage: StageName,
        /// Why the stage could not start.
        message: String,
    },

    /// The generation call failed or returned unusable output.
    #[error("{stage} generation failed: {source}")]
    Generation {
        /// The failing stage.
        stage: StageName,
        /// The generation failure.
        #[source]
        source: GenerationError,
    },

    /// The caller cancelled the run while the stage was in progress.
    #[error("{stage} cancelled: {reason}")]
    Cancelled {
        /// The interrupted stage.
        stage: StageName,
        /// The cancellation reason.
        reason: String,
    },
}

impl StageError {
    /// Creates a configuration error for a stage.
    #[must_use]
    pub fn config(stage: StageName, source: ConfigError) -> Self {
        Self::Config { stage, source }
    }

    /// Creates a precondition error for a stage.
    #[must_use]
    pub fn precondition(stage: StageName, message: impl Into<String>) -> Self {
        Self::Precondition {
            stage,
            message: message.into(),
        }
    }

    /// Creates a generation error for a stage.
    #[must_use]
    pub fn generation(stage: StageName, source: GenerationError) -> Self {
        Self::Generation { stage, source }
    }

    /// Creates a cancellation error for a stage.
    #[must_use]
    pub fn cancelled(stage: StageName, reason: impl Into<String>) -> Self {
        Self::Cancelled {
            stage,
            reason: reason.into(),
        }
    }

    /// Returns the stage that failed.
    #[must_use]
    pub fn stage(&self) -> StageName {
        match self {
            Self::Config { stage, .. }
            | Self::Precondition { stage, .. }
            | Self::Generation { stage, .. }
            | Self::Cancelled { stage, .. } => *stage,
        }
    }

    /// Returns the error kind.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config { .. } => ErrorKind::Config,
            Self::Precondition { .. } => ErrorKind::Precondition,
            Self::Generation { .. } => ErrorKind::Generation,
            Self::Cancelled { .. } => ErrorKind::Cancelled,
        }
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("stage".to_string(), serde_json::json!(self.stage()));
        map.insert("kind".to_string(), serde_json::json!(self.kind()));
        map.insert("message".to_string(), serde_json::json!(self.to_string()));
        if let Self::Generation { source, .. } = self {
            map.insert("retryable".to_string(), serde_json::json!(source.is_retryable()));
        }
        map
    }
}

/// Errors raised by the document ingestion flow.
#[derive(Debug, Error)]
pub enum IngestError {
    /// A file or directory could not be read or written.
    #[error("IO error at {path}: {source}")]
    Io {
        /// The path involved.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The embedding capability failed.
    #[error("embedding failed: {0}")]
    Embedding(String),

    /// A vector does not have the dimension the store expects.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// The store's dimension.
        expected: usize,
        /// The offending vector's dimension.
        actual: usize,
    },

    /// The persisted store could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The ingestion configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl IngestError {
    /// Creates an IO error for a path.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
