//! Error types for SiteScout.
//!
//! Library crates use [`SiteScoutError`] via `thiserror`. The job entry point
//! never returns these to its caller: they are folded into a failed
//! `ResearchResult`. The CLI wraps them with `color-eyre`.

use std::path::PathBuf;

use crate::types::JobState;

/// Top-level error type for all SiteScout operations.
#[derive(Debug, thiserror::Error)]
pub enum SiteScoutError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// HTTP client construction error.
    #[error("network error: {0}")]
    Network(String),

    /// Input validation error (malformed domain, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A job tried to move between two states that are not connected.
    #[error("invalid job state transition: {from} -> {to}")]
    InvalidTransition { from: JobState, to: JobState },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, SiteScoutError>;

impl SiteScoutError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
