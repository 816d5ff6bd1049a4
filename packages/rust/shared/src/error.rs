//! Error types for Icebreaker.
//!
//! Library crates use [`IcebreakerError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.
//!
//! Per-lead failures are *not* errors: they are reported as
//! [`LeadOutcome::Failure`](crate::LeadOutcome) values. This type covers
//! infrastructure problems (config, client construction, I/O).

use std::path::PathBuf;

/// Top-level error type for all Icebreaker operations.
#[derive(Debug, thiserror::Error)]
pub enum IcebreakerError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error talking to a website or the model endpoint.
    #[error("network error: {0}")]
    Network(String),

    /// JSON or HTML parsing error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Language-model call error (API status, empty choice list, refusal).
    #[error("model error: {0}")]
    Model(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Input validation error (malformed lead, bad URL, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// HTML-to-Markdown conversion error.
    #[error("conversion error: {0}")]
    Conversion(String),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, IcebreakerError>;

impl IcebreakerError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
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
