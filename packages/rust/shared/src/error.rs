//! Error types for the municipality URI enricher.
//!
//! Library crates use [`MuniUriError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all enrichment operations.
#[derive(Debug, thiserror::Error)]
pub enum MuniUriError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error while querying an endpoint.
    #[error("network error: {0}")]
    Network(String),

    /// CSV or JSON parsing error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (missing column, duplicate key, unknown resource, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// The merged table does not have one row per canonical municipality.
    #[error("row count mismatch after merge: expected {expected} rows, got {actual}")]
    RowCountMismatch { expected: usize, actual: usize },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, MuniUriError>;

impl MuniUriError {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = MuniUriError::config("no sources configured");
        assert_eq!(err.to_string(), "config error: no sources configured");

        let err = MuniUriError::validation("missing column `city`");
        assert!(err.to_string().contains("`city`"));
    }

    #[test]
    fn row_count_mismatch_reports_both_sides() {
        let err = MuniUriError::RowCountMismatch {
            expected: 5570,
            actual: 5571,
        };
        let msg = err.to_string();
        assert!(msg.contains("5570"));
        assert!(msg.contains("5571"));
    }
}
