//! Error types for Shearwater.
//!
//! Library crates use [`ShearwaterError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all Shearwater operations.
#[derive(Debug, thiserror::Error)]
pub enum ShearwaterError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Platform API error (auth, fetch, publish).
    #[error("platform error: {0}")]
    Platform(String),

    /// Moderation service error (transport or malformed verdict).
    #[error("moderation error: {0}")]
    Moderation(String),

    /// The isolated inference worker failed: non-zero exit, missing answer
    /// envelope, or timeout. Carries the worker's diagnostic output and the
    /// exact invocation parameters. Fatal — never retried.
    #[error("inference error: {message} (model={model}, question={question:?}): {diagnostics}")]
    Inference {
        message: String,
        model: String,
        question: String,
        diagnostics: String,
    },

    /// The moderation retry bound was exceeded: the model never produced a
    /// policy-clean answer span. Distinct from [`Self::Inference`] so callers
    /// can tell "never clean" from "worker crashed".
    #[error("moderation rejected every answer after {attempts} attempts")]
    ModerationExhausted { attempts: u32 },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (empty corpus, malformed response, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ShearwaterError>;

impl ShearwaterError {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = ShearwaterError::config("missing API token");
        assert_eq!(err.to_string(), "config error: missing API token");

        let err = ShearwaterError::validation("corpus file is empty");
        assert!(err.to_string().contains("corpus file is empty"));
    }

    #[test]
    fn inference_error_carries_invocation_parameters() {
        let err = ShearwaterError::Inference {
            message: "worker exited with status 3".into(),
            model: "distilbert-base-cased-distilled-squad".into(),
            question: "what is the capital?".into(),
            diagnostics: "model not found".into(),
        };
        let text = err.to_string();
        assert!(text.contains("status 3"));
        assert!(text.contains("distilbert"));
        assert!(text.contains("what is the capital?"));
        assert!(text.contains("model not found"));
    }

    #[test]
    fn exhaustion_is_distinct_from_inference() {
        let err = ShearwaterError::ModerationExhausted { attempts: 5 };
        assert!(err.to_string().contains("5 attempts"));
        assert!(!matches!(err, ShearwaterError::Inference { .. }));
    }
}
