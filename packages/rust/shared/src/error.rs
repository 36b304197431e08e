//! Error types for edumeta.
//!
//! Library crates use [`EduMetaError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all edumeta operations.
#[derive(Debug, thiserror::Error)]
pub enum EduMetaError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Malformed source archive or document.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// A required field is absent from the source dataset.
    #[error("missing field: dataset has no '{0}' field")]
    MissingField(String),

    /// A field (or one of its trajectories) cannot be coerced into a flat
    /// numeric sequence.
    #[error("shape error in field '{field}': {message}")]
    Shape { field: String, message: String },

    /// Flattened field lengths disagree.
    #[error("alignment error: field lengths disagree after flattening ({})", format_lengths(.lengths))]
    Alignment { lengths: Vec<(String, usize)> },

    /// A question was observed with more than one knowledge id under the
    /// `reject` policy.
    #[error("knowledge conflict: question {question_id} observed with knowledge ids {knowledge_ids:?}")]
    KnowledgeConflict {
        question_id: i64,
        knowledge_ids: Vec<i64>,
    },

    /// Data validation error (non-finite values, serialization failure, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, EduMetaError>;

fn format_lengths(lengths: &[(String, usize)]) -> String {
    lengths
        .iter()
        .map(|(name, len)| format!("{name}={len}"))
        .collect::<Vec<_>>()
        .join(", ")
}

impl EduMetaError {
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

    /// Create a shape error for the named field.
    pub fn shape(field: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Shape {
            field: field.into(),
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
        let err = EduMetaError::config("unknown knowledge policy");
        assert_eq!(err.to_string(), "config error: unknown knowledge policy");

        let err = EduMetaError::shape("skill", "trajectory 3 contains a string");
        assert_eq!(
            err.to_string(),
            "shape error in field 'skill': trajectory 3 contains a string"
        );
    }

    #[test]
    fn alignment_error_names_every_length() {
        let err = EduMetaError::Alignment {
            lengths: vec![
                ("question_id".into(), 5),
                ("skill".into(), 4),
                ("mask".into(), 5),
            ],
        };
        let msg = err.to_string();
        assert!(msg.contains("question_id=5"));
        assert!(msg.contains("skill=4"));
        assert!(msg.contains("mask=5"));
    }

    #[test]
    fn knowledge_conflict_names_question() {
        let err = EduMetaError::KnowledgeConflict {
            question_id: 42,
            knowledge_ids: vec![3, 7],
        };
        assert_eq!(
            err.to_string(),
            "knowledge conflict: question 42 observed with knowledge ids [3, 7]"
        );
    }
}
