//! Error types for the tutoring core.

use crate::subject::Subject;
use std::path::PathBuf;

/// Failures while loading or validating lesson content.
#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    #[error("Unknown subject: '{0}'")]
    UnknownSubject(String),
    #[error("Content is missing subject '{0}'")]
    MissingSubject(Subject),
    #[error("Subject '{0}' has an empty {1} sequence")]
    EmptySequence(Subject, &'static str),
    #[error("Failed to parse content document: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Failed to read content file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Failures of the setup step that precedes the first tick.
///
/// The display text is the status line shown to the learner.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SetupError {
    #[error("Error loading models.")]
    ModelLoad(String),
    #[error("Camera access denied or unavailable.")]
    Camera(String),
}

impl SetupError {
    /// The underlying cause, for logs.
    pub fn reason(&self) -> &str {
        match self {
            SetupError::ModelLoad(reason) | SetupError::Camera(reason) => reason,
        }
    }
}

/// Errors returned by the lesson lifecycle operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LessonError {
    #[error("Choose a subject first.")]
    NoSubjectSelected,
    #[error("A lesson is already running.")]
    AlreadyRunning,
    #[error(transparent)]
    Setup(#[from] SetupError),
    #[error("The lesson was stopped before it started.")]
    Interrupted,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_error_display_is_status_text() {
        let err = SetupError::Camera("NotAllowedError".to_string());
        assert_eq!(err.to_string(), "Camera access denied or unavailable.");
        assert_eq!(err.reason(), "NotAllowedError");

        let lesson_err: LessonError = SetupError::ModelLoad("404".to_string()).into();
        assert_eq!(lesson_err.to_string(), "Error loading models.");
    }

    #[test]
    fn test_content_error_display() {
        let err = ContentError::EmptySequence(Subject::Java, "base");
        assert_eq!(err.to_string(), "Subject 'java' has an empty base sequence");
    }
}
