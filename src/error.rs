//! Error types for the quizstruct library.

use std::io;
use thiserror::Error;

/// Result type alias for quizstruct operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while processing page annotations.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing page files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A page annotation file could not be parsed as JSON.
    #[error("Malformed page annotation: {0}")]
    MalformedAnnotation(String),

    /// A box id did not follow the expected `T<n>`/`Q<n>` shape.
    #[error("Invalid box id: {0}")]
    InvalidBoxId(String),

    /// The category string is not one the parser knows about.
    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    /// A structure parser was requested for a non-question category.
    #[error("No parser profile for category: {0}")]
    NoParserProfile(String),

    /// The lesson identifiers of the parsed questions and the answer key
    /// disagree. This is fatal for the book: a silent misalignment would
    /// corrupt the correctness of every joined answer.
    #[error("Answer key mismatch: questions-only lessons {questions_only:?}, key-only lessons {key_only:?}")]
    AnswerKeyMismatch {
        /// Lesson ids present in the parsed questions but not the key.
        questions_only: Vec<String>,
        /// Lesson ids present in the key but not the parsed questions.
        key_only: Vec<String>,
    },

    /// Error serializing parsed output.
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        if err.is_io() {
            Error::Io(err.into())
        } else {
            Error::MalformedAnnotation(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidBoxId("X9".to_string());
        assert_eq!(err.to_string(), "Invalid box id: X9");

        let err = Error::AnswerKeyMismatch {
            questions_only: vec!["1.2".to_string()],
            key_only: vec![],
        };
        assert!(err.to_string().contains("1.2"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{oops").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::MalformedAnnotation(_)));
    }
}
