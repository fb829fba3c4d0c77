//! Error types for the interview core.

use thiserror::Error;

/// Result type alias for core operations
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors raised while building questions or mutating a session.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Question generation failed: {0}")]
    Generation(String),

    #[error("Question writer error: {0}")]
    Writer(String),

    #[error("Unknown question id: {0}")]
    UnknownQuestion(String),

    #[error("No current question (cursor {cursor} of {len})")]
    NoCurrentQuestion { cursor: usize, len: usize },

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Profile parse error: {0}")]
    Profile(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
