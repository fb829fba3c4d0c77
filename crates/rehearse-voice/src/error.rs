//! Error types for the turn controller and its speech adapters

use rehearse_core::CoreError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for voice operations
pub type VoiceResult<T> = Result<T, VoiceError>;

/// Errors raised by speech adapters and the orchestrator plumbing
#[derive(Error, Debug)]
pub enum VoiceError {
    #[error("Audio playback error: {0}")]
    Playback(String),

    #[error("Transcription error: {0}")]
    Transcription(String),

    #[error("Channel send error: {0}")]
    ChannelSend(String),

    #[error("Interview error: {0}")]
    Interview(#[from] InterviewError),

    #[error("Core error: {0}")]
    Core(#[from] CoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why transcription stopped or hiccupped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TranscriptionErrorKind {
    Network,
    NoSpeech,
    Aborted,
    NotSupported,
    PermissionDenied,
    Other(String),
}

impl TranscriptionErrorKind {
    /// Transient kinds are retried by the transcription layer and never surface.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network | Self::NoSpeech | Self::Aborted)
    }

    /// Parse recognizer error codes such as `no-speech` or `not-allowed`.
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_ascii_lowercase().as_str() {
            "network" => Self::Network,
            "no-speech" => Self::NoSpeech,
            "aborted" => Self::Aborted,
            "not-supported" | "unsupported" => Self::NotSupported,
            "not-allowed" | "permission-denied" | "service-not-allowed" => Self::PermissionDenied,
            other => Self::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for TranscriptionErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Network => write!(f, "network"),
            Self::NoSpeech => write!(f, "no-speech"),
            Self::Aborted => write!(f, "aborted"),
            Self::NotSupported => write!(f, "not-supported"),
            Self::PermissionDenied => write!(f, "permission-denied"),
            Self::Other(code) => write!(f, "{}", code),
        }
    }
}

/// Faults that block forward progress and land in the user-visible error slot.
///
/// Silence timeouts are not errors, and transient transcription faults never get here.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InterviewError {
    #[error("Failed to start interview: {0}")]
    Startup(String),

    #[error("Failed to play question audio ({0}). Read the question and start listening when ready.")]
    Playback(String),

    #[error("Speech recognition error: {0}. Please try again.")]
    TranscriptionFatal(TranscriptionErrorKind),

    #[error("Could not record the answer: {0}")]
    Recording(String),
}
