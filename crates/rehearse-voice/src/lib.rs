//! # Rehearse Voice - Spoken Interview Turn-Taking
//!
//! Drives a voice-only mock interview: speak a question, listen for the answer,
//! decide when the answer is done, splice in a follow-up, and finish only after
//! the candidate confirms out loud.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Interview Orchestrator                     │
//! │  ┌──────────────┐   effects   ┌──────────────┐               │
//! │  │    Turn      │ ──────────→ │  Playback    │ primary /     │
//! │  │  Controller  │             │  (TTS)       │ fallback      │
//! │  │ (pure state) │ ←────────── └──────────────┘               │
//! │  │              │   events    ┌──────────────┐               │
//! │  │              │ ←────────── │ Transcriber  │ partial/final │
//! │  │              │ ──────────→ │  (STT)       │               │
//! │  └──────────────┘             └──────────────┘               │
//! │     ↑  ↓                                                      │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐        │
//! │  │  Watchdog    │  │  Response    │  │ Confirmation │        │
//! │  │ (5s sliding) │  │  Handler     │  │    Gate      │        │
//! │  └──────────────┘  └──────────────┘  └──────────────┘        │
//! └──────────────────────────────────────────────────────────────┘
//! ```

pub mod adapters;
pub mod confirmation;
pub mod error;
pub mod orchestrator;
pub mod response;
pub mod turn;

pub use adapters::{PlaybackSink, SilentPlayback, SpeechPlayback, SpeechTranscriber, TranscriptSink};
pub use confirmation::{is_affirmative, CLOSING_PROMPT, REPROMPT};
pub use error::{InterviewError, TranscriptionErrorKind, VoiceError, VoiceResult};
pub use orchestrator::{InterviewCommand, InterviewHandle, InterviewOrchestrator};
pub use response::{pick_acknowledgment, Advance, ResponseHandler, ACKNOWLEDGMENTS};
pub use turn::{
    ControllerEvent, Deferred, Effect, Renderer, SpeechPurpose, TurnController, TurnSnapshot, Wake,
};
