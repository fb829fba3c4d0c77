//! **Speech I/O adapters**: the two audio channels the controller drives.
//!
//! Playback and transcription are external capabilities. Implementations report
//! back through the sink they are handed when started; every sink is tagged with
//! the speech ticket or listen turn it belongs to, so late callbacks from a
//! cancelled play or a finished turn are recognised and dropped by the controller.

use crate::error::{TranscriptionErrorKind, VoiceResult};
use crate::turn::ControllerEvent;
use tokio::sync::mpsc;
use tracing::debug;

/// Renders text as speech. One utterance at a time; `play` replaces whatever was playing.
pub trait SpeechPlayback: Send {
    /// Start speaking `text`. Report the outcome through `sink` exactly once.
    /// Returning `Err` counts as a playback failure; the sink is then dropped unused.
    fn play(&mut self, text: &str, sink: PlaybackSink) -> VoiceResult<()>;

    /// Cancel the current utterance, if any. Must be safe to call when idle.
    fn stop(&mut self);
}

/// Streams partial and final transcripts of the candidate's speech.
pub trait SpeechTranscriber: Send {
    fn start(&mut self, sink: TranscriptSink) -> VoiceResult<()>;

    /// Must be safe to call when not listening.
    fn stop(&mut self);

    /// Whether the recognizer is still live. Consulted before every `stop`.
    fn is_listening(&self) -> bool;
}

/// Completion handle for one `play` call.
#[derive(Debug)]
pub struct PlaybackSink {
    ticket: u64,
    tx: mpsc::UnboundedSender<ControllerEvent>,
}

impl PlaybackSink {
    pub fn new(ticket: u64, tx: mpsc::UnboundedSender<ControllerEvent>) -> Self {
        Self { ticket, tx }
    }

    pub fn ticket(&self) -> u64 {
        self.ticket
    }

    pub fn finished(self) {
        self.send(ControllerEvent::PlaybackFinished { ticket: self.ticket });
    }

    pub fn failed(self, reason: impl Into<String>) {
        self.send(ControllerEvent::PlaybackFailed {
            ticket: self.ticket,
            reason: reason.into(),
        });
    }

    fn send(&self, event: ControllerEvent) {
        if self.tx.send(event).is_err() {
            debug!(ticket = self.ticket, "playback outcome dropped: controller gone");
        }
    }
}

/// Result handle for one listen turn. Cloneable so recognizers can report from callbacks.
#[derive(Debug, Clone)]
pub struct TranscriptSink {
    turn: u64,
    tx: mpsc::UnboundedSender<ControllerEvent>,
}

impl TranscriptSink {
    pub fn new(turn: u64, tx: mpsc::UnboundedSender<ControllerEvent>) -> Self {
        Self { turn, tx }
    }

    pub fn turn(&self) -> u64 {
        self.turn
    }

    /// Whole transcript so far (not a delta).
    pub fn partial(&self, text: impl Into<String>) {
        self.send(ControllerEvent::Transcript {
            turn: self.turn,
            text: text.into(),
            is_final: false,
        });
    }

    pub fn final_result(&self, text: impl Into<String>) {
        self.send(ControllerEvent::Transcript {
            turn: self.turn,
            text: text.into(),
            is_final: true,
        });
    }

    pub fn error(&self, kind: TranscriptionErrorKind) {
        self.send(ControllerEvent::TranscriptionFailed { turn: self.turn, kind });
    }

    fn send(&self, event: ControllerEvent) {
        if self.tx.send(event).is_err() {
            debug!(turn = self.turn, "transcript dropped: controller gone");
        }
    }
}

/// Placeholder playback: finishes every utterance immediately without making a sound.
#[derive(Debug, Default)]
pub struct SilentPlayback;

impl SpeechPlayback for SilentPlayback {
    fn play(&mut self, _text: &str, sink: PlaybackSink) -> VoiceResult<()> {
        sink.finished();
        Ok(())
    }

    fn stop(&mut self) {}
}
