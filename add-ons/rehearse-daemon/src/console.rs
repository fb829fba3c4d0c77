//! Terminal stand-ins for the speech adapters.
//!
//! Questions are printed instead of spoken, and each line typed on stdin is taken
//! as a final transcript while the interview is listening.

use rehearse_voice::{PlaybackSink, SpeechPlayback, SpeechTranscriber, TranscriptSink, VoiceResult};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Simulated speaking rate.
const PER_WORD: Duration = Duration::from_millis(60);
const MAX_UTTERANCE: Duration = Duration::from_secs(4);

/// Prints each utterance and reports completion after a reading-time delay.
pub struct ConsoleVoice {
    label: &'static str,
    current: Option<JoinHandle<()>>,
}

impl ConsoleVoice {
    pub fn new(label: &'static str) -> Self {
        Self { label, current: None }
    }
}

impl SpeechPlayback for ConsoleVoice {
    fn play(&mut self, text: &str, sink: PlaybackSink) -> VoiceResult<()> {
        self.stop();
        println!("🗣️  [{}] {}", self.label, text);
        let words = text.split_whitespace().count() as u32;
        let delay = (PER_WORD * words).min(MAX_UTTERANCE);
        self.current = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            sink.finished();
        }));
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(task) = self.current.take() {
            task.abort();
        }
    }
}

/// Shared slot holding the sink of the live listen turn, if any.
#[derive(Clone, Default)]
pub struct Microphone {
    live: Arc<Mutex<Option<TranscriptSink>>>,
}

impl Microphone {
    /// Hand a typed line to the current turn. Returns false when nobody is listening.
    pub fn hear(&self, line: &str) -> bool {
        match self.live.lock() {
            Ok(guard) => match guard.as_ref() {
                Some(sink) => {
                    sink.final_result(line);
                    true
                }
                None => false,
            },
            Err(_) => false,
        }
    }
}

impl SpeechTranscriber for Microphone {
    fn start(&mut self, sink: TranscriptSink) -> VoiceResult<()> {
        if let Ok(mut guard) = self.live.lock() {
            *guard = Some(sink);
        }
        println!("🎤 (listening, type your answer)");
        Ok(())
    }

    fn stop(&mut self) {
        if let Ok(mut guard) = self.live.lock() {
            guard.take();
        }
    }

    fn is_listening(&self) -> bool {
        self.live.lock().map(|g| g.is_some()).unwrap_or(false)
    }
}
