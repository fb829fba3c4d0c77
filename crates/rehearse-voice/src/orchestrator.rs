//! **Interview orchestrator**: runs the turn controller against real adapters.
//!
//! One tokio task owns the controller, both playback renderers, and the transcriber.
//! Commands arrive through an [`InterviewHandle`], adapter callbacks and timer
//! firings through one event channel. Every resulting [`Effect`] is executed here;
//! this is the only place that touches audio or spawns timers.

use crate::adapters::{PlaybackSink, SpeechPlayback, SpeechTranscriber, TranscriptSink};
use crate::error::{TranscriptionErrorKind, VoiceError, VoiceResult};
use crate::turn::{ControllerEvent, Effect, Renderer, TurnController, TurnSnapshot};
use rehearse_core::{CandidateProfile, Session};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone)]
pub enum InterviewCommand {
    Start {
        profile: CandidateProfile,
        role: Option<String>,
    },
    StartListening,
    StopListening,
    Pause,
    Resume,
    End,
    Shutdown,
}

/// Cloneable control surface for a running orchestrator.
#[derive(Debug, Clone)]
pub struct InterviewHandle {
    commands: mpsc::UnboundedSender<InterviewCommand>,
    snapshots: watch::Receiver<TurnSnapshot>,
}

impl InterviewHandle {
    pub fn send(&self, command: InterviewCommand) -> VoiceResult<()> {
        self.commands
            .send(command)
            .map_err(|e| VoiceError::ChannelSend(e.to_string()))
    }

    pub fn start(&self, profile: CandidateProfile, role: Option<String>) -> VoiceResult<()> {
        self.send(InterviewCommand::Start { profile, role })
    }

    pub fn start_listening(&self) -> VoiceResult<()> {
        self.send(InterviewCommand::StartListening)
    }

    pub fn stop_listening(&self) -> VoiceResult<()> {
        self.send(InterviewCommand::StopListening)
    }

    pub fn pause(&self) -> VoiceResult<()> {
        self.send(InterviewCommand::Pause)
    }

    pub fn resume(&self) -> VoiceResult<()> {
        self.send(InterviewCommand::Resume)
    }

    pub fn end(&self) -> VoiceResult<()> {
        self.send(InterviewCommand::End)
    }

    pub fn shutdown(&self) -> VoiceResult<()> {
        self.send(InterviewCommand::Shutdown)
    }

    /// Latest published controller state.
    pub fn snapshot(&self) -> TurnSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<TurnSnapshot> {
        self.snapshots.clone()
    }
}

/// Restart bookkeeping for transient recognition errors within one listen turn.
#[derive(Debug, Default)]
struct RetryState {
    turn: u64,
    attempts: u32,
    timer: Option<JoinHandle<()>>,
}

impl RetryState {
    fn cancel(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

pub struct InterviewOrchestrator {
    controller: TurnController,
    primary: Box<dyn SpeechPlayback>,
    fallback: Box<dyn SpeechPlayback>,
    transcriber: Box<dyn SpeechTranscriber>,
    commands: mpsc::UnboundedReceiver<InterviewCommand>,
    events_tx: mpsc::UnboundedSender<ControllerEvent>,
    events_rx: mpsc::UnboundedReceiver<ControllerEvent>,
    restart_tx: mpsc::UnboundedSender<u64>,
    restart_rx: mpsc::UnboundedReceiver<u64>,
    snapshots: watch::Sender<TurnSnapshot>,
    completed: mpsc::UnboundedSender<Session>,
    watchdog: Option<JoinHandle<()>>,
    scheduled: Vec<JoinHandle<()>>,
    retry: RetryState,
    retry_limit: u32,
    retry_delay: Duration,
}

impl InterviewOrchestrator {
    /// Wire up an orchestrator. Returns the control handle and the stream of
    /// completed sessions alongside it.
    pub fn new(
        controller: TurnController,
        primary: Box<dyn SpeechPlayback>,
        fallback: Box<dyn SpeechPlayback>,
        transcriber: Box<dyn SpeechTranscriber>,
    ) -> (Self, InterviewHandle, mpsc::UnboundedReceiver<Session>) {
        info!("🎭 Initializing Interview Orchestrator");

        let (commands_tx, commands) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (restart_tx, restart_rx) = mpsc::unbounded_channel();
        let (completed_tx, completed_rx) = mpsc::unbounded_channel();
        let (snapshots, snapshots_rx) = watch::channel(controller.snapshot());

        let retry_limit = controller.config().transcription_retry_limit;
        let retry_delay = controller.config().transcription_retry_delay();

        let orchestrator = Self {
            controller,
            primary,
            fallback,
            transcriber,
            commands,
            events_tx,
            events_rx,
            restart_tx,
            restart_rx,
            snapshots,
            completed: completed_tx,
            watchdog: None,
            scheduled: Vec::new(),
            retry: RetryState::default(),
            retry_limit,
            retry_delay,
        };
        let handle = InterviewHandle {
            commands: commands_tx,
            snapshots: snapshots_rx,
        };
        (orchestrator, handle, completed_rx)
    }

    /// Run until `Shutdown` or until every handle is dropped.
    pub async fn run(mut self) {
        info!("🚀 Interview Orchestrator started");
        loop {
            tokio::select! {
                command = self.commands.recv() => {
                    match command {
                        None | Some(InterviewCommand::Shutdown) => break,
                        Some(command) => self.apply_command(command),
                    }
                }
                Some(event) = self.events_rx.recv() => {
                    self.apply_event(event);
                }
                Some(turn) = self.restart_rx.recv() => {
                    self.restart_transcription(turn);
                }
            }
            self.publish();
        }

        self.shutdown();
        info!("✅ Interview Orchestrator stopped");
    }

    fn apply_command(&mut self, command: InterviewCommand) {
        debug!(?command, "Command");
        let effects = match command {
            InterviewCommand::Start { profile, role } => {
                match self.controller.start(&profile, role.as_deref().unwrap_or("")) {
                    Ok(effects) => effects,
                    Err(e) => {
                        error!("Failed to start interview: {}", e);
                        Vec::new()
                    }
                }
            }
            InterviewCommand::StartListening => self.controller.start_listening(),
            InterviewCommand::StopListening => self.controller.stop_listening(),
            InterviewCommand::Pause => self.controller.pause(),
            InterviewCommand::Resume => self.controller.resume(),
            InterviewCommand::End => self.controller.end(),
            InterviewCommand::Shutdown => Vec::new(),
        };
        self.execute(effects);
    }

    fn apply_event(&mut self, event: ControllerEvent) {
        if let ControllerEvent::TranscriptionFailed { turn, ref kind } = event {
            if kind.is_transient() {
                self.retry_transient(turn, kind);
            }
        }
        let effects = self.controller.on_event(event);
        self.execute(effects);
    }

    /// Transient recognition errors restart the recognizer for the same turn, a
    /// bounded number of times. Past the limit the silence watchdog resolves the turn.
    fn retry_transient(&mut self, turn: u64, kind: &TranscriptionErrorKind) {
        if !self.controller.is_listening() || turn != self.controller.current_turn() {
            return;
        }
        if self.retry.turn != turn {
            self.retry.cancel();
            self.retry = RetryState {
                turn,
                ..RetryState::default()
            };
        }
        if self.retry.attempts >= self.retry_limit {
            warn!(turn, %kind, attempts = self.retry.attempts, "Transcription retry limit reached");
            return;
        }

        self.retry.attempts += 1;
        info!(turn, %kind, attempt = self.retry.attempts, "🔄 Restarting transcription");
        self.stop_transcriber();
        self.retry.cancel();
        let tx = self.restart_tx.clone();
        let delay = self.retry_delay;
        self.retry.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(turn);
        }));
    }

    fn restart_transcription(&mut self, turn: u64) {
        if !self.controller.is_listening() || turn != self.controller.current_turn() {
            return;
        }
        self.retry.timer = None;
        let sink = TranscriptSink::new(turn, self.events_tx.clone());
        if let Err(e) = self.transcriber.start(sink) {
            warn!(turn, "Transcription restart failed: {}", e);
            self.send_event(ControllerEvent::TranscriptionFailed {
                turn,
                kind: TranscriptionErrorKind::Other(e.to_string()),
            });
        }
    }

    fn execute(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Speak { ticket, text, renderer } => {
                    let sink = PlaybackSink::new(ticket, self.events_tx.clone());
                    let playback = match renderer {
                        Renderer::Primary => &mut self.primary,
                        Renderer::Fallback => &mut self.fallback,
                    };
                    debug!(ticket, ?renderer, "🔊 Speaking");
                    if let Err(e) = playback.play(&text, sink) {
                        self.send_event(ControllerEvent::PlaybackFailed {
                            ticket,
                            reason: e.to_string(),
                        });
                    }
                }
                Effect::CancelSpeech => {
                    self.primary.stop();
                    self.fallback.stop();
                }
                Effect::StartTranscription { turn } => {
                    self.retry.cancel();
                    self.retry = RetryState {
                        turn,
                        ..RetryState::default()
                    };
                    let sink = TranscriptSink::new(turn, self.events_tx.clone());
                    if let Err(e) = self.transcriber.start(sink) {
                        self.send_event(ControllerEvent::TranscriptionFailed {
                            turn,
                            kind: TranscriptionErrorKind::Other(e.to_string()),
                        });
                    }
                }
                Effect::StopTranscription => {
                    self.retry.cancel();
                    self.stop_transcriber();
                }
                Effect::ArmWatchdog { turn, after } => {
                    self.disarm_watchdog();
                    let tx = self.events_tx.clone();
                    self.watchdog = Some(tokio::spawn(async move {
                        tokio::time::sleep(after).await;
                        let _ = tx.send(ControllerEvent::WatchdogFired { turn });
                    }));
                }
                Effect::DisarmWatchdog => self.disarm_watchdog(),
                Effect::Schedule { after, wake } => {
                    self.scheduled.retain(|h| !h.is_finished());
                    let tx = self.events_tx.clone();
                    self.scheduled.push(tokio::spawn(async move {
                        tokio::time::sleep(after).await;
                        let _ = tx.send(ControllerEvent::Wake(wake));
                    }));
                }
                Effect::CancelScheduled => {
                    for handle in self.scheduled.drain(..) {
                        handle.abort();
                    }
                }
                Effect::ReportError(e) => {
                    warn!("⚠️ {}", e);
                }
                Effect::SessionCompleted(session) => {
                    info!(session = %session.id, "Session handed off");
                    if self.completed.send(session).is_err() {
                        debug!("No listener for completed sessions");
                    }
                }
            }
        }
    }

    fn disarm_watchdog(&mut self) {
        if let Some(handle) = self.watchdog.take() {
            handle.abort();
        }
    }

    fn send_event(&self, event: ControllerEvent) {
        let _ = self.events_tx.send(event);
    }

    fn publish(&self) {
        self.snapshots.send_replace(self.controller.snapshot());
    }

    fn shutdown(&mut self) {
        info!("🛑 Stopping Interview Orchestrator");
        self.disarm_watchdog();
        self.retry.cancel();
        for handle in self.scheduled.drain(..) {
            handle.abort();
        }
        self.primary.stop();
        self.fallback.stop();
        self.stop_transcriber();
    }

    /// Recognizers that already ended on their own (fatal error, natural end) are left alone.
    fn stop_transcriber(&mut self) {
        if self.transcriber.is_listening() {
            debug!("🎤 Stopping transcription");
            self.transcriber.stop();
        }
    }
}
