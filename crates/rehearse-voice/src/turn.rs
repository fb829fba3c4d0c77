//! **Turn controller**: the interview state machine.
//!
//! The controller never performs I/O. Commands (`start`, `pause`, ...) and adapter
//! events go in; a list of [`Effect`]s comes out for the orchestrator to execute.
//!
//! Three counters keep late callbacks from acting on the wrong turn:
//! - `ticket`: one per `Speak`; playback events must carry the pending ticket.
//! - `turn`: one per listen; transcript and watchdog events must carry the current turn.
//! - `epoch`: bumped on start, pause, resume, and end; deferred wake-ups must match it.
//!
//! Invariant: `listening` and `speaking` are never both true.

use crate::confirmation::{is_affirmative, CLOSING_PROMPT, REPROMPT};
use crate::error::{InterviewError, TranscriptionErrorKind};
use crate::response::{pick_acknowledgment, Advance, ResponseHandler};
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rehearse_core::{CandidateProfile, InterviewConfig, QuestionSource, Session, SessionStatus};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Which speech renderer an utterance goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Renderer {
    /// Interviewer voice for questions.
    Primary,
    /// Secondary voice for acknowledgments and closing prompts, and the retry target
    /// when the primary fails.
    Fallback,
}

/// Why an utterance is being spoken; decides what happens once it ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeechPurpose {
    /// The current question. Listening follows.
    Question,
    /// Short reply after an answer. The next question follows.
    Acknowledgment,
    /// "Shall we end?" Listening for confirmation follows.
    Closing,
    /// Repeat of the closing prompt after a non-affirmative reply.
    Reprompt,
}

/// Work the controller deferred to a timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deferred {
    /// Move a preparing session to active and ask the first question.
    BeginSession,
    /// Open a listen turn after speech has ended.
    Listen,
    /// Ask the question at the cursor.
    AskQuestion,
}

/// A timer firing. Ignored unless `epoch` still matches the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Wake {
    pub epoch: u64,
    pub action: Deferred,
}

/// Everything that can happen to the controller from the outside world.
#[derive(Debug, Clone, PartialEq)]
pub enum ControllerEvent {
    /// The utterance with this ticket played to the end.
    PlaybackFinished { ticket: u64 },
    /// The utterance with this ticket could not be played.
    PlaybackFailed { ticket: u64, reason: String },
    /// Recognized speech for a listen turn. Partials replace the running transcript.
    Transcript { turn: u64, text: String, is_final: bool },
    /// The recognizer reported an error during a listen turn.
    TranscriptionFailed { turn: u64, kind: TranscriptionErrorKind },
    /// No final transcript arrived within the silence timeout.
    WatchdogFired { turn: u64 },
    /// A `Schedule` effect came due.
    Wake(Wake),
}

/// Side-effect requests, executed in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Play `text` on `renderer`; completion is reported with `ticket`.
    Speak { ticket: u64, text: String, renderer: Renderer },
    /// Cut off whatever is playing on either renderer.
    CancelSpeech,
    /// Start the recognizer for listen turn `turn`.
    StartTranscription { turn: u64 },
    StopTranscription,
    /// Replaces any armed watchdog.
    ArmWatchdog { turn: u64, after: Duration },
    DisarmWatchdog,
    /// Deliver `wake` back as an event after `after`.
    Schedule { after: Duration, wake: Wake },
    /// Drop every pending `Schedule`.
    CancelScheduled,
    /// Surface an error to the candidate.
    ReportError(InterviewError),
    /// The session reached a terminal state; this is its final copy.
    SessionCompleted(Session),
}

/// Observable controller state.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TurnSnapshot {
    pub session_id: Option<String>,
    pub status: Option<SessionStatus>,
    pub cursor: usize,
    pub question_count: usize,
    pub current_question: Option<String>,
    /// Current (or most recent) listen turn number.
    pub turn: u64,
    pub is_listening: bool,
    pub is_speaking: bool,
    pub awaiting_end_confirmation: bool,
    pub current_transcript: String,
    pub last_transcript_at: Option<DateTime<Utc>>,
    pub last_error: Option<InterviewError>,
}

#[derive(Debug, Clone)]
struct PendingSpeech {
    ticket: u64,
    text: String,
    purpose: SpeechPurpose,
    renderer: Renderer,
}

/// Owns the session and decides who talks next.
///
/// Built once per interview runner; `start` may be called again to begin a fresh
/// session, which discards the previous one.
pub struct TurnController {
    config: InterviewConfig,
    source: Box<dyn QuestionSource>,
    responses: ResponseHandler,
    rng: StdRng,
    session: Option<Session>,
    listening: bool,
    speaking: bool,
    transcript: String,
    awaiting_end_confirmation: bool,
    last_transcript_at: Option<DateTime<Utc>>,
    listen_started_at: Option<DateTime<Utc>>,
    last_error: Option<InterviewError>,
    turn: u64,
    ticket: u64,
    epoch: u64,
    pending_speech: Option<PendingSpeech>,
}

impl TurnController {
    pub fn new(config: InterviewConfig, source: Box<dyn QuestionSource>) -> Self {
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            responses: ResponseHandler::new(config.follow_up_policy),
            config,
            source,
            rng,
            session: None,
            listening: false,
            speaking: false,
            transcript: String::new(),
            awaiting_end_confirmation: false,
            last_transcript_at: None,
            listen_started_at: None,
            last_error: None,
            turn: 0,
            ticket: 0,
            epoch: 0,
            pending_speech: None,
        }
    }

    pub fn config(&self) -> &InterviewConfig {
        &self.config
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn is_listening(&self) -> bool {
        self.listening
    }

    pub fn is_speaking(&self) -> bool {
        self.speaking
    }

    pub fn awaiting_end_confirmation(&self) -> bool {
        self.awaiting_end_confirmation
    }

    /// Number of the current (or most recent) listen turn.
    pub fn current_turn(&self) -> u64 {
        self.turn
    }

    pub fn last_error(&self) -> Option<&InterviewError> {
        self.last_error.as_ref()
    }

    pub fn snapshot(&self) -> TurnSnapshot {
        let session = self.session.as_ref();
        TurnSnapshot {
            session_id: session.map(|s| s.id.clone()),
            status: session.map(|s| s.status),
            cursor: session.map(|s| s.cursor()).unwrap_or(0),
            question_count: session.map(|s| s.questions().len()).unwrap_or(0),
            current_question: session.and_then(|s| s.current_question()).map(|q| q.text.clone()),
            turn: self.turn,
            is_listening: self.listening,
            is_speaking: self.speaking,
            awaiting_end_confirmation: self.awaiting_end_confirmation,
            current_transcript: self.transcript.clone(),
            last_transcript_at: self.last_transcript_at,
            last_error: self.last_error.clone(),
        }
    }

    /// Generate questions and create a new session in `Preparing`. The first question
    /// is asked after the startup delay. Any previous session is discarded.
    pub fn start(&mut self, profile: &CandidateProfile, role: &str) -> Result<Vec<Effect>, InterviewError> {
        let role = if role.trim().is_empty() {
            self.config.default_role.clone()
        } else {
            role.trim().to_string()
        };

        let questions = match self
            .source
            .generate(profile, &role, self.config.question_count, &mut self.rng)
        {
            Ok(q) if q.is_empty() => {
                return Err(self.startup_failed("no questions were generated".to_string()))
            }
            Ok(q) => q,
            Err(e) => return Err(self.startup_failed(e.to_string())),
        };

        let mut effects = self.teardown();
        self.awaiting_end_confirmation = false;
        self.transcript.clear();
        self.last_transcript_at = None;
        self.listen_started_at = None;
        self.last_error = None;

        let session = Session::new(profile.id.clone(), role, questions);
        info!(
            session = %session.id,
            role = %session.role,
            questions = session.questions().len(),
            "🚀 Interview session created"
        );
        self.session = Some(session);

        effects.push(self.schedule(self.config.timings.startup_delay(), Deferred::BeginSession));
        Ok(effects)
    }

    /// Begin a listen turn. No-op while already listening or speaking.
    pub fn start_listening(&mut self) -> Vec<Effect> {
        if self.listening || self.speaking || !self.is_active() {
            return Vec::new();
        }

        self.turn += 1;
        self.listening = true;
        self.transcript.clear();
        self.last_transcript_at = None;
        self.listen_started_at = Some(Utc::now());
        self.last_error = None;
        debug!(turn = self.turn, "🎤 Listening");

        vec![
            Effect::StartTranscription { turn: self.turn },
            Effect::ArmWatchdog {
                turn: self.turn,
                after: self.config.timings.silence_timeout(),
            },
        ]
    }

    /// Resolve the current listen turn now with whatever transcript is available.
    pub fn stop_listening(&mut self) -> Vec<Effect> {
        if !self.listening {
            return Vec::new();
        }
        debug!(turn = self.turn, "Manual stop");
        self.resolve_turn()
    }

    /// Halt audio in both directions. Nothing from the interrupted turn is recorded.
    pub fn pause(&mut self) -> Vec<Effect> {
        let pausable = matches!(
            self.session.as_ref().map(|s| s.status),
            Some(SessionStatus::Preparing | SessionStatus::Active)
        );
        if !pausable {
            return Vec::new();
        }

        let effects = self.teardown();
        if let Some(session) = self.session.as_mut() {
            session.status = SessionStatus::Paused;
            info!(session = %session.id, cursor = session.cursor(), "⏸️ Interview paused");
        }
        effects
    }

    /// Re-ask the current question from scratch (or the closing prompt at the end).
    pub fn resume(&mut self) -> Vec<Effect> {
        match self.session.as_mut() {
            Some(session) if session.status == SessionStatus::Paused => {
                session.status = SessionStatus::Active;
                info!(session = %session.id, cursor = session.cursor(), "▶️ Interview resumed");
            }
            _ => return Vec::new(),
        }

        self.epoch += 1;
        if self.awaiting_end_confirmation {
            self.speak(CLOSING_PROMPT.to_string(), SpeechPurpose::Closing, Renderer::Fallback)
        } else {
            self.ask_current_question()
        }
    }

    /// Tear everything down and complete the session. Safe from any state.
    pub fn end(&mut self) -> Vec<Effect> {
        match self.session.as_ref() {
            Some(session) if !session.status.is_terminal() => {}
            _ => return Vec::new(),
        }

        let mut effects = self.teardown();
        self.awaiting_end_confirmation = false;
        if let Some(session) = self.session.as_mut() {
            session.complete();
            info!(
                session = %session.id,
                answered = session.responses().len(),
                questions = session.questions().len(),
                "🏁 Interview completed"
            );
            effects.push(Effect::SessionCompleted(session.clone()));
        }
        effects
    }

    pub fn on_event(&mut self, event: ControllerEvent) -> Vec<Effect> {
        match event {
            ControllerEvent::PlaybackFinished { ticket } => match self.take_pending(ticket) {
                Some(pending) => self.after_speech(pending.purpose),
                None => Vec::new(),
            },
            ControllerEvent::PlaybackFailed { ticket, reason } => match self.take_pending(ticket) {
                Some(pending) => self.playback_failed(pending, reason),
                None => Vec::new(),
            },
            ControllerEvent::Transcript { turn, text, is_final } => {
                if !self.is_live_turn(turn) {
                    debug!(turn, current = self.turn, "Stale transcript ignored");
                    return Vec::new();
                }
                self.last_transcript_at = Some(Utc::now());
                if is_final && !text.trim().is_empty() {
                    self.transcript = text;
                    return self.resolve_turn();
                }
                if !is_final {
                    self.transcript = text;
                }
                vec![Effect::ArmWatchdog {
                    turn,
                    after: self.config.timings.silence_timeout(),
                }]
            }
            ControllerEvent::TranscriptionFailed { turn, kind } => {
                if !self.is_live_turn(turn) {
                    return Vec::new();
                }
                if kind.is_transient() {
                    debug!(turn, %kind, "Transient transcription error ignored");
                    return Vec::new();
                }
                warn!(turn, %kind, "Transcription failed");
                self.listening = false;
                let error = InterviewError::TranscriptionFatal(kind);
                self.last_error = Some(error.clone());
                vec![
                    Effect::StopTranscription,
                    Effect::DisarmWatchdog,
                    Effect::ReportError(error),
                ]
            }
            ControllerEvent::WatchdogFired { turn } => {
                if !self.is_live_turn(turn) {
                    return Vec::new();
                }
                debug!(turn, transcript_len = self.transcript.len(), "⏱️ Silence timeout");
                self.resolve_turn()
            }
            ControllerEvent::Wake(wake) => self.on_wake(wake),
        }
    }

    fn on_wake(&mut self, wake: Wake) -> Vec<Effect> {
        if wake.epoch != self.epoch {
            debug!(epoch = wake.epoch, current = self.epoch, "Stale wake-up ignored");
            return Vec::new();
        }
        match wake.action {
            Deferred::BeginSession => {
                match self.session.as_mut() {
                    Some(session) if session.status == SessionStatus::Preparing => {
                        session.status = SessionStatus::Active;
                    }
                    _ => return Vec::new(),
                }
                self.ask_current_question()
            }
            Deferred::Listen => self.start_listening(),
            Deferred::AskQuestion if self.is_active() => self.ask_current_question(),
            Deferred::AskQuestion => Vec::new(),
        }
    }

    fn ask_current_question(&mut self) -> Vec<Effect> {
        let text = match self.session.as_ref().and_then(|s| s.current_question()) {
            Some(q) => {
                info!(question = %q.id, category = q.category.label(), "❓ Asking question");
                q.text.clone()
            }
            None => return Vec::new(),
        };
        self.speak(text, SpeechPurpose::Question, Renderer::Primary)
    }

    /// Request playback, tearing down listening and any in-flight speech first.
    fn speak(&mut self, text: String, purpose: SpeechPurpose, renderer: Renderer) -> Vec<Effect> {
        let mut effects = Vec::new();
        if self.listening {
            self.listening = false;
            effects.push(Effect::StopTranscription);
            effects.push(Effect::DisarmWatchdog);
        }
        if self.speaking || self.pending_speech.is_some() {
            effects.push(Effect::CancelSpeech);
        }

        self.ticket += 1;
        self.speaking = true;
        self.pending_speech = Some(PendingSpeech {
            ticket: self.ticket,
            text: text.clone(),
            purpose,
            renderer,
        });
        effects.push(Effect::Speak {
            ticket: self.ticket,
            text,
            renderer,
        });
        effects
    }

    fn take_pending(&mut self, ticket: u64) -> Option<PendingSpeech> {
        match self.pending_speech.as_ref() {
            Some(p) if p.ticket == ticket => {
                self.speaking = false;
                self.pending_speech.take()
            }
            _ => {
                debug!(ticket, "Stale playback event ignored");
                None
            }
        }
    }

    fn after_speech(&mut self, purpose: SpeechPurpose) -> Vec<Effect> {
        let timings = self.config.timings;
        let (after, action) = match purpose {
            SpeechPurpose::Question => (timings.listen_delay(), Deferred::Listen),
            SpeechPurpose::Acknowledgment => (timings.next_question_delay(), Deferred::AskQuestion),
            SpeechPurpose::Closing => (timings.closing_listen_delay(), Deferred::Listen),
            SpeechPurpose::Reprompt => (timings.reprompt_listen_delay(), Deferred::Listen),
        };
        vec![self.schedule(after, action)]
    }

    fn playback_failed(&mut self, pending: PendingSpeech, reason: String) -> Vec<Effect> {
        match (pending.purpose, pending.renderer) {
            (SpeechPurpose::Question, Renderer::Primary) => {
                warn!(ticket = pending.ticket, %reason, "🔊 Primary playback failed, using fallback renderer");
                self.speak(pending.text, SpeechPurpose::Question, Renderer::Fallback)
            }
            (SpeechPurpose::Question, Renderer::Fallback) => {
                warn!(ticket = pending.ticket, %reason, "🔊 Fallback playback failed, waiting for manual listen");
                let error = InterviewError::Playback(reason);
                self.last_error = Some(error.clone());
                vec![Effect::ReportError(error)]
            }
            (purpose, _) => {
                debug!(?purpose, %reason, "Prompt playback failed, continuing");
                self.after_speech(purpose)
            }
        }
    }

    /// Shared by final result, watchdog, and manual stop. Runs at most once per turn.
    fn resolve_turn(&mut self) -> Vec<Effect> {
        self.listening = false;
        let mut effects = vec![Effect::StopTranscription, Effect::DisarmWatchdog];
        let answer = self.transcript.trim().to_string();

        if self.awaiting_end_confirmation {
            if is_affirmative(&answer) {
                info!(utterance = %answer, "Confirmation received");
                effects.extend(self.end());
            } else {
                debug!(utterance = %answer, "Not a confirmation, re-prompting");
                effects.extend(self.speak(REPROMPT.to_string(), SpeechPurpose::Reprompt, Renderer::Fallback));
            }
            return effects;
        }

        let Some(session) = self.session.as_mut() else {
            return effects;
        };

        let answered = !answer.is_empty();
        let advance = if answered {
            let duration = self
                .listen_started_at
                .map(|at| (Utc::now() - at).to_std().unwrap_or_default())
                .unwrap_or_default();
            match self.responses.handle(session, &answer, duration, &mut self.rng) {
                Ok(advance) => advance,
                Err(e) => {
                    warn!(error = %e, "Answer could not be recorded");
                    let error = InterviewError::Recording(e.to_string());
                    self.last_error = Some(error.clone());
                    effects.push(Effect::ReportError(error));
                    return effects;
                }
            }
        } else {
            debug!(cursor = session.cursor(), "⏭️ Empty answer, skipping question");
            self.responses.skip(session)
        };

        match advance {
            Advance::Exhausted => {
                info!("All questions asked, awaiting end confirmation");
                self.awaiting_end_confirmation = true;
                effects.extend(self.speak(CLOSING_PROMPT.to_string(), SpeechPurpose::Closing, Renderer::Fallback));
            }
            Advance::Next if answered => {
                let ack = pick_acknowledgment(&mut self.rng).to_string();
                effects.extend(self.speak(ack, SpeechPurpose::Acknowledgment, Renderer::Fallback));
            }
            Advance::Next => {
                effects.push(self.schedule(self.config.timings.skip_delay(), Deferred::AskQuestion));
            }
        }
        effects
    }

    /// Stop all audio and invalidate every outstanding callback and timer.
    fn teardown(&mut self) -> Vec<Effect> {
        self.epoch += 1;
        self.listening = false;
        self.speaking = false;
        self.pending_speech = None;
        vec![
            Effect::CancelSpeech,
            Effect::StopTranscription,
            Effect::DisarmWatchdog,
            Effect::CancelScheduled,
        ]
    }

    fn schedule(&self, after: Duration, action: Deferred) -> Effect {
        Effect::Schedule {
            after,
            wake: Wake {
                epoch: self.epoch,
                action,
            },
        }
    }

    fn startup_failed(&mut self, reason: String) -> InterviewError {
        warn!(%reason, "Interview could not start");
        let error = InterviewError::Startup(reason);
        self.last_error = Some(error.clone());
        error
    }

    fn is_active(&self) -> bool {
        self.session.as_ref().map(|s| s.status) == Some(SessionStatus::Active)
    }

    fn is_live_turn(&self, turn: u64) -> bool {
        self.listening && turn == self.turn
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, RngCore};
    use rehearse_core::{
        CoreError, CoreResult, Difficulty, FollowUpPolicy, Question, QuestionCategory,
    };

    struct FixedSource(usize);

    impl QuestionSource for FixedSource {
        fn generate(
            &self,
            _profile: &CandidateProfile,
            _role: &str,
            count: usize,
            _rng: &mut dyn RngCore,
        ) -> CoreResult<Vec<Question>> {
            Ok((0..self.0.min(count))
                .map(|i| {
                    Question::new(
                        format!("q{}", i),
                        format!("Question number {}?", i),
                        QuestionCategory::Behavioral,
                        Difficulty::Medium,
                    )
                })
                .collect())
        }
    }

    struct BrokenSource;

    impl QuestionSource for BrokenSource {
        fn generate(&self, _: &CandidateProfile, _: &str, _: usize, _: &mut dyn RngCore) -> CoreResult<Vec<Question>> {
            Err(CoreError::Generation("rate limited".into()))
        }
    }

    fn controller(questions: usize, policy: FollowUpPolicy) -> TurnController {
        let config = InterviewConfig {
            rng_seed: Some(7),
            follow_up_policy: policy,
            ..InterviewConfig::default()
        };
        TurnController::new(config, Box::new(FixedSource(questions)))
    }

    fn wake_of(effects: &[Effect]) -> Wake {
        effects
            .iter()
            .find_map(|e| match e {
                Effect::Schedule { wake, .. } => Some(*wake),
                _ => None,
            })
            .expect("schedule effect")
    }

    fn ticket_of(effects: &[Effect]) -> u64 {
        effects
            .iter()
            .find_map(|e| match e {
                Effect::Speak { ticket, .. } => Some(*ticket),
                _ => None,
            })
            .expect("speak effect")
    }

    fn spoken(effects: &[Effect]) -> Option<String> {
        effects.iter().find_map(|e| match e {
            Effect::Speak { text, .. } => Some(text.clone()),
            _ => None,
        })
    }

    /// Drive from `start` to listening on the first question.
    fn started(c: &mut TurnController) {
        let effects = c.start(&CandidateProfile::new("cand"), "").unwrap();
        let effects = c.on_event(ControllerEvent::Wake(wake_of(&effects)));
        assert_eq!(c.session().unwrap().status, SessionStatus::Active);
        listen_after_speech(c, &effects);
    }

    fn listen_after_speech(c: &mut TurnController, effects: &[Effect]) {
        let effects = c.on_event(ControllerEvent::PlaybackFinished { ticket: ticket_of(effects) });
        c.on_event(ControllerEvent::Wake(wake_of(&effects)));
        assert!(c.is_listening());
    }

    #[test]
    fn start_schedules_first_question() {
        let mut c = controller(3, FollowUpPolicy::Disabled);
        let effects = c.start(&CandidateProfile::new("cand"), "").unwrap();
        assert_eq!(c.session().unwrap().status, SessionStatus::Preparing);
        assert_eq!(c.session().unwrap().role, "software engineer");
        assert!(effects.iter().any(|e| matches!(
            e,
            Effect::Schedule { after, wake: Wake { action: Deferred::BeginSession, .. } }
                if *after == Duration::from_millis(1000)
        )));

        let effects = c.on_event(ControllerEvent::Wake(wake_of(&effects)));
        assert_eq!(spoken(&effects).as_deref(), Some("Question number 0?"));
        assert!(c.is_speaking());
    }

    #[test]
    fn failed_generation_creates_no_session() {
        let mut c = TurnController::new(InterviewConfig::default(), Box::new(BrokenSource));
        let err = c.start(&CandidateProfile::new("cand"), "dev").unwrap_err();
        assert!(matches!(err, InterviewError::Startup(_)));
        assert!(c.session().is_none());
        assert_eq!(c.last_error(), Some(&err));

        let mut empty = controller(0, FollowUpPolicy::Disabled);
        assert!(empty.start(&CandidateProfile::new("cand"), "dev").is_err());
        assert!(empty.session().is_none());
    }

    #[test]
    fn manual_stop_with_empty_transcript_on_final_question_awaits_confirmation() {
        let mut c = controller(1, FollowUpPolicy::Always);
        started(&mut c);

        let effects = c.stop_listening();
        let session = c.session().unwrap();
        assert_eq!(session.cursor(), 1);
        assert!(session.is_exhausted());
        assert!(session.responses().is_empty());
        assert!(c.awaiting_end_confirmation());
        assert_eq!(session.status, SessionStatus::Active);
        assert_eq!(spoken(&effects).as_deref(), Some(CLOSING_PROMPT));
    }

    #[test]
    fn only_affirmative_utterance_completes() {
        let mut c = controller(1, FollowUpPolicy::Disabled);
        started(&mut c);
        let effects = c.stop_listening();
        listen_after_speech(&mut c, &effects);

        let turn = c.current_turn();
        let effects = c.on_event(ControllerEvent::Transcript {
            turn,
            text: "hmm, one moment".into(),
            is_final: true,
        });
        assert_eq!(spoken(&effects).as_deref(), Some(REPROMPT));
        assert_eq!(c.session().unwrap().status, SessionStatus::Active);
        assert!(c.awaiting_end_confirmation());

        listen_after_speech(&mut c, &effects);
        let turn = c.current_turn();
        let effects = c.on_event(ControllerEvent::Transcript {
            turn,
            text: "End interview".into(),
            is_final: true,
        });
        assert_eq!(c.session().unwrap().status, SessionStatus::Completed);
        assert!(c.session().unwrap().ended_at.is_some());
        assert!(!c.awaiting_end_confirmation());
        assert!(effects.iter().any(|e| matches!(e, Effect::SessionCompleted(_))));
    }

    #[test]
    fn answer_is_acknowledged_then_next_question_asked() {
        let mut c = controller(2, FollowUpPolicy::Disabled);
        started(&mut c);
        let turn = c.current_turn();

        c.on_event(ControllerEvent::Transcript { turn, text: "I led".into(), is_final: false });
        let effects = c.on_event(ControllerEvent::Transcript {
            turn,
            text: "I led the migration".into(),
            is_final: true,
        });
        assert!(!c.is_listening());
        assert!(effects.contains(&Effect::DisarmWatchdog));
        let ack = spoken(&effects).unwrap();
        assert!(crate::response::ACKNOWLEDGMENTS.contains(&ack.as_str()));
        assert_eq!(c.session().unwrap().responses()[0].text, "I led the migration");

        // Acknowledgment playback fails; the interview still moves on.
        let effects = c.on_event(ControllerEvent::PlaybackFailed {
            ticket: ticket_of(&effects),
            reason: "no voices".into(),
        });
        assert!(effects.iter().any(|e| matches!(
            e,
            Effect::Schedule { after, wake: Wake { action: Deferred::AskQuestion, .. } }
                if *after == Duration::from_millis(1000)
        )));
        let effects = c.on_event(ControllerEvent::Wake(wake_of(&effects)));
        assert_eq!(spoken(&effects).as_deref(), Some("Question number 1?"));
    }

    #[test]
    fn empty_answer_skips_without_acknowledgment() {
        let mut c = controller(2, FollowUpPolicy::Always);
        started(&mut c);
        let turn = c.current_turn();
        let effects = c.on_event(ControllerEvent::WatchdogFired { turn });
        assert!(spoken(&effects).is_none());
        assert!(c.session().unwrap().responses().is_empty());
        assert_eq!(c.session().unwrap().cursor(), 1);
        assert_eq!(c.session().unwrap().questions().len(), 2);
        assert!(matches!(
            effects.last(),
            Some(Effect::Schedule { wake: Wake { action: Deferred::AskQuestion, .. }, .. })
        ));
    }

    #[test]
    fn partial_rearms_watchdog_and_resolution_happens_once() {
        let mut c = controller(3, FollowUpPolicy::Disabled);
        started(&mut c);
        let turn = c.current_turn();

        let effects = c.on_event(ControllerEvent::Transcript { turn, text: "I think".into(), is_final: false });
        assert_eq!(effects, vec![Effect::ArmWatchdog { turn, after: Duration::from_millis(5000) }]);

        // Blank final behaves like a partial.
        let effects = c.on_event(ControllerEvent::Transcript { turn, text: "  ".into(), is_final: true });
        assert!(matches!(effects.as_slice(), [Effect::ArmWatchdog { .. }]));
        assert!(c.is_listening());

        c.on_event(ControllerEvent::WatchdogFired { turn });
        assert_eq!(c.session().unwrap().responses().len(), 1);
        assert_eq!(c.session().unwrap().responses()[0].text, "I think");

        // A late final and a second watchdog for the same turn change nothing.
        assert!(c
            .on_event(ControllerEvent::Transcript { turn, text: "late".into(), is_final: true })
            .is_empty());
        assert!(c.on_event(ControllerEvent::WatchdogFired { turn }).is_empty());
        assert_eq!(c.session().unwrap().responses().len(), 1);
        assert_eq!(c.session().unwrap().cursor(), 1);
    }

    #[test]
    fn question_playback_falls_back_then_reports() {
        let mut c = controller(2, FollowUpPolicy::Disabled);
        let effects = c.start(&CandidateProfile::new("cand"), "").unwrap();
        let effects = c.on_event(ControllerEvent::Wake(wake_of(&effects)));

        let effects = c.on_event(ControllerEvent::PlaybackFailed {
            ticket: ticket_of(&effects),
            reason: "tts down".into(),
        });
        assert!(effects.iter().any(|e| matches!(e, Effect::Speak { renderer: Renderer::Fallback, .. })));
        assert!(c.is_speaking());

        let effects = c.on_event(ControllerEvent::PlaybackFailed {
            ticket: ticket_of(&effects),
            reason: "no synth".into(),
        });
        assert!(!c.is_speaking());
        assert!(!c.is_listening());
        assert!(matches!(effects.as_slice(), [Effect::ReportError(InterviewError::Playback(_))]));
        assert_eq!(c.session().unwrap().cursor(), 0);

        // Manual listen still works.
        assert!(!c.start_listening().is_empty());
        assert!(c.is_listening());
        assert!(c.last_error().is_none());
    }

    #[test]
    fn fatal_transcription_error_stops_listening_only() {
        let mut c = controller(2, FollowUpPolicy::Disabled);
        started(&mut c);
        let turn = c.current_turn();

        assert!(c
            .on_event(ControllerEvent::TranscriptionFailed { turn, kind: TranscriptionErrorKind::NoSpeech })
            .is_empty());
        assert!(c.is_listening());

        let effects = c.on_event(ControllerEvent::TranscriptionFailed {
            turn,
            kind: TranscriptionErrorKind::PermissionDenied,
        });
        assert!(!c.is_listening());
        assert!(effects.contains(&Effect::StopTranscription));
        assert_eq!(c.session().unwrap().cursor(), 0);
        assert_eq!(c.session().unwrap().status, SessionStatus::Active);
        assert!(matches!(c.last_error(), Some(InterviewError::TranscriptionFatal(_))));
    }

    #[test]
    fn pause_invalidates_pending_work_and_resume_reasks() {
        let mut c = controller(2, FollowUpPolicy::Disabled);
        started(&mut c);
        let turn = c.current_turn();
        c.on_event(ControllerEvent::Transcript { turn, text: "half an answ".into(), is_final: false });

        let effects = c.pause();
        assert!(effects.contains(&Effect::CancelScheduled));
        assert!(effects.contains(&Effect::StopTranscription));
        assert!(!c.is_listening() && !c.is_speaking());
        assert_eq!(c.session().unwrap().status, SessionStatus::Paused);

        assert!(c.on_event(ControllerEvent::WatchdogFired { turn }).is_empty());
        assert!(c.session().unwrap().responses().is_empty());
        assert!(c.start_listening().is_empty());

        let effects = c.resume();
        assert_eq!(c.session().unwrap().status, SessionStatus::Active);
        assert_eq!(spoken(&effects).as_deref(), Some("Question number 0?"));
    }

    #[test]
    fn stale_wake_after_pause_is_ignored() {
        let mut c = controller(2, FollowUpPolicy::Disabled);
        let effects = c.start(&CandidateProfile::new("cand"), "").unwrap();
        let wake = wake_of(&effects);
        c.pause();
        assert!(c.on_event(ControllerEvent::Wake(wake)).is_empty());
        assert_eq!(c.session().unwrap().status, SessionStatus::Paused);

        let effects = c.resume();
        assert_eq!(spoken(&effects).as_deref(), Some("Question number 0?"));
    }

    #[test]
    fn resume_while_confirming_repeats_closing_prompt() {
        let mut c = controller(1, FollowUpPolicy::Disabled);
        started(&mut c);
        c.stop_listening();
        c.pause();
        let effects = c.resume();
        assert_eq!(spoken(&effects).as_deref(), Some(CLOSING_PROMPT));
    }

    #[test]
    fn end_is_idempotent_and_safe_without_session() {
        let mut c = controller(2, FollowUpPolicy::Disabled);
        assert!(c.end().is_empty());

        started(&mut c);
        let effects = c.end();
        assert!(effects.contains(&Effect::CancelSpeech));
        assert!(effects.contains(&Effect::CancelScheduled));
        assert!(effects.iter().any(|e| matches!(e, Effect::SessionCompleted(_))));
        let ended_at = c.session().unwrap().ended_at;

        assert!(c.end().is_empty());
        assert_eq!(c.session().unwrap().ended_at, ended_at);
        assert!(!c.is_listening() && !c.is_speaking());
    }

    #[test]
    fn new_start_replaces_session() {
        let mut c = controller(2, FollowUpPolicy::Disabled);
        started(&mut c);
        let first = c.session().unwrap().id.clone();
        c.start(&CandidateProfile::new("cand"), "").unwrap();
        assert_ne!(c.session().unwrap().id, first);
        assert!(!c.is_listening());
    }

    #[test]
    fn follow_up_is_asked_after_answer() {
        let mut c = controller(2, FollowUpPolicy::Always);
        started(&mut c);
        let turn = c.current_turn();
        c.on_event(ControllerEvent::Transcript {
            turn,
            text: "I improved latency by 15% using Redis".into(),
            is_final: true,
        });
        let session = c.session().unwrap();
        assert_eq!(session.questions().len(), 3);
        assert!(session.current_question().unwrap().is_follow_up());
    }

    /// Random interleavings of commands and adapter callbacks, live and stale.
    #[test]
    fn listening_and_speaking_are_mutually_exclusive() {
        for seed in 0..40u64 {
            let mut driver = StdRng::seed_from_u64(seed);
            let mut c = controller(4, FollowUpPolicy::Always);
            let mut pending: Vec<ControllerEvent> = Vec::new();
            let absorb = |effects: Vec<Effect>, pending: &mut Vec<ControllerEvent>, rng: &mut StdRng| {
                for effect in effects {
                    match effect {
                        Effect::Speak { ticket, .. } => {
                            if rng.gen_bool(0.8) {
                                pending.push(ControllerEvent::PlaybackFinished { ticket });
                            } else {
                                pending.push(ControllerEvent::PlaybackFailed { ticket, reason: "x".into() });
                            }
                        }
                        Effect::StartTranscription { turn } => {
                            pending.push(ControllerEvent::Transcript { turn, text: "part".into(), is_final: false });
                            pending.push(ControllerEvent::Transcript {
                                turn,
                                text: ["yes done", "we used docker", ""][rng.gen_range(0..3)].into(),
                                is_final: true,
                            });
                            pending.push(ControllerEvent::TranscriptionFailed {
                                turn,
                                kind: TranscriptionErrorKind::Network,
                            });
                        }
                        Effect::ArmWatchdog { turn, .. } => pending.push(ControllerEvent::WatchdogFired { turn }),
                        Effect::Schedule { wake, .. } => pending.push(ControllerEvent::Wake(wake)),
                        _ => {}
                    }
                }
            };

            let effects = c.start(&CandidateProfile::new("cand"), "").unwrap();
            absorb(effects, &mut pending, &mut driver);

            for _ in 0..300 {
                let roll = driver.gen_range(0..100);
                let effects = if roll < 4 {
                    c.pause()
                } else if roll < 8 {
                    c.resume()
                } else if roll < 12 {
                    c.start_listening()
                } else if roll < 16 {
                    c.stop_listening()
                } else if roll < 17 {
                    c.end()
                } else if pending.is_empty() {
                    Vec::new()
                } else {
                    // Events are delivered out of order and may be replayed.
                    let i = driver.gen_range(0..pending.len());
                    let event = if driver.gen_bool(0.9) {
                        pending.swap_remove(i)
                    } else {
                        pending[i].clone()
                    };
                    c.on_event(event)
                };
                absorb(effects, &mut pending, &mut driver);

                assert!(!(c.is_listening() && c.is_speaking()), "seed {}", seed);
                let s = c.session().unwrap();
                assert!(s.cursor() <= s.questions().len());
                if s.status.is_terminal() {
                    assert!(!c.is_listening() && !c.is_speaking());
                }
            }
        }
    }
}
