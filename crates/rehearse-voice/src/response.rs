//! Response handling and cursor advancement.
//!
//! Records the answer against the current question, splices in a follow-up when
//! one is produced, and moves the cursor by exactly one.

use chrono::Utc;
use rand::{Rng, RngCore};
use rehearse_core::{
    CoreError, CoreResult, FollowUpPolicy, FollowUpSynthesizer, Response, Session,
};
use std::time::Duration;
use tracing::info;

/// Spoken between an answer and the next question.
pub const ACKNOWLEDGMENTS: &[&str] = &[
    "Thank you for that response.",
    "I see, that's interesting.",
    "Good, let's move on to the next question.",
    "Thank you for sharing that.",
];

/// Where the cursor landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// A question is waiting at the new cursor.
    Next,
    /// The cursor reached the end of the question list.
    Exhausted,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseHandler {
    synthesizer: FollowUpSynthesizer,
    policy: FollowUpPolicy,
}

impl ResponseHandler {
    pub fn new(policy: FollowUpPolicy) -> Self {
        Self {
            synthesizer: FollowUpSynthesizer::new(),
            policy,
        }
    }

    /// Record `answer` for the current question and advance.
    pub fn handle(
        &self,
        session: &mut Session,
        answer: &str,
        duration: Duration,
        rng: &mut dyn RngCore,
    ) -> CoreResult<Advance> {
        let question = session
            .current_question()
            .cloned()
            .ok_or(CoreError::NoCurrentQuestion {
                cursor: session.cursor(),
                len: session.questions().len(),
            })?;

        session.record_response(Response {
            question_id: question.id.clone(),
            text: answer.trim().to_string(),
            timestamp: Utc::now(),
            duration,
        })?;

        if self.policy.consults_for(&question) {
            if let Some(follow_up) = self.synthesizer.synthesize(&question, answer, rng) {
                info!(after = %question.id, follow_up = %follow_up.id, "follow-up spliced");
                session.splice_after_cursor(follow_up);
            }
        }

        Ok(Self::step(session))
    }

    /// Advance without recording anything (empty transcript).
    pub fn skip(&self, session: &mut Session) -> Advance {
        Self::step(session)
    }

    fn step(session: &mut Session) -> Advance {
        session.advance();
        if session.is_exhausted() {
            Advance::Exhausted
        } else {
            Advance::Next
        }
    }
}

pub fn pick_acknowledgment(rng: &mut dyn RngCore) -> &'static str {
    ACKNOWLEDGMENTS[rng.gen_range(0..ACKNOWLEDGMENTS.len())]
}
