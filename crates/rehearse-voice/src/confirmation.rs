//! End-of-session confirmation gate.
//!
//! After the last question the controller stops asking and waits for the
//! candidate to say they are done. Only an affirmative utterance ends the session.

use once_cell::sync::Lazy;
use regex::Regex;

/// Spoken once the question list is exhausted.
pub const CLOSING_PROMPT: &str =
    "That was the final question. If you're ready to finish, say 'end interview' to end the meeting.";

/// Spoken after a non-affirmative (or empty) reply while waiting for confirmation.
pub const REPROMPT: &str = "If you're ready, say 'end interview' to finish.";

// Word-bounded so "weekend" or "pending" do not end the interview.
static AFFIRMATIVE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(end|ending|finish|finished|submit|complete|completed|done|stop|yes)\b")
        .expect("affirmative regex")
});

/// True when `utterance` asks to end the interview.
pub fn is_affirmative(utterance: &str) -> bool {
    AFFIRMATIVE_RE.is_match(utterance)
}
