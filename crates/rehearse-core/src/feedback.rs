//! Offline answer feedback.
//!
//! Length-based heuristics used when no evaluation backend is wired in. The
//! wording is intentionally generic; it only looks at how much the candidate said.

use crate::model::Session;
use serde::{Deserialize, Serialize};

/// Feedback for one answer.
pub fn evaluate_answer(answer: &str) -> &'static str {
    let len = answer.trim().chars().count();
    if len < 50 {
        "Your answer seems quite brief. Consider providing more detail and specific examples to fully demonstrate your experience and knowledge."
    } else if len < 150 {
        "Good start! Your answer shows understanding of the topic. To strengthen it, consider adding specific examples, metrics, or outcomes that demonstrate your impact."
    } else {
        "Thank you for your detailed response. Your answer demonstrates good knowledge and experience. Consider structuring future responses using the STAR method (Situation, Task, Action, Result) for maximum impact."
    }
}

/// End-of-session summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub answered: usize,
    /// Questions passed over without a transcript.
    pub skipped: usize,
    pub average_answer_chars: f64,
    pub overview: String,
}

impl SessionSummary {
    pub fn from_session(session: &Session) -> Self {
        let answered = session.responses().len();
        let asked = session.cursor().min(session.questions().len());
        let total_chars: usize = session.responses().iter().map(|r| r.text.chars().count()).sum();
        let average = if answered == 0 {
            0.0
        } else {
            total_chars as f64 / answered as f64
        };

        let depth = if average > 200.0 {
            "Your responses were generally detailed and comprehensive, which shows good preparation and knowledge depth."
        } else if average > 100.0 {
            "Your responses were of moderate length. Consider providing more specific examples and details in future interviews."
        } else {
            "Your responses were quite brief. Aim to provide more comprehensive answers with specific examples and outcomes."
        };

        Self {
            session_id: session.id.clone(),
            answered,
            skipped: asked.saturating_sub(answered),
            average_answer_chars: average,
            overview: format!("You completed {} questions during this interview session. {}", answered, depth),
        }
    }
}
