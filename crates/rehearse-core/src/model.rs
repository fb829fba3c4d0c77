//! Session model: questions, responses, and the session aggregate.
//!
//! A [`Session`] owns an ordered question list (follow-ups are spliced in while the
//! interview runs), an append-only response list, and a cursor into the questions.
//! The cursor never moves past `questions.len()`.

use crate::error::{CoreError, CoreResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use uuid::Uuid;

/// Question category. Serialized as `technical | behavioral | experience | role-specific`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionCategory {
    Technical,
    Behavioral,
    Experience,
    RoleSpecific,
}

impl QuestionCategory {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Technical => "technical",
            Self::Behavioral => "behavioral",
            Self::Experience => "experience",
            Self::RoleSpecific => "role-specific",
        }
    }

    /// Advisory answer time for questions of this category.
    pub fn expected_duration(&self) -> Duration {
        match self {
            Self::Technical => Duration::from_secs(120),
            Self::Behavioral => Duration::from_secs(180),
            Self::Experience => Duration::from_secs(150),
            Self::RoleSpecific => Duration::from_secs(180),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];
}

/// One interview question. Never mutated after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub text: String,
    pub category: QuestionCategory,
    pub difficulty: Difficulty,
    /// Advisory only; nothing enforces it.
    #[serde(with = "duration_secs")]
    pub expected_duration: Duration,
    /// Id of the question this one follows up on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub follow_up_of: Option<String>,
}

impl Question {
    pub fn new(
        id: impl Into<String>,
        text: impl Into<String>,
        category: QuestionCategory,
        difficulty: Difficulty,
    ) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            category,
            difficulty,
            expected_duration: category.expected_duration(),
            follow_up_of: None,
        }
    }

    pub fn is_follow_up(&self) -> bool {
        self.follow_up_of.is_some()
    }

    pub fn with_expected_duration(mut self, duration: Duration) -> Self {
        self.expected_duration = duration;
        self
    }
}

/// A recorded answer. Appended once per answered question, never edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub question_id: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    #[serde(with = "duration_secs")]
    pub duration: Duration,
}

/// Candidate profile as extracted from a resume (extraction itself happens elsewhere).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateProfile {
    pub id: String,
    #[serde(default)]
    pub skills: Vec<String>,
    /// Free-text experience lines, e.g. "Backend engineer at Acme Corp".
    #[serde(default)]
    pub experience: Vec<String>,
    #[serde(default)]
    pub summary: Option<String>,
}

impl CandidateProfile {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn with_skills<I, S>(mut self, skills: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.skills = skills.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_experience<I, S>(mut self, experience: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.experience = experience.into_iter().map(Into::into).collect();
        self
    }

    /// Load a profile from a `.toml` or `.json` file.
    pub fn from_file(path: &Path) -> CoreResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("json"))
            .unwrap_or(false);
        if is_json {
            serde_json::from_str(&raw).map_err(|e| CoreError::Profile(e.to_string()))
        } else {
            toml::from_str(&raw).map_err(|e| CoreError::Profile(e.to_string()))
        }
    }

    /// Flattened profile text handed to external question writers.
    pub fn as_prompt_text(&self) -> String {
        let mut out = String::new();
        if let Some(ref s) = self.summary {
            out.push_str(s.trim());
            out.push('\n');
        }
        if !self.skills.is_empty() {
            out.push_str("Skills: ");
            out.push_str(&self.skills.join(", "));
            out.push('\n');
        }
        for line in &self.experience {
            out.push_str("Experience: ");
            out.push_str(line.trim());
            out.push('\n');
        }
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Preparing,
    Active,
    Paused,
    Completed,
}

impl SessionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// One interview attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub profile_id: String,
    pub role: String,
    questions: Vec<Question>,
    responses: Vec<Response>,
    cursor: usize,
    pub status: SessionStatus,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl Session {
    /// New session in `Preparing` with the cursor on the first question.
    pub fn new(profile_id: impl Into<String>, role: impl Into<String>, questions: Vec<Question>) -> Self {
        Self {
            id: format!("interview-{}", Uuid::new_v4()),
            profile_id: profile_id.into(),
            role: role.into(),
            questions,
            responses: Vec::new(),
            cursor: 0,
            status: SessionStatus::Preparing,
            started_at: Utc::now(),
            ended_at: None,
        }
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn responses(&self) -> &[Response] {
        &self.responses
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.cursor)
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.questions.len()
    }

    pub fn contains_question(&self, id: &str) -> bool {
        self.questions.iter().any(|q| q.id == id)
    }

    /// Append a response. The referenced question must already be in the session.
    pub fn record_response(&mut self, response: Response) -> CoreResult<()> {
        if !self.contains_question(&response.question_id) {
            return Err(CoreError::UnknownQuestion(response.question_id));
        }
        self.responses.push(response);
        Ok(())
    }

    /// Insert `question` directly after the cursor, shifting later questions back.
    pub fn splice_after_cursor(&mut self, question: Question) {
        let at = (self.cursor + 1).min(self.questions.len());
        self.questions.insert(at, question);
    }

    /// Move the cursor forward by one. Returns the new cursor.
    pub fn advance(&mut self) -> usize {
        if self.cursor < self.questions.len() {
            self.cursor += 1;
        }
        self.cursor
    }

    /// Mark the session completed. Keeps the first end time if called again.
    pub fn complete(&mut self) {
        self.status = SessionStatus::Completed;
        if self.ended_at.is_none() {
            self.ended_at = Some(Utc::now());
        }
    }

    pub fn category_counts(&self) -> BTreeMap<QuestionCategory, usize> {
        category_counts(&self.questions)
    }
}

pub fn category_counts(questions: &[Question]) -> BTreeMap<QuestionCategory, usize> {
    let mut counts = BTreeMap::new();
    for q in questions {
        *counts.entry(q.category).or_insert(0) += 1;
    }
    counts
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(id: &str) -> Question {
        Question::new(id, format!("question {}", id), QuestionCategory::Behavioral, Difficulty::Medium)
    }

    #[test]
    fn splice_inserts_after_cursor() {
        let mut s = Session::new("p1", "software engineer", vec![q("a"), q("b"), q("c")]);
        s.advance();
        s.splice_after_cursor(q("f"));
        let ids: Vec<_> = s.questions().iter().map(|q| q.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "f", "c"]);
        assert_eq!(s.cursor(), 1);
    }

    #[test]
    fn cursor_never_passes_end() {
        let mut s = Session::new("p1", "role", vec![q("a")]);
        assert_eq!(s.advance(), 1);
        assert_eq!(s.advance(), 1);
        assert!(s.is_exhausted());
        assert!(s.current_question().is_none());
    }

    #[test]
    fn response_must_reference_known_question() {
        let mut s = Session::new("p1", "role", vec![q("a")]);
        let bad = Response {
            question_id: "zzz".into(),
            text: "hi".into(),
            timestamp: Utc::now(),
            duration: Duration::ZERO,
        };
        assert!(matches!(s.record_response(bad), Err(CoreError::UnknownQuestion(_))));
        assert!(s.responses().is_empty());
    }

    #[test]
    fn complete_keeps_first_end_time() {
        let mut s = Session::new("p1", "role", vec![q("a")]);
        s.complete();
        let first = s.ended_at;
        s.complete();
        assert_eq!(s.ended_at, first);
        assert!(s.status.is_terminal());
    }

    #[test]
    fn category_serializes_kebab_case() {
        let json = serde_json::to_string(&QuestionCategory::RoleSpecific).unwrap();
        assert_eq!(json, "\"role-specific\"");
    }

    #[test]
    fn profile_parses_from_toml() {
        let p: CandidateProfile = toml::from_str(
            r#"
            id = "cand-7"
            skills = ["Rust", "Python"]
            experience = ["Engineer at Acme Corp"]
            "#,
        )
        .unwrap();
        assert_eq!(p.skills.len(), 2);
        assert!(p.as_prompt_text().contains("Skills: Rust, Python"));
    }
}
