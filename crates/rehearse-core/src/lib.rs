//! rehearse-core: the interview data model and everything that produces questions.
//!
//! - [`model`]: questions, responses, candidate profile, and the session aggregate.
//! - [`question_bank`]: category-weighted template generation behind [`QuestionSource`].
//! - [`follow_up`]: hook extraction and follow-up question synthesis.
//! - [`writer`]: pluggable LLM question writers.
//! - [`feedback`]: offline answer feedback and session summary.
//! - [`config`]: [`InterviewConfig`] loaded from file and environment.

pub mod config;
pub mod error;
pub mod feedback;
pub mod follow_up;
pub mod model;
pub mod question_bank;
pub mod writer;

pub use config::{InterviewConfig, TurnTimings};
pub use error::{CoreError, CoreResult};
pub use feedback::{evaluate_answer, SessionSummary};
pub use follow_up::{FollowUpPolicy, FollowUpSynthesizer, FOLLOW_UP_DURATION};
pub use model::{
    category_counts, CandidateProfile, Difficulty, Question, QuestionCategory, Response, Session,
    SessionStatus,
};
pub use question_bank::{
    extract_company, normalize_role, QuestionSource, QuotaPlan, TemplateQuestionBank, DEFAULT_ROLE,
};
pub use writer::{OpenAiCompatibleWriter, QuestionWriter, WriterQuestionBank};
