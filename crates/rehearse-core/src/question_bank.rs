//! **Question bank**: builds the ordered question list for a session.
//!
//! The count is split into category quotas (technical 30%, behavioral 25%,
//! experience 25%, role-specific takes the remainder), each quota is filled from a
//! template pool by modular indexing, and the assembled list is shuffled and
//! truncated to the requested count.
//!
//! Technical questions are capped by the number of skills in the profile. That
//! deficit is not handed to another category, so a profile with few skills yields
//! fewer questions than requested.

use crate::error::CoreResult;
use crate::model::{CandidateProfile, Difficulty, Question, QuestionCategory};
use once_cell::sync::Lazy;
use rand::seq::SliceRandom;
use rand::{Rng, RngCore};
use regex::Regex;
use tracing::debug;

/// Role used when the requested role has no template table.
pub const DEFAULT_ROLE: &str = "software engineer";

const DEFAULT_COMPANY: &str = "your previous company";

const TECHNICAL_TEMPLATES: &[&str] = &[
    "Can you explain your experience with {skill}?",
    "How would you approach solving a problem involving {skill}?",
    "What challenges have you faced while working with {skill}?",
    "Can you walk me through a project where you used {skill}?",
];

const BEHAVIORAL_TEMPLATES: &[&str] = &[
    "Tell me about a time when you had to work under pressure.",
    "Describe a situation where you had to work with a difficult team member.",
    "How do you handle constructive criticism?",
    "Tell me about a time you failed and what you learned from it.",
    "Describe your approach to learning new technologies.",
];

const EXPERIENCE_TEMPLATES: &[&str] = &[
    "Tell me about your role at {company}.",
    "What was your biggest achievement in your previous position?",
    "How did you contribute to your team's success?",
    "What motivated you to leave your last position?",
];

const ROLE_TEMPLATES: &[(&str, &[&str])] = &[
    (
        "software engineer",
        &[
            "How do you ensure code quality in your projects?",
            "Describe your experience with version control systems.",
            "How do you approach debugging complex issues?",
            "What's your experience with agile development methodologies?",
        ],
    ),
    (
        "data scientist",
        &[
            "How do you approach data cleaning and preprocessing?",
            "Describe your experience with machine learning algorithms.",
            "How do you validate your models?",
            "What tools do you use for data visualization?",
        ],
    ),
    (
        "product manager",
        &[
            "How do you prioritize features in a product roadmap?",
            "Describe your experience with user research.",
            "How do you handle conflicting stakeholder requirements?",
            "What metrics do you use to measure product success?",
        ],
    ),
    (
        "marketing manager",
        &[
            "How do you measure the success of marketing campaigns?",
            "Describe your experience with digital marketing channels.",
            "How do you identify target audiences?",
            "What's your approach to brand positioning?",
        ],
    ),
];

static COMPANY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bat\s+([A-Z][A-Za-z&]*(?:\s+[A-Z&][A-Za-z&]*)*)").expect("company regex")
});

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex"));

/// Anything that can produce the question list for a session.
///
/// The template bank is the local implementation; an LLM-backed source plugs in
/// behind the same contract (see [`crate::writer::WriterQuestionBank`]).
pub trait QuestionSource: Send + Sync {
    fn generate(
        &self,
        profile: &CandidateProfile,
        role: &str,
        count: usize,
        rng: &mut dyn RngCore,
    ) -> CoreResult<Vec<Question>>;
}

/// Per-category quotas for a requested count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaPlan {
    pub technical: usize,
    pub behavioral: usize,
    pub experience: usize,
    pub role_specific: usize,
}

impl QuotaPlan {
    /// Ceiling for the first three categories; role-specific absorbs what is left (never negative).
    pub fn for_count(count: usize) -> Self {
        let technical = ceil_percent(count, 30);
        let behavioral = ceil_percent(count, 25);
        let experience = ceil_percent(count, 25);
        let role_specific = count.saturating_sub(technical + behavioral + experience);
        Self {
            technical,
            behavioral,
            experience,
            role_specific,
        }
    }

    pub fn total(&self) -> usize {
        self.technical + self.behavioral + self.experience + self.role_specific
    }
}

fn ceil_percent(count: usize, percent: usize) -> usize {
    (count * percent + 99) / 100
}

/// Lower-case and collapse whitespace so "Data  Scientist" finds "data scientist".
pub fn normalize_role(role: &str) -> String {
    WHITESPACE_RE.replace_all(role.trim(), " ").to_lowercase()
}

/// Company name from an experience line ("... at Acme Corp"), if any.
pub fn extract_company(experience: &str) -> Option<String> {
    COMPANY_RE
        .captures(experience)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn role_templates(role_key: &str) -> &'static [&'static str] {
    ROLE_TEMPLATES
        .iter()
        .find(|(key, _)| *key == role_key)
        .or_else(|| ROLE_TEMPLATES.iter().find(|(key, _)| *key == DEFAULT_ROLE))
        .map(|(_, templates)| *templates)
        .unwrap_or(&[])
}

fn random_difficulty(rng: &mut dyn RngCore) -> Difficulty {
    Difficulty::ALL[rng.gen_range(0..Difficulty::ALL.len())]
}

/// Local template-based question source.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateQuestionBank;

impl TemplateQuestionBank {
    pub fn new() -> Self {
        Self
    }

    fn technical(&self, skills: &[String], quota: usize, rng: &mut dyn RngCore) -> Vec<Question> {
        skills
            .iter()
            .take(quota)
            .enumerate()
            .map(|(i, skill)| {
                let text = TECHNICAL_TEMPLATES[i % TECHNICAL_TEMPLATES.len()].replace("{skill}", skill.trim());
                Question::new(
                    format!("tech-{}", i),
                    text,
                    QuestionCategory::Technical,
                    random_difficulty(rng),
                )
            })
            .collect()
    }

    fn behavioral(&self, quota: usize) -> Vec<Question> {
        (0..quota)
            .map(|i| {
                Question::new(
                    format!("behavioral-{}", i),
                    BEHAVIORAL_TEMPLATES[i % BEHAVIORAL_TEMPLATES.len()],
                    QuestionCategory::Behavioral,
                    Difficulty::Medium,
                )
            })
            .collect()
    }

    fn experience(&self, experience: &[String], quota: usize) -> Vec<Question> {
        (0..quota)
            .map(|i| {
                let template = EXPERIENCE_TEMPLATES[i % EXPERIENCE_TEMPLATES.len()];
                let text = if template.contains("{company}") {
                    let company = if experience.is_empty() {
                        None
                    } else {
                        extract_company(&experience[i % experience.len()])
                    };
                    template.replace("{company}", company.as_deref().unwrap_or(DEFAULT_COMPANY))
                } else {
                    template.to_string()
                };
                Question::new(
                    format!("exp-{}", i),
                    text,
                    QuestionCategory::Experience,
                    Difficulty::Medium,
                )
            })
            .collect()
    }

    fn role_specific(&self, role_key: &str, quota: usize, rng: &mut dyn RngCore) -> Vec<Question> {
        let templates = role_templates(role_key);
        if templates.is_empty() {
            return Vec::new();
        }
        (0..quota)
            .map(|i| {
                Question::new(
                    format!("role-{}", i),
                    templates[i % templates.len()],
                    QuestionCategory::RoleSpecific,
                    random_difficulty(rng),
                )
            })
            .collect()
    }
}

impl QuestionSource for TemplateQuestionBank {
    fn generate(
        &self,
        profile: &CandidateProfile,
        role: &str,
        count: usize,
        rng: &mut dyn RngCore,
    ) -> CoreResult<Vec<Question>> {
        let plan = QuotaPlan::for_count(count);
        let role_key = normalize_role(role);

        let mut questions = Vec::with_capacity(plan.total());
        questions.extend(self.technical(&profile.skills, plan.technical, rng));
        questions.extend(self.behavioral(plan.behavioral));
        questions.extend(self.experience(&profile.experience, plan.experience));
        questions.extend(self.role_specific(&role_key, plan.role_specific, rng));

        questions.shuffle(rng);
        questions.truncate(count);

        debug!(
            requested = count,
            produced = questions.len(),
            role = %role_key,
            "question bank generated"
        );
        Ok(questions)
    }
}
