//! **Follow-up synthesis**: turn an answer into one more question.
//!
//! Hooks are salient fragments of the answer: quoted phrases, technology names,
//! a metric, and a few topical triggers. When any hook exists, one is picked at
//! random and dropped into a hook template; otherwise a generic deepening prompt
//! is used. Blank answers produce nothing.

use crate::model::{Difficulty, Question, QuestionCategory};
use once_cell::sync::Lazy;
use rand::seq::SliceRandom;
use rand::{Rng, RngCore};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// Advisory answer time for every follow-up.
pub const FOLLOW_UP_DURATION: Duration = Duration::from_secs(120);

const HOOK_TEMPLATES: &[&str] = &[
    "You mentioned {hook}. Could you give a concrete example?",
    "Can you break down the steps you took around {hook}?",
    "What was the measurable impact related to {hook}?",
    "What trade-offs did you consider regarding {hook}?",
];

const GENERIC_PROMPTS: &[&str] = &[
    "What was the hardest part about that, and how did you handle it?",
    "If you had to do it again, what would you change and why?",
    "How did you validate success for that approach?",
];

const TOPIC_TRIGGERS: &[(&[&str], &str)] = &[
    (&["team", "stakeholder"], "team collaboration"),
    (&["deadline"], "deadline"),
    (&["scal"], "scalability"),
    (&["performance"], "performance"),
    (&["security"], "security"),
];

static QUOTED_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""([^"]{3,80})"|(?:^|[^\w])'([^']{3,80})'(?:[^\w]|$)"#).expect("quoted regex")
});

static TECH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(node|react|angular|vue|java|python|go|aws|azure|gcp|docker|kubernetes|mysql|postgres|mongodb|redis|graphql|rest)\b",
    )
    .expect("tech regex")
});

static METRIC_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(\$\d+(?:\.\d+)?[km]?\b|\b\d+(?:\.\d+)?\s?%|\b\d+(?:\.\d+)?\s?(?:ms|sec|secs|seconds?|s|min|mins|minutes?|hours?|hrs?)\b|\b\d+\s?(?:users?|requests?|tickets?)\b)",
    )
    .expect("metric regex")
});

/// When the synthesizer is consulted and whether its output is spliced in.
///
/// There is no probabilistic middle ground: whenever the synthesizer is consulted
/// and returns a question, that question is inserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FollowUpPolicy {
    /// Consult for every answered question, follow-ups included.
    #[default]
    Always,
    /// Consult for scripted questions only; answers to follow-ups do not spawn more.
    ScriptedOnly,
    Disabled,
}

impl FollowUpPolicy {
    /// Whether an answer to `question` should be handed to the synthesizer.
    pub fn consults_for(&self, question: &Question) -> bool {
        match self {
            Self::Always => true,
            Self::ScriptedOnly => !question.is_follow_up(),
            Self::Disabled => false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FollowUpSynthesizer;

impl FollowUpSynthesizer {
    pub fn new() -> Self {
        Self
    }

    /// All hooks found in `answer`, in discovery order.
    ///
    /// A hook that overlaps an earlier one (either contains the other, ignoring
    /// case) is dropped, so a prompt built from any hook names exactly one.
    pub fn hooks(&self, answer: &str) -> Vec<String> {
        let mut hooks: Vec<String> = Vec::new();
        let mut push = |hook: String| {
            let lower = hook.to_lowercase();
            let overlaps = hooks.iter().any(|h| {
                let h = h.to_lowercase();
                h.contains(&lower) || lower.contains(&h)
            });
            if !hook.is_empty() && !overlaps {
                hooks.push(hook);
            }
        };

        for caps in QUOTED_RE.captures_iter(answer) {
            if let Some(m) = caps.get(1).or_else(|| caps.get(2)) {
                push(m.as_str().trim().to_string());
            }
        }
        for m in TECH_RE.find_iter(answer) {
            push(m.as_str().to_lowercase());
        }
        if let Some(m) = METRIC_RE.find(answer) {
            push(m.as_str().trim().to_string());
        }

        let lower = answer.to_lowercase();
        for (needles, topic) in TOPIC_TRIGGERS {
            if needles.iter().any(|n| lower.contains(n)) {
                push((*topic).to_string());
            }
        }
        hooks
    }

    /// One follow-up question for `answer`, or `None` when the answer is blank.
    pub fn synthesize(&self, original: &Question, answer: &str, rng: &mut dyn RngCore) -> Option<Question> {
        let answer = answer.trim();
        if answer.is_empty() {
            return None;
        }

        let hooks = self.hooks(answer);
        let text = match hooks.choose(rng) {
            Some(hook) => {
                let template = HOOK_TEMPLATES[rng.gen_range(0..HOOK_TEMPLATES.len())];
                template.replace("{hook}", hook)
            }
            None => GENERIC_PROMPTS[rng.gen_range(0..GENERIC_PROMPTS.len())].to_string(),
        };

        tracing::debug!(
            after = %original.id,
            hooks = hooks.len(),
            "follow-up synthesized"
        );

        let id = Uuid::from_bytes(rng.gen::<[u8; 16]>());
        let mut question = Question::new(
            format!("followup-{}", id),
            text,
            QuestionCategory::Behavioral,
            Difficulty::Medium,
        )
        .with_expected_duration(FOLLOW_UP_DURATION);
        question.follow_up_of = Some(original.id.clone());
        Some(question)
    }
}
