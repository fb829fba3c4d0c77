//! External question writers (LLM-backed).
//!
//! A [`QuestionWriter`] returns one question string per call. [`WriterQuestionBank`]
//! wraps any writer into a [`QuestionSource`] so the controller does not care where
//! questions come from.

use crate::error::{CoreError, CoreResult};
use crate::model::{CandidateProfile, Difficulty, Question, QuestionCategory};
use crate::question_bank::QuestionSource;
use rand::RngCore;
use tracing::{info, warn};

/// Backend that writes a single interview question for a role and profile.
pub trait QuestionWriter: Send + Sync {
    /// `number` is 1-based and lets the backend vary its output across calls.
    fn write_question(&self, role: &str, profile_text: &str, number: usize) -> CoreResult<String>;
}

/// OpenAI-compatible chat completions writer (OpenAI, OpenRouter, local gateways).
/// Uses `REHEARSE_LLM_API_URL` (default https://api.openai.com/v1), `REHEARSE_LLM_API_KEY`
/// and `REHEARSE_LLM_MODEL` (default gpt-4o-mini).
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleWriter {
    /// Base URL without trailing slash.
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    client: reqwest::blocking::Client,
}

impl OpenAiCompatibleWriter {
    /// Build from environment. Fails when no API key is configured.
    pub fn from_env() -> CoreResult<Self> {
        let base_url = std::env::var("REHEARSE_LLM_API_URL")
            .unwrap_or_else(|_| "https://api.openai.com/v1".to_string());
        let api_key = std::env::var("REHEARSE_LLM_API_KEY")
            .or_else(|_| std::env::var("OPENAI_API_KEY"))
            .map_err(|_| CoreError::Writer("writer requires REHEARSE_LLM_API_KEY or OPENAI_API_KEY".to_string()))?;
        let model = std::env::var("REHEARSE_LLM_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());
        Self::new(base_url, api_key, model)
    }

    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> CoreResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| CoreError::Writer(e.to_string()))?;
        Ok(Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            client,
        })
    }

    fn prompt(role: &str, profile_text: &str, number: usize) -> String {
        format!(
            "You are interviewing a candidate for a {} position.\n\
             Candidate profile:\n{}\n\
             Write interview question #{}. It must be answerable out loud in two or three minutes.\n\
             Return only the question text, no numbering or formatting.",
            role, profile_text, number
        )
    }
}

impl QuestionWriter for OpenAiCompatibleWriter {
    fn write_question(&self, role: &str, profile_text: &str, number: usize) -> CoreResult<String> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let body = serde_json::json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": Self::prompt(role, profile_text, number) }],
            "max_tokens": 200,
            "temperature": 0.7,
        });
        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .map_err(|e| CoreError::Writer(e.to_string()))?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().unwrap_or_default();
            return Err(CoreError::Writer(format!("LLM API error {}: {}", status, body)));
        }
        let json: serde_json::Value = res.json().map_err(|e| CoreError::Writer(e.to_string()))?;
        let text = json["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or("")
            .trim()
            .to_string();
        if text.is_empty() {
            return Err(CoreError::Writer("LLM returned no question text".to_string()));
        }
        Ok(text)
    }
}

/// Question source that asks a writer for every question.
///
/// Any writer failure fails the whole batch; partial lists are not returned.
pub struct WriterQuestionBank<W> {
    writer: W,
}

impl<W: QuestionWriter> WriterQuestionBank<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: QuestionWriter> QuestionSource for WriterQuestionBank<W> {
    fn generate(
        &self,
        profile: &CandidateProfile,
        role: &str,
        count: usize,
        _rng: &mut dyn RngCore,
    ) -> CoreResult<Vec<Question>> {
        let profile_text = profile.as_prompt_text();
        let mut questions = Vec::with_capacity(count);
        for n in 1..=count {
            let text = self.writer.write_question(role, &profile_text, n).map_err(|e| {
                warn!(number = n, error = %e, "question writer failed");
                CoreError::Generation(e.to_string())
            })?;
            questions.push(Question::new(
                format!("llm-{}", n - 1),
                text,
                QuestionCategory::RoleSpecific,
                Difficulty::Medium,
            ));
        }
        info!(count = questions.len(), role, "questions written by external writer");
        Ok(questions)
    }
}
