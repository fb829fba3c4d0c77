//! Interview configuration.
//!
//! | Key | Default | Description |
//! |-----|---------|-------------|
//! | question_count | 10 | Questions requested from the question source. |
//! | default_role | software engineer | Role used when none is given. |
//! | rng_seed | (none) | Fixed seed for shuffles and random picks. |
//! | follow_up_policy | always | `always` \| `scripted_only` \| `disabled`. |
//! | startup_delay_ms | 1000 | Session creation to first question. |
//! | listen_delay_ms | 500 | Question playback end to listening. |
//! | skip_delay_ms | 500 | Skipped (empty) answer to next question. |
//! | next_question_delay_ms | 1000 | Acknowledgment to next question. |
//! | closing_listen_delay_ms | 600 | Closing prompt to listening. |
//! | reprompt_listen_delay_ms | 400 | Confirmation re-prompt to listening. |
//! | silence_timeout_ms | 5000 | Sliding silence watchdog. |
//! | transcription_retry_limit | 2 | Restarts after transient recognition errors. |
//! | transcription_retry_delay_ms | 700 | Delay before each restart. |
//!
//! Precedence: `REHEARSE__*` environment variables > file at `REHEARSE_CONFIG`
//! (default `config/rehearse`, any extension the `config` crate knows) > defaults.

use crate::error::CoreResult;
use crate::follow_up::FollowUpPolicy;
use crate::question_bank::DEFAULT_ROLE;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterviewConfig {
    #[serde(default = "default_question_count")]
    pub question_count: usize,
    #[serde(default = "default_role")]
    pub default_role: String,
    #[serde(default)]
    pub rng_seed: Option<u64>,
    #[serde(default)]
    pub follow_up_policy: FollowUpPolicy,
    #[serde(default)]
    pub timings: TurnTimings,
    #[serde(default = "default_retry_limit")]
    pub transcription_retry_limit: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub transcription_retry_delay_ms: u64,
}

/// Fixed delays of the turn cycle, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TurnTimings {
    pub startup_delay_ms: u64,
    pub listen_delay_ms: u64,
    pub skip_delay_ms: u64,
    pub next_question_delay_ms: u64,
    pub closing_listen_delay_ms: u64,
    pub reprompt_listen_delay_ms: u64,
    pub silence_timeout_ms: u64,
}

impl Default for TurnTimings {
    fn default() -> Self {
        Self {
            startup_delay_ms: 1000,
            listen_delay_ms: 500,
            skip_delay_ms: 500,
            next_question_delay_ms: 1000,
            closing_listen_delay_ms: 600,
            reprompt_listen_delay_ms: 400,
            silence_timeout_ms: 5000,
        }
    }
}

impl TurnTimings {
    pub fn startup_delay(&self) -> Duration {
        Duration::from_millis(self.startup_delay_ms)
    }

    pub fn listen_delay(&self) -> Duration {
        Duration::from_millis(self.listen_delay_ms)
    }

    pub fn skip_delay(&self) -> Duration {
        Duration::from_millis(self.skip_delay_ms)
    }

    pub fn next_question_delay(&self) -> Duration {
        Duration::from_millis(self.next_question_delay_ms)
    }

    pub fn closing_listen_delay(&self) -> Duration {
        Duration::from_millis(self.closing_listen_delay_ms)
    }

    pub fn reprompt_listen_delay(&self) -> Duration {
        Duration::from_millis(self.reprompt_listen_delay_ms)
    }

    pub fn silence_timeout(&self) -> Duration {
        Duration::from_millis(self.silence_timeout_ms)
    }
}

fn default_question_count() -> usize {
    10
}

fn default_role() -> String {
    DEFAULT_ROLE.to_string()
}

fn default_retry_limit() -> u32 {
    2
}

fn default_retry_delay_ms() -> u64 {
    700
}

impl Default for InterviewConfig {
    fn default() -> Self {
        Self {
            question_count: default_question_count(),
            default_role: default_role(),
            rng_seed: None,
            follow_up_policy: FollowUpPolicy::Always,
            timings: TurnTimings::default(),
            transcription_retry_limit: default_retry_limit(),
            transcription_retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

impl InterviewConfig {
    /// Load from `REHEARSE_CONFIG` (or `config/rehearse`) and `REHEARSE__*` env vars.
    pub fn load() -> CoreResult<Self> {
        let config_path = std::env::var("REHEARSE_CONFIG").unwrap_or_else(|_| "config/rehearse".to_string());
        Self::load_from(Path::new(&config_path))
    }

    /// Load with an explicit file path; a missing file just means defaults.
    pub fn load_from(path: &Path) -> CoreResult<Self> {
        let builder = config::Config::builder();
        let builder = if path.exists() {
            builder.add_source(config::File::from(path))
        } else {
            builder.add_source(config::File::with_name(&path.to_string_lossy()).required(false))
        };

        let built = builder
            .add_source(
                config::Environment::with_prefix("REHEARSE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(built.try_deserialize()?)
    }

    pub fn transcription_retry_delay(&self) -> Duration {
        Duration::from_millis(self.transcription_retry_delay_ms)
    }
}
