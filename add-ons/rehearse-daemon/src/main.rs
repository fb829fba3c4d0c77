//! Rehearse console runner
//!
//! Runs one spoken mock interview in the terminal. Questions are printed, answers
//! are typed. Lines starting with `/` are commands: `/listen`, `/stop`, `/pause`,
//! `/resume`, `/end`.
//!
//! Environment:
//! - `REHEARSE_PROFILE`: candidate profile file (`.toml` or `.json`).
//! - `REHEARSE_ROLE`: target role (defaults to `default_role` from config).
//! - `REHEARSE_LLM_API_URL`: when set, questions come from the LLM writer instead of templates.

mod console;

use console::{ConsoleVoice, Microphone};
use rehearse_core::{
    evaluate_answer, CandidateProfile, CoreResult, InterviewConfig, OpenAiCompatibleWriter, Question,
    QuestionSource, Session, SessionSummary, TemplateQuestionBank, WriterQuestionBank,
};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use rehearse_voice::{InterviewHandle, InterviewOrchestrator, TurnController};
use std::path::Path;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// How long to wait for the session after CTRL-C before giving up.
const END_GRACE: Duration = Duration::from_secs(2);

/// Questions produced ahead of time, so blocking backends stay off the event loop.
struct Prepared(Vec<Question>);

impl QuestionSource for Prepared {
    fn generate(
        &self,
        _profile: &CandidateProfile,
        _role: &str,
        count: usize,
        _rng: &mut dyn RngCore,
    ) -> CoreResult<Vec<Question>> {
        Ok(self.0.iter().take(count).cloned().collect())
    }
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("[rehearse-daemon] .env not loaded: {} (using system environment)", e);
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = InterviewConfig::load()?;
    let profile = match std::env::var("REHEARSE_PROFILE") {
        Ok(path) => CandidateProfile::from_file(Path::new(&path))?,
        Err(_) => CandidateProfile::new("anonymous"),
    };
    let role = std::env::var("REHEARSE_ROLE").unwrap_or_else(|_| config.default_role.clone());

    let source = question_source(&config, &profile, &role).await?;

    tracing::info!(
        profile = %profile.id,
        role = %role,
        questions = config.question_count,
        "Rehearse interview starting"
    );

    let microphone = Microphone::default();
    let controller = TurnController::new(config, source);
    let (orchestrator, handle, mut completed) = InterviewOrchestrator::new(
        controller,
        Box::new(ConsoleVoice::new("voice")),
        Box::new(ConsoleVoice::new("narrator")),
        Box::new(microphone.clone()),
    );
    let runner = tokio::spawn(orchestrator.run());
    handle.start(profile, Some(role))?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let session = loop {
        tokio::select! {
            Some(session) = completed.recv() => break Some(session),
            line = lines.next_line() => {
                match line {
                    Ok(Some(line)) => on_line(&handle, &microphone, line.trim())?,
                    Ok(None) => {
                        tracing::info!("stdin closed; ending interview");
                        handle.end()?;
                        break tokio::time::timeout(END_GRACE, completed.recv()).await.ok().flatten();
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "stdin read failed");
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("CTRL-C received; ending interview");
                handle.end()?;
                break tokio::time::timeout(END_GRACE, completed.recv()).await.ok().flatten();
            }
        }
    };

    handle.shutdown()?;
    let _ = runner.await;

    if let Some(session) = session {
        report(&session)?;
    }
    Ok(())
}

async fn question_source(
    config: &InterviewConfig,
    profile: &CandidateProfile,
    role: &str,
) -> Result<Box<dyn QuestionSource>, BoxError> {
    if std::env::var("REHEARSE_LLM_API_URL").is_err() {
        return Ok(Box::new(TemplateQuestionBank::new()));
    }

    let profile = profile.clone();
    let role = role.to_string();
    let count = config.question_count;
    // The writer's blocking client must be built and dropped off the async runtime.
    let questions = tokio::task::spawn_blocking(move || -> CoreResult<Vec<Question>> {
        let writer = OpenAiCompatibleWriter::from_env()?;
        let mut rng = StdRng::from_entropy();
        WriterQuestionBank::new(writer).generate(&profile, &role, count, &mut rng)
    })
    .await??;
    tracing::info!(questions = questions.len(), "Questions written by LLM backend");
    Ok(Box::new(Prepared(questions)))
}

fn on_line(handle: &InterviewHandle, microphone: &Microphone, line: &str) -> Result<(), BoxError> {
    match line {
        "/listen" => handle.start_listening()?,
        "/stop" => handle.stop_listening()?,
        "/pause" => handle.pause()?,
        "/resume" => handle.resume()?,
        "/end" => handle.end()?,
        "/status" => println!("{}", serde_json::to_string_pretty(&handle.snapshot())?),
        text => {
            if !microphone.hear(text) {
                println!("(not listening; type /listen to answer)");
            }
        }
    }
    Ok(())
}

fn report(session: &Session) -> Result<(), BoxError> {
    let summary = SessionSummary::from_session(session);
    println!("\n📋 Interview summary");
    println!("{}", summary.overview);
    for response in session.responses() {
        let question = session
            .questions()
            .iter()
            .find(|q| q.id == response.question_id)
            .map(|q| q.text.as_str())
            .unwrap_or("?");
        println!("\nQ: {}\nA: {}\n→ {}", question, response.text, evaluate_answer(&response.text));
    }
    println!("\n{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
