//! Profile file -> generated questions -> answered session -> summary.

use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rehearse_core::{
    category_counts, CandidateProfile, FollowUpSynthesizer, QuestionCategory, QuestionSource, Response, Session,
    SessionSummary, TemplateQuestionBank,
};
use std::io::Write;
use std::time::Duration;

#[test]
fn profile_file_drives_a_full_session() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(
        file,
        r#"
id = "cand-42"
skills = ["Rust", "PostgreSQL", "Kubernetes", "Terraform"]
experience = ["Platform engineer at Initech Systems, 2020-2024"]
summary = "Infrastructure-minded backend engineer."
"#
    )
    .unwrap();

    let profile = CandidateProfile::from_file(file.path()).unwrap();
    assert_eq!(profile.id, "cand-42");

    let mut rng = StdRng::seed_from_u64(2024);
    let questions = TemplateQuestionBank::new()
        .generate(&profile, "DevOps Engineer", 10, &mut rng)
        .unwrap();
    assert_eq!(questions.len(), 10);
    let counts = category_counts(&questions);
    assert_eq!(counts[&QuestionCategory::Technical], 3);
    assert_eq!(counts[&QuestionCategory::Behavioral], 3);
    assert_eq!(counts[&QuestionCategory::Experience], 3);
    assert_eq!(counts[&QuestionCategory::RoleSpecific], 1);
    assert!(questions
        .iter()
        .any(|q| q.text == "Tell me about your role at Initech Systems."));

    let mut session = Session::new(profile.id.clone(), "DevOps Engineer", questions);
    let synthesizer = FollowUpSynthesizer::new();
    let answer = "We moved the fleet to Kubernetes and cut deploy time by 40%.";
    let current = session.current_question().unwrap().clone();
    session
        .record_response(Response {
            question_id: current.id.clone(),
            text: answer.to_string(),
            timestamp: Utc::now(),
            duration: Duration::from_secs(30),
        })
        .unwrap();
    let follow_up = synthesizer.synthesize(&current, answer, &mut rng).unwrap();
    session.splice_after_cursor(follow_up.clone());
    session.advance();
    assert_eq!(session.current_question(), Some(&follow_up));
    assert_eq!(session.questions().len(), 11);

    // Skip the follow-up, then finish.
    session.advance();
    session.complete();

    let summary = SessionSummary::from_session(&session);
    assert_eq!(summary.answered, 1);
    assert_eq!(summary.skipped, 1);
    assert!(summary.overview.starts_with("You completed 1 questions"));

    let json = serde_json::to_string(&session).unwrap();
    assert!(json.contains("\"status\":\"completed\""));
    assert!(json.contains(&format!("\"follow_up_of\":\"{}\"", current.id)));
}
