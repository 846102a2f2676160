use std::path::Path;
use std::sync::Arc;

use futures::future::join_all;

use quizforge_core::model::{AnswerMap, AnswerValue, AttemptTelemetry};
use quizforge_core::progress::ProgressStatus;
use quizforge_core::traits::ProgressStore;
use quizforge_core::{EngineError, QuizService};
use quizforge_store::{
    create_service, load_catalog, InMemoryProgressStore, JsonFileProgressStore, QuizforgeConfig,
};

const MODULE_QUIZ: &str = r#"
[quiz]
id = "intro-check"
title = "Introduction check"
training_id = "onboarding"
module_id = "intro"
passing_score = 50
max_attempts = 2

[[questions]]
id = "q1"
type = "multiple-choice"
options = ["north", "south"]
correct_answer = 0

[[questions]]
id = "q2"
type = "true-false"
correct_answer = true
"#;

const FINAL_EXAM: &str = r#"
[quiz]
id = "onboarding-final"
training_id = "onboarding"
passing_score = 100

[[questions]]
id = "q1"
type = "short-answer"
correct_answer = "handbook"
"#;

fn write_quizzes(dir: &Path) {
    std::fs::write(dir.join("intro.toml"), MODULE_QUIZ).unwrap();
    std::fs::write(dir.join("final.toml"), FINAL_EXAM).unwrap();
}

fn config(root: &Path) -> QuizforgeConfig {
    let quiz_dir = root.join("quizzes");
    std::fs::create_dir_all(&quiz_dir).unwrap();
    write_quizzes(&quiz_dir);
    let mut config = QuizforgeConfig {
        data_dir: root.join("data"),
        quiz_dir,
        ..Default::default()
    };
    config.trainings.insert("onboarding".into(), 3);
    config
}

fn answers(pairs: Vec<(&str, AnswerValue)>) -> AnswerMap {
    pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

#[tokio::test]
async fn progress_survives_restart() {
    let root = tempfile::tempdir().unwrap();
    let config = config(root.path());

    let svc = create_service(&config).unwrap();
    let result = svc
        .submit_quiz(
            "ann",
            "intro-check",
            answers(vec![("q1", 0i64.into()), ("q2", "true".into())]),
            None,
        )
        .await
        .unwrap();
    assert_eq!(result.score_percent, 100);
    drop(svc);

    let svc = create_service(&config).unwrap();
    let progress = svc.get_progress("ann", "onboarding").await.unwrap();
    assert_eq!(progress.total_modules(), 3);
    assert_eq!(progress.attempts().len(), 1);
    assert_eq!(progress.module("intro").unwrap().quizzes["intro-check"].score_percent, 100);
    assert!(progress.is_consistent());
}

#[tokio::test]
async fn concurrent_file_backed_submissions() {
    let root = tempfile::tempdir().unwrap();
    let svc = create_service(&config(root.path())).unwrap();

    let n = 12u32;
    let results = join_all(
        (0..n).map(|_| svc.submit_attempt("ann", "intro-check", AnswerMap::new(), None)),
    )
    .await;
    let mut numbers: Vec<u32> = results
        .into_iter()
        .map(|r| r.unwrap().1.attempt_number)
        .collect();
    numbers.sort_unstable();
    assert_eq!(numbers, (1..=n).collect::<Vec<_>>());

    let progress = svc.get_progress("ann", "onboarding").await.unwrap();
    assert_eq!(progress.attempts().len(), n as usize);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn separate_services_share_one_data_dir() {
    let root = tempfile::tempdir().unwrap();
    let services: Vec<QuizService> = (0..8)
        .map(|_| create_service(&config(root.path())).unwrap())
        .collect();

    let n = 40usize;
    let results = join_all((0..n).map(|i| {
        services[i % services.len()].submit_attempt("ann", "intro-check", AnswerMap::new(), None)
    }))
    .await;
    let mut numbers: Vec<u32> = results
        .into_iter()
        .map(|r| r.unwrap().1.attempt_number)
        .collect();
    numbers.sort_unstable();
    assert_eq!(numbers, (1..=n as u32).collect::<Vec<_>>());

    let progress = services[0].get_progress("ann", "onboarding").await.unwrap();
    assert_eq!(progress.attempts().len(), n);
    assert!(progress.is_consistent());
}

#[tokio::test]
async fn enforcing_attempt_limit_from_config() {
    let root = tempfile::tempdir().unwrap();
    let mut config = config(root.path());
    config.attempts.enforce_max_attempts = true;
    let svc = create_service(&config).unwrap();

    for _ in 0..2 {
        svc.submit_quiz("ann", "intro-check", AnswerMap::new(), None)
            .await
            .unwrap();
    }
    let err = svc
        .submit_quiz("ann", "intro-check", AnswerMap::new(), None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::AttemptLimitReached { max_attempts: 2, .. }
    ));
    assert_eq!(svc.attempts("ann", "intro-check").await.unwrap().len(), 2);
}

#[tokio::test]
async fn integrity_rules_from_config() {
    let root = tempfile::tempdir().unwrap();
    let mut config = config(root.path());
    config.integrity.violation_ceiling.enabled = true;
    config.integrity.violation_ceiling.max_violations = 1;
    let svc = create_service(&config).unwrap();

    let telemetry = AttemptTelemetry {
        violation_count: Some(2),
        ..Default::default()
    };
    let result = svc
        .submit_quiz(
            "ann",
            "intro-check",
            answers(vec![("q1", 0i64.into()), ("q2", true.into())]),
            Some(telemetry),
        )
        .await
        .unwrap();
    assert!(result.rejected);
    assert_eq!(result.score_percent, 0);
}

#[tokio::test]
async fn section_and_module_flow_on_disk() {
    let root = tempfile::tempdir().unwrap();
    let config = config(root.path());
    let svc = create_service(&config).unwrap();

    svc.enroll("ann", "onboarding").await.unwrap();
    svc.update_section_status("ann", "onboarding", "intro", "welcome", true, 100)
        .await
        .unwrap();
    let p = svc
        .update_section_status("ann", "onboarding", "intro", "tools", false, 50)
        .await
        .unwrap();
    assert_eq!(p.module("intro").unwrap().status, ProgressStatus::InProgress);
    assert_eq!(p.module("intro").unwrap().progress, 75);

    for module in ["intro", "policies", "wrap-up"] {
        svc.update_module_status("ann", "onboarding", module, ProgressStatus::Completed, 100)
            .await
            .unwrap();
    }

    let store = JsonFileProgressStore::new(&config.data_dir);
    let keys = store.keys_for_learner("ann").await.unwrap();
    assert_eq!(keys.len(), 1);
    let stored = store.load(&keys[0]).await.unwrap().unwrap();
    assert_eq!(stored.status(), ProgressStatus::Completed);
    assert_eq!(stored.counters().finished, 3);
    assert_eq!(stored.overall_progress(), 100);
}

#[tokio::test]
async fn in_memory_store_with_directory_catalog() {
    let root = tempfile::tempdir().unwrap();
    let catalog = load_catalog(&config(root.path())).unwrap();
    assert_eq!(catalog.len(), 2);

    let store = Arc::new(InMemoryProgressStore::new());
    let svc = QuizService::new(Arc::new(catalog), store.clone());
    svc.submit_quiz(
        "bob",
        "onboarding-final",
        answers(vec![("q1", "handbook".into())]),
        None,
    )
    .await
    .unwrap();
    assert_eq!(store.len().await, 1);

    let err = svc.get_progress("bob", "other").await.unwrap_err();
    assert!(err.is_not_found());
}
