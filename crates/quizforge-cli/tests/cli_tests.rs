//! CLI integration tests using assert_cmd.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn quizforge() -> Command {
    #[allow(deprecated)]
    Command::cargo_bin("quizforge").unwrap()
}

fn quiz_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../quizzes")
}

/// A command isolated in `dir`, storing progress under `dir/data`.
fn isolated(dir: &TempDir) -> Command {
    let mut cmd = quizforge();
    cmd.current_dir(dir.path())
        .env("HOME", dir.path())
        .env("QUIZFORGE_DATA_DIR", dir.path().join("data"))
        .env("QUIZFORGE_QUIZ_DIR", quiz_dir());
    cmd
}

fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    path
}

const ALL_CORRECT: &str = r#"{"ppe": 0, "spill": false, "signs": [2, 0], "report": "NM-1"}"#;
const MOSTLY_WRONG: &str = r#"{"ppe": 0, "spill": true, "signs": [0], "report": "nm-1"}"#;

#[test]
fn validate_directory() {
    quizforge()
        .arg("validate")
        .arg("--quiz")
        .arg("../../quizzes")
        .assert()
        .success()
        .stdout(predicate::str::contains("hazard-awareness"))
        .stdout(predicate::str::contains("fire-safety"))
        .stdout(predicate::str::contains("final exam"))
        .stdout(predicate::str::contains("essay"))
        .stdout(predicate::str::contains("1 warning(s) found"));
}

#[test]
fn validate_single_quiz() {
    quizforge()
        .arg("validate")
        .arg("--quiz")
        .arg("../../quizzes/workplace-safety/fire.toml")
        .assert()
        .success()
        .stdout(predicate::str::contains("2 questions"))
        .stdout(predicate::str::contains("All quizzes valid"));
}

#[test]
fn validate_nonexistent_file() {
    quizforge()
        .arg("validate")
        .arg("--quiz")
        .arg("nonexistent.toml")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn score_perfect_answers() {
    let dir = TempDir::new().unwrap();
    let answers = write(&dir, "answers.json", ALL_CORRECT);

    isolated(&dir)
        .arg("score")
        .arg("--quiz")
        .arg(quiz_dir().join("workplace-safety/hazards.toml"))
        .arg("--answers")
        .arg(&answers)
        .assert()
        .success()
        .stdout(predicate::str::contains("100% (5/5 points) PASSED"));
}

#[test]
fn score_json_output() {
    let dir = TempDir::new().unwrap();
    let answers = write(&dir, "answers.json", MOSTLY_WRONG);

    let output = isolated(&dir)
        .arg("score")
        .arg("--quiz")
        .arg(quiz_dir().join("workplace-safety/hazards.toml"))
        .arg("--answers")
        .arg(&answers)
        .arg("--format")
        .arg("json")
        .output()
        .unwrap();
    assert!(output.status.success());

    let result: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(result["score_percent"], 20);
    assert_eq!(result["passed"], false);
    assert_eq!(result["per_question"]["report"], false);
}

#[test]
fn score_with_violation_ceiling_rejects() {
    let dir = TempDir::new().unwrap();
    let answers = write(&dir, "answers.json", ALL_CORRECT);
    let telemetry = write(&dir, "telemetry.json", r#"{"violation_count": 3}"#);
    let config = write(
        &dir,
        "strict.toml",
        "[integrity.violation_ceiling]\nenabled = true\nmax_violations = 1\n",
    );

    isolated(&dir)
        .arg("score")
        .arg("--quiz")
        .arg(quiz_dir().join("workplace-safety/hazards.toml"))
        .arg("--answers")
        .arg(&answers)
        .arg("--telemetry")
        .arg(&telemetry)
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("REJECTED"));
}

#[test]
fn submit_records_numbered_attempts() {
    let dir = TempDir::new().unwrap();
    let answers = write(&dir, "answers.json", MOSTLY_WRONG);

    for n in 1..=2 {
        isolated(&dir)
            .args(["submit", "--learner", "alice", "--quiz", "hazard-awareness"])
            .arg("--answers")
            .arg(&answers)
            .assert()
            .success()
            .stdout(predicate::str::contains("FAILED"))
            .stdout(predicate::str::contains(format!("Recorded attempt {n}")));
    }

    isolated(&dir)
        .args(["attempts", "--learner", "alice", "--quiz", "hazard-awareness"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 attempt(s)"));
}

#[test]
fn submit_json_includes_recorded_attempt() {
    let dir = TempDir::new().unwrap();
    let answers = write(&dir, "answers.json", MOSTLY_WRONG);

    for n in 1..=2 {
        let output = isolated(&dir)
            .args(["submit", "--learner", "carol", "--quiz", "hazard-awareness"])
            .arg("--answers")
            .arg(&answers)
            .args(["--format", "json"])
            .output()
            .unwrap();
        assert!(output.status.success());

        let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(json["result"]["quiz_id"], "hazard-awareness");
        assert_eq!(json["result"]["passed"], false);
        assert_eq!(json["attempt"]["attempt_number"], n);
        assert_eq!(json["attempt"]["quiz_id"], "hazard-awareness");
        assert!(json["attempt"]["attempt_id"].is_string());
    }
}

#[test]
fn progress_after_module_updates() {
    let dir = TempDir::new().unwrap();

    isolated(&dir)
        .args(["enroll", "--learner", "bob", "--training", "workplace-safety"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 modules"));

    isolated(&dir)
        .args(["section", "--learner", "bob", "--training", "workplace-safety"])
        .args(["--module", "fire", "--section", "intro", "--progress", "40"])
        .assert()
        .success()
        .stdout(predicate::str::contains("0 completed, 1 in progress, 1 not started"));

    isolated(&dir)
        .args(["module", "--learner", "bob", "--training", "workplace-safety"])
        .args(["--module", "hazards", "--status", "completed"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 completed, 1 in progress, 0 not started"));

    let output = isolated(&dir)
        .args(["progress", "--learner", "bob", "--training", "workplace-safety"])
        .args(["--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let progress: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(progress["total_modules"], 2);
    assert_eq!(progress["counters"]["finished"], 1);
    assert_eq!(progress["overall_progress"], 50);
}

#[test]
fn progress_for_unknown_learner_fails() {
    let dir = TempDir::new().unwrap();

    isolated(&dir)
        .args(["progress", "--learner", "nobody", "--training", "workplace-safety"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no progress"));
}

#[test]
fn invalid_module_status_fails() {
    let dir = TempDir::new().unwrap();

    isolated(&dir)
        .args(["module", "--learner", "bob", "--training", "workplace-safety"])
        .args(["--module", "fire", "--status", "paused"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown status"));
}

#[test]
fn init_creates_files() {
    let dir = TempDir::new().unwrap();

    quizforge()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created quizforge.toml"))
        .stdout(predicate::str::contains("Created quizzes/example.toml"));

    assert!(dir.path().join("quizforge.toml").exists());
    assert!(dir.path().join("quizzes/example.toml").exists());

    quizforge()
        .current_dir(dir.path())
        .arg("validate")
        .arg("--quiz")
        .arg("quizzes/example.toml")
        .assert()
        .success()
        .stdout(predicate::str::contains("All quizzes valid"));
}

#[test]
fn init_skips_existing() {
    let dir = TempDir::new().unwrap();

    quizforge()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success();

    quizforge()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));
}

#[test]
fn help_output() {
    quizforge()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Quiz scoring and progress tracking engine"));
}

#[test]
fn version_output() {
    quizforge()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("quizforge"));
}
