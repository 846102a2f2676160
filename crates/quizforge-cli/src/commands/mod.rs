pub mod attempts;
pub mod init;
pub mod module;
pub mod progress;
pub mod score;
pub mod submit;
pub mod validate;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;

use quizforge_core::model::{AnswerMap, AttemptTelemetry, QuizResult};
use quizforge_core::QuizService;
use quizforge_store::{create_service, load_config_from};

/// Build the file-backed service from the given or discovered config.
pub fn load_service(config: Option<PathBuf>) -> Result<QuizService> {
    let config = load_config_from(config.as_deref())?;
    tracing::debug!(
        "quizzes from {}, progress in {}",
        config.quiz_dir.display(),
        config.data_dir.display()
    );
    create_service(&config)
}

fn read_json<T: DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {what} file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("failed to parse {what} file: {}", path.display()))
}

pub fn read_answers(path: &Path) -> Result<AnswerMap> {
    read_json(path, "answers")
}

pub fn read_telemetry(path: Option<&Path>) -> Result<Option<AttemptTelemetry>> {
    path.map(|p| read_json(p, "telemetry")).transpose()
}

/// Print a result in the requested format.
pub fn print_result(result: &QuizResult, format: &str) -> Result<()> {
    if format == "json" {
        println!("{}", serde_json::to_string_pretty(result)?);
        return Ok(());
    }

    if result.rejected {
        println!(
            "Quiz {}: REJECTED ({})",
            result.quiz_id,
            result.rejection_reason.as_deref().unwrap_or("no reason given")
        );
        return Ok(());
    }

    println!(
        "Quiz {}: {}% ({}/{} points) {}",
        result.quiz_id,
        result.score_percent,
        result.earned_points,
        result.total_points,
        if result.passed { "PASSED" } else { "FAILED" }
    );
    if result.penalty_percent > 0 {
        println!("  Penalty: {}%", result.penalty_percent);
    }
    for (question, correct) in &result.per_question {
        println!("  [{}] {question}", if *correct { "x" } else { " " });
    }
    Ok(())
}
