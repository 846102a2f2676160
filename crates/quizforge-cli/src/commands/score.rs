//! The `quizforge score` command.

use std::path::PathBuf;

use anyhow::Result;

use quizforge_core::parser::parse_quiz;
use quizforge_core::ScoringEngine;
use quizforge_store::load_config_from;

use super::{print_result, read_answers, read_telemetry};

pub fn execute(
    quiz_path: PathBuf,
    answers_path: PathBuf,
    telemetry_path: Option<PathBuf>,
    format: String,
    config: Option<PathBuf>,
) -> Result<()> {
    let config = load_config_from(config.as_deref())?;
    let quiz = parse_quiz(&quiz_path)?;
    let answers = read_answers(&answers_path)?;
    let telemetry = read_telemetry(telemetry_path.as_deref())?;

    let engine = ScoringEngine::new(config.integrity);
    let result = engine.score(&quiz, &answers, telemetry.as_ref());
    print_result(&result, &format)
}
