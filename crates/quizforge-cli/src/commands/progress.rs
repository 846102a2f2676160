//! The `quizforge progress` and `quizforge enroll` commands.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use quizforge_core::progress::TrainingProgress;

use super::load_service;

pub async fn execute(
    learner: String,
    training: String,
    format: String,
    config: Option<PathBuf>,
) -> Result<()> {
    let service = load_service(config)?;
    let progress = service.get_progress(&learner, &training).await?;

    match format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&progress)?),
        _ => print_progress(&progress),
    }
    Ok(())
}

pub async fn enroll(learner: String, training: String, config: Option<PathBuf>) -> Result<()> {
    let service = load_service(config)?;
    let progress = service.enroll(&learner, &training).await?;
    println!(
        "Enrolled {} in {} ({} modules)",
        progress.learner_id(),
        progress.training_id(),
        progress.total_modules()
    );
    Ok(())
}

pub fn print_progress(progress: &TrainingProgress) {
    let counters = progress.counters();
    println!(
        "{} / {}: {} ({}%)",
        progress.learner_id(),
        progress.training_id(),
        progress.status(),
        progress.overall_progress()
    );
    println!(
        "Modules: {} completed, {} in progress, {} not started (of {})",
        counters.finished,
        counters.in_progress,
        counters.not_started,
        progress.total_modules()
    );
    println!("Time spent: {}s", progress.time_spent_secs());

    if !progress.modules().is_empty() {
        let mut table = Table::new();
        table.set_header(vec!["Module", "Status", "Progress", "Sections", "Quizzes"]);
        for (id, module) in progress.modules() {
            let done = module.sections.values().filter(|s| s.completed).count();
            let quizzes: Vec<String> = module
                .quizzes
                .iter()
                .map(|(quiz, summary)| format!("{quiz} {}%", summary.score_percent))
                .collect();
            table.add_row(vec![
                Cell::new(id),
                Cell::new(module.status),
                Cell::new(format!("{}%", module.progress)),
                Cell::new(format!("{done}/{}", module.sections.len())),
                Cell::new(quizzes.join(", ")),
            ]);
        }
        println!("\n{table}");
    }

    for (quiz, summary) in progress.final_exams() {
        println!(
            "Final exam {quiz}: {}% {} (attempt {})",
            summary.score_percent,
            if summary.passed { "passed" } else { "not passed" },
            summary.attempt_number
        );
    }
}
