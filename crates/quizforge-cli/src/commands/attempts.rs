//! The `quizforge attempts` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use quizforge_core::statistics::summarize_attempts;

use super::load_service;

pub async fn execute(learner: String, quiz_id: String, config: Option<PathBuf>) -> Result<()> {
    let service = load_service(config)?;
    let attempts = service.attempts(&learner, &quiz_id).await?;

    if attempts.is_empty() {
        println!("No attempts by {learner} at {quiz_id}.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["#", "Score", "Result", "Penalty", "Completed"]);
    for a in &attempts {
        let outcome = if a.rejected {
            "rejected"
        } else if a.passed {
            "passed"
        } else {
            "failed"
        };
        table.add_row(vec![
            Cell::new(a.attempt_number),
            Cell::new(format!("{}%", a.score)),
            Cell::new(outcome),
            Cell::new(format!("{}%", a.penalty_percent)),
            Cell::new(a.completed_at.format("%Y-%m-%d %H:%M:%S")),
        ]);
    }
    println!("{table}");

    if let Some(stats) = summarize_attempts(&attempts).get(&quiz_id) {
        println!(
            "\n{} attempt(s): best {}%, latest {}%, average {:.1}%",
            stats.attempts, stats.best_score, stats.latest_score, stats.average_score
        );
    }
    Ok(())
}
