//! The `quizforge submit` command.

use std::path::PathBuf;

use anyhow::Result;

use super::{load_service, print_result, read_answers, read_telemetry};

pub async fn execute(
    learner: String,
    quiz_id: String,
    answers_path: PathBuf,
    telemetry_path: Option<PathBuf>,
    format: String,
    config: Option<PathBuf>,
) -> Result<()> {
    let service = load_service(config)?;
    let answers = read_answers(&answers_path)?;
    let telemetry = read_telemetry(telemetry_path.as_deref())?;

    let (result, record) = service
        .submit_attempt(&learner, &quiz_id, answers, telemetry)
        .await?;

    if format == "json" {
        let output = serde_json::json!({ "result": result, "attempt": record });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    print_result(&result, &format)?;
    println!(
        "Recorded attempt {} ({})",
        record.attempt_number, record.attempt_id
    );
    Ok(())
}
