//! The `quizforge module` and `quizforge section` commands.

use std::path::PathBuf;

use anyhow::Result;

use quizforge_core::progress::ProgressStatus;

use super::load_service;
use super::progress::print_progress;

pub async fn execute(
    learner: String,
    training: String,
    module: String,
    status: String,
    percent: u8,
    config: Option<PathBuf>,
) -> Result<()> {
    let status: ProgressStatus = status.parse().map_err(|e: String| anyhow::anyhow!(e))?;
    let percent = match status {
        ProgressStatus::Completed => 100,
        _ => percent,
    };

    let service = load_service(config)?;
    let progress = service
        .update_module_status(&learner, &training, &module, status, percent)
        .await?;
    print_progress(&progress);
    Ok(())
}

pub async fn section(
    learner: String,
    training: String,
    module: String,
    section: String,
    completed: bool,
    percent: u8,
    config: Option<PathBuf>,
) -> Result<()> {
    let service = load_service(config)?;
    let progress = service
        .update_section_status(&learner, &training, &module, &section, completed, percent)
        .await?;
    print_progress(&progress);
    Ok(())
}
