//! The `quizforge validate` command.

use std::path::PathBuf;

use anyhow::Result;

pub fn execute(quiz_path: PathBuf) -> Result<()> {
    let quizzes = if quiz_path.is_dir() {
        quizforge_core::parser::load_quiz_directory(&quiz_path)?
    } else {
        vec![quizforge_core::parser::parse_quiz(&quiz_path)?]
    };

    let mut total_warnings = 0;

    for quiz in &quizzes {
        let owner = match &quiz.module_id {
            Some(module) => format!("{} / {module}", quiz.training_id),
            None => format!("{} / final exam", quiz.training_id),
        };
        println!(
            "Quiz: {} [{owner}] ({} questions, {} points)",
            quiz.id,
            quiz.questions.len(),
            quiz.total_points()
        );

        let warnings = quizforge_core::parser::validate_quiz(quiz);
        for w in &warnings {
            let prefix = w
                .question_id
                .as_ref()
                .map(|id| format!("  [{id}]"))
                .unwrap_or_else(|| "  ".to_string());
            println!("{prefix} WARNING: {}", w.message);
        }
        total_warnings += warnings.len();
    }

    if total_warnings == 0 {
        println!("All quizzes valid.");
    } else {
        println!("\n{total_warnings} warning(s) found.");
    }

    Ok(())
}
