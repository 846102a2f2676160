//! The `quizforge init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    // Create quizforge.toml
    if std::path::Path::new("quizforge.toml").exists() {
        println!("quizforge.toml already exists, skipping.");
    } else {
        std::fs::write("quizforge.toml", SAMPLE_CONFIG)?;
        println!("Created quizforge.toml");
    }

    // Create example quiz
    std::fs::create_dir_all("quizzes")?;
    let example_path = std::path::Path::new("quizzes/example.toml");
    if example_path.exists() {
        println!("quizzes/example.toml already exists, skipping.");
    } else {
        std::fs::write(example_path, EXAMPLE_QUIZ)?;
        println!("Created quizzes/example.toml");
    }

    println!("\nNext steps:");
    println!("  1. Edit quizforge.toml to enable integrity rules if needed");
    println!("  2. Run: quizforge validate --quiz quizzes/example.toml");
    println!("  3. Run: quizforge submit --learner alice --quiz example-quiz --answers answers.json");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# quizforge configuration

data_dir = "./quizforge-data"
quiz_dir = "./quizzes"

# Module counts for trainings with modules that have no quiz
[trainings]
example-training = 2

# Integrity rules are all disabled by default.
[integrity.min_duration]
enabled = false
per_question_ms = 10000

[integrity.violation_ceiling]
enabled = false
max_violations = 10

[integrity.bot_speed]
enabled = false
fast_response_ms = 2000
max_fast_percent = 80

[integrity.penalty]
enabled = false
per_violation_percent = 5
max_percent = 50

[attempts]
enforce_max_attempts = false
"#;

const EXAMPLE_QUIZ: &str = r#"[quiz]
id = "example-quiz"
title = "Example quiz"
training_id = "example-training"
module_id = "module-1"
passing_score = 50
max_attempts = 3

[quiz.settings]
show_review = true
show_explanations = true

[[questions]]
id = "q1"
type = "multiple-choice"
prompt = "Which planet is closest to the sun?"
options = ["Venus", "Mercury", "Mars"]
correct_answer = 1
explanation = "Mercury orbits closest to the sun."

[[questions]]
id = "q2"
type = "true-false"
prompt = "Water boils at 100 degrees Celsius at sea level."
correct_answer = true

[[questions]]
id = "q3"
type = "multiple-correct"
prompt = "Which of these are primary colors?"
options = ["Red", "Green", "Blue", "Yellow"]
correct_answer = [0, 2, 3]
points = 2

[[questions]]
id = "q4"
type = "short-answer"
prompt = "What is the chemical symbol for gold?"
correct_answer = "Au"
"#;
