//! TOML quiz parser.
//!
//! Loads quiz definitions from TOML files and directories, and validates them.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::evaluator::{Choice, ExpectedAnswer};
use crate::model::{AnswerValue, Question, QuestionKind, Quiz, QuizSettings};

/// Intermediate TOML structure for parsing quiz files.
#[derive(Debug, Deserialize)]
struct TomlQuizFile {
    quiz: TomlQuizHeader,
    #[serde(default)]
    questions: Vec<TomlQuestion>,
}

#[derive(Debug, Deserialize)]
struct TomlQuizHeader {
    id: String,
    #[serde(default)]
    title: String,
    training_id: String,
    #[serde(default)]
    module_id: Option<String>,
    #[serde(default = "default_passing_score")]
    passing_score: u32,
    #[serde(default)]
    time_limit_minutes: Option<u32>,
    #[serde(default)]
    max_attempts: Option<u32>,
    #[serde(default)]
    settings: QuizSettings,
}

fn default_passing_score() -> u32 {
    70
}

#[derive(Debug, Deserialize)]
struct TomlQuestion {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    prompt: String,
    #[serde(default)]
    options: Vec<String>,
    #[serde(default)]
    correct_answer: Option<AnswerValue>,
    #[serde(default = "default_points")]
    points: u32,
    #[serde(default)]
    explanation: Option<String>,
}

fn default_points() -> u32 {
    1
}

/// Parse a single TOML file into a `Quiz`.
pub fn parse_quiz(path: &Path) -> Result<Quiz> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read quiz file: {}", path.display()))?;

    parse_quiz_str(&content, path)
}

/// Parse a TOML string into a `Quiz` (useful for testing).
pub fn parse_quiz_str(content: &str, source_path: &Path) -> Result<Quiz> {
    let parsed: TomlQuizFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    let questions = parsed
        .questions
        .into_iter()
        .map(|q| {
            let kind: QuestionKind = q
                .kind
                .parse()
                .map_err(|e: String| anyhow::anyhow!("question {}: {}", q.id, e))?;
            Ok(Question {
                id: q.id,
                kind,
                prompt: q.prompt,
                options: q.options,
                correct_answer: q.correct_answer,
                points: q.points,
                explanation: q.explanation,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let header = parsed.quiz;
    Ok(Quiz {
        id: header.id,
        title: header.title,
        training_id: header.training_id,
        module_id: header.module_id.filter(|m| !m.trim().is_empty()),
        questions,
        passing_score: header.passing_score,
        time_limit_minutes: header.time_limit_minutes,
        max_attempts: header.max_attempts,
        settings: header.settings,
    })
}

/// Recursively load all `.toml` quiz files from a directory.
pub fn load_quiz_directory(dir: &Path) -> Result<Vec<Quiz>> {
    let mut quizzes = Vec::new();

    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
    {
        let entry = entry?;
        let path = entry.path();

        if path.is_dir() {
            quizzes.extend(load_quiz_directory(&path)?);
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            match parse_quiz(&path) {
                Ok(quiz) => quizzes.push(quiz),
                Err(e) => {
                    tracing::warn!("skipping {}: {:#}", path.display(), e);
                }
            }
        }
    }

    Ok(quizzes)
}

/// A warning from quiz validation.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// The question ID (if applicable).
    pub question_id: Option<String>,
    /// Warning message.
    pub message: String,
}

impl ValidationWarning {
    fn quiz(message: impl Into<String>) -> Self {
        Self {
            question_id: None,
            message: message.into(),
        }
    }

    fn question(question: &Question, message: impl Into<String>) -> Self {
        Self {
            question_id: Some(question.id.clone()),
            message: message.into(),
        }
    }
}

/// Validate a quiz for common authoring mistakes.
///
/// Nothing here blocks scoring; a flawed question simply never scores.
pub fn validate_quiz(quiz: &Quiz) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    if quiz.passing_score > 100 {
        warnings.push(ValidationWarning::quiz(format!(
            "passing_score {} is above 100 and can never be reached",
            quiz.passing_score
        )));
    }

    if quiz.total_points() == 0 {
        warnings.push(ValidationWarning::quiz(
            "quiz has no points; every attempt will score 0 and fail",
        ));
    }

    let mut seen_ids = HashSet::new();
    for question in &quiz.questions {
        if !seen_ids.insert(&question.id) {
            warnings.push(ValidationWarning::question(
                question,
                format!("duplicate question ID: {}", question.id),
            ));
        }
    }

    for question in &quiz.questions {
        warnings.extend(validate_question(question));
    }

    warnings
}

fn validate_question(question: &Question) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    if question.kind == QuestionKind::Essay {
        warnings.push(ValidationWarning::question(
            question,
            "essay questions are not auto-graded and always score as incorrect",
        ));
        return warnings;
    }

    // true-false keys may be plain booleans without options
    if question.options.is_empty()
        && matches!(
            question.kind,
            QuestionKind::MultipleChoice | QuestionKind::MultipleCorrect
        )
    {
        warnings.push(ValidationWarning::question(
            question,
            format!("{} question has no options", question.kind),
        ));
    }

    let expected = match ExpectedAnswer::resolve(question) {
        Ok(expected) => expected,
        Err(e) => {
            warnings.push(ValidationWarning::question(
                question,
                format!("correct_answer unusable: {e}"),
            ));
            return warnings;
        }
    };

    let option_count = question.options.len() as u64;
    let out_of_range: Vec<u64> = match &expected {
        ExpectedAnswer::Single(Choice::Index(i)) if question.kind.is_choice() => vec![*i],
        ExpectedAnswer::MultiSet(set) => set.iter().copied().collect(),
        _ => vec![],
    }
    .into_iter()
    .filter(|i| *i >= option_count)
    .collect();
    if !out_of_range.is_empty() && option_count > 0 {
        warnings.push(ValidationWarning::question(
            question,
            format!(
                "correct_answer index {:?} is out of range for {} options",
                out_of_range, option_count
            ),
        ));
    }

    if let ExpectedAnswer::Single(Choice::Label(label)) = &expected {
        if !question.options.iter().any(|o| o == label) {
            warnings.push(ValidationWarning::question(
                question,
                format!("correct_answer label '{label}' is not one of the options"),
            ));
        }
    }

    if let ExpectedAnswer::MultiSet(set) = &expected {
        if set.is_empty() {
            warnings.push(ValidationWarning::question(
                question,
                "correct_answer is an empty set",
            ));
        }
    }

    if question.points == 0 {
        warnings.push(ValidationWarning::question(
            question,
            "question is worth 0 points",
        ));
    }

    warnings
}
