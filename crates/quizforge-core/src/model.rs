//! Core data model types for quizforge.
//!
//! Quiz definitions arrive from a content-management collaborator and are
//! treated as immutable once scored. Submitted answers and correct answers
//! are loosely typed values; the evaluator resolves them per question type.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Submitted answers keyed by question id.
pub type AnswerMap = BTreeMap<String, AnswerValue>;

/// A quiz definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quiz {
    /// Unique identifier for this quiz.
    pub id: String,
    /// Human-readable title.
    #[serde(default)]
    pub title: String,
    /// Training that owns this quiz.
    pub training_id: String,
    /// Module that owns this quiz. Absent for a training's final exam.
    #[serde(default)]
    pub module_id: Option<String>,
    /// Ordered questions.
    #[serde(default)]
    pub questions: Vec<Question>,
    /// Minimum score percent (0-100 inclusive) required to pass.
    pub passing_score: u32,
    /// Time limit in minutes (None = unlimited).
    #[serde(default)]
    pub time_limit_minutes: Option<u32>,
    /// Maximum number of attempts (None = unlimited).
    #[serde(default)]
    pub max_attempts: Option<u32>,
    /// Presentation settings. No effect on scoring.
    #[serde(default)]
    pub settings: QuizSettings,
}

impl Quiz {
    /// Sum of all question weights.
    pub fn total_points(&self) -> u64 {
        self.questions.iter().map(|q| u64::from(q.points)).sum()
    }

    /// `true` when the quiz belongs to the training as a whole.
    pub fn is_final_exam(&self) -> bool {
        self.module_id.is_none()
    }

    pub fn question(&self, id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }
}

/// Presentation-only quiz settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizSettings {
    #[serde(default)]
    pub shuffle_questions: bool,
    #[serde(default)]
    pub shuffle_options: bool,
    #[serde(default)]
    pub show_review: bool,
    #[serde(default)]
    pub show_explanations: bool,
}

/// A single question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    /// Identifier, unique within its quiz.
    pub id: String,
    /// Question type; decides how `correct_answer` is interpreted.
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    /// Question text.
    #[serde(default)]
    pub prompt: String,
    /// Ordered options for choice-based types.
    #[serde(default)]
    pub options: Vec<String>,
    /// Answer key. Shape depends on `kind`; absent for essays.
    #[serde(default)]
    pub correct_answer: Option<AnswerValue>,
    /// Positive weight.
    #[serde(default = "default_points")]
    pub points: u32,
    /// Shown after grading. Display only.
    #[serde(default)]
    pub explanation: Option<String>,
}

fn default_points() -> u32 {
    1
}

/// Supported question types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionKind {
    MultipleChoice,
    TrueFalse,
    ShortAnswer,
    MultipleCorrect,
    Essay,
}

impl QuestionKind {
    /// `true` for types whose answers select among `options`.
    pub fn is_choice(self) -> bool {
        matches!(
            self,
            QuestionKind::MultipleChoice | QuestionKind::TrueFalse | QuestionKind::MultipleCorrect
        )
    }

    /// `true` for types the evaluator can grade on its own.
    pub fn is_auto_graded(self) -> bool {
        !matches!(self, QuestionKind::Essay)
    }
}

impl fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuestionKind::MultipleChoice => write!(f, "multiple-choice"),
            QuestionKind::TrueFalse => write!(f, "true-false"),
            QuestionKind::ShortAnswer => write!(f, "short-answer"),
            QuestionKind::MultipleCorrect => write!(f, "multiple-correct"),
            QuestionKind::Essay => write!(f, "essay"),
        }
    }
}

impl FromStr for QuestionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "multiple-choice" | "single" => Ok(QuestionKind::MultipleChoice),
            "true-false" | "boolean" => Ok(QuestionKind::TrueFalse),
            "short-answer" | "text" => Ok(QuestionKind::ShortAnswer),
            "multiple-correct" | "multiple" => Ok(QuestionKind::MultipleCorrect),
            "essay" => Ok(QuestionKind::Essay),
            other => Err(format!("unknown question type: {other}")),
        }
    }
}

/// A loosely typed answer value, as supplied by callers or quiz authors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    List(Vec<AnswerValue>),
    Object(BTreeMap<String, AnswerValue>),
}

impl AnswerValue {
    /// Short name of the value's shape, for diagnostics.
    pub fn shape(&self) -> &'static str {
        match self {
            AnswerValue::Null => "null",
            AnswerValue::Bool(_) => "boolean",
            AnswerValue::Integer(_) => "integer",
            AnswerValue::Float(_) => "number",
            AnswerValue::Text(_) => "string",
            AnswerValue::List(_) => "list",
            AnswerValue::Object(_) => "object",
        }
    }
}

impl From<bool> for AnswerValue {
    fn from(v: bool) -> Self {
        AnswerValue::Bool(v)
    }
}

impl From<i64> for AnswerValue {
    fn from(v: i64) -> Self {
        AnswerValue::Integer(v)
    }
}

impl From<&str> for AnswerValue {
    fn from(v: &str) -> Self {
        AnswerValue::Text(v.to_string())
    }
}

impl From<String> for AnswerValue {
    fn from(v: String) -> Self {
        AnswerValue::Text(v)
    }
}

impl<T: Into<AnswerValue>> From<Vec<T>> for AnswerValue {
    fn from(v: Vec<T>) -> Self {
        AnswerValue::List(v.into_iter().map(Into::into).collect())
    }
}

/// Optional anti-cheat telemetry supplied with a submission.
///
/// Every field is optional. With no telemetry at all the integrity policy
/// accepts the attempt without penalty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptTelemetry {
    /// Attempt start, epoch milliseconds.
    #[serde(default)]
    pub start_time: Option<i64>,
    /// Attempt end, epoch milliseconds.
    #[serde(default)]
    pub end_time: Option<i64>,
    /// Number of distinct questions with a detected violation.
    #[serde(default)]
    pub violation_count: Option<u32>,
    /// Response time per question id, in milliseconds.
    #[serde(default)]
    pub per_question_response_time_ms: BTreeMap<String, u64>,
    /// Violation category tags (e.g. "tab-switch", "copy-paste").
    #[serde(default)]
    pub violation_types: BTreeSet<String>,
}

impl AttemptTelemetry {
    /// Elapsed milliseconds between start and end, when both are present and ordered.
    pub fn elapsed_ms(&self) -> Option<u64> {
        let (start, end) = (self.start_time?, self.end_time?);
        u64::try_from(end.checked_sub(start)?).ok()
    }

    pub fn violations(&self) -> u32 {
        self.violation_count.unwrap_or(0)
    }
}

/// The outcome of scoring one submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizResult {
    /// Quiz that was scored.
    pub quiz_id: String,
    /// Penalty-adjusted score, 0-100, rounded down.
    pub score_percent: u32,
    /// Points from correctly answered questions.
    pub earned_points: u64,
    /// Points available in the quiz.
    pub total_points: u64,
    /// `score_percent >= passing_score`.
    pub passed: bool,
    /// Correctness per question id. Empty for rejected attempts.
    #[serde(default)]
    pub per_question: BTreeMap<String, bool>,
    /// Whether the integrity policy rejected the attempt.
    #[serde(default)]
    pub rejected: bool,
    /// Human-readable reason, present when `rejected`.
    #[serde(default)]
    pub rejection_reason: Option<String>,
    /// Score reduction applied for violations, in percent.
    #[serde(default)]
    pub penalty_percent: u32,
}

impl QuizResult {
    /// A zero-credit result for an attempt the integrity policy rejected.
    pub fn rejected(quiz: &Quiz, reason: impl Into<String>) -> Self {
        Self {
            quiz_id: quiz.id.clone(),
            score_percent: 0,
            earned_points: 0,
            total_points: quiz.total_points(),
            passed: false,
            per_question: BTreeMap::new(),
            rejected: true,
            rejection_reason: Some(reason.into()),
            penalty_percent: 0,
        }
    }

    /// Number of questions answered correctly.
    pub fn correct_count(&self) -> usize {
        self.per_question.values().filter(|c| **c).count()
    }
}
