//! Error types.
//!
//! `EngineError` is what callers of the service see. `StoreError` is raised by
//! `ProgressStore` implementations and wrapped by the engine. `AnswerError`
//! never leaves the evaluator: a malformed answer is scored as incorrect.

use thiserror::Error;

/// Errors surfaced to callers of the quiz service.
#[derive(Debug, Error)]
pub enum EngineError {
    /// No quiz with this id exists in the catalog.
    #[error("quiz not found: {0}")]
    QuizNotFound(String),

    /// The catalog does not know this training.
    #[error("training not found: {0}")]
    TrainingNotFound(String),

    /// The learner has no progress record for this training.
    #[error("no progress for learner '{learner_id}' in training '{training_id}'")]
    ProgressNotFound {
        learner_id: String,
        training_id: String,
    },

    /// The attempt gate refused another attempt.
    #[error("attempt limit reached for quiz '{quiz_id}' (max {max_attempts})")]
    AttemptLimitReached { quiz_id: String, max_attempts: u32 },

    /// A status update carried values outside their domain.
    #[error("invalid update: {0}")]
    InvalidUpdate(String),

    /// The progress store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl EngineError {
    /// Returns `true` for lookup failures (unknown quiz, training or progress).
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            EngineError::QuizNotFound(_)
                | EngineError::TrainingNotFound(_)
                | EngineError::ProgressNotFound { .. }
        )
    }
}

/// Errors raised by progress store backends.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing the backing medium failed.
    #[error("storage I/O failed: {0}")]
    Io(String),

    /// A progress aggregate could not be encoded or decoded.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// A stored aggregate exists but cannot be trusted.
    #[error("stored progress for {key} is corrupt: {message}")]
    Corrupt { key: String, message: String },
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

/// Reasons an answer could not be compared against a question's key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnswerError {
    /// The question has no correct answer to compare against.
    #[error("question has no correct answer")]
    MissingCorrectAnswer,

    /// A value had the wrong shape for the question type.
    #[error("expected {expected}, found {found}")]
    Malformed {
        expected: &'static str,
        found: String,
    },
}
