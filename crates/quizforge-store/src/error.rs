//! Catalog error types.

use thiserror::Error;

/// Errors raised while assembling a quiz catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Two quiz definitions share an id.
    #[error("duplicate quiz id: {0}")]
    DuplicateQuiz(String),

    /// A declared module count is smaller than the modules its quizzes reference.
    #[error("training '{training_id}' declares {declared} modules but its quizzes reference {found}")]
    ModuleCountMismatch {
        training_id: String,
        declared: usize,
        found: usize,
    },
}
