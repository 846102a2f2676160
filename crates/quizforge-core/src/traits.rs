//! Collaborator traits.
//!
//! Quiz definitions come from a catalog and progress aggregates live in a
//! store. Both are implemented by the `quizforge-store` crate.

use async_trait::async_trait;

use crate::error::{EngineError, StoreError};
use crate::model::Quiz;
use crate::progress::{ProgressKey, TrainingProgress};

// ---------------------------------------------------------------------------
// Quiz catalog
// ---------------------------------------------------------------------------

/// Read-only source of quiz definitions and training outlines.
#[async_trait]
pub trait QuizCatalog: Send + Sync {
    /// Fetch a quiz by id.
    ///
    /// Returns `EngineError::QuizNotFound` for unknown ids.
    async fn quiz(&self, quiz_id: &str) -> Result<Quiz, EngineError>;

    /// Number of modules in a training.
    ///
    /// Returns `EngineError::TrainingNotFound` for unknown trainings.
    async fn module_count(&self, training_id: &str) -> Result<usize, EngineError>;
}

// ---------------------------------------------------------------------------
// Progress store
// ---------------------------------------------------------------------------

/// Exclusive hold on one aggregate, released on drop.
pub struct StoreLock {
    held: Option<Box<dyn Send + Sync>>,
}

impl StoreLock {
    /// A lock that holds nothing, for stores only reachable from one process.
    pub fn none() -> Self {
        Self { held: None }
    }

    /// Keep `guard` alive until this lock is dropped.
    pub fn holding(guard: impl Send + Sync + 'static) -> Self {
        Self {
            held: Some(Box::new(guard)),
        }
    }
}

impl std::fmt::Debug for StoreLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreLock")
            .field("held", &self.held.is_some())
            .finish()
    }
}

/// Persistence for progress aggregates.
///
/// `save` must replace the whole aggregate in one atomic write: a concurrent
/// `load` sees either the previous or the new aggregate, never a mix.
/// Callers hold [`lock`](ProgressStore::lock) across each load-modify-save.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// Load an aggregate, or `None` if the learner has none for the training.
    async fn load(&self, key: &ProgressKey) -> Result<Option<TrainingProgress>, StoreError>;

    /// Persist an aggregate, replacing any previous version.
    async fn save(&self, progress: &TrainingProgress) -> Result<(), StoreError>;

    /// Exclude other writers of `key`, including ones in other processes
    /// sharing the same storage, until the returned lock is dropped.
    async fn lock(&self, _key: &ProgressKey) -> Result<StoreLock, StoreError> {
        Ok(StoreLock::none())
    }

    /// Keys of all stored aggregates for a learner.
    async fn keys_for_learner(&self, learner_id: &str) -> Result<Vec<ProgressKey>, StoreError>;
}
