//! In-memory catalog and progress store.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use async_trait::async_trait;
use tokio::sync::RwLock;

use quizforge_core::model::Quiz;
use quizforge_core::parser::load_quiz_directory;
use quizforge_core::progress::{ProgressKey, TrainingProgress};
use quizforge_core::traits::{ProgressStore, QuizCatalog};
use quizforge_core::{EngineError, StoreError};

use crate::error::CatalogError;

/// Quiz catalog held in memory.
///
/// A training's module count is either declared with
/// [`with_training`](Self::with_training) or derived from the distinct
/// module ids its quizzes reference.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    quizzes: HashMap<String, Quiz>,
    declared_modules: HashMap<String, usize>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from every quiz file under `dir`.
    pub fn from_directory(dir: &Path) -> anyhow::Result<Self> {
        let mut catalog = Self::new();
        for quiz in load_quiz_directory(dir)? {
            catalog.insert(quiz)?;
        }
        tracing::info!(
            quizzes = catalog.quizzes.len(),
            "loaded quiz catalog from {}",
            dir.display()
        );
        Ok(catalog)
    }

    /// Add a quiz. Ids must be unique across the catalog.
    pub fn insert(&mut self, quiz: Quiz) -> Result<(), CatalogError> {
        if self.quizzes.contains_key(&quiz.id) {
            return Err(CatalogError::DuplicateQuiz(quiz.id));
        }
        self.quizzes.insert(quiz.id.clone(), quiz);
        Ok(())
    }

    pub fn with_quiz(mut self, quiz: Quiz) -> Result<Self, CatalogError> {
        self.insert(quiz)?;
        Ok(self)
    }

    /// Declare a training's module count, including modules without quizzes.
    pub fn with_training(mut self, training_id: &str, modules: usize) -> Result<Self, CatalogError> {
        let found = self.referenced_modules(training_id).len();
        if modules < found {
            return Err(CatalogError::ModuleCountMismatch {
                training_id: training_id.to_string(),
                declared: modules,
                found,
            });
        }
        self.declared_modules.insert(training_id.to_string(), modules);
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.quizzes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quizzes.is_empty()
    }

    /// Quizzes sorted by id.
    pub fn quizzes(&self) -> Vec<&Quiz> {
        let mut quizzes: Vec<&Quiz> = self.quizzes.values().collect();
        quizzes.sort_by(|a, b| a.id.cmp(&b.id));
        quizzes
    }

    fn referenced_modules(&self, training_id: &str) -> BTreeSet<&str> {
        self.quizzes
            .values()
            .filter(|q| q.training_id == training_id)
            .filter_map(|q| q.module_id.as_deref())
            .collect()
    }

    fn knows_training(&self, training_id: &str) -> bool {
        self.declared_modules.contains_key(training_id)
            || self.quizzes.values().any(|q| q.training_id == training_id)
    }
}

#[async_trait]
impl QuizCatalog for InMemoryCatalog {
    async fn quiz(&self, quiz_id: &str) -> Result<Quiz, EngineError> {
        self.quizzes
            .get(quiz_id)
            .cloned()
            .ok_or_else(|| EngineError::QuizNotFound(quiz_id.to_string()))
    }

    async fn module_count(&self, training_id: &str) -> Result<usize, EngineError> {
        if !self.knows_training(training_id) {
            return Err(EngineError::TrainingNotFound(training_id.to_string()));
        }
        let referenced = self.referenced_modules(training_id).len();
        Ok(self
            .declared_modules
            .get(training_id)
            .copied()
            .unwrap_or(referenced)
            .max(referenced))
    }
}

/// Progress store held in memory. Contents are lost on drop.
#[derive(Debug, Default)]
pub struct InMemoryProgressStore {
    aggregates: RwLock<HashMap<ProgressKey, TrainingProgress>>,
}

impl InMemoryProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.aggregates.read().await.len()
    }
}

#[async_trait]
impl ProgressStore for InMemoryProgressStore {
    async fn load(&self, key: &ProgressKey) -> Result<Option<TrainingProgress>, StoreError> {
        Ok(self.aggregates.read().await.get(key).cloned())
    }

    async fn save(&self, progress: &TrainingProgress) -> Result<(), StoreError> {
        self.aggregates
            .write()
            .await
            .insert(progress.key(), progress.clone());
        Ok(())
    }

    async fn keys_for_learner(&self, learner_id: &str) -> Result<Vec<ProgressKey>, StoreError> {
        let mut keys: Vec<ProgressKey> = self
            .aggregates
            .read()
            .await
            .keys()
            .filter(|k| k.learner_id == learner_id)
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use quizforge_core::progress::ProgressKey;

    fn quiz(id: &str, training: &str, module: Option<&str>) -> Quiz {
        Quiz {
            id: id.into(),
            title: String::new(),
            training_id: training.into(),
            module_id: module.map(Into::into),
            questions: vec![],
            passing_score: 50,
            time_limit_minutes: None,
            max_attempts: None,
            settings: Default::default(),
        }
    }

    #[tokio::test]
    async fn module_count_derived_or_declared() {
        let catalog = InMemoryCatalog::new()
            .with_quiz(quiz("a", "t", Some("m1")))
            .unwrap()
            .with_quiz(quiz("b", "t", Some("m2")))
            .unwrap()
            .with_quiz(quiz("c", "t", Some("m2")))
            .unwrap()
            .with_quiz(quiz("final", "t", None))
            .unwrap();
        assert_eq!(catalog.module_count("t").await.unwrap(), 2);

        let catalog = catalog.with_training("t", 5).unwrap();
        assert_eq!(catalog.module_count("t").await.unwrap(), 5);

        let catalog = catalog.with_training("empty", 0).unwrap();
        assert_eq!(catalog.module_count("empty").await.unwrap(), 0);
        assert!(matches!(
            catalog.module_count("unknown").await,
            Err(EngineError::TrainingNotFound(_))
        ));
    }

    #[test]
    fn rejects_duplicates_and_undersized_trainings() {
        let catalog = InMemoryCatalog::new().with_quiz(quiz("a", "t", Some("m1"))).unwrap();
        assert!(matches!(
            catalog.clone().with_quiz(quiz("a", "t", None)),
            Err(CatalogError::DuplicateQuiz(_))
        ));
        let catalog = catalog.with_quiz(quiz("b", "t", Some("m2"))).unwrap();
        assert!(matches!(
            catalog.with_training("t", 1),
            Err(CatalogError::ModuleCountMismatch { found: 2, .. })
        ));
    }

    #[tokio::test]
    async fn unknown_quiz_is_not_found() {
        let catalog = InMemoryCatalog::new();
        assert!(matches!(
            catalog.quiz("nope").await,
            Err(EngineError::QuizNotFound(_))
        ));
    }

    #[tokio::test]
    async fn store_round_trip() {
        let store = InMemoryProgressStore::new();
        let key = ProgressKey::new("ann", "t");
        assert!(store.load(&key).await.unwrap().is_none());

        let progress = TrainingProgress::new(key.clone(), 3, Utc::now());
        store.save(&progress).await.unwrap();
        store
            .save(&TrainingProgress::new(ProgressKey::new("ann", "u"), 1, Utc::now()))
            .await
            .unwrap();

        assert_eq!(store.load(&key).await.unwrap(), Some(progress));
        assert_eq!(store.len().await, 2);
        assert_eq!(store.keys_for_learner("ann").await.unwrap().len(), 2);
        assert!(store.keys_for_learner("bob").await.unwrap().is_empty());
    }
}
