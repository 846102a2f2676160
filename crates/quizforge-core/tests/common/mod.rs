//! Test doubles shared by the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use quizforge_core::model::{Question, QuestionKind, Quiz};
use quizforge_core::progress::{ProgressKey, TrainingProgress};
use quizforge_core::traits::{ProgressStore, QuizCatalog};
use quizforge_core::{EngineError, QuizService, StoreError};

/// Catalog over a fixed set of quizzes and module counts.
#[derive(Default)]
pub struct MockCatalog {
    quizzes: HashMap<String, Quiz>,
    modules: HashMap<String, usize>,
}

impl MockCatalog {
    pub fn with_quiz(mut self, quiz: Quiz) -> Self {
        self.quizzes.insert(quiz.id.clone(), quiz);
        self
    }

    pub fn with_training(mut self, training_id: &str, modules: usize) -> Self {
        self.modules.insert(training_id.to_string(), modules);
        self
    }
}

#[async_trait]
impl QuizCatalog for MockCatalog {
    async fn quiz(&self, quiz_id: &str) -> Result<Quiz, EngineError> {
        self.quizzes
            .get(quiz_id)
            .cloned()
            .ok_or_else(|| EngineError::QuizNotFound(quiz_id.to_string()))
    }

    async fn module_count(&self, training_id: &str) -> Result<usize, EngineError> {
        self.modules
            .get(training_id)
            .copied()
            .ok_or_else(|| EngineError::TrainingNotFound(training_id.to_string()))
    }
}

/// Store that yields between load and save, so unserialized writers would
/// lose updates.
#[derive(Default)]
pub struct MockStore {
    inner: Mutex<HashMap<ProgressKey, TrainingProgress>>,
    saves: AtomicUsize,
}

impl MockStore {
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProgressStore for MockStore {
    async fn load(&self, key: &ProgressKey) -> Result<Option<TrainingProgress>, StoreError> {
        let found = self.inner.lock().unwrap().get(key).cloned();
        tokio::task::yield_now().await;
        Ok(found)
    }

    async fn save(&self, progress: &TrainingProgress) -> Result<(), StoreError> {
        tokio::task::yield_now().await;
        self.inner
            .lock()
            .unwrap()
            .insert(progress.key(), progress.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn keys_for_learner(&self, learner_id: &str) -> Result<Vec<ProgressKey>, StoreError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .keys()
            .filter(|k| k.learner_id == learner_id)
            .cloned()
            .collect())
    }
}

pub fn mc(id: &str, key: i64, points: u32) -> Question {
    Question {
        id: id.into(),
        kind: QuestionKind::MultipleChoice,
        prompt: format!("{id}?"),
        options: vec!["a".into(), "b".into(), "c".into()],
        correct_answer: Some(key.into()),
        points,
        explanation: None,
    }
}

pub fn quiz(id: &str, training_id: &str, module_id: Option<&str>, questions: Vec<Question>) -> Quiz {
    Quiz {
        id: id.into(),
        title: id.into(),
        training_id: training_id.into(),
        module_id: module_id.map(Into::into),
        questions,
        passing_score: 50,
        time_limit_minutes: None,
        max_attempts: None,
        settings: Default::default(),
    }
}

/// A service over one three-module training with quizzes `m1-quiz`,
/// `m2-quiz`, `m3-quiz` and a final exam `final`.
pub fn three_module_service() -> (QuizService, Arc<MockStore>) {
    let catalog = ["m1", "m2", "m3"]
        .into_iter()
        .fold(MockCatalog::default().with_training("safety", 3), |c, m| {
            c.with_quiz(quiz(
                &format!("{m}-quiz"),
                "safety",
                Some(m),
                vec![mc("q1", 0, 1), mc("q2", 1, 1)],
            ))
        })
        .with_quiz(quiz("final", "safety", None, vec![mc("q1", 2, 1)]));
    let store = Arc::new(MockStore::default());
    let service = QuizService::new(Arc::new(catalog), store.clone());
    (service, store)
}
