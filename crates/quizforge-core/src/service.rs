//! Quiz service facade.
//!
//! Ties the catalog, the scoring engine, the attempt recorder and the
//! progress aggregator together behind the two external operations,
//! `submit_quiz` and `get_progress`, plus the status updates that feed
//! module progress.
//!
//! Every mutation of a (learner, training) aggregate runs under that
//! aggregate's lock and ends in exactly one `ProgressStore::save`. The lock
//! is taken in-process first, then from the store, which covers other
//! processes sharing the same storage. Scoring happens before the lock is
//! taken. Different aggregates never contend.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::attempt::{AttemptGate, AttemptRecord, AttemptRecorder, Unlimited};
use crate::engine::ScoringEngine;
use crate::error::EngineError;
use crate::model::{AnswerMap, AttemptTelemetry, QuizResult};
use crate::progress::{
    ModuleProgressPolicy, ProgressAggregator, ProgressKey, ProgressStatus, SectionAverage,
    TrainingProgress, TrainingProgressPolicy,
};
use crate::statistics::{attempts_for, summarize_attempts, QuizAttemptStats};
use crate::traits::{ProgressStore, QuizCatalog};

/// Idle lock entries are pruned once the table grows past this size.
const LOCK_TABLE_PRUNE_THRESHOLD: usize = 1024;

/// One async mutex per progress aggregate.
#[derive(Default)]
pub struct KeyedLocks {
    table: Mutex<HashMap<ProgressKey, Arc<AsyncMutex<()>>>>,
}

impl KeyedLocks {
    /// Wait for exclusive access to `key`. The guard releases on drop.
    pub async fn acquire(&self, key: &ProgressKey) -> OwnedMutexGuard<()> {
        let lock = {
            let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
            if table.len() > LOCK_TABLE_PRUNE_THRESHOLD {
                table.retain(|_, lock| Arc::strong_count(lock) > 1);
            }
            Arc::clone(table.entry(key.clone()).or_default())
        };
        lock.lock_owned().await
    }

    /// Number of keys currently tracked.
    pub fn len(&self) -> usize {
        self.table
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Entry point for quiz submissions and progress queries.
pub struct QuizService {
    catalog: Arc<dyn QuizCatalog>,
    store: Arc<dyn ProgressStore>,
    engine: ScoringEngine,
    recorder: AttemptRecorder,
    aggregator: ProgressAggregator,
    gate: Arc<dyn AttemptGate>,
    module_policy: Arc<dyn ModuleProgressPolicy>,
    locks: KeyedLocks,
}

impl fmt::Debug for QuizService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuizService")
            .field("engine", &self.engine)
            .field("locks", &self.locks.len())
            .finish_non_exhaustive()
    }
}

impl QuizService {
    /// A service with every integrity rule off, no attempt limit, and the
    /// default progress policies.
    pub fn new(catalog: Arc<dyn QuizCatalog>, store: Arc<dyn ProgressStore>) -> Self {
        Self {
            catalog,
            store,
            engine: ScoringEngine::default(),
            recorder: AttemptRecorder,
            aggregator: ProgressAggregator::default(),
            gate: Arc::new(Unlimited),
            module_policy: Arc::new(SectionAverage),
            locks: KeyedLocks::default(),
        }
    }

    pub fn with_engine(mut self, engine: ScoringEngine) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_attempt_gate(mut self, gate: Arc<dyn AttemptGate>) -> Self {
        self.gate = gate;
        self
    }

    pub fn with_module_policy(mut self, policy: Arc<dyn ModuleProgressPolicy>) -> Self {
        self.module_policy = policy;
        self
    }

    pub fn with_training_policy(mut self, policy: Arc<dyn TrainingProgressPolicy>) -> Self {
        self.aggregator = ProgressAggregator::new(policy);
        self
    }

    pub fn engine(&self) -> &ScoringEngine {
        &self.engine
    }

    /// Score a submission and record it against the learner's progress.
    pub async fn submit_quiz(
        &self,
        learner_id: &str,
        quiz_id: &str,
        answers: AnswerMap,
        telemetry: Option<AttemptTelemetry>,
    ) -> Result<QuizResult, EngineError> {
        let (result, _) = self
            .submit_attempt(learner_id, quiz_id, answers, telemetry)
            .await?;
        Ok(result)
    }

    /// Like [`submit_quiz`](Self::submit_quiz), also returning the recorded attempt.
    pub async fn submit_attempt(
        &self,
        learner_id: &str,
        quiz_id: &str,
        answers: AnswerMap,
        telemetry: Option<AttemptTelemetry>,
    ) -> Result<(QuizResult, AttemptRecord), EngineError> {
        let quiz = self.catalog.quiz(quiz_id).await?;
        let result = self.engine.score(&quiz, &answers, telemetry.as_ref());

        let key = ProgressKey::new(learner_id, quiz.training_id.clone());
        let _guard = self.locks.acquire(&key).await;
        let _store_lock = self.store.lock(&key).await?;

        let now = Utc::now();
        let mut progress = match self.store.load(&key).await? {
            Some(progress) => progress,
            None => self.create(key, now).await?,
        };

        let prior = AttemptRecorder::next_attempt_number(&progress, &quiz.id) - 1;
        self.gate.check(&quiz, prior)?;

        let record = self.recorder.record(
            &mut progress,
            &quiz,
            &result,
            answers,
            telemetry.as_ref(),
            now,
        );
        self.aggregator.refresh(&mut progress, now);
        self.store.save(&progress).await?;

        Ok((result, record))
    }

    /// Read-only snapshot of a learner's progress in a training.
    pub async fn get_progress(
        &self,
        learner_id: &str,
        training_id: &str,
    ) -> Result<TrainingProgress, EngineError> {
        let key = ProgressKey::new(learner_id, training_id);
        self.store
            .load(&key)
            .await?
            .ok_or_else(|| not_found(&key))
    }

    /// Create the learner's aggregate for a training, or return the existing one.
    pub async fn enroll(
        &self,
        learner_id: &str,
        training_id: &str,
    ) -> Result<TrainingProgress, EngineError> {
        let key = ProgressKey::new(learner_id, training_id);
        let _guard = self.locks.acquire(&key).await;
        let _store_lock = self.store.lock(&key).await?;

        if let Some(existing) = self.store.load(&key).await? {
            return Ok(existing);
        }
        let progress = self.create(key, Utc::now()).await?;
        self.store.save(&progress).await?;
        Ok(progress)
    }

    /// Set a module's status and percent.
    pub async fn update_module_status(
        &self,
        learner_id: &str,
        training_id: &str,
        module_id: &str,
        status: ProgressStatus,
        percent: u8,
    ) -> Result<TrainingProgress, EngineError> {
        let key = ProgressKey::new(learner_id, training_id);
        let _guard = self.locks.acquire(&key).await;
        let _store_lock = self.store.lock(&key).await?;

        let progress = self.load_existing(&key).await?;
        let progress =
            self.aggregator
                .apply_module_status(progress, module_id, status, percent, Utc::now())?;
        self.store.save(&progress).await?;
        Ok(progress)
    }

    /// Record a section's state and re-derive its module through the module
    /// progress policy.
    pub async fn update_section_status(
        &self,
        learner_id: &str,
        training_id: &str,
        module_id: &str,
        section_id: &str,
        completed: bool,
        percent: u8,
    ) -> Result<TrainingProgress, EngineError> {
        let key = ProgressKey::new(learner_id, training_id);
        let _guard = self.locks.acquire(&key).await;
        let _store_lock = self.store.lock(&key).await?;

        let now = Utc::now();
        let progress = self.load_existing(&key).await?;
        let progress = self.aggregator.apply_section_status(
            progress, module_id, section_id, completed, percent, now,
        )?;
        let (status, module_percent) = match progress.module(module_id) {
            Some(module) => self.module_policy.evaluate(module),
            None => (ProgressStatus::NotStarted, 0),
        };
        let progress = self.aggregator.apply_module_status(
            progress,
            module_id,
            status,
            module_percent.min(100),
            now,
        )?;
        self.store.save(&progress).await?;
        Ok(progress)
    }

    /// A learner's attempts at one quiz, oldest first.
    pub async fn attempts(
        &self,
        learner_id: &str,
        quiz_id: &str,
    ) -> Result<Vec<AttemptRecord>, EngineError> {
        let quiz = self.catalog.quiz(quiz_id).await?;
        let progress = self.get_progress(learner_id, &quiz.training_id).await?;
        Ok(attempts_for(progress.attempts(), quiz_id)
            .into_iter()
            .cloned()
            .collect())
    }

    /// Per-quiz attempt statistics for a learner in a training.
    pub async fn statistics(
        &self,
        learner_id: &str,
        training_id: &str,
    ) -> Result<BTreeMap<String, QuizAttemptStats>, EngineError> {
        let progress = self.get_progress(learner_id, training_id).await?;
        Ok(summarize_attempts(progress.attempts()))
    }

    async fn create(
        &self,
        key: ProgressKey,
        now: chrono::DateTime<Utc>,
    ) -> Result<TrainingProgress, EngineError> {
        let total = self.catalog.module_count(&key.training_id).await?;
        tracing::info!(progress = %key, modules = total, "creating progress");
        Ok(TrainingProgress::new(key, total, now))
    }

    async fn load_existing(&self, key: &ProgressKey) -> Result<TrainingProgress, EngineError> {
        self.store.load(key).await?.ok_or_else(|| not_found(key))
    }
}

fn not_found(key: &ProgressKey) -> EngineError {
    EngineError::ProgressNotFound {
        learner_id: key.learner_id.clone(),
        training_id: key.training_id.clone(),
    }
}
