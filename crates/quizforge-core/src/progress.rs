//! Per-learner, per-training progress aggregate and its aggregator.
//!
//! The summary counters (`finished`, `in_progress`, `not_started`) are never
//! adjusted incrementally. Every mutation that can change a module status
//! ends with a full tally over the module map, so the counters always agree
//! with the per-module state and always sum to the module total.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::attempt::AttemptRecord;
use crate::error::EngineError;

/// Identity of a progress aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProgressKey {
    pub learner_id: String,
    pub training_id: String,
}

impl ProgressKey {
    pub fn new(learner_id: impl Into<String>, training_id: impl Into<String>) -> Self {
        Self {
            learner_id: learner_id.into(),
            training_id: training_id.into(),
        }
    }
}

impl fmt::Display for ProgressKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.learner_id, self.training_id)
    }
}

/// Completion status of a module or training.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProgressStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
}

impl fmt::Display for ProgressStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgressStatus::NotStarted => write!(f, "not-started"),
            ProgressStatus::InProgress => write!(f, "in-progress"),
            ProgressStatus::Completed => write!(f, "completed"),
        }
    }
}

impl FromStr for ProgressStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "not-started" => Ok(ProgressStatus::NotStarted),
            "in-progress" => Ok(ProgressStatus::InProgress),
            "completed" | "done" => Ok(ProgressStatus::Completed),
            other => Err(format!("unknown status: {other}")),
        }
    }
}

/// Progress on one section of a module.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionProgress {
    pub completed: bool,
    /// Percent, 0-100.
    pub progress: u8,
}

/// Latest result of a quiz, as kept in the aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizSummary {
    pub score_percent: u32,
    pub passed: bool,
    pub rejected: bool,
    pub attempt_number: u32,
    pub completed_at: DateTime<Utc>,
}

/// Progress on one module.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleProgress {
    pub status: ProgressStatus,
    /// Percent, 0-100.
    pub progress: u8,
    pub time_spent_secs: u64,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub sections: BTreeMap<String, SectionProgress>,
    #[serde(default)]
    pub quizzes: BTreeMap<String, QuizSummary>,
}

/// Tally of module statuses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressCounters {
    pub finished: usize,
    pub in_progress: usize,
    pub not_started: usize,
}

impl ProgressCounters {
    pub fn total(&self) -> usize {
        self.finished + self.in_progress + self.not_started
    }
}

/// A learner's progress through one training.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingProgress {
    learner_id: String,
    training_id: String,
    status: ProgressStatus,
    started_at: DateTime<Utc>,
    #[serde(default)]
    completed_at: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
    total_modules: usize,
    counters: ProgressCounters,
    overall_progress: u8,
    time_spent_secs: u64,
    #[serde(default)]
    modules: BTreeMap<String, ModuleProgress>,
    #[serde(default)]
    final_exams: BTreeMap<String, QuizSummary>,
    #[serde(default)]
    attempts: Vec<AttemptRecord>,
}

impl TrainingProgress {
    /// A fresh aggregate: in progress, no module started, fixed module total.
    pub fn new(key: ProgressKey, total_modules: usize, now: DateTime<Utc>) -> Self {
        let mut progress = Self {
            learner_id: key.learner_id,
            training_id: key.training_id,
            status: ProgressStatus::InProgress,
            started_at: now,
            completed_at: None,
            updated_at: now,
            total_modules,
            counters: ProgressCounters::default(),
            overall_progress: 0,
            time_spent_secs: 0,
            modules: BTreeMap::new(),
            final_exams: BTreeMap::new(),
            attempts: Vec::new(),
        };
        progress.recompute_counters();
        progress
    }

    pub fn key(&self) -> ProgressKey {
        ProgressKey::new(self.learner_id.clone(), self.training_id.clone())
    }

    pub fn learner_id(&self) -> &str {
        &self.learner_id
    }

    pub fn training_id(&self) -> &str {
        &self.training_id
    }

    pub fn status(&self) -> ProgressStatus {
        self.status
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn total_modules(&self) -> usize {
        self.total_modules
    }

    pub fn counters(&self) -> ProgressCounters {
        self.counters
    }

    pub fn overall_progress(&self) -> u8 {
        self.overall_progress
    }

    pub fn time_spent_secs(&self) -> u64 {
        self.time_spent_secs
    }

    pub fn modules(&self) -> &BTreeMap<String, ModuleProgress> {
        &self.modules
    }

    pub fn module(&self, module_id: &str) -> Option<&ModuleProgress> {
        self.modules.get(module_id)
    }

    pub fn final_exams(&self) -> &BTreeMap<String, QuizSummary> {
        &self.final_exams
    }

    /// Attempt history, oldest first.
    pub fn attempts(&self) -> &[AttemptRecord] {
        &self.attempts
    }

    /// Count module statuses. Modules without an entry are not started.
    pub fn tally(&self) -> ProgressCounters {
        let mut counters = ProgressCounters::default();
        for module in self.modules.values() {
            match module.status {
                ProgressStatus::Completed => counters.finished += 1,
                ProgressStatus::InProgress => counters.in_progress += 1,
                ProgressStatus::NotStarted => {}
            }
        }
        counters.not_started = self
            .total_modules
            .saturating_sub(counters.finished + counters.in_progress);
        counters
    }

    /// Replace the stored counters with a fresh tally.
    pub fn recompute_counters(&mut self) {
        self.counters = self.tally();
    }

    /// `true` when the stored counters equal the tally and sum to the total.
    pub fn is_consistent(&self) -> bool {
        self.counters == self.tally()
            && self.counters.total() == self.total_modules
            && self.modules.len() <= self.total_modules
    }

    /// Entry for `module_id`, created as not started if absent. A module the
    /// aggregate has never seen beyond its total raises the total.
    pub(crate) fn module_entry(&mut self, module_id: &str) -> &mut ModuleProgress {
        if !self.modules.contains_key(module_id) {
            self.modules
                .insert(module_id.to_string(), ModuleProgress::default());
            if self.modules.len() > self.total_modules {
                tracing::warn!(
                    progress = %self.key(),
                    module = module_id,
                    "module outside the known total, growing total to {}",
                    self.modules.len()
                );
                self.total_modules = self.modules.len();
                self.recompute_counters();
            }
        }
        self.modules
            .entry(module_id.to_string())
            .or_default()
    }

    pub(crate) fn push_attempt(
        &mut self,
        record: AttemptRecord,
        module_id: Option<&str>,
        elapsed_secs: Option<u64>,
    ) {
        let summary = QuizSummary {
            score_percent: record.score,
            passed: record.passed,
            rejected: record.rejected,
            attempt_number: record.attempt_number,
            completed_at: record.completed_at,
        };
        let secs = elapsed_secs.unwrap_or(0);
        match module_id {
            Some(module_id) => {
                let module = self.module_entry(module_id);
                module.quizzes.insert(record.quiz_id.clone(), summary);
                module.time_spent_secs = module.time_spent_secs.saturating_add(secs);
            }
            None => {
                self.final_exams.insert(record.quiz_id.clone(), summary);
            }
        }
        self.time_spent_secs = self.time_spent_secs.saturating_add(secs);
        self.updated_at = record.completed_at.max(self.updated_at);
        self.attempts.push(record);
    }
}

/// Computes a module's percent and status from its sections.
pub trait ModuleProgressPolicy: Send + Sync {
    fn evaluate(&self, module: &ModuleProgress) -> (ProgressStatus, u8);
}

/// Module percent is the floor of the mean section percent, with completed
/// sections counting as 100. The module completes when every known section
/// is complete.
#[derive(Debug, Clone, Copy, Default)]
pub struct SectionAverage;

impl ModuleProgressPolicy for SectionAverage {
    fn evaluate(&self, module: &ModuleProgress) -> (ProgressStatus, u8) {
        let sections = &module.sections;
        if sections.is_empty() {
            return (module.status, module.progress);
        }
        let sum: u64 = sections
            .values()
            .map(|s| if s.completed { 100 } else { u64::from(s.progress.min(100)) })
            .sum();
        let percent = (sum / sections.len() as u64) as u8;
        let status = if sections.values().all(|s| s.completed) {
            ProgressStatus::Completed
        } else if percent > 0 || sections.values().any(|s| s.completed) {
            ProgressStatus::InProgress
        } else {
            ProgressStatus::NotStarted
        };
        (status, percent)
    }
}

/// Computes the training's overall percent.
pub trait TrainingProgressPolicy: Send + Sync {
    fn overall_percent(&self, progress: &TrainingProgress) -> u8;
}

/// Share of completed modules: `floor(finished * 100 / total)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompletedModuleShare;

impl TrainingProgressPolicy for CompletedModuleShare {
    fn overall_percent(&self, progress: &TrainingProgress) -> u8 {
        let total = progress.total_modules();
        if total == 0 {
            return 0;
        }
        (progress.counters().finished * 100 / total) as u8
    }
}

/// Weighted mean of module percents, e.g. weighted by module duration.
/// Modules missing from `weights` do not contribute.
#[derive(Debug, Clone, Default)]
pub struct WeightedModules {
    pub weights: BTreeMap<String, u32>,
}

impl TrainingProgressPolicy for WeightedModules {
    fn overall_percent(&self, progress: &TrainingProgress) -> u8 {
        let total_weight: u64 = self.weights.values().map(|w| u64::from(*w)).sum();
        if total_weight == 0 {
            return 0;
        }
        let weighted: u64 = self
            .weights
            .iter()
            .map(|(id, w)| {
                let pct = progress.module(id).map(|m| m.progress.min(100)).unwrap_or(0);
                u64::from(*w) * u64::from(pct)
            })
            .sum();
        (weighted / total_weight) as u8
    }
}

/// Applies module and section updates and keeps the derived state consistent.
#[derive(Clone)]
pub struct ProgressAggregator {
    training_policy: Arc<dyn TrainingProgressPolicy>,
}

impl Default for ProgressAggregator {
    fn default() -> Self {
        Self::new(Arc::new(CompletedModuleShare))
    }
}

impl fmt::Debug for ProgressAggregator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressAggregator").finish_non_exhaustive()
    }
}

impl ProgressAggregator {
    pub fn new(training_policy: Arc<dyn TrainingProgressPolicy>) -> Self {
        Self { training_policy }
    }

    /// Set a module's status and percent, then recompute the derived state.
    ///
    /// Any transition is allowed, including re-opening a completed module.
    pub fn apply_module_status(
        &self,
        mut progress: TrainingProgress,
        module_id: &str,
        status: ProgressStatus,
        percent: u8,
        now: DateTime<Utc>,
    ) -> Result<TrainingProgress, EngineError> {
        check_percent(percent)?;
        let module = progress.module_entry(module_id);
        let previous = module.status;
        module.status = status;
        module.progress = percent;
        match status {
            ProgressStatus::NotStarted => {
                module.started_at = None;
                module.completed_at = None;
            }
            ProgressStatus::InProgress => {
                module.started_at.get_or_insert(now);
                module.completed_at = None;
            }
            ProgressStatus::Completed => {
                module.started_at.get_or_insert(now);
                module.completed_at.get_or_insert(now);
            }
        }
        if previous != status {
            tracing::info!(
                progress = %progress.key(),
                module = module_id,
                "module {previous} -> {status}"
            );
        }
        progress.updated_at = now;
        self.refresh(&mut progress, now);
        Ok(progress)
    }

    /// Record a section's state. Top-level counters are untouched; the
    /// caller recomputes the module with a [`ModuleProgressPolicy`] and then
    /// applies it with [`apply_module_status`](Self::apply_module_status).
    pub fn apply_section_status(
        &self,
        mut progress: TrainingProgress,
        module_id: &str,
        section_id: &str,
        completed: bool,
        percent: u8,
        now: DateTime<Utc>,
    ) -> Result<TrainingProgress, EngineError> {
        check_percent(percent)?;
        let percent = if completed { 100 } else { percent };
        progress.module_entry(module_id).sections.insert(
            section_id.to_string(),
            SectionProgress {
                completed,
                progress: percent,
            },
        );
        progress.updated_at = now;
        Ok(progress)
    }

    /// Recompute counters, overall percent and the training's own status.
    /// Idempotent.
    pub fn refresh(&self, progress: &mut TrainingProgress, now: DateTime<Utc>) {
        progress.recompute_counters();
        progress.overall_progress = self.training_policy.overall_percent(progress).min(100);

        let all_done =
            progress.total_modules > 0 && progress.counters.finished == progress.total_modules;
        if all_done {
            if progress.status != ProgressStatus::Completed {
                tracing::info!(progress = %progress.key(), "training completed");
            }
            progress.status = ProgressStatus::Completed;
            progress.completed_at.get_or_insert(now);
        } else {
            progress.status = ProgressStatus::InProgress;
            progress.completed_at = None;
        }
    }
}

fn check_percent(percent: u8) -> Result<(), EngineError> {
    if percent > 100 {
        return Err(EngineError::InvalidUpdate(format!(
            "progress must be within 0-100, got {percent}"
        )));
    }
    Ok(())
}
