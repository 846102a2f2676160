//! Attempt recording.
//!
//! Appends scored attempts to a learner's progress aggregate. Attempt numbers
//! are `1 + prior attempts at the same quiz`, computed at recording time.
//! Whether another attempt is allowed at all is decided beforehand by an
//! [`AttemptGate`]; the recorder itself never refuses or deduplicates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::EngineError;
use crate::model::{AnswerMap, AttemptTelemetry, Quiz, QuizResult};
use crate::progress::TrainingProgress;

/// One recorded attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub quiz_id: String,
    /// Fresh id per submission.
    pub attempt_id: Uuid,
    /// 1-based, strictly increasing per (learner, quiz).
    pub attempt_number: u32,
    pub score: u32,
    pub passed: bool,
    #[serde(default)]
    pub rejected: bool,
    #[serde(default)]
    pub penalty_percent: u32,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    /// Raw answers as submitted, kept for audit.
    #[serde(default)]
    pub answers: AnswerMap,
}

/// Start and end of an attempt.
///
/// Telemetry timestamps win when present and valid; anything missing,
/// unrepresentable or out of order falls back to `now`.
pub fn attempt_window(
    telemetry: Option<&AttemptTelemetry>,
    now: DateTime<Utc>,
) -> (DateTime<Utc>, DateTime<Utc>) {
    let Some(telemetry) = telemetry else {
        return (now, now);
    };
    let from_millis = |ms: Option<i64>| ms.and_then(DateTime::<Utc>::from_timestamp_millis);
    let started = from_millis(telemetry.start_time);
    let completed = from_millis(telemetry.end_time);

    if (telemetry.start_time.is_some() && started.is_none())
        || (telemetry.end_time.is_some() && completed.is_none())
    {
        tracing::warn!("unrepresentable telemetry timestamp, using submission time");
    }

    match (started, completed) {
        (Some(s), Some(c)) if c < s => {
            tracing::warn!("telemetry end precedes start, using submission time");
            (now, now)
        }
        (Some(s), Some(c)) => (s, c),
        (Some(s), None) if s <= now => (s, now),
        (None, Some(c)) => (c, c),
        _ => (now, now),
    }
}

/// Start and end from telemetry, when both resolve and are ordered.
///
/// Whenever this is `Some`, [`attempt_window`] records exactly this span.
fn telemetry_span(telemetry: &AttemptTelemetry) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let started = DateTime::<Utc>::from_timestamp_millis(telemetry.start_time?)?;
    let completed = DateTime::<Utc>::from_timestamp_millis(telemetry.end_time?)?;
    (started <= completed).then_some((started, completed))
}

/// Appends attempts to progress aggregates.
#[derive(Debug, Clone, Copy, Default)]
pub struct AttemptRecorder;

impl AttemptRecorder {
    /// Number the next attempt at `quiz_id` would receive.
    pub fn next_attempt_number(progress: &TrainingProgress, quiz_id: &str) -> u32 {
        let prior = progress
            .attempts()
            .iter()
            .filter(|a| a.quiz_id == quiz_id)
            .count();
        u32::try_from(prior).unwrap_or(u32::MAX - 1) + 1
    }

    /// Append `result` to `progress` and return the new record.
    ///
    /// Also stores the quiz summary on the owning module (or as a final exam)
    /// and adds the telemetry duration to time spent. The caller refreshes the
    /// aggregate's derived state afterwards.
    pub fn record(
        &self,
        progress: &mut TrainingProgress,
        quiz: &Quiz,
        result: &QuizResult,
        answers: AnswerMap,
        telemetry: Option<&AttemptTelemetry>,
        now: DateTime<Utc>,
    ) -> AttemptRecord {
        let (started_at, completed_at) = attempt_window(telemetry, now);
        let record = AttemptRecord {
            quiz_id: quiz.id.clone(),
            attempt_id: Uuid::new_v4(),
            attempt_number: Self::next_attempt_number(progress, &quiz.id),
            score: result.score_percent,
            passed: result.passed,
            rejected: result.rejected,
            penalty_percent: result.penalty_percent,
            started_at,
            completed_at,
            answers,
        };
        // Fallback windows (bad or partial telemetry) add no time spent.
        let elapsed_secs = telemetry
            .and_then(telemetry_span)
            .map(|(start, end)| u64::try_from((end - start).num_seconds()).unwrap_or(0));

        tracing::info!(
            progress = %progress.key(),
            quiz = %quiz.id,
            attempt = record.attempt_number,
            score = record.score,
            passed = record.passed,
            "attempt recorded"
        );
        progress.push_attempt(record.clone(), quiz.module_id.as_deref(), elapsed_secs);
        record
    }
}

/// Precondition checked before a new attempt is scored.
pub trait AttemptGate: Send + Sync {
    /// `prior_attempts` counts earlier attempts at this quiz by this learner.
    fn check(&self, quiz: &Quiz, prior_attempts: u32) -> Result<(), EngineError>;
}

/// Allows every attempt. `max_attempts` is advisory only.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unlimited;

impl AttemptGate for Unlimited {
    fn check(&self, _quiz: &Quiz, _prior_attempts: u32) -> Result<(), EngineError> {
        Ok(())
    }
}

/// Refuses attempts once a quiz's `max_attempts` is used up.
#[derive(Debug, Clone, Copy, Default)]
pub struct MaxAttempts;

impl AttemptGate for MaxAttempts {
    fn check(&self, quiz: &Quiz, prior_attempts: u32) -> Result<(), EngineError> {
        match quiz.max_attempts {
            Some(max) if prior_attempts >= max => Err(EngineError::AttemptLimitReached {
                quiz_id: quiz.id.clone(),
                max_attempts: max,
            }),
            _ => Ok(()),
        }
    }
}
