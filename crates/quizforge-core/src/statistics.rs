//! Attempt statistics.
//!
//! Summaries over a learner's attempt history, grouped by quiz.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::attempt::AttemptRecord;

/// Statistics for one quiz across a learner's attempts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizAttemptStats {
    /// Quiz identifier.
    pub quiz_id: String,
    /// Number of recorded attempts, rejected ones included.
    pub attempts: u32,
    /// Highest score across attempts.
    pub best_score: u32,
    /// Score of the most recent attempt.
    pub latest_score: u32,
    /// Mean score across attempts.
    pub average_score: f64,
    /// Whether any attempt passed.
    pub passed_any: bool,
    /// Number of attempts rejected by the integrity policy.
    pub rejected: u32,
    /// Completion time of the most recent attempt.
    pub last_attempt_at: DateTime<Utc>,
}

/// Attempts at `quiz_id`, oldest first.
pub fn attempts_for<'a>(attempts: &'a [AttemptRecord], quiz_id: &str) -> Vec<&'a AttemptRecord> {
    attempts.iter().filter(|a| a.quiz_id == quiz_id).collect()
}

/// Group attempts by quiz and summarize each group.
pub fn summarize_attempts(attempts: &[AttemptRecord]) -> BTreeMap<String, QuizAttemptStats> {
    let mut grouped: BTreeMap<&str, Vec<&AttemptRecord>> = BTreeMap::new();
    for a in attempts {
        grouped.entry(a.quiz_id.as_str()).or_default().push(a);
    }

    grouped
        .into_iter()
        .filter_map(|(quiz_id, group)| {
            // Recording order is attempt order; attempt_number breaks ties for
            // histories assembled from several sources.
            let latest = group.iter().max_by_key(|a| a.attempt_number)?;
            let n = group.len();
            let total: u64 = group.iter().map(|a| u64::from(a.score)).sum();
            let stats = QuizAttemptStats {
                quiz_id: quiz_id.to_string(),
                attempts: n as u32,
                best_score: group.iter().map(|a| a.score).max().unwrap_or(0),
                latest_score: latest.score,
                average_score: total as f64 / n as f64,
                passed_any: group.iter().any(|a| a.passed),
                rejected: group.iter().filter(|a| a.rejected).count() as u32,
                last_attempt_at: latest.completed_at,
            };
            Some((quiz_id.to_string(), stats))
        })
        .collect()
}
