//! Scoring engine.
//!
//! Runs the integrity policy, evaluates every question, and folds the
//! outcome into a [`QuizResult`]. Scoring is pure and needs no locking.

use std::collections::BTreeMap;

use crate::evaluator::evaluate;
use crate::integrity::{IntegrityPolicy, Verdict};
use crate::model::{AnswerMap, AttemptTelemetry, Quiz, QuizResult};

/// Scores submissions under a fixed integrity policy.
#[derive(Debug, Clone, Default)]
pub struct ScoringEngine {
    policy: IntegrityPolicy,
}

impl ScoringEngine {
    pub fn new(policy: IntegrityPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &IntegrityPolicy {
        &self.policy
    }

    /// Score `answers` against `quiz`.
    ///
    /// A rejected attempt short-circuits: no question is evaluated and the
    /// result carries zero credit. Otherwise
    /// `score = floor(earned / total * 100 * multiplier)`, and a quiz with no
    /// points scores 0 and never passes.
    pub fn score(
        &self,
        quiz: &Quiz,
        answers: &AnswerMap,
        telemetry: Option<&AttemptTelemetry>,
    ) -> QuizResult {
        let assessment = self.policy.assess(quiz, telemetry);
        if let Verdict::Reject(reason) = &assessment.verdict {
            return QuizResult::rejected(quiz, reason.to_string());
        }

        let mut earned_points = 0u64;
        let mut total_points = 0u64;
        let mut per_question = BTreeMap::new();

        for question in &quiz.questions {
            let correct = evaluate(question, answers.get(&question.id));
            tracing::debug!(quiz = %quiz.id, question = %question.id, correct);
            total_points += u64::from(question.points);
            if correct {
                earned_points += u64::from(question.points);
            }
            per_question.insert(question.id.clone(), correct);
        }

        let score_percent = score_percent(earned_points, total_points, assessment.penalty_percent);
        let passed = total_points > 0 && score_percent >= quiz.passing_score;

        QuizResult {
            quiz_id: quiz.id.clone(),
            score_percent,
            earned_points,
            total_points,
            passed,
            per_question,
            rejected: false,
            rejection_reason: None,
            penalty_percent: assessment.penalty_percent,
        }
    }
}

/// `floor(earned * (100 - penalty) / total)` in integer arithmetic, which is
/// `floor(earned / total * 100 * multiplier)` without float rounding drift.
pub fn score_percent(earned: u64, total: u64, penalty_percent: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    let retained = u64::from(100 - penalty_percent.min(100));
    let pct = earned.min(total) * retained / total;
    u32::try_from(pct).unwrap_or(100)
}
