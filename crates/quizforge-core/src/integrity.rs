//! Integrity policy: anti-cheat rejection gates and violation penalties.
//!
//! Three rejection rules and one penalty rule, each independently enabled.
//! Every rule is disabled by default, and an attempt without telemetry is
//! always accepted without penalty.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::{AttemptTelemetry, Quiz};

/// Why an attempt was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "kebab-case")]
pub enum RejectionReason {
    /// Finished faster than the minimum time for the question count.
    TooFast { elapsed_ms: u64, required_ms: u64 },
    /// More violations than the configured ceiling.
    TooManyViolations { count: u32, max: u32 },
    /// Too many answers came back faster than a human plausibly reads.
    BotLikeResponses { fast: usize, total: usize },
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectionReason::TooFast {
                elapsed_ms,
                required_ms,
            } => write!(
                f,
                "completed in {:.1}s, minimum is {:.1}s",
                *elapsed_ms as f64 / 1000.0,
                *required_ms as f64 / 1000.0
            ),
            RejectionReason::TooManyViolations { count, max } => {
                write!(f, "{count} integrity violations exceed the limit of {max}")
            }
            RejectionReason::BotLikeResponses { fast, total } => {
                write!(f, "{fast} of {total} answers were submitted implausibly fast")
            }
        }
    }
}

/// A rule that can reject an attempt outright.
pub trait RejectionRule {
    /// Stable rule name, used in logs.
    fn name(&self) -> &'static str;

    /// Whether the rule is active.
    fn enabled(&self) -> bool;

    /// Returns a reason when the attempt must be rejected.
    ///
    /// Implementations return `None` when disabled or when the telemetry they
    /// need is missing.
    fn check(&self, quiz: &Quiz, telemetry: &AttemptTelemetry) -> Option<RejectionReason>;
}

/// Reject attempts finished faster than `per_question_ms` per question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MinDurationRule {
    pub enabled: bool,
    pub per_question_ms: u64,
}

impl Default for MinDurationRule {
    fn default() -> Self {
        Self {
            enabled: false,
            per_question_ms: 10_000,
        }
    }
}

impl RejectionRule for MinDurationRule {
    fn name(&self) -> &'static str {
        "min-duration"
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn check(&self, quiz: &Quiz, telemetry: &AttemptTelemetry) -> Option<RejectionReason> {
        if !self.enabled {
            return None;
        }
        let Some(elapsed_ms) = telemetry.elapsed_ms() else {
            if telemetry.start_time.is_some() && telemetry.end_time.is_some() {
                tracing::warn!("end time precedes start time, skipping duration check");
            }
            return None;
        };
        let required_ms = quiz.questions.len() as u64 * self.per_question_ms;
        (elapsed_ms < required_ms).then_some(RejectionReason::TooFast {
            elapsed_ms,
            required_ms,
        })
    }
}

/// Reject attempts with more than `max_violations` violations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViolationCeilingRule {
    pub enabled: bool,
    pub max_violations: u32,
}

impl Default for ViolationCeilingRule {
    fn default() -> Self {
        Self {
            enabled: false,
            max_violations: 10,
        }
    }
}

impl RejectionRule for ViolationCeilingRule {
    fn name(&self) -> &'static str {
        "violation-ceiling"
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn check(&self, _quiz: &Quiz, telemetry: &AttemptTelemetry) -> Option<RejectionReason> {
        if !self.enabled {
            return None;
        }
        let count = telemetry.violation_count?;
        (count > self.max_violations).then_some(RejectionReason::TooManyViolations {
            count,
            max: self.max_violations,
        })
    }
}

/// Reject attempts where more than `max_fast_percent` of the recorded response
/// times are below `fast_response_ms`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotSpeedRule {
    pub enabled: bool,
    pub fast_response_ms: u64,
    pub max_fast_percent: u32,
}

impl Default for BotSpeedRule {
    fn default() -> Self {
        Self {
            enabled: false,
            fast_response_ms: 2_000,
            max_fast_percent: 80,
        }
    }
}

impl RejectionRule for BotSpeedRule {
    fn name(&self) -> &'static str {
        "bot-speed"
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn check(&self, _quiz: &Quiz, telemetry: &AttemptTelemetry) -> Option<RejectionReason> {
        if !self.enabled {
            return None;
        }
        let times = &telemetry.per_question_response_time_ms;
        let total = times.len();
        if total == 0 {
            return None;
        }
        let fast = times
            .values()
            .filter(|ms| **ms < self.fast_response_ms)
            .count();
        // fast / total > max_fast_percent / 100, in integers
        (fast as u64 * 100 > total as u64 * u64::from(self.max_fast_percent))
            .then_some(RejectionReason::BotLikeResponses { fast, total })
    }
}

/// Scale the score down by `per_violation_percent` per violation, capped at
/// `max_percent`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PenaltyRule {
    pub enabled: bool,
    pub per_violation_percent: u32,
    pub max_percent: u32,
}

impl Default for PenaltyRule {
    fn default() -> Self {
        Self {
            enabled: false,
            per_violation_percent: 5,
            max_percent: 50,
        }
    }
}

impl PenaltyRule {
    pub fn name(&self) -> &'static str {
        "penalty"
    }

    /// Score reduction in whole percent, in `0..=100`.
    pub fn penalty_percent(&self, telemetry: &AttemptTelemetry) -> u32 {
        if !self.enabled {
            return 0;
        }
        telemetry
            .violations()
            .saturating_mul(self.per_violation_percent)
            .min(self.max_percent)
            .min(100)
    }
}

/// Accept or reject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Accept,
    Reject(RejectionReason),
}

/// The integrity assessment of one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assessment {
    pub verdict: Verdict,
    /// Score reduction in whole percent. Zero for rejected attempts.
    pub penalty_percent: u32,
}

impl Assessment {
    pub fn accept() -> Self {
        Self {
            verdict: Verdict::Accept,
            penalty_percent: 0,
        }
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self.verdict, Verdict::Reject(_))
    }

    /// Factor in `[0, 1]` applied to the raw score.
    pub fn penalty_multiplier(&self) -> f64 {
        f64::from(100 - self.penalty_percent.min(100)) / 100.0
    }
}

/// The full integrity policy. All rules are off by default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntegrityPolicy {
    pub min_duration: MinDurationRule,
    pub violation_ceiling: ViolationCeilingRule,
    pub bot_speed: BotSpeedRule,
    pub penalty: PenaltyRule,
}

impl IntegrityPolicy {
    /// A policy with every rule enabled at its default thresholds.
    pub fn all_enabled() -> Self {
        Self {
            min_duration: MinDurationRule {
                enabled: true,
                ..Default::default()
            },
            violation_ceiling: ViolationCeilingRule {
                enabled: true,
                ..Default::default()
            },
            bot_speed: BotSpeedRule {
                enabled: true,
                ..Default::default()
            },
            penalty: PenaltyRule {
                enabled: true,
                ..Default::default()
            },
        }
    }

    /// Rejection rules in evaluation order.
    pub fn rejection_rules(&self) -> [&dyn RejectionRule; 3] {
        [&self.min_duration, &self.violation_ceiling, &self.bot_speed]
    }

    /// Names of the active rules.
    pub fn active_rules(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self
            .rejection_rules()
            .iter()
            .filter(|r| r.enabled())
            .map(|r| r.name())
            .collect();
        if self.penalty.enabled {
            names.push(self.penalty.name());
        }
        names
    }

    /// Assess an attempt. The first failing rejection rule wins; the penalty
    /// applies only to accepted attempts.
    pub fn assess(&self, quiz: &Quiz, telemetry: Option<&AttemptTelemetry>) -> Assessment {
        let Some(telemetry) = telemetry else {
            return Assessment::accept();
        };

        for rule in self.rejection_rules() {
            if let Some(reason) = rule.check(quiz, telemetry) {
                tracing::info!(quiz = %quiz.id, rule = rule.name(), "attempt rejected: {reason}");
                return Assessment {
                    verdict: Verdict::Reject(reason),
                    penalty_percent: 0,
                };
            }
        }

        Assessment {
            verdict: Verdict::Accept,
            penalty_percent: self.penalty.penalty_percent(telemetry),
        }
    }
}
