//! Answer evaluation.
//!
//! A question's `correct_answer` is resolved once into an [`ExpectedAnswer`]
//! according to the question type, and the submitted value is normalized to
//! the same representation before comparison. Any shape mismatch is reported
//! as an [`AnswerError`] internally and scored as incorrect; evaluation never
//! fails outward.
//!
//! Matching rules:
//! - multiple-choice / true-false: equality after normalizing to an option
//!   index or a label. A non-numeric answer against a numeric key is incorrect.
//! - multiple-correct: exact set equality of option indexes, no partial credit.
//! - short-answer: case-sensitive exact equality. Numbers are compared by their
//!   decimal rendering (`42` matches `"42"`); no other normalization.
//! - essay: never auto-graded, always incorrect. Manual grading overrides are
//!   an extension point outside this module.

use std::collections::BTreeSet;

use crate::error::AnswerError;
use crate::model::{AnswerValue, Question, QuestionKind};

/// A resolved single-choice key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Choice {
    /// Zero-based option index.
    Index(u64),
    /// Option label, compared verbatim.
    Label(String),
}

/// A question's answer key, resolved for comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpectedAnswer {
    Single(Choice),
    Boolean(bool),
    MultiSet(BTreeSet<u64>),
    Text(String),
    Ungraded,
}

impl ExpectedAnswer {
    /// Resolve the key of `question` according to its type.
    pub fn resolve(question: &Question) -> Result<Self, AnswerError> {
        if question.kind == QuestionKind::Essay {
            return Ok(ExpectedAnswer::Ungraded);
        }
        let key = question
            .correct_answer
            .as_ref()
            .ok_or(AnswerError::MissingCorrectAnswer)?;

        match question.kind {
            QuestionKind::MultipleChoice => resolve_choice(key).map(ExpectedAnswer::Single),
            QuestionKind::TrueFalse => {
                // an index key pointing at a "True"/"False" option is a boolean key
                let labelled = as_index(key)
                    .and_then(|i| option_label(question, i))
                    .and_then(|label| parse_bool(&AnswerValue::Text(label.to_string())));
                match parse_bool(key).or(labelled) {
                    Some(b) => Ok(ExpectedAnswer::Boolean(b)),
                    None => resolve_choice(key).map(ExpectedAnswer::Single),
                }
            }
            QuestionKind::MultipleCorrect => index_set(key).map(ExpectedAnswer::MultiSet),
            QuestionKind::ShortAnswer => as_text(key)
                .map(ExpectedAnswer::Text)
                .ok_or_else(|| malformed("text", key)),
            QuestionKind::Essay => Ok(ExpectedAnswer::Ungraded),
        }
    }

    /// Compare a submitted value against this key.
    pub fn matches(&self, question: &Question, submitted: &AnswerValue) -> Result<bool, AnswerError> {
        match self {
            ExpectedAnswer::Single(Choice::Index(expected)) => as_index(submitted)
                .map(|i| i == *expected)
                .ok_or_else(|| malformed("option index", submitted)),
            ExpectedAnswer::Single(Choice::Label(expected)) => match submitted {
                AnswerValue::Text(s) if s == expected => Ok(true),
                AnswerValue::Text(_) => Ok(as_index(submitted)
                    .and_then(|i| option_label(question, i))
                    == Some(expected.as_str())),
                other => as_index(other)
                    .map(|i| option_label(question, i) == Some(expected.as_str()))
                    .ok_or_else(|| malformed("option label", other)),
            },
            ExpectedAnswer::Boolean(expected) => match parse_bool(submitted) {
                Some(b) => Ok(b == *expected),
                None => as_index(submitted)
                    .and_then(|i| option_label(question, i))
                    .and_then(|label| parse_bool(&AnswerValue::Text(label.to_string())))
                    .map(|b| b == *expected)
                    .ok_or_else(|| malformed("true or false", submitted)),
            },
            ExpectedAnswer::MultiSet(expected) => Ok(index_set(submitted)? == *expected),
            ExpectedAnswer::Text(expected) => as_text(submitted)
                .map(|s| s == *expected)
                .ok_or_else(|| malformed("text", submitted)),
            ExpectedAnswer::Ungraded => Ok(false),
        }
    }
}

/// Decide whether `submitted` answers `question` correctly.
///
/// An absent answer is incorrect. Malformed keys or answers are incorrect.
pub fn evaluate(question: &Question, submitted: Option<&AnswerValue>) -> bool {
    let Some(submitted) = submitted else {
        return false;
    };
    let outcome = ExpectedAnswer::resolve(question)
        .and_then(|expected| expected.matches(question, submitted));
    match outcome {
        Ok(correct) => correct,
        Err(e) => {
            tracing::debug!(question = %question.id, kind = %question.kind, "scored as incorrect: {e}");
            false
        }
    }
}

fn malformed(expected: &'static str, found: &AnswerValue) -> AnswerError {
    AnswerError::Malformed {
        expected,
        found: found.shape().to_string(),
    }
}

fn option_label(question: &Question, index: u64) -> Option<&str> {
    usize::try_from(index)
        .ok()
        .and_then(|i| question.options.get(i))
        .map(String::as_str)
}

fn resolve_choice(key: &AnswerValue) -> Result<Choice, AnswerError> {
    if let Some(i) = as_index(key) {
        return Ok(Choice::Index(i));
    }
    match key {
        AnswerValue::Text(s) => Ok(Choice::Label(s.clone())),
        other => Err(malformed("option index or label", other)),
    }
}

/// Normalize a value to a non-negative option index.
fn as_index(value: &AnswerValue) -> Option<u64> {
    match value {
        AnswerValue::Integer(i) => u64::try_from(*i).ok(),
        AnswerValue::Float(f) if f.fract() == 0.0 && *f >= 0.0 && *f <= u32::MAX as f64 => {
            Some(*f as u64)
        }
        AnswerValue::Text(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }
}

fn as_text(value: &AnswerValue) -> Option<String> {
    match value {
        AnswerValue::Text(s) => Some(s.clone()),
        AnswerValue::Integer(i) => Some(i.to_string()),
        AnswerValue::Float(f) => Some(f.to_string()),
        _ => None,
    }
}

fn parse_bool(value: &AnswerValue) -> Option<bool> {
    match value {
        AnswerValue::Bool(b) => Some(*b),
        AnswerValue::Text(s) if s.trim().eq_ignore_ascii_case("true") => Some(true),
        AnswerValue::Text(s) if s.trim().eq_ignore_ascii_case("false") => Some(false),
        _ => None,
    }
}

fn index_set(value: &AnswerValue) -> Result<BTreeSet<u64>, AnswerError> {
    match value {
        AnswerValue::List(items) => items
            .iter()
            .map(|item| as_index(item).ok_or_else(|| malformed("option index", item)))
            .collect(),
        other => as_index(other)
            .map(|i| BTreeSet::from([i]))
            .ok_or_else(|| malformed("list of option indexes", other)),
    }
}
