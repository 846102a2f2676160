//! quizforge-core: Quiz scoring and progress tracking.
//!
//! This crate defines the quiz data model, answer evaluation, the integrity
//! policy, the scoring engine, attempt recording, and the per-learner
//! progress aggregate that the rest of quizforge builds on.

pub mod attempt;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod integrity;
pub mod model;
pub mod parser;
pub mod progress;
pub mod service;
pub mod statistics;
pub mod traits;

pub use engine::ScoringEngine;
pub use error::{AnswerError, EngineError, StoreError};
pub use service::QuizService;
